//! Process-wide cache of facade instances.
//!
//! Each facade type has one slot that moves `ABSENT -> CONSTRUCTED` on the
//! first `get_*` call and back to `ABSENT` only through [`ClientRegistry::reset`].
//! Construction runs while the slot lock is held, so concurrent first calls
//! observe a single instance.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::info;

use crate::clients::{EngineClient, EventEngineClient, ExecutorClient};
use crate::config::Config;
use crate::driver::DriverRegistry;
use crate::error::RegistryError;

static GLOBAL: LazyLock<ClientRegistry> = LazyLock::new(ClientRegistry::from_env);

type Slot<T> = Mutex<Option<Arc<T>>>;

/// Where facade construction reads its configuration from.
#[derive(Debug, Clone)]
enum ConfigSource {
    Fixed(Config),
    /// Loaded with [`Config::load`] on every construction.
    Environment,
}

impl ConfigSource {
    fn resolve(&self) -> Result<Config, RegistryError> {
        match self {
            ConfigSource::Fixed(config) => Ok(config.clone()),
            ConfigSource::Environment => Ok(Config::load(None)?),
        }
    }
}

/// Lazily constructed singleton facades.
pub struct ClientRegistry {
    config: RwLock<ConfigSource>,
    drivers: DriverRegistry,
    engine: Slot<EngineClient>,
    executor: Slot<ExecutorClient>,
    event_engine: Slot<EventEngineClient>,
}

impl ClientRegistry {
    /// Registry using the built-in drivers.
    pub fn new(config: Config) -> Self {
        Self::with_drivers(config, DriverRegistry::with_defaults())
    }

    /// Registry using a custom set of driver constructors.
    pub fn with_drivers(config: Config, drivers: DriverRegistry) -> Self {
        Self::with_source(ConfigSource::Fixed(config), drivers)
    }

    fn with_source(source: ConfigSource, drivers: DriverRegistry) -> Self {
        Self {
            config: RwLock::new(source),
            drivers,
            engine: Mutex::new(None),
            executor: Mutex::new(None),
            event_engine: Mutex::new(None),
        }
    }

    /// Registry configured from files and environment (see [`Config::load`]).
    ///
    /// Configuration is read when a client is constructed; a load failure is
    /// returned by the `*_client` call as [`RegistryError::Config`].
    pub fn from_env() -> Self {
        Self::with_source(ConfigSource::Environment, DriverRegistry::with_defaults())
    }

    /// The cached Engine client, constructing it on first use.
    pub fn engine_client(&self) -> Result<Arc<EngineClient>, RegistryError> {
        get_or_init(&self.engine, || {
            EngineClient::new(&self.config()?.engine, &self.drivers)
        })
    }

    /// The cached Executor client, constructing it on first use.
    pub fn executor_client(&self) -> Result<Arc<ExecutorClient>, RegistryError> {
        get_or_init(&self.executor, || {
            ExecutorClient::new(&self.config()?.executor, &self.drivers)
        })
    }

    /// The cached Event Engine client, constructing it on first use.
    pub fn event_engine_client(&self) -> Result<Arc<EventEngineClient>, RegistryError> {
        get_or_init(&self.event_engine, || {
            EventEngineClient::new(&self.config()?.event_engine, &self.drivers)
        })
    }

    /// Drop every cached client; the next `*_client` call rebuilds from the
    /// current configuration. Intended for test isolation.
    pub fn reset(&self) {
        let cleared = [
            lock(&self.engine).take().is_some(),
            lock(&self.executor).take().is_some(),
            lock(&self.event_engine).take().is_some(),
        ]
        .iter()
        .filter(|cleared| **cleared)
        .count();

        info!(cleared, "RPC client registry reset");
    }

    /// Replace the configuration used by future constructions.
    ///
    /// Clients already cached are kept until [`reset`](Self::reset).
    pub fn reconfigure(&self, config: Config) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = ConfigSource::Fixed(config);
    }

    /// The configuration the next construction would use.
    pub fn config(&self) -> Result<Config, RegistryError> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve()
    }

    /// Returns true if no client is cached.
    pub fn is_empty(&self) -> bool {
        lock(&self.engine).is_none()
            && lock(&self.executor).is_none()
            && lock(&self.event_engine).is_none()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("drivers", &self.drivers)
            .field("engine", &lock(&self.engine).is_some())
            .field("executor", &lock(&self.executor).is_some())
            .field("event_engine", &lock(&self.event_engine).is_some())
            .finish()
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Atomic check-and-set: the slot stays locked while `build` runs.
fn get_or_init<T, F>(slot: &Slot<T>, build: F) -> Result<Arc<T>, RegistryError>
where
    F: FnOnce() -> Result<T, RegistryError>,
{
    let mut guard = lock(slot);
    if let Some(existing) = guard.as_ref() {
        return Ok(existing.clone());
    }

    let client = Arc::new(build()?);
    *guard = Some(client.clone());
    Ok(client)
}

// ============================================================================
// Process-wide registry
// ============================================================================

/// The process-wide registry.
pub fn global() -> &'static ClientRegistry {
    &GLOBAL
}

/// The process-wide Engine client.
pub fn get_engine_client() -> Result<Arc<EngineClient>, RegistryError> {
    GLOBAL.engine_client()
}

/// The process-wide Executor client.
pub fn get_executor_client() -> Result<Arc<ExecutorClient>, RegistryError> {
    GLOBAL.executor_client()
}

/// The process-wide Event Engine client.
pub fn get_event_engine_client() -> Result<Arc<EventEngineClient>, RegistryError> {
    GLOBAL.event_engine_client()
}

/// Clear the process-wide clients. Safe to call before any were built.
pub fn reset() {
    GLOBAL.reset();
}
