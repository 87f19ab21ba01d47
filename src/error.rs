//! Error types surfaced to facade callers.

use crate::driver::DriverError;

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Where a messaging failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The call never left this process (no context bound).
    Local,
    /// Connection, serialization, timeout or delivery failure in the driver.
    Transport,
    /// The remote service raised a domain error.
    Application,
}

/// Unified error for every RPC made through a facade.
///
/// Callers can handle all variants uniformly ("engine unreachable") or
/// branch on [`MessagingError::kind`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessagingError {
    /// No call context was bound to the calling task.
    #[error("no call context bound for '{method}'")]
    MissingContext { method: String },

    /// The driver failed to deliver the call or its reply.
    #[error("transport failure in '{method}': {message}")]
    Transport { method: String, message: String },

    /// The remote service handled the call and raised an error.
    #[error("remote failure in '{method}': {exc_type}: {message}")]
    Remote {
        method: String,
        exc_type: String,
        message: String,
    },
}

impl MessagingError {
    /// Translate a driver failure raised while calling `method`.
    pub fn from_driver(method: &str, err: DriverError) -> Self {
        match err {
            DriverError::Remote { exc_type, message } => MessagingError::Remote {
                method: method.to_string(),
                exc_type,
                message,
            },
            other => MessagingError::Transport {
                method: method.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Classification of the failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            MessagingError::MissingContext { .. } => FailureKind::Local,
            MessagingError::Transport { .. } => FailureKind::Transport,
            MessagingError::Remote { .. } => FailureKind::Application,
        }
    }

    /// Name of the remote method the failed call targeted.
    pub fn method(&self) -> &str {
        match self {
            MessagingError::MissingContext { method }
            | MessagingError::Transport { method, .. }
            | MessagingError::Remote { method, .. } => method,
        }
    }

    /// The original failure message.
    pub fn message(&self) -> String {
        match self {
            MessagingError::MissingContext { method } => {
                format!("no call context bound for '{}'", method)
            }
            MessagingError::Transport { message, .. } | MessagingError::Remote { message, .. } => {
                message.clone()
            }
        }
    }

    /// Returns true if the remote service raised the error.
    pub fn is_remote(&self) -> bool {
        self.kind() == FailureKind::Application
    }

    /// Returns true if the call failed in the transport.
    pub fn is_transport(&self) -> bool {
        self.kind() == FailureKind::Transport
    }
}

/// Errors raised while building facades from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The configured driver name has no registered constructor.
    #[error("unknown rpc driver '{0}'")]
    UnknownDriver(String),

    /// The driver constructor rejected the transport settings.
    #[error("failed to construct '{driver}' driver: {source}")]
    Driver {
        driver: String,
        #[source]
        source: DriverError,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}
