//! RPC facades for the remote workflow services.

pub mod engine;
pub mod event_engine;
pub mod executor;

pub use engine::EngineClient;
pub use event_engine::EventEngineClient;
pub use executor::ExecutorClient;
