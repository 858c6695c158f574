//! Infrastructure layer: order store, lifecycle engine, refresh, config.

pub mod config;
pub mod engine;
pub mod record;
pub mod refresh;
pub mod session;
pub mod store;


pub use config::{ConfigError, StallConfig};
pub use engine::{EngineError, OrderLifecycleEngine, RefreshOutcome};
pub use record::{OrderRecord, RecordError};
pub use refresh::Digest;
pub use session::Session;
pub use store::{Document, InMemoryOrderStore, OrderStore, StoreError};
