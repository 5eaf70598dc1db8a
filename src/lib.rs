// Re-export modules
pub mod api;
pub mod browser;
pub mod config;
pub mod context;
pub mod purge;
pub mod skins;
pub mod store;
pub mod time;

// Re-export commonly used types for convenience
pub use api::{PurgeApi, PurgeOutcome, WikiApi};
pub use config::Config;
pub use context::PageContext;
pub use purge::{AutoPurge, PurgeAction, evaluate};
pub use store::{FileStore, MemoryStore, PersistedStore};
pub use time::UnitWords;
