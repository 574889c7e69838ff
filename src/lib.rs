// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod collect;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState, LAUNCH_DATE};
pub use crate::collect::source::{FixtureSource, HttpRootServerSource, RootServerSource};
pub use crate::collect::{run_once, CollectOptions};
pub use crate::model::{AggregateSnapshot, Counters, PerSourceSnapshot, RootServerRecord};
pub use crate::store::{JsonFileStore, MemoryStore, SnapshotStore};
