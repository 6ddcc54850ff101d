// # taskdns-core
//
// Core library for keeping DNS A records pointed at live cluster tasks.
//
// ## Architecture Overview
//
// - **TaskSource**: Trait for listing private IPs of running tasks
// - **RecordStore**: Trait for reading A records and submitting change batches
// - **reconcile**: Pure function pairing stale records with orphan task IPs
// - **SyncEngine**: Orchestrates fetch → reconcile → apply for one zone
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation is pure; I/O lives behind traits
// 2. **Stateless**: Each pass starts from scratch; the zone itself is the state
// 3. **Repoint, Never Delete**: Records are only ever upserted
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A consistent zone produces no changes

pub mod traits;
pub mod model;
pub mod reconcile;
pub mod engine;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{TaskSource, RecordStore, ApplyOutcome};
pub use model::{ChangeOp, DnsRecord, RecordMap, RECORD_TTL};
pub use reconcile::{reconcile, Reconciliation};
pub use engine::{SyncEngine, EngineEvent, SyncReport, spawn_event_logger};
pub use config::{SyncConfig, EngineConfig};
pub use error::{Error, Result};
