//! Core traits for the TaskDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`TaskSource`]: List private IPs of live cluster tasks
//! - [`RecordStore`]: Read A records from a zone and submit change batches

pub mod task_source;
pub mod record_store;

pub use task_source::TaskSource;
pub use record_store::{RecordStore, ApplyOutcome};
