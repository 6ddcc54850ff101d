// # Record Store Trait
//
// Defines the interface for reading and updating A records in a DNS zone.
//
// ## Implementations
//
// - Route 53: `taskdns-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use taskdns_core::{ChangeOp, RecordStore};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let records = store.list_address_records("Z123").await?;
//     let change = ChangeOp::upsert("api.svc.example.com.", "10.0.0.7".parse()?);
//     store.apply_changes("Z123", &[change]).await?;
//
//     Ok(())
// }
// ```

use crate::model::{ChangeOp, RecordMap};
use async_trait::async_trait;

/// Result of submitting a change list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing to submit; no request was made
    Skipped,
    /// The batch was accepted by the DNS service
    Submitted {
        /// Provider-assigned change identifier
        change_id: String,
        /// Number of changes in the batch
        count: usize,
    },
    /// Dry-run mode: the batch was logged but not sent
    DryRun {
        /// Number of changes that would have been sent
        count: usize,
    },
}

impl ApplyOutcome {
    /// Number of changes the outcome covers
    pub fn count(&self) -> usize {
        match self {
            ApplyOutcome::Skipped => 0,
            ApplyOutcome::Submitted { count, .. } | ApplyOutcome::DryRun { count } => *count,
        }
    }
}

/// Trait for DNS zone implementations
///
/// # Contract
///
/// - `list_address_records` only yields simple A records holding exactly
///   one value. Anything else is excluded; multi-value exclusions are
///   logged as warnings by the implementation.
/// - `apply_changes` submits the whole list as one atomic batch, and
///   returns [`ApplyOutcome::Skipped`] without touching the network when
///   the list is empty.
/// - Implementations never retry and never delete records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List simple A records in `zone_id`, in provider order
    async fn list_address_records(&self, zone_id: &str) -> Result<RecordMap, crate::Error>;

    /// Submit `changes` to `zone_id` as a single batch
    async fn apply_changes(
        &self,
        zone_id: &str,
        changes: &[ChangeOp],
    ) -> Result<ApplyOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// A static string identifying the provider (e.g., "route53")
    fn provider_name(&self) -> &'static str;
}
