// # Route 53 DNS Provider
//
// This crate provides a Route 53 record store for the TaskDNS system.
//
// ## Behavior
//
// - ✅ Lists every record set in the hosted zone, following truncation markers
// - ✅ Keeps only simple A records holding exactly one value
// - ✅ Submits all changes in one `ChangeResourceRecordSets` call (atomic on the service side)
// - ✅ Makes no request at all for an empty change list
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (a failed pass is corrected by the next invocation)
// - ❌ NO deletes (records are only ever repointed with UPSERT)
// - ❌ NO background tasks
//
// ## API Reference
//
// - List records: `ListResourceRecordSets` (`StartRecordName` / `StartRecordType` paging)
// - Update records: `ChangeResourceRecordSets`

use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use std::net::Ipv4Addr;
use taskdns_core::model::{self, ChangeOp, RecordMap};
use taskdns_core::traits::{ApplyOutcome, RecordStore};
use taskdns_core::{Error, Result};

/// Comment attached to every submitted change batch
const BATCH_COMMENT: &str = "taskdns: repoint stale records at running tasks";

/// Route 53 record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all list requests
/// - Log the intended change batch
/// - **NOT** submit it
pub struct Route53RecordStore {
    /// Route 53 API client
    client: Client,

    /// Dry-run mode: if true, list records but skip ChangeResourceRecordSets
    dry_run: bool,
}

// Custom Debug implementation that keeps client internals out of logs
impl std::fmt::Debug for Route53RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53RecordStore")
            .field("client", &"<Route53 client>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53RecordStore {
    /// Create a new Route 53 record store
    pub fn new(client: Client, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    /// Create a record store that submits changes
    pub fn new_live(client: Client) -> Self {
        Self::new(client, false)
    }

    /// Create a record store that only logs the changes it would submit
    pub fn new_dry_run(client: Client) -> Self {
        Self::new(client, true)
    }

    /// Create a record store from shared AWS configuration
    pub fn from_conf(config: &aws_config::SdkConfig, dry_run: bool) -> Self {
        Self::new(Client::new(config), dry_run)
    }

    /// Whether changes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Add eligible A records from one page of record sets to `map`
///
/// Eligible means type A, no routing-policy set identifier, and exactly
/// one value that parses as IPv4. Alias records carry no values and are
/// skipped quietly; multi-value sets are skipped with a warning.
pub fn collect_address_records(sets: &[ResourceRecordSet], map: &mut RecordMap) {
    for set in sets {
        if *set.r#type() != RrType::A {
            continue;
        }

        if let Some(identifier) = set.set_identifier() {
            tracing::debug!(
                "Skipping {} ({}): routing policy records are not managed",
                set.name(),
                identifier
            );
            continue;
        }

        match set.resource_records() {
            [] => {
                tracing::debug!("Skipping {}: no values (alias record)", set.name());
            }
            [record] => match record.value().parse::<Ipv4Addr>() {
                Ok(ip) => {
                    map.insert(set.name(), ip);
                }
                Err(_) => {
                    tracing::warn!(
                        "Excluding {}: value {} is not an IPv4 address",
                        set.name(),
                        record.value()
                    );
                }
            },
            values => {
                tracing::warn!(
                    "Excluding {}: {} values, only single-value A records are managed",
                    set.name(),
                    values.len()
                );
            }
        }
    }
}

/// Translate intended changes into a Route 53 change batch
pub fn build_change_batch(changes: &[ChangeOp]) -> Result<ChangeBatch> {
    let changes = changes.iter().map(to_change).collect::<Result<Vec<_>>>()?;

    ChangeBatch::builder()
        .comment(BATCH_COMMENT)
        .set_changes(Some(changes))
        .build()
        .map_err(|e| Error::record_store(format!("Invalid change batch: {}", e)))
}

fn to_change(op: &ChangeOp) -> Result<Change> {
    let action = match op.action {
        model::ChangeAction::Upsert => ChangeAction::Upsert,
    };
    let rr_type = match op.record_type {
        model::RecordType::A => RrType::A,
    };

    let record = ResourceRecord::builder()
        .value(op.ip.to_string())
        .build()
        .map_err(|e| Error::record_store(format!("Invalid record value for {}: {}", op.name, e)))?;

    let set = ResourceRecordSet::builder()
        .name(&op.name)
        .r#type(rr_type)
        .ttl(i64::from(op.ttl))
        .resource_records(record)
        .build()
        .map_err(|e| Error::record_store(format!("Invalid record set {}: {}", op.name, e)))?;

    Change::builder()
        .action(action)
        .resource_record_set(set)
        .build()
        .map_err(|e| Error::record_store(format!("Invalid change for {}: {}", op.name, e)))
}

#[async_trait]
impl RecordStore for Route53RecordStore {
    async fn list_address_records(&self, zone_id: &str) -> Result<RecordMap> {
        let mut map = RecordMap::new();
        let mut start: Option<(String, RrType, Option<String>)> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id);

            if let Some((name, rr_type, identifier)) = start.take() {
                request = request
                    .start_record_name(name)
                    .start_record_type(rr_type)
                    .set_start_record_identifier(identifier);
            }

            let output = request.send().await.map_err(|e| {
                Error::record_store(format!(
                    "ListResourceRecordSets failed for zone {}: {}",
                    zone_id,
                    DisplayErrorContext(&e)
                ))
            })?;
            pages += 1;

            collect_address_records(output.resource_record_sets(), &mut map);

            if !output.is_truncated() {
                break;
            }

            match (output.next_record_name(), output.next_record_type()) {
                (Some(name), Some(rr_type)) => {
                    start = Some((
                        name.to_string(),
                        rr_type.clone(),
                        output.next_record_identifier().map(str::to_string),
                    ));
                }
                _ => {
                    return Err(Error::record_store(format!(
                        "ListResourceRecordSets for zone {} was truncated without a continuation marker",
                        zone_id
                    )));
                }
            }
        }

        tracing::debug!(
            "Zone {}: {} eligible A record(s) across {} page(s)",
            zone_id,
            map.len(),
            pages
        );

        Ok(map)
    }

    async fn apply_changes(&self, zone_id: &str, changes: &[ChangeOp]) -> Result<ApplyOutcome> {
        if changes.is_empty() {
            return Ok(ApplyOutcome::Skipped);
        }

        let batch = build_change_batch(changes)?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would submit {} change(s) to zone {}: {}",
                changes.len(),
                zone_id,
                serde_json::to_string(changes)?
            );
            return Ok(ApplyOutcome::DryRun {
                count: changes.len(),
            });
        }

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| {
                Error::record_store(format!(
                    "ChangeResourceRecordSets failed for zone {}: {}",
                    zone_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        let change_id = output
            .change_info()
            .map(|info| info.id().to_string())
            .unwrap_or_default();

        tracing::info!(
            "Submitted {} change(s) to zone {} (change {})",
            changes.len(),
            zone_id,
            change_id
        );

        Ok(ApplyOutcome::Submitted {
            change_id,
            count: changes.len(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}
