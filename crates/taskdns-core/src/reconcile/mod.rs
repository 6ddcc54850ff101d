//! Record reconciliation
//!
//! Pure, synchronous computation over the two fetched collections:
//!
//! 1. Split existing records into *valid* (IP is live) and *invalid*
//!    (IP no longer belongs to any task), keeping provider order.
//! 2. Every valid record claims one occurrence of its IP from the live
//!    list. Whatever remains are orphan IPs.
//! 3. Orphans are paired positionally with invalid records. Surplus
//!    orphans are reported, surplus invalid records are left alone.
//!
//! No record is ever deleted. Pairing carries no affinity between runs.

use crate::model::{ChangeOp, RecordMap};
use std::collections::{HashSet, VecDeque};
use std::net::Ipv4Addr;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Upserts to submit, in pairing order
    pub changes: Vec<ChangeOp>,

    /// Live IPs that no spare record could absorb
    pub unresolved_orphans: Vec<Ipv4Addr>,

    /// Invalid records that received no orphan and still point at dead IPs
    pub stale_records: Vec<String>,

    /// Number of records whose IP is live
    valid_records: usize,
}

impl Reconciliation {
    /// True when there is nothing to submit
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn valid_record_count(&self) -> usize {
        self.valid_records
    }
}

/// Compute the minimal set of upserts bringing `records` in line with `task_ips`
///
/// Duplicate entries in `task_ips` are kept: each occurrence is an
/// independent live signal and may claim its own record.
pub fn reconcile(task_ips: &[Ipv4Addr], records: &RecordMap) -> Reconciliation {
    let live: HashSet<Ipv4Addr> = task_ips.iter().copied().collect();

    let mut orphans: Vec<Ipv4Addr> = task_ips.to_vec();
    let mut invalid: VecDeque<&str> = VecDeque::new();
    let mut valid_records = 0;

    for record in records.iter() {
        if live.contains(&record.ip) {
            valid_records += 1;
            // A second record on the same IP finds nothing left to claim.
            if let Some(pos) = orphans.iter().position(|ip| *ip == record.ip) {
                orphans.remove(pos);
            }
        } else {
            invalid.push_back(record.name.as_str());
        }
    }

    let mut changes = Vec::with_capacity(orphans.len().min(invalid.len()));
    let mut unresolved_orphans = Vec::new();

    for ip in orphans {
        match invalid.pop_front() {
            Some(name) => changes.push(ChangeOp::upsert(name, ip)),
            None => unresolved_orphans.push(ip),
        }
    }

    Reconciliation {
        changes,
        unresolved_orphans,
        stale_records: invalid.into_iter().map(str::to_owned).collect(),
        valid_records,
    }
}
