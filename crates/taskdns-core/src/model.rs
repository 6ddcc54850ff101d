//! Data model shared by the reconciler and the providers
//!
//! Everything here is transient: built at the start of a pass,
//! consumed by [`crate::reconcile()`], and dropped once the change
//! batch has been submitted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// TTL (seconds) written on every upserted record
pub const RECORD_TTL: u32 = 300;

/// One simple A record in the managed zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully qualified record name, as returned by the provider
    pub name: String,
    /// The single address the record points at
    pub ip: Ipv4Addr,
}

/// Mapping of record name to IP, kept in provider order
///
/// Names are unique. Iteration order is the order in which names were
/// first inserted, which decides which stale record is repurposed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMap {
    records: Vec<DnsRecord>,
    /// Name to position in `records`
    index: HashMap<String, usize>,
}

impl RecordMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing the IP in place if the name already exists
    ///
    /// Returns the previous IP for that name, if any.
    pub fn insert(&mut self, name: impl Into<String>, ip: Ipv4Addr) -> Option<Ipv4Addr> {
        let name = name.into();
        if let Some(&position) = self.index.get(&name) {
            return Some(std::mem::replace(&mut self.records[position].ip, ip));
        }

        self.index.insert(name.clone(), self.records.len());
        self.records.push(DnsRecord { name, ip });
        None
    }

    /// Look up the IP for a record name
    pub fn get(&self, name: &str) -> Option<Ipv4Addr> {
        self.index.get(name).map(|&position| self.records[position].ip)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in provider order
    pub fn iter(&self) -> impl Iterator<Item = &DnsRecord> {
        self.records.iter()
    }

    /// Record names in provider order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }
}

impl<N: Into<String>> FromIterator<(N, Ipv4Addr)> for RecordMap {
    fn from_iter<I: IntoIterator<Item = (N, Ipv4Addr)>>(iter: I) -> Self {
        let mut map = RecordMap::new();
        for (name, ip) in iter {
            map.insert(name, ip);
        }
        map
    }
}

/// Change action sent to the DNS service
///
/// Records are only ever repointed, so UPSERT is the sole action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Upsert,
}

/// DNS record type of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
}

/// An intended change to one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOp {
    pub action: ChangeAction,
    pub name: String,
    pub ip: Ipv4Addr,
    pub record_type: RecordType,
    pub ttl: u32,
}

impl ChangeOp {
    /// Point `name` at `ip` with the standard type and TTL
    pub fn upsert(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            action: ChangeAction::Upsert,
            name: name.into(),
            ip,
            record_type: RecordType::A,
            ttl: RECORD_TTL,
        }
    }
}
