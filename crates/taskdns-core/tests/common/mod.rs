//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal in-memory providers that record how the
//! engine drives them.

#![allow(dead_code)]

use taskdns_core::error::{Error, Result};
use taskdns_core::traits::{ApplyOutcome, RecordStore, TaskSource};
use taskdns_core::{ChangeOp, RecordMap, SyncConfig};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Barrier;

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("valid IPv4 literal")
}

pub fn ips(list: &[&str]) -> Vec<Ipv4Addr> {
    list.iter().map(|s| ip(s)).collect()
}

pub fn records(list: &[(&str, &str)]) -> RecordMap {
    list.iter().map(|(name, addr)| (*name, ip(addr))).collect()
}

/// A TaskSource returning a fixed list of IPs
pub struct MockTaskSource {
    ips: Vec<Ipv4Addr>,
    fail: Arc<AtomicBool>,
    list_call_count: Arc<AtomicUsize>,
    /// When set, list_task_ips waits here before answering
    barrier: Option<Arc<Barrier>>,
}

impl MockTaskSource {
    pub fn new(ips: Vec<Ipv4Addr>) -> Self {
        Self {
            ips,
            fail: Arc::new(AtomicBool::new(false)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            barrier: None,
        }
    }

    pub fn failing() -> Self {
        let source = Self::new(Vec::new());
        source.fail.store(true, Ordering::SeqCst);
        source
    }

    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Get the number of times list_task_ips() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Make subsequent calls fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Create a new MockTaskSource that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            ips: other.ips.clone(),
            fail: Arc::clone(&other.fail),
            list_call_count: Arc::clone(&other.list_call_count),
            barrier: other.barrier.clone(),
        }
    }
}

#[async_trait::async_trait]
impl TaskSource for MockTaskSource {
    async fn list_task_ips(&self, _cluster_id: &str) -> Result<Vec<Ipv4Addr>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::task_source("ListTasks failed"));
        }

        Ok(self.ips.clone())
    }

    fn source_name(&self) -> &'static str {
        "mock-tasks"
    }
}

/// A RecordStore that serves a fixed zone and records submitted batches
pub struct MockRecordStore {
    records: RecordMap,
    fail_list: bool,
    fail_apply: bool,
    list_call_count: Arc<AtomicUsize>,
    batches: Arc<std::sync::Mutex<Vec<Vec<ChangeOp>>>>,
    barrier: Option<Arc<Barrier>>,
}

impl MockRecordStore {
    pub fn new(records: RecordMap) -> Self {
        Self {
            records,
            fail_list: false,
            fail_apply: false,
            list_call_count: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(std::sync::Mutex::new(Vec::new())),
            barrier: None,
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Get the number of times list_address_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Batches passed to apply_changes(), including empty ones
    pub fn batches(&self) -> Vec<Vec<ChangeOp>> {
        self.batches.lock().unwrap().clone()
    }

    /// Create a new MockRecordStore that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: other.records.clone(),
            fail_list: other.fail_list,
            fail_apply: other.fail_apply,
            list_call_count: Arc::clone(&other.list_call_count),
            batches: Arc::clone(&other.batches),
            barrier: other.barrier.clone(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn list_address_records(&self, _zone_id: &str) -> Result<RecordMap> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        if self.fail_list {
            return Err(Error::record_store("ListResourceRecordSets failed"));
        }

        Ok(self.records.clone())
    }

    async fn apply_changes(&self, _zone_id: &str, changes: &[ChangeOp]) -> Result<ApplyOutcome> {
        self.batches.lock().unwrap().push(changes.to_vec());

        if self.fail_apply {
            return Err(Error::record_store("ChangeResourceRecordSets failed"));
        }

        Ok(ApplyOutcome::Submitted {
            change_id: "C-TEST".to_string(),
            count: changes.len(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock-zone"
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new("test-cluster", "ZTEST")
}
