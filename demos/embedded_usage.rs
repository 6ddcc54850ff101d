//! Minimal embedding example for taskdns-core
//!
//! This example drives the sync engine with in-memory task and record
//! implementations, so it runs without any cloud access. Tasks are
//! replaced between two passes and the second pass repoints the stale
//! records at them.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use taskdns_core::{
    ApplyOutcome, ChangeOp, RecordMap, RecordStore, Result, SyncConfig, SyncEngine, TaskSource,
};

/// Task inventory the application controls directly
#[derive(Clone, Default)]
struct InMemoryTasks {
    ips: Arc<Mutex<Vec<Ipv4Addr>>>,
}

impl InMemoryTasks {
    fn replace(&self, ips: &[Ipv4Addr]) {
        if let Ok(mut current) = self.ips.lock() {
            *current = ips.to_vec();
        }
    }
}

#[async_trait::async_trait]
impl TaskSource for InMemoryTasks {
    async fn list_task_ips(&self, _cluster_id: &str) -> Result<Vec<Ipv4Addr>> {
        self.ips
            .lock()
            .map(|ips| ips.clone())
            .map_err(|_| taskdns_core::Error::task_source("task list lock poisoned"))
    }

    fn source_name(&self) -> &'static str {
        "in-memory-tasks"
    }
}

/// A zone held in memory; applied batches are written straight into it
#[derive(Clone, Default)]
struct InMemoryZone {
    records: Arc<Mutex<RecordMap>>,
}

#[async_trait::async_trait]
impl RecordStore for InMemoryZone {
    async fn list_address_records(&self, _zone_id: &str) -> Result<RecordMap> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| taskdns_core::Error::record_store("zone lock poisoned"))
    }

    async fn apply_changes(&self, _zone_id: &str, changes: &[ChangeOp]) -> Result<ApplyOutcome> {
        if changes.is_empty() {
            return Ok(ApplyOutcome::Skipped);
        }

        let mut records = self
            .records
            .lock()
            .map_err(|_| taskdns_core::Error::record_store("zone lock poisoned"))?;
        for change in changes {
            println!("[Embedded] UPSERT {} -> {}", change.name, change.ip);
            records.insert(change.name.clone(), change.ip);
        }

        Ok(ApplyOutcome::Submitted {
            change_id: "embedded-change".to_string(),
            count: changes.len(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "in-memory-zone"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded taskdns-core Example ===\n");

    let tasks = InMemoryTasks::default();
    tasks.replace(&[Ipv4Addr::new(10, 0, 1, 10), Ipv4Addr::new(10, 0, 1, 11)]);

    let zone = InMemoryZone::default();
    if let Ok(mut records) = zone.records.lock() {
        records.insert("api-1.internal.example.com.", Ipv4Addr::new(10, 0, 1, 10));
        records.insert("api-2.internal.example.com.", Ipv4Addr::new(10, 0, 1, 11));
    }

    println!("1. Creating engine...");
    let (engine, mut event_rx) = SyncEngine::new(
        Box::new(tasks.clone()),
        Box::new(zone.clone()),
        SyncConfig::new("embedded-cluster", "ZEMBEDDED"),
    )?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. First pass: zone already matches the tasks");
    let report = engine.run_once().await?;
    println!("   -> {} change(s), outcome {:?}\n", report.changes.len(), report.outcome);

    println!("3. Tasks replaced by a deployment");
    tasks.replace(&[Ipv4Addr::new(10, 0, 2, 20), Ipv4Addr::new(10, 0, 2, 21)]);

    println!("4. Second pass: stale records are repointed");
    let report = engine.run_once().await?;
    println!("   -> {} change(s), outcome {:?}\n", report.changes.len(), report.outcome);

    drop(engine);
    let _ = event_listener.await;

    println!("5. Final zone:");
    if let Ok(records) = zone.records.lock() {
        for record in records.iter() {
            println!("   {} A {}", record.name, record.ip);
        }
    }

    println!("\n=== Embedding Successful ===");
    Ok(())
}
