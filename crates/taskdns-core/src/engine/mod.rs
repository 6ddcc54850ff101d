//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Fetching live task IPs via TaskSource
//! - Fetching existing A records via RecordStore
//! - Reconciling the two collections
//! - Submitting the resulting change batch via RecordStore
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐          ┌──────────────┐
//! │ TaskSource  │          │ RecordStore  │
//! │ (task IPs)  │          │ (records)    │
//! └─────────────┘          └──────────────┘
//!        │                        │
//!        └──────── try_join ──────┘
//!                     │
//!                     ▼
//!             ┌──────────────┐
//!             │  reconcile   │
//!             └──────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌──────────────┐        ┌─────────────┐
//! │ RecordStore  │        │   Events    │
//! │ (apply)      │        │  (notify)   │
//! └──────────────┘        └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Fetch task IPs and records concurrently; either failure aborts
//! 2. Reconcile into upserts and diagnostics
//! 3. If there are changes, submit them as one batch
//! 4. Report the outcome
//!
//! Every pass is independent. No state is carried between passes.

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::{ChangeOp, RecordMap};
use crate::reconcile::reconcile;
use crate::traits::{ApplyOutcome, RecordStore, TaskSource};
use chrono::{DateTime, Utc};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A reconciliation pass started
    PassStarted {
        cluster_id: String,
        zone_id: String,
    },

    /// Both inputs were fetched
    InputsFetched {
        task_ips: usize,
        records: usize,
    },

    /// A live IP could not be assigned to any record
    OrphanUnresolved {
        ip: Ipv4Addr,
    },

    /// The change batch was handed to the record store
    ChangesApplied {
        outcome: ApplyOutcome,
    },

    /// The pass finished successfully
    PassSucceeded {
        changes: usize,
    },

    /// The pass aborted
    PassFailed {
        error: String,
    },

    /// Periodic mode stopped
    Stopped {
        reason: String,
    },
}

/// Summary of one successful pass
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of live task IPs seen (duplicates included)
    pub task_ip_count: usize,
    /// Number of eligible A records seen
    pub record_count: usize,
    pub changes: Vec<ChangeOp>,
    pub unresolved_orphans: Vec<Ipv4Addr>,
    pub stale_records: Vec<String>,
    pub outcome: ApplyOutcome,
}

impl SyncReport {
    /// Status code reported for a successful pass
    pub const STATUS_OK: u16 = 200;

    pub fn status_code(&self) -> u16 {
        Self::STATUS_OK
    }
}

/// Core sync engine
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Either call [`SyncEngine::run_once()`] from an external scheduler,
///    or [`SyncEngine::run()`] to loop on the configured interval
/// 3. Drop to cleanup
///
/// ## Failure Policy
///
/// A failed fetch or apply aborts the pass. There is no retry within a
/// pass; in periodic mode the next tick starts a fresh pass.
pub struct SyncEngine {
    /// Task inventory
    task_source: Box<dyn TaskSource>,

    /// DNS zone access
    record_store: Box<dyn RecordStore>,

    /// Cluster to inspect
    cluster_id: String,

    /// Zone to reconcile
    zone_id: String,

    /// Seconds between passes (periodic mode)
    interval_secs: Option<u64>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,

    /// Events discarded because the channel was full
    dropped_events: AtomicUsize,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// Configuration is validated here, so a missing cluster or zone id
    /// fails before any I/O is attempted.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        task_source: Box<dyn TaskSource>,
        record_store: Box<dyn RecordStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            task_source,
            record_store,
            cluster_id: config.cluster_id,
            zone_id: config.zone_id,
            interval_secs: config.engine.interval_secs,
            event_tx: tx,
            dropped_events: AtomicUsize::new(0),
        };

        Ok((engine, rx))
    }

    /// Run a single reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: The pass completed (possibly with unresolved orphans)
    /// - `Err(Error)`: A fetch or the batch submission failed
    pub async fn run_once(&self) -> Result<SyncReport> {
        match self.pass().await {
            Ok(report) => {
                self.emit_event(EngineEvent::PassSucceeded {
                    changes: report.changes.len(),
                });
                Ok(report)
            }
            Err(e) => {
                self.emit_event(EngineEvent::PassFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run the engine
    ///
    /// Without an interval this is a single pass. With one, passes repeat
    /// until SIGINT; failed passes are logged and do not stop the loop.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let Some(interval_secs) = self.interval_secs else {
            return self.run_once().await.map(|_| ());
        };

        info!(
            "Periodic mode: reconciling zone {} every {}s",
            self.zone_id, interval_secs
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        if let Some(mut rx) = shutdown_rx {
            // Test mode: wait for provided shutdown signal
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_logged().await;
                    }

                    _ = &mut rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            // Production mode: wait for SIGINT
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_logged().await;
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run one pass in periodic mode, logging instead of propagating failure
    async fn run_logged(&self) {
        if let Err(e) = self.run_once().await {
            error!("Reconciliation pass failed: {}", e);
        }
    }

    async fn pass(&self) -> Result<SyncReport> {
        let started_at = Utc::now();

        self.emit_event(EngineEvent::PassStarted {
            cluster_id: self.cluster_id.clone(),
            zone_id: self.zone_id.clone(),
        });

        let (task_ips, records) = tokio::try_join!(self.fetch_task_ips(), self.fetch_records())?;

        debug!(
            "Fetched {} task IP(s) from cluster {} and {} record(s) from zone {}",
            task_ips.len(),
            self.cluster_id,
            records.len(),
            self.zone_id
        );
        self.emit_event(EngineEvent::InputsFetched {
            task_ips: task_ips.len(),
            records: records.len(),
        });

        let reconciliation = reconcile(&task_ips, &records);

        for ip in &reconciliation.unresolved_orphans {
            warn!(
                "Task IP {} has no record and no stale record is free to take it; \
                 zone {} needs more records",
                ip, self.zone_id
            );
            self.emit_event(EngineEvent::OrphanUnresolved { ip: *ip });
        }

        if !reconciliation.stale_records.is_empty() {
            debug!(
                "Leaving {} stale record(s) untouched: {}",
                reconciliation.stale_records.len(),
                reconciliation.stale_records.join(", ")
            );
        }

        let outcome = if reconciliation.is_noop() {
            debug!("Zone {} is up to date, nothing to submit", self.zone_id);
            ApplyOutcome::Skipped
        } else {
            for change in &reconciliation.changes {
                info!("Repointing {} -> {}", change.name, change.ip);
            }
            self.apply(&reconciliation.changes).await?
        };

        if outcome != ApplyOutcome::Skipped {
            self.emit_event(EngineEvent::ChangesApplied {
                outcome: outcome.clone(),
            });
        }

        info!(
            "Reconciled zone {}: {} change(s), {} unresolved orphan(s), {} valid record(s)",
            self.zone_id,
            reconciliation.changes.len(),
            reconciliation.unresolved_orphans.len(),
            reconciliation.valid_record_count()
        );

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            task_ip_count: task_ips.len(),
            record_count: records.len(),
            changes: reconciliation.changes,
            unresolved_orphans: reconciliation.unresolved_orphans,
            stale_records: reconciliation.stale_records,
            outcome,
        })
    }

    async fn fetch_task_ips(&self) -> Result<Vec<Ipv4Addr>> {
        self.task_source
            .list_task_ips(&self.cluster_id)
            .await
            .map_err(|e| Error::fetch(self.task_source.source_name(), e.to_string()))
    }

    async fn fetch_records(&self) -> Result<RecordMap> {
        self.record_store
            .list_address_records(&self.zone_id)
            .await
            .map_err(|e| Error::fetch(self.record_store.provider_name(), e.to_string()))
    }

    async fn apply(&self, changes: &[ChangeOp]) -> Result<ApplyOutcome> {
        self.record_store
            .apply_changes(&self.zone_id, changes)
            .await
            .map_err(|e| Error::apply(self.record_store.provider_name(), e.to_string()))
    }

    /// Number of events dropped because the receiver fell behind
    pub fn dropped_event_count(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                // Warn once; later drops are counted and logged at debug.
                if self.dropped_events.fetch_add(1, Ordering::Relaxed) == 0 {
                    warn!("Event channel full, dropping events. Consider increasing event_channel_capacity.");
                } else {
                    debug!("Event channel full, dropping event");
                }
            }
            // Nobody is listening; events are optional.
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Test-only helper to run the engine with a controlled shutdown signal
    ///
    /// **TESTING ONLY**: Production code should use `run()` instead, which
    /// manages shutdown via SIGINT rather than programmatic channels.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }
}

/// Drain an engine's event receiver, logging every event at debug level
///
/// For callers that have no use for the events but run the engine in
/// periodic mode, where an unread channel would fill up.
pub fn spawn_event_logger(mut event_rx: mpsc::Receiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "engine event");
        }
    })
}
