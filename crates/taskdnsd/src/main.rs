// # taskdnsd - TaskDNS runner
//
// Thin integration layer: all reconciliation logic lives in taskdns-core.
//
// The runner is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Loading AWS configuration once and handing it to both providers
// 4. Running one reconciliation pass (or the periodic loop)
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `CLUSTER_ID`: ECS cluster whose running tasks are inspected (required)
// - `ZONE_ID`: Route 53 hosted zone to reconcile (required)
// - `TASKDNS_MODE`: `live` (default) or `dry-run`
// - `TASKDNS_INTERVAL_SECS`: Run passes on this interval instead of once
// - `TASKDNS_REGION`: AWS region override (default: AWS provider chain)
// - `TASKDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export CLUSTER_ID=prod-cluster
// export ZONE_ID=Z0123456789ABCDEFGHIJ
// export TASKDNS_MODE=dry-run
//
// taskdnsd
// ```

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use std::env;
use std::process::ExitCode;
use taskdns_core::{SyncConfig, SyncEngine, spawn_event_logger};
use taskdns_provider_route53::Route53RecordStore;
use taskdns_source_ecs::EcsTaskSource;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Pass completed (or clean shutdown in periodic mode)
/// - 1: Configuration error, no I/O performed
/// - 2: Upstream or runtime failure
#[derive(Debug, Clone, Copy)]
enum TaskDnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<TaskDnsExitCode> for ExitCode {
    fn from(code: TaskDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    cluster_id: String,
    zone_id: String,
    dry_run: bool,
    interval_secs: Option<u64>,
    region: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => anyhow::bail!("{} is required. Set it via: export {}=...", key, key),
            }
        };

        let mode = lookup("TASKDNS_MODE").unwrap_or_else(|| "live".to_string());
        let dry_run = match mode.to_lowercase().as_str() {
            "live" => false,
            "dry-run" => true,
            other => anyhow::bail!(
                "TASKDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let interval_secs = match lookup("TASKDNS_INTERVAL_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("TASKDNS_INTERVAL_SECS must be a number of seconds. Got: {}", raw)
            })?),
            None => None,
        };

        Ok(Self {
            cluster_id: required("CLUSTER_ID")?,
            zone_id: required("ZONE_ID")?,
            dry_run,
            interval_secs,
            region: lookup("TASKDNS_REGION").filter(|r| !r.trim().is_empty()),
            log_level: lookup("TASKDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if let Some(interval) = self.interval_secs
            && !(10..=86_400).contains(&interval)
        {
            anyhow::bail!(
                "TASKDNS_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval
            );
        }

        // Hosted zone ids are uppercase alphanumerics; accept the
        // "/hostedzone/" prefix the console and CLI sometimes show.
        let zone = self.zone_id.trim_start_matches("/hostedzone/");
        if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("ZONE_ID '{}' is not a valid hosted zone id", self.zone_id);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "TASKDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn sync_config(&self) -> SyncConfig {
        let config = SyncConfig::new(
            self.cluster_id.clone(),
            self.zone_id.trim_start_matches("/hostedzone/"),
        );
        match self.interval_secs {
            Some(secs) => config.with_interval_secs(secs),
            None => config,
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return TaskDnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return TaskDnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TaskDnsExitCode::ConfigError.into();
    }

    info!(
        "Starting taskdnsd: cluster {} -> zone {}",
        config.cluster_id, config.zone_id
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TaskDnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(config).await {
            Ok(()) => TaskDnsExitCode::Success,
            Err(e) => {
                error!("Reconciliation failed: {:#}", e);
                TaskDnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the providers and run the engine
async fn run(config: Config) -> Result<()> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    if config.dry_run {
        warn!("Running in DRY-RUN mode - no DNS changes will be submitted");
    }

    let task_source = EcsTaskSource::from_conf(&sdk_config);
    let record_store = Route53RecordStore::from_conf(&sdk_config, config.dry_run);

    let (engine, event_rx) = SyncEngine::new(
        Box::new(task_source),
        Box::new(record_store),
        config.sync_config(),
    )?;
    let event_logger = spawn_event_logger(event_rx);

    if config.interval_secs.is_some() {
        let result = engine.run().await;
        drop(engine);
        let _ = event_logger.await;
        result?;
        info!("Shut down cleanly");
        return Ok(());
    }

    let report = engine.run_once().await?;
    info!(
        "Completed with status {}: {} task IP(s), {} record(s), {} change(s), {} unresolved orphan(s)",
        report.status_code(),
        report.task_ip_count,
        report.record_count,
        report.changes.len(),
        report.unresolved_orphans.len()
    );

    Ok(())
}
