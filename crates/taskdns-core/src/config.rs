//! Configuration types for the TaskDNS system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main TaskDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cluster whose running tasks are inspected
    pub cluster_id: String,

    /// Hosted zone whose A records are reconciled
    pub zone_id: String,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with default engine settings
    pub fn new(cluster_id: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            zone_id: zone_id.into(),
            engine: EngineConfig::default(),
        }
    }

    /// Set the interval for periodic mode
    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.engine.interval_secs = Some(interval_secs);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.cluster_id.trim().is_empty() {
            return Err(crate::Error::config("cluster id cannot be empty"));
        }

        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("zone id cannot be empty"));
        }

        self.engine.validate()?;

        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between passes in periodic mode
    ///
    /// `None` runs a single pass and returns, leaving re-invocation to
    /// an external scheduler.
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 100 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == Some(0) {
            return Err(crate::Error::config("interval must be > 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}
