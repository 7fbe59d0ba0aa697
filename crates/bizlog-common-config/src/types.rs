//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BizlogConfig {
    /// Record dispatch configuration.
    pub dispatcher: DispatcherConfig,
    /// Log output configuration.
    pub log: LogSettings,
}

/// Worker pool behind record delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Number of delivery workers.
    pub pool_size: usize,
    /// Records that may wait for a worker before submitters deliver inline.
    pub queue_capacity: usize,
}

impl DispatcherConfig {
    /// Default number of delivery workers.
    pub const DEFAULT_POOL_SIZE: usize = 4;
    /// Default queue capacity.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

    /// Create a config with explicit sizes.
    pub fn new(pool_size: usize, queue_capacity: usize) -> Self {
        Self {
            pool_size,
            queue_capacity,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POOL_SIZE, Self::DEFAULT_QUEUE_CAPACITY)
    }
}

/// Log output settings, interpreted by `bizlog-common-log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Minimum level: trace, debug, info, warn or error.
    pub level: String,
    /// Output format: pretty, compact or json.
    pub format: String,
    /// Write logs to this file instead of stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub(crate) const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
    pub(crate) const FORMATS: [&'static str; 3] = ["pretty", "compact", "json"];
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}
