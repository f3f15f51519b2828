//! Configuration for propagatord

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Manifest file loaded into the store at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<PathBuf>,
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of workers reconciling roots in parallel
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciles: usize,

    /// Interval between full resyncs in seconds
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Delay before the first retry of a failed root
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    /// Upper bound on the retry delay
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Capacity of the propagation event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: default_max_concurrent(),
            resync_interval_secs: default_resync_interval(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ControllerConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_reconciles == 0 {
            return Err("controller.max_concurrent_reconciles must be at least 1".into());
        }
        if self.resync_interval_secs == 0 {
            return Err("controller.resync_interval_secs must be positive".into());
        }
        if self.base_backoff_ms == 0 || self.base_backoff_ms > self.max_backoff_ms {
            return Err(
                "controller.base_backoff_ms must be positive and not exceed max_backoff_ms".into(),
            );
        }
        if self.event_capacity == 0 {
            return Err("controller.event_capacity must be positive".into());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_max_concurrent() -> usize {
    4
}

fn default_resync_interval() -> u64 {
    300
}

fn default_base_backoff() -> u64 {
    5
}

fn default_max_backoff() -> u64 {
    300_000
}

fn default_event_capacity() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // PROPAGATOR_CONTROLLER__MAX_CONCURRENT_RECONCILES=8
        builder = builder.add_source(
            config::Environment::with_prefix("PROPAGATOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.controller.max_concurrent_reconciles, 4);
        assert_eq!(config.controller.resync_interval(), Duration::from_secs(300));
        assert_eq!(config.logging.level, "info");
        assert!(config.seed.is_none());
        assert!(config.controller.validate().is_ok());
    }

    #[test]
    fn test_load_without_file() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.controller.base_backoff_ms, 5);
        assert_eq!(config.controller.max_backoff_ms, 300_000);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("propagatord-{}.yaml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "controller:\n  max_concurrent_reconciles: 8\n  resync_interval_secs: 30\nlogging:\n  json: true\nseed: /etc/propagator/seed.yaml"
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.controller.max_concurrent_reconciles, 8);
        assert_eq!(config.controller.resync_interval_secs, 30);
        assert_eq!(config.controller.event_capacity, 4096);
        assert!(config.logging.json);
        assert_eq!(config.seed, Some(PathBuf::from("/etc/propagator/seed.yaml")));
    }

    #[test]
    fn test_validation() {
        let config = ControllerConfig {
            max_concurrent_reconciles: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ControllerConfig {
            base_backoff_ms: 10_000,
            max_backoff_ms: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
