//! Throttle configuration and defaulting.
//!
//! The TOML form lives under a `[throttle]` table:
//!
//! ```toml
//! [throttle]
//! target_latency_ms = 20
//! sample_interval_ms = 500
//! initial_capacity = 200
//! max_capacity = 100000
//! ```
//!
//! Zero or negative values are not errors: they are replaced by the
//! defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TARGET_LATENCY: Duration = Duration::from_millis(20);
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_INITIAL_CAPACITY: usize = 200;
pub const DEFAULT_MAX_CAPACITY: usize = 100_000;

/// Validated throttle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Average request duration the tuner steers towards.
    pub target_latency: Duration,
    /// How often the tuner wakes up.
    pub sample_interval: Duration,
    /// Capacity of the gate before the first tuning cycle.
    pub initial_capacity: usize,
    /// Upper bound for any tuned capacity.
    pub max_capacity: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            target_latency: DEFAULT_TARGET_LATENCY,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl ThrottleConfig {
    /// Replace every zero field with its default.
    ///
    /// `max_capacity` is raised to at least `initial_capacity`.
    pub fn with_defaults(mut self) -> Self {
        if self.target_latency.is_zero() {
            self.target_latency = DEFAULT_TARGET_LATENCY;
        }
        if self.sample_interval.is_zero() {
            self.sample_interval = DEFAULT_SAMPLE_INTERVAL;
        }
        if self.initial_capacity == 0 {
            self.initial_capacity = DEFAULT_INITIAL_CAPACITY;
        }
        if self.max_capacity == 0 {
            self.max_capacity = DEFAULT_MAX_CAPACITY;
        }
        self.max_capacity = self.max_capacity.max(self.initial_capacity);
        self
    }

    /// Parse the `[throttle]` table of a TOML document.
    ///
    /// A document without that table yields the defaults. Other tables are
    /// ignored so the same file can carry unrelated sections.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            throttle: ThrottleSettings,
        }

        let doc: Document = toml::from_str(s)?;
        Ok(doc.throttle.into_config())
    }

    /// Read and parse a TOML file. See [`ThrottleConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

/// Raw, user-supplied throttle settings.
///
/// Fields are signed so that negative input deserializes and can be
/// corrected instead of failing the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub target_latency_ms: Option<i64>,
    pub sample_interval_ms: Option<i64>,
    pub initial_capacity: Option<i64>,
    pub max_capacity: Option<i64>,
}

impl ThrottleSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: ThrottleSettings) -> ThrottleSettings {
        ThrottleSettings {
            target_latency_ms: other.target_latency_ms.or(self.target_latency_ms),
            sample_interval_ms: other.sample_interval_ms.or(self.sample_interval_ms),
            initial_capacity: other.initial_capacity.or(self.initial_capacity),
            max_capacity: other.max_capacity.or(self.max_capacity),
        }
    }

    /// Convert into a [`ThrottleConfig`], defaulting missing and
    /// non-positive values.
    pub fn into_config(self) -> ThrottleConfig {
        ThrottleConfig {
            target_latency: Duration::from_millis(positive(self.target_latency_ms)),
            sample_interval: Duration::from_millis(positive(self.sample_interval_ms)),
            initial_capacity: positive(self.initial_capacity) as usize,
            max_capacity: positive(self.max_capacity) as usize,
        }
        .with_defaults()
    }
}

/// Non-positive and missing values collapse to zero, which `with_defaults`
/// then replaces.
fn positive(value: Option<i64>) -> u64 {
    value.filter(|v| *v > 0).map(|v| v as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fields_take_defaults() {
        let config = ThrottleConfig {
            target_latency: Duration::ZERO,
            sample_interval: Duration::ZERO,
            initial_capacity: 0,
            max_capacity: 0,
        }
        .with_defaults();

        assert_eq!(config, ThrottleConfig::default());
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = ThrottleConfig {
            target_latency: Duration::from_millis(5),
            sample_interval: Duration::from_secs(1),
            initial_capacity: 10,
            max_capacity: 50,
        }
        .with_defaults();

        assert_eq!(config.target_latency, Duration::from_millis(5));
        assert_eq!(config.sample_interval, Duration::from_secs(1));
        assert_eq!(config.initial_capacity, 10);
        assert_eq!(config.max_capacity, 50);
    }

    #[test]
    fn max_capacity_never_below_initial() {
        let config = ThrottleConfig {
            initial_capacity: 500,
            max_capacity: 100,
            ..ThrottleConfig::default()
        }
        .with_defaults();

        assert_eq!(config.max_capacity, 500);
    }

    #[test]
    fn negative_settings_are_silently_corrected() {
        let settings = ThrottleSettings {
            target_latency_ms: Some(-20),
            sample_interval_ms: Some(0),
            initial_capacity: Some(-1),
            max_capacity: None,
        };

        assert_eq!(settings.into_config(), ThrottleConfig::default());
    }

    #[test]
    fn parse_throttle_table() {
        let toml_str = r#"
[server]
port = 9000

[throttle]
target_latency_ms = 50
sample_interval_ms = 250
initial_capacity = 16
"#;
        let config = ThrottleConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.target_latency, Duration::from_millis(50));
        assert_eq!(config.sample_interval, Duration::from_millis(250));
        assert_eq!(config.initial_capacity, 16);
        assert_eq!(config.max_capacity, DEFAULT_MAX_CAPACITY);
    }

    #[test]
    fn missing_table_yields_defaults() {
        let config = ThrottleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ThrottleConfig::default());
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = ThrottleConfig::from_toml_str("[throttle\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = ThrottleSettings {
            target_latency_ms: Some(30),
            initial_capacity: Some(8),
            ..ThrottleSettings::default()
        };
        let cli = ThrottleSettings {
            initial_capacity: Some(64),
            ..ThrottleSettings::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.target_latency_ms, Some(30));
        assert_eq!(merged.initial_capacity, Some(64));
        assert_eq!(merged.sample_interval_ms, None);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tempo.toml");
        std::fs::write(&path, "[throttle]\ninitial_capacity = 3\n").unwrap();

        let config = ThrottleConfig::from_file(&path).unwrap();
        assert_eq!(config.initial_capacity, 3);
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ThrottleConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
