//! Error types for the admission gate.

use std::path::PathBuf;

use thiserror::Error;

/// Returned by [`Throttle::run`](crate::Throttle::run) when the gate has no
/// spare capacity. The handler was not invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("service overloaded: admission rejected")]
pub struct Overloaded;

/// Errors that can occur while loading a throttle configuration file.
///
/// Out-of-range values are never reported here; they are replaced by
/// defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
