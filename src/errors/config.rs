// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, validating or applying a kernel configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file contents could not be parsed in the format implied by its extension
    #[error("failed to parse config '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The file extension does not map to a supported format
    #[error("unsupported config format '{extension}' (expected yaml, yml, toml or json)")]
    UnsupportedFormat { extension: String },

    /// A single field holds a value the kernel cannot work with
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// One or more validation checks failed
    #[error("Configuration validation failed:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<ConfigError>),

    /// Worker threads for the configured executor could not be spawned
    #[error("failed to start executor threads: {0}")]
    Spawn(#[source] std::io::Error),

    /// The tokio executor was selected but no runtime is running on this thread
    #[error("executor kind 'tokio' requires a running tokio runtime")]
    NoTokioRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_problem() {
        let err = ConfigError::Validation(vec![
            ConfigError::InvalidValue {
                field: "executor.worker_threads",
                reason: "must be at least 1".into(),
            },
            ConfigError::InvalidValue {
                field: "streams.request_window",
                reason: "must be at least 1".into(),
            },
        ]);

        let msg = err.to_string();
        assert!(msg.starts_with("Configuration validation failed:"));
        assert!(msg.contains("executor.worker_threads"));
        assert!(msg.contains("streams.request_window"));
    }
}
