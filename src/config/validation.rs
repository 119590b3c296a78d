// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every check runs, and all problems are reported together so a broken file
//! can be fixed in one pass.

use crate::config::{ExecutorKind, KernelConfig};
use crate::errors::ConfigError;
use tracing_subscriber::EnvFilter;

/// Validate a configuration, collecting every problem found.
pub fn validate_config(cfg: &KernelConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if cfg.executor.worker_threads == Some(0) {
        errors.push(ConfigError::InvalidValue {
            field: "executor.worker_threads",
            reason: "must be at least 1".into(),
        });
    }
    if cfg.executor.thread_name.trim().is_empty()
        && matches!(
            cfg.executor.kind,
            ExecutorKind::ThreadPool | ExecutorKind::SingleThread
        )
    {
        errors.push(ConfigError::InvalidValue {
            field: "executor.thread_name",
            reason: "must not be empty".into(),
        });
    }
    if cfg.streams.request_window == 0 {
        errors.push(ConfigError::InvalidValue {
            field: "streams.request_window",
            reason: "must be at least 1".into(),
        });
    }
    if cfg.streams.default_capacity == Some(0) {
        errors.push(ConfigError::InvalidValue {
            field: "streams.default_capacity",
            reason: "must be at least 1 (omit it for unbounded streams)".into(),
        });
    }
    if let Err(err) = EnvFilter::try_new(&cfg.logging.filter) {
        errors.push(ConfigError::InvalidValue {
            field: "logging.filter",
            reason: err.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&KernelConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut cfg = KernelConfig::default();
        cfg.executor.worker_threads = Some(0);
        cfg.executor.thread_name = "  ".into();
        cfg.streams.default_capacity = Some(0);

        let errors = validate_config(&cfg).unwrap_err();
        let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(errors.len(), 3);
        assert!(fields[0].contains("executor.worker_threads"));
        assert!(fields[1].contains("executor.thread_name"));
        assert!(fields[2].contains("streams.default_capacity"));
    }

    #[test]
    fn test_thread_name_ignored_for_direct() {
        let mut cfg = KernelConfig::default();
        cfg.executor.kind = ExecutorKind::Direct;
        cfg.executor.thread_name.clear();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_bad_log_filter() {
        let mut cfg = KernelConfig::default();
        cfg.logging.filter = "dagwood_flow=notalevel".into();
        let errors = validate_config(&cfg).unwrap_err();
        assert!(errors[0].to_string().contains("logging.filter"));
    }
}
