// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_LOG_FILTER, DEFAULT_REQUEST_WINDOW, DEFAULT_THREAD_NAME};
use crate::config::validate_config;
use crate::errors::ConfigError;
use crate::node::StreamDefaults;
use crate::observability::messages::config::{ConfigLoaded, ConfigValidationFailed};
use crate::observability::messages::StructuredLog;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Kernel configuration.
///
/// Every section is optional; an empty file yields the defaults.
///
/// # Example
/// ```yaml
/// executor:
///   kind: thread_pool
///   worker_threads: 4
///   thread_name: dagwood-worker
/// streams:
///   request_window: 16
///   default_capacity: 64
/// logging:
///   filter: "info,dagwood_flow=debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub executor: ExecutorOptions,
    pub streams: StreamOptions,
    pub logging: LoggingOptions,
}

/// Which executor runs node actions.
///
/// # Variants
/// * `ThreadPool` - Fixed pool of worker threads (default)
/// * `SingleThread` - One worker thread; actions run in submission order
/// * `Direct` - Inline on the posting thread
/// * `Tokio` - Spawned onto the tokio runtime the caller is running in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    #[default]
    ThreadPool,
    SingleThread,
    Direct,
    Tokio,
}

/// Executor options.
///
/// # Fields
/// * `kind` - The executor to build
/// * `worker_threads` - Pool size; defaults to the number of available cores
/// * `thread_name` - Prefix for worker thread names
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorOptions {
    pub kind: ExecutorKind,
    pub worker_threads: Option<usize>,
    pub thread_name: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            worker_threads: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// Defaults for stream ports.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamOptions {
    pub request_window: u64,
    pub default_capacity: Option<usize>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            request_window: DEFAULT_REQUEST_WINDOW,
            default_capacity: None,
        }
    }
}

impl From<&StreamOptions> for StreamDefaults {
    fn from(options: &StreamOptions) -> Self {
        Self {
            request_window: options.request_window,
            default_capacity: options.default_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingOptions {
    /// An `EnvFilter` directive string.
    pub filter: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Load a config file. The format follows the extension: `yaml`/`yml`, `toml` or `json`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<KernelConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let parse_error = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let (cfg, format) = match extension.as_str() {
        "yaml" | "yml" if content.trim().is_empty() => (KernelConfig::default(), "yaml"),
        "yaml" | "yml" => (
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            "yaml",
        ),
        "toml" => (
            toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            "toml",
        ),
        "json" => (
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            "json",
        ),
        _ => return Err(ConfigError::UnsupportedFormat { extension }),
    };
    ConfigLoaded { path, format }.log();
    Ok(cfg)
}

/// Load a config file and run every validation check on it.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<KernelConfig, ConfigError> {
    let cfg = load_config(path)?;
    if let Err(errors) = validate_config(&cfg) {
        let problems: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ConfigValidationFailed {
            problems: &problems,
        }
        .log();
        return Err(ConfigError::Validation(errors));
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
executor:
  kind: single_thread
  thread_name: serial
streams:
  request_window: 4
  default_capacity: 8
"#;

        let cfg: KernelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.executor.kind, ExecutorKind::SingleThread);
        assert_eq!(cfg.executor.thread_name, "serial");
        assert_eq!(cfg.streams.request_window, 4);
        assert_eq!(cfg.streams.default_capacity, Some(8));
        assert_eq!(cfg.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let file = write_config(".yaml", "");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg, KernelConfig::default());
    }

    #[test]
    fn test_toml_and_json_formats() {
        let toml_file = write_config(
            ".toml",
            "[executor]\nkind = \"direct\"\n\n[logging]\nfilter = \"debug\"\n",
        );
        let cfg = load_config(toml_file.path()).unwrap();
        assert_eq!(cfg.executor.kind, ExecutorKind::Direct);
        assert_eq!(cfg.logging.filter, "debug");

        let json_file = write_config(".json", r#"{"executor": {"worker_threads": 3}}"#);
        let cfg = load_config(json_file.path()).unwrap();
        assert_eq!(cfg.executor.worker_threads, Some(3));
        assert_eq!(cfg.executor.kind, ExecutorKind::ThreadPool);
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let file = write_config(".yaml", "executor:\n  workers: 4\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_config(".ini", "kind=direct");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_and_validate_rejects_zero_values() {
        let file = write_config(
            ".yaml",
            "executor:\n  worker_threads: 0\nstreams:\n  request_window: 0\n",
        );
        let err = load_and_validate_config(file.path()).unwrap_err();
        match err {
            ConfigError::Validation(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
