// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration loading and validation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A configuration file was read and parsed.
///
/// # Log Level
/// `info!` - Startup milestone
pub struct ConfigLoaded<'a> {
    pub path: &'a Path,
    pub format: &'a str,
}

impl Display for ConfigLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} configuration from '{}'",
            self.format,
            self.path.display()
        )
    }
}

impl StructuredLog for ConfigLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            format = self.format,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "config_load",
            span_name = name,
            path = %self.path.display(),
            format = self.format,
        )
    }
}

/// Validation found problems with a loaded configuration.
///
/// # Log Level
/// `error!` - Startup cannot continue
///
/// # Example
/// ```
/// use dagwood_flow::observability::messages::config::ConfigValidationFailed;
///
/// let problems = vec!["invalid value for 'streams.request_window': must be at least 1".to_string()];
/// let msg = ConfigValidationFailed {
///     problems: &problems,
/// };
///
/// assert_eq!(msg.to_string(), "Configuration rejected with 1 problem(s)");
/// ```
pub struct ConfigValidationFailed<'a> {
    pub problems: &'a [String],
}

impl Display for ConfigValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Configuration rejected with {} problem(s)",
            self.problems.len()
        )
    }
}

impl StructuredLog for ConfigValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            problems = self.problems.join("; "),
            count = self.problems.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "config_validation",
            span_name = name,
            count = self.problems.len(),
        )
    }
}
