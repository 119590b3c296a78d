// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::KernelConfig;
use crate::engine::ExecutorFactory;
use crate::errors::ConfigError;
use crate::node::{Dataflow, StreamDefaults};

/// Runtime builder - turns a configuration into a root dataflow.
///
/// The root carries the configured executor and stream defaults; every node and
/// nested dataflow created under it inherits both.
///
/// # Examples
///
/// ```
/// use dagwood_flow::config::{ExecutorKind, KernelConfig, RuntimeBuilder};
///
/// let mut config = KernelConfig::default();
/// config.executor.kind = ExecutorKind::Direct;
///
/// let dataflow = RuntimeBuilder::from_config(&config).unwrap();
/// assert_eq!(dataflow.executor().name(), "direct");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build a root [`Dataflow`] from configuration.
    pub fn from_config(cfg: &KernelConfig) -> Result<Dataflow, ConfigError> {
        let executor = ExecutorFactory::from_config(cfg)?;
        Ok(Dataflow::with_options(
            "root",
            executor,
            StreamDefaults::from(&cfg.streams),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorKind;

    #[test]
    fn test_root_carries_stream_defaults() {
        let mut cfg = KernelConfig::default();
        cfg.executor.kind = ExecutorKind::Direct;
        cfg.streams.request_window = 3;
        cfg.streams.default_capacity = Some(5);

        let dataflow = RuntimeBuilder::from_config(&cfg).unwrap();
        let child = dataflow.child("stage");

        assert_eq!(child.stream_defaults().request_window, 3);
        assert_eq!(child.stream_defaults().default_capacity, Some(5));
        assert_eq!(child.executor().name(), "direct");
    }
}
