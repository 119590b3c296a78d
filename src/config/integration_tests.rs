// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_and_validate_config, ExecutorKind, RuntimeBuilder};

    /// The shipped YAML config loads and validates
    #[test]
    fn test_thread_pool_yaml_loading() {
        let config = load_and_validate_config("configs/thread-pool.yaml").unwrap();

        assert_eq!(config.executor.kind, ExecutorKind::ThreadPool);
        assert_eq!(config.executor.worker_threads, Some(4));
        assert_eq!(config.executor.thread_name, "dagwood-worker");
        assert_eq!(config.streams.default_capacity, Some(64));
        assert_eq!(config.logging.filter, "info,dagwood_flow=debug");
    }

    /// TOML sections fall back to defaults for omitted fields
    #[test]
    fn test_single_thread_toml_loading() {
        let config = load_and_validate_config("configs/single-thread.toml").unwrap();

        assert_eq!(config.executor.kind, ExecutorKind::SingleThread);
        assert_eq!(config.executor.worker_threads, None);
        assert_eq!(config.streams.request_window, 4);
        assert_eq!(config.streams.default_capacity, None);
    }

    /// Every shipped config builds a runtime
    #[test]
    fn test_shipped_configs_build_runtimes() {
        for (file, executor) in [
            ("configs/thread-pool.yaml", "thread_pool"),
            ("configs/single-thread.toml", "single_thread"),
            ("configs/direct.json", "direct"),
        ] {
            let config = load_and_validate_config(file).unwrap();
            let dataflow = RuntimeBuilder::from_config(&config).unwrap();
            assert_eq!(dataflow.executor().name(), executor, "{file}");
        }
    }
}
