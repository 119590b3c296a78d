/// Demand an unbounded stream port requests from an upstream output
pub const DEFAULT_REQUEST_WINDOW: u64 = 16;
/// Prefix for pool worker thread names
pub const DEFAULT_THREAD_NAME: &str = "dagwood-worker";
/// Tracing filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info";
