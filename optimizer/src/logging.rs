//! Diagnostic tracing for the optimizer.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Run progress and
//! the final summary are product output and go to stdout regardless of the
//! filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the filter is `warn`, or
/// `optimizer=debug` when `debug` is requested.
///
/// # Example
/// ```bash
/// RUST_LOG=optimizer::llm=trace optimizer --program slow.py --model ollama --model_name llama3
/// ```
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn default_directive(debug: bool) -> &'static str {
    if debug { "optimizer=debug" } else { "warn" }
}
