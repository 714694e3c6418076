use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr subscriber. The filter comes from `FC_LOG` and
/// defaults to `warn`, so stdout carries only command output.
pub fn init() {
    let filter = EnvFilter::try_from_env("FC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}
