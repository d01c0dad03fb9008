use std::sync::mpsc::Receiver;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Route executor logs to the test harness. `RUST_LOG` overrides the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "strand_executor=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Receive with a generous timeout so a broken executor fails the test
/// instead of hanging it.
pub fn recv<T>(rx: &Receiver<T>) -> T {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("timed out waiting for the executor")
}
