//! Shared test utilities: a per-test tracing subscriber so dispatch spans
//! and registration events are visible under `RUST_LOG` without leaking
//! between tests.

use tracing::subscriber::DefaultGuard;

pub fn init_tracing() -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}
