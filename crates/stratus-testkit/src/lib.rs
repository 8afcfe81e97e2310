//! Shared test utilities for the stratus workspace.
//!
//! Provides a scriptable in-memory platform implementing
//! [`stratus_cloud::RemoteApi`] so engine and binding tests run without a
//! real cloud. Dev-dependency only, never published.

pub mod platform;

pub use platform::{CallCounters, FakePlatform, Op, UpdateRecord};

/// Initialise test logging once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
