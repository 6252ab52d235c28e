//! Command-line configuration for the binaries.

use tracing_subscriber::EnvFilter;

pub mod analyst;
pub mod ctl;

const DEFAULT_FILTER: &str = "info,h2=warn,hyper=warn";

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
