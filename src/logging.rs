//! Structured logging setup (`spec.md` §4.J in the expanded spec).
//!
//! A supervised daemon, unlike the desktop app this node was adapted from,
//! has no use for a rolling log file — stderr under the process supervisor
//! is the whole story. `RUST_LOG` controls verbosity; `info` is the default.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}
