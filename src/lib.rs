// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod poll;
pub mod trigger;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::error::{ConfigError, FetchError, PresenterError};
pub use crate::notify::{Presenter, PresenterMux};
pub use crate::poll::{CycleReport, PollConfig, PollLoop, PollState, StopReason};
pub use crate::trigger::{compile, filter, load_rule_book, Predicate, Record, RuleBook};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "FEEDWATCH_LOG_JSON";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise info, with HTTP client internals at warn.
/// `FEEDWATCH_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper_util=warn,reqwest=warn"));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
