//! feedwatch binary entrypoint.
//! Compiles the trigger file, then runs the poll loop and the presenter task
//! side by side until Ctrl-C.
//!
//! Usage: `feedwatch [TRIGGERS_PATH]` (see `config.rs` for env overrides).

use std::path::PathBuf;

use anyhow::Context;
use feedwatch::ingest::providers::rss::RssSource;
use feedwatch::ingest::types::FeedSource;
use feedwatch::{notify, AppConfig, PollConfig, PollLoop, PresenterMux, StopReason};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    feedwatch::init_tracing();

    let mut cfg = AppConfig::load().context("loading configuration")?;
    if let Some(p) = std::env::args().nth(1) {
        cfg.triggers_path = PathBuf::from(p);
    }

    // An invalid trigger file must stop us before the first poll.
    let book = feedwatch::load_rule_book(&cfg.triggers_path)
        .with_context(|| format!("compiling triggers from {}", cfg.triggers_path.display()))?;
    if book.active().is_empty() {
        tracing::warn!("no triggers activated with ADD; nothing will ever match");
    }
    for rule in book.active() {
        tracing::info!(name = %rule.name, rule = %rule.predicate, "trigger active");
    }

    if let Some(addr) = cfg.metrics_addr {
        feedwatch::metrics::install_exporter(addr)?;
    }

    let sources: Vec<Box<dyn FeedSource>> = cfg
        .feeds
        .iter()
        .map(|url| {
            Box::new(RssSource::from_url(url.as_str(), cfg.fetch_timeout)) as Box<dyn FeedSource>
        })
        .collect();

    let (dispatcher, rx) = notify::channel(cfg.channel_capacity, notify::DEFAULT_ENQUEUE_TIMEOUT);
    let presenter_task = notify::run_presenter(rx, PresenterMux::from_env());

    let poll = PollLoop::new(
        PollConfig {
            interval: cfg.interval,
            fetch_timeout: cfg.fetch_timeout,
        },
        sources,
        book.into_active(),
        dispatcher,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_task = tokio::spawn(poll.run(shutdown_rx));

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Ctrl-C received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Dropping the sender would stop the loop; keep it alive instead.
                tracing::error!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    });

    let reason = poll_task.await.context("poll task panicked")?;
    // The dispatcher went down with the poll loop; let the presenter drain.
    presenter_task.await.context("presenter task panicked")?;

    match reason {
        StopReason::Shutdown => Ok(()),
        StopReason::PresenterGone => anyhow::bail!("presenter stopped accepting records"),
    }
}
