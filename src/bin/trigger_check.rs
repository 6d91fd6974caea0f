//! Compile a trigger file and dry-run it against RSS documents on disk.
//!
//! Usage: `trigger-check <triggers.txt> [feed.xml ...]`
//!
//! Prints the active rules, then every item each document would dispatch.
//! Exits non-zero on an invalid trigger file.

use std::path::Path;

use anyhow::{bail, Context};
use feedwatch::ingest::providers::rss::RssSource;
use feedwatch::ingest::types::FeedSource;
use feedwatch::notify::{self, StdoutPresenter};
use feedwatch::{PollConfig, PollLoop};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedwatch::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(triggers) = args.next() else {
        bail!("usage: trigger-check <triggers.txt> [feed.xml ...]");
    };

    let book = feedwatch::load_rule_book(Path::new(&triggers))
        .with_context(|| format!("compiling {triggers}"))?;

    println!(
        "{} trigger(s) defined, {} active:",
        book.registry().len(),
        book.active().len()
    );
    for rule in book.active() {
        println!("  {:<12} {}", rule.name, rule.predicate);
    }

    let mut sources: Vec<Box<dyn FeedSource>> = Vec::new();
    for path in args {
        let xml = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        sources.push(Box::new(RssSource::from_fixture(path, &xml)));
    }
    if sources.is_empty() {
        return Ok(());
    }

    let (dispatcher, rx) = notify::channel(64, notify::DEFAULT_ENQUEUE_TIMEOUT);
    let presenter = notify::run_presenter(rx, StdoutPresenter::new());

    let mut poll = PollLoop::new(
        PollConfig::default(),
        sources,
        book.into_active(),
        dispatcher,
    );
    let report = poll.poll_once().await;
    drop(poll);
    presenter.await.context("presenter task panicked")?;

    println!(
        "{} item(s) read, {} match(es), {} new, {} source error(s)",
        report.fetched, report.matched, report.dispatched, report.fetch_errors
    );
    Ok(())
}
