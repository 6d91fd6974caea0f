// src/poll.rs
//! Poll loop: fetch → filter → dedup → dispatch, then sleep.
//!
//! The seen-set lives inside the loop and is never shared; records leave the
//! loop only through the presenter channel.

use std::collections::HashSet;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::watch;

use crate::error::PresenterError;
use crate::ingest::{self, types::FeedSource};
use crate::notify::Dispatcher;
use crate::trigger::{filter, ActiveRule};

/// Ids already handed to the presenter. Grows for the life of the loop.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if `id` was not seen before.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// Counts for one cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub fetch_errors: usize,
    pub matched: usize,
    pub dispatched: usize,
    pub duplicates: usize,
    pub dispatch_errors: usize,
}

/// Why [`PollLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    PresenterGone,
}

pub struct PollLoop {
    cfg: PollConfig,
    sources: Vec<Box<dyn FeedSource>>,
    rules: Vec<ActiveRule>,
    seen: SeenSet,
    dispatcher: Dispatcher,
    state: watch::Sender<PollState>,
    presenter_gone: bool,
}

impl PollLoop {
    pub fn new(
        cfg: PollConfig,
        sources: Vec<Box<dyn FeedSource>>,
        rules: Vec<ActiveRule>,
        dispatcher: Dispatcher,
    ) -> Self {
        crate::metrics::ensure_described();
        Self {
            cfg,
            sources,
            rules,
            seen: SeenSet::new(),
            dispatcher,
            state: watch::Sender::new(PollState::Idle),
            presenter_gone: false,
        }
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Follow `Idle` / `Polling` transitions from another task.
    pub fn watch_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Run a single fetch/filter/dedup/dispatch cycle.
    pub async fn poll_once(&mut self) -> CycleReport {
        self.state.send_replace(PollState::Polling);
        tracing::info!(target: "poll", sources = self.sources.len(), "polling");

        let batch = ingest::fetch_all(&self.sources, self.cfg.fetch_timeout).await;
        let matches = filter(&batch.records, &self.rules);

        let mut report = CycleReport {
            fetched: batch.records.len(),
            fetch_errors: batch.errors.len(),
            matched: matches.len(),
            ..Default::default()
        };

        for record in matches {
            if !self.seen.insert(&record.id) {
                report.duplicates += 1;
                continue;
            }
            let id = record.id.clone();
            match self.dispatcher.dispatch(record).await {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    // The id stays seen either way.
                    report.dispatch_errors += 1;
                    if matches!(e, PresenterError::ChannelClosed) {
                        tracing::error!(target: "poll", %id, error = %e, "presenter is gone");
                        self.presenter_gone = true;
                        break;
                    }
                    tracing::warn!(target: "poll", %id, error = %e, "dispatch failed");
                }
            }
        }

        counter!("feedwatch_poll_cycles_total").increment(1);
        counter!("feedwatch_matches_total").increment(report.matched as u64);
        counter!("feedwatch_dispatched_total").increment(report.dispatched as u64);
        counter!("feedwatch_duplicates_total").increment(report.duplicates as u64);
        counter!("feedwatch_dispatch_errors_total")
            .increment(report.dispatch_errors as u64);
        gauge!("feedwatch_seen_ids").set(self.seen.len() as f64);
        gauge!("feedwatch_last_poll_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        tracing::info!(
            target: "poll",
            fetched = report.fetched,
            fetch_errors = report.fetch_errors,
            matched = report.matched,
            dispatched = report.dispatched,
            duplicates = report.duplicates,
            "poll cycle done"
        );

        self.state.send_replace(PollState::Idle);
        report
    }

    /// Poll until `shutdown` turns `true` (or its sender is dropped), or the
    /// presenter channel closes. The sleep between cycles is interruptible.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> StopReason {
        loop {
            if *shutdown.borrow() {
                return StopReason::Shutdown;
            }

            self.poll_once().await;
            if self.presenter_gone {
                return StopReason::PresenterGone;
            }

            tracing::info!(target: "poll", secs = self.cfg.interval.as_secs(), "sleeping");
            tokio::select! {
                _ = tokio::time::sleep(self.cfg.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(target: "poll", "shutdown requested");
                        return StopReason::Shutdown;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_set_insert_reports_novelty() {
        let mut s = SeenSet::new();
        assert!(s.is_empty());
        assert!(s.insert("a"));
        assert!(!s.insert("a"));
        assert!(s.contains("a"));
        assert!(!s.contains("b"));
        assert_eq!(s.len(), 1);
    }
}
