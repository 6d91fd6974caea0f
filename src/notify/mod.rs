// src/notify/mod.rs
//! Presenters receive newly matched records.
//!
//! The poll loop never calls a presenter directly: it enqueues records on a
//! bounded channel ([`Dispatcher`]) and a separate task ([`run_presenter`])
//! drains it, so a slow webhook cannot stall polling.

pub mod discord;
pub mod slack;
pub mod stdout;

use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;

use crate::error::PresenterError;
use crate::trigger::Record;

pub use discord::DiscordPresenter;
pub use slack::SlackPresenter;
pub use stdout::StdoutPresenter;

/// How long the poll loop waits for room in a full presenter queue.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait::async_trait]
pub trait Presenter: Send + Sync {
    async fn display(&self, record: &Record) -> Result<(), PresenterError>;
    fn name(&self) -> &'static str;
}

/// Fans a record out to every configured presenter.
pub struct PresenterMux {
    presenters: Vec<Box<dyn Presenter>>,
}

impl PresenterMux {
    pub fn new(presenters: Vec<Box<dyn Presenter>>) -> Self {
        Self { presenters }
    }

    /// Stdout always; Slack / Discord when their webhook env var is set.
    pub fn from_env() -> Self {
        let mut presenters: Vec<Box<dyn Presenter>> = vec![Box::new(StdoutPresenter::new())];
        if let Some(p) = SlackPresenter::from_env() {
            presenters.push(Box::new(p));
        }
        if let Some(p) = DiscordPresenter::from_env() {
            presenters.push(Box::new(p));
        }
        tracing::info!(
            target: "notify",
            presenters = ?presenters.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "presenters configured"
        );
        Self { presenters }
    }

    pub fn len(&self) -> usize {
        self.presenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presenters.is_empty()
    }
}

#[async_trait::async_trait]
impl Presenter for PresenterMux {
    /// Every presenter is tried; the first failure is reported after all ran.
    async fn display(&self, record: &Record) -> Result<(), PresenterError> {
        let mut first_err = None;
        for p in &self.presenters {
            if let Err(e) = p.display(record).await {
                tracing::warn!(
                    target: "notify",
                    presenter = p.name(),
                    id = %record.id,
                    error = %e,
                    "display failed"
                );
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

/// Poll-loop side of the presenter channel.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<Record>,
    enqueue_timeout: Duration,
}

impl Dispatcher {
    /// Hand a record over, waiting at most `enqueue_timeout` for queue space.
    pub async fn dispatch(&self, record: Record) -> Result<(), PresenterError> {
        match self.tx.send_timeout(record, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                Err(PresenterError::EnqueueTimeout(self.enqueue_timeout))
            }
            Err(SendTimeoutError::Closed(_)) => Err(PresenterError::ChannelClosed),
        }
    }
}

/// Bounded channel between the poll loop and the presenter task.
pub fn channel(
    capacity: usize,
    enqueue_timeout: Duration,
) -> (Dispatcher, mpsc::Receiver<Record>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dispatcher = Dispatcher {
        tx,
        enqueue_timeout,
    };
    (dispatcher, rx)
}

/// Drain `rx` into `presenter` until every [`Dispatcher`] is dropped.
///
/// Display failures are logged and counted; the record is not retried.
pub fn run_presenter<P: Presenter + 'static>(
    mut rx: mpsc::Receiver<Record>,
    presenter: P,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match presenter.display(&record).await {
                Ok(()) => counter!("feedwatch_displayed_total").increment(1),
                Err(e) => {
                    tracing::warn!(
                        target: "notify",
                        id = %record.id,
                        error = %e,
                        "presenter failed"
                    );
                    counter!("feedwatch_display_errors_total").increment(1);
                }
            }
        }
        tracing::info!(target: "notify", "presenter channel closed, task exiting");
    })
}
