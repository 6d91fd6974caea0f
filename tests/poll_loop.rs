// tests/poll_loop.rs
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use feedwatch::error::FetchError;
use feedwatch::ingest::providers::rss::RssSource;
use feedwatch::ingest::types::{FeedSource, RawItem};
use feedwatch::notify::{self, Presenter};
use feedwatch::trigger::ActiveRule;
use feedwatch::{compile, PollConfig, PollLoop, PollState, PresenterError, Record, StopReason};
use tokio::sync::{mpsc, watch, Notify};

/// Returns the next scripted batch on every fetch, then empty batches.
struct Scripted {
    batches: Mutex<VecDeque<Vec<RawItem>>>,
    calls: Arc<Mutex<usize>>,
}

impl Scripted {
    fn new(batches: Vec<Vec<RawItem>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl FeedSource for Scripted {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, FetchError> {
        *self.calls.lock().unwrap() += 1;
        let mut batches = self.batches.lock().unwrap();
        Ok(batches.pop_front().unwrap_or_default())
    }
    fn name(&self) -> &str {
        "scripted"
    }
}

struct Hanging;

#[async_trait]
impl FeedSource for Hanging {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, FetchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
    fn name(&self) -> &str {
        "hanging"
    }
}

/// Blocks inside `fetch_latest` until released, so a test can look at the
/// loop mid-cycle.
#[derive(Clone, Default)]
struct Gated {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl FeedSource for Gated {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, FetchError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![item("1", "rain")])
    }
    fn name(&self) -> &str {
        "gated"
    }
}

fn item(id: &str, title: &str) -> RawItem {
    RawItem {
        id: id.into(),
        title: title.into(),
        link: format!("https://example.test/{id}"),
        ..Default::default()
    }
}

fn one(src: impl FeedSource + 'static) -> Vec<Box<dyn FeedSource>> {
    vec![Box::new(src) as Box<dyn FeedSource>]
}

fn rules(text: &str) -> Vec<ActiveRule> {
    compile(text).unwrap().into_active()
}

fn cfg() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(60),
        fetch_timeout: Duration::from_secs(5),
    }
}

fn drain(rx: &mut mpsc::Receiver<Record>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(r) = rx.try_recv() {
        out.push(r.id);
    }
    out
}

#[tokio::test]
async fn same_id_across_cycles_is_dispatched_once() -> Result<()> {
    let src = Scripted::new(vec![
        vec![item("1", "rain today"), item("2", "dry")],
        vec![item("1", "rain today"), item("3", "more rain")],
    ]);
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let mut poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);

    let first = poll.poll_once().await;
    assert_eq!((first.fetched, first.matched, first.dispatched), (2, 1, 1));
    assert_eq!(drain(&mut rx), ["1"]);

    let second = poll.poll_once().await;
    assert_eq!(
        (second.matched, second.dispatched, second.duplicates),
        (2, 1, 1)
    );
    assert_eq!(drain(&mut rx), ["3"]);
    assert_eq!(poll.seen().len(), 2);
    assert_eq!(poll.state(), PollState::Idle);
    Ok(())
}

#[tokio::test]
async fn multiple_matching_rules_dispatch_once_in_filter_order() -> Result<()> {
    let src = RssSource::from_fixture("top", include_str!("fixtures/top_stories.xml"));
    let book = feedwatch::load_rule_book("tests/fixtures/triggers.txt".as_ref())?;
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let mut poll = PollLoop::new(cfg(), one(src), book.into_active(), dispatcher);

    let report = poll.poll_once().await;
    assert_eq!(report.fetched, 3);
    assert_eq!(report.matched, 3);
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(drain(&mut rx), ["story-rain", "story-brazil"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_and_others_still_count() {
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let sources: Vec<Box<dyn FeedSource>> = vec![
        Box::new(Hanging),
        Box::new(Scripted::new(vec![vec![item("1", "rain")]])),
    ];
    let mut poll = PollLoop::new(cfg(), sources, rules("t TITLE rain\nADD t"), dispatcher);

    let report = poll.poll_once().await;
    assert_eq!(report.fetch_errors, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(drain(&mut rx), ["1"]);
}

#[tokio::test]
async fn failed_hand_off_keeps_id_seen() {
    let src = Scripted::new(vec![
        vec![item("1", "rain"), item("2", "rain")],
        vec![item("1", "rain"), item("2", "rain")],
    ]);
    // Capacity 1 and nobody reading: the second record cannot be enqueued.
    let (dispatcher, mut rx) = notify::channel(1, Duration::from_millis(10));
    let mut poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);

    let first = poll.poll_once().await;
    assert_eq!((first.dispatched, first.dispatch_errors), (1, 1));
    assert!(poll.seen().contains("2"));
    assert_eq!(drain(&mut rx), ["1"]);

    let second = poll.poll_once().await;
    assert_eq!((second.dispatched, second.duplicates), (0, 2));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_sleep() {
    let src = Scripted::new(vec![vec![item("1", "rain")]]);
    let calls = src.calls.clone();
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);

    let (tx, shutdown) = watch::channel(false);
    let task = tokio::spawn(poll.run(shutdown));

    // first cycle runs right away; the loop then sleeps 60s
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(rx.recv().await.map(|r| r.id).as_deref(), Some("1"));

    tx.send(true).unwrap();
    let reason = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should stop well before the next poll")
        .unwrap();
    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_polls_again_after_interval() {
    let src = Scripted::new(vec![vec![item("1", "rain")], vec![item("2", "rain")]]);
    let calls = src.calls.clone();
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);

    let (tx, shutdown) = watch::channel(false);
    let task = tokio::spawn(poll.run(shutdown));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(drain(&mut rx), ["1", "2"]);

    tx.send(true).unwrap();
    assert_eq!(task.await.unwrap(), StopReason::Shutdown);
}

#[tokio::test]
async fn state_is_polling_while_sources_are_fetched() {
    let gate = Gated::default();
    let (dispatcher, mut rx) = notify::channel(16, Duration::from_millis(50));
    let source = gate.clone();
    let poll = PollLoop::new(cfg(), one(source), rules("t TITLE rain\nADD t"), dispatcher);
    let mut states = poll.watch_state();
    assert_eq!(*states.borrow(), PollState::Idle);

    let (tx, shutdown) = watch::channel(false);
    let task = tokio::spawn(poll.run(shutdown));

    gate.entered.notified().await;
    assert_eq!(*states.borrow_and_update(), PollState::Polling);

    gate.release.notify_one();
    states.wait_for(|s| *s == PollState::Idle).await.unwrap();
    assert_eq!(rx.recv().await.map(|r| r.id).as_deref(), Some("1"));

    tx.send(true).unwrap();
    assert_eq!(task.await.unwrap(), StopReason::Shutdown);
}

#[tokio::test]
async fn closed_presenter_channel_stops_the_loop() {
    let src = Scripted::new(vec![vec![item("1", "rain")]]);
    let (dispatcher, rx) = notify::channel(16, Duration::from_millis(50));
    drop(rx);
    let poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);

    let (_tx, shutdown) = watch::channel(false);
    assert_eq!(poll.run(shutdown).await, StopReason::PresenterGone);
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl Presenter for Collect {
    async fn display(&self, record: &Record) -> Result<(), PresenterError> {
        self.0.lock().unwrap().push(record.title.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "collect"
    }
}

#[tokio::test]
async fn presenter_task_receives_dispatched_records() {
    let src = Scripted::new(vec![vec![item("1", "Rain, again"), item("2", "Raincoats")]]);
    let (dispatcher, rx) = notify::channel(16, Duration::from_millis(50));
    let seen = Collect::default();
    let presenter = notify::run_presenter(rx, seen.clone());

    let mut poll = PollLoop::new(cfg(), one(src), rules("t TITLE rain\nADD t"), dispatcher);
    poll.poll_once().await;
    drop(poll);
    presenter.await.unwrap();

    assert_eq!(*seen.0.lock().unwrap(), ["Rain, again"]);
}
