// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::FetchError;
use crate::ingest::types::{FeedSource, RawItem};
use crate::trigger::Record;

/// Turn feed text into plain text: strip HTML tags, decode entities.
///
/// Text without tags or entities comes back unchanged.
pub fn normalize_text(s: &str) -> String {
    const BREAKS: &str = r"(?i)<br\s*/?>|</p\s*>";
    const TAGS: &str = r"(?is)</?[a-z!][^>]*>";
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();

    if !s.contains('<') && !s.contains('&') {
        return s.to_string();
    }

    // Block-level breaks keep words from gluing together once tags are gone.
    let re_breaks = RE_BREAKS.get_or_init(|| Regex::new(BREAKS).expect("break regex"));
    let out = re_breaks.replace_all(s, "\n");

    let re_tags = RE_TAGS.get_or_init(|| Regex::new(TAGS).expect("tag regex"));
    let out = re_tags.replace_all(&out, "");

    html_escape::decode_html_entities(&out).into_owned()
}

/// Build a [`Record`] from a raw item, normalizing every text field.
pub fn to_record(source: &str, item: RawItem) -> Record {
    let title = normalize_text(&item.title);
    let id = if !item.id.trim().is_empty() {
        item.id.trim().to_string()
    } else if !item.link.trim().is_empty() {
        item.link.trim().to_string()
    } else {
        format!("{source}:{title}")
    };
    Record {
        id,
        title,
        subject: item
            .category
            .as_deref()
            .map(normalize_text)
            .unwrap_or_default(),
        summary: normalize_text(&item.summary),
        link: item.link,
    }
}

/// Outcome of fetching every source once.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub records: Vec<Record>,
    pub errors: Vec<(String, FetchError)>,
}

/// Fetch every source in order, each bounded by `timeout`.
///
/// A failing source is logged and skipped; the others still contribute.
pub async fn fetch_all(sources: &[Box<dyn FeedSource>], timeout: Duration) -> FetchBatch {
    let mut batch = FetchBatch::default();

    for src in sources {
        let t0 = Instant::now();
        let result = match tokio::time::timeout(timeout, src.fetch_latest()).await {
            Ok(r) => r,
            Err(_) => Err(FetchError::Timeout {
                origin: src.name().to_string(),
                timeout,
            }),
        };
        histogram!("feedwatch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(items) => {
                tracing::debug!(
                    target: "ingest",
                    source = src.name(),
                    items = items.len(),
                    "source fetched"
                );
                counter!("feedwatch_items_fetched_total").increment(items.len() as u64);
                batch
                    .records
                    .extend(items.into_iter().map(|it| to_record(src.name(), it)));
            }
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    source = src.name(),
                    "source skipped this cycle"
                );
                counter!("feedwatch_fetch_errors_total").increment(1);
                batch.errors.push((src.name().to_string(), e));
            }
        }
    }

    batch
}
