// src/ingest/providers/rss.rs
//! RSS 2.0 feed source, over HTTP or from an in-memory document.

use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::{FeedSource, RawItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    guid: Option<TextNode>,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<TextNode>,
}

/// Element whose attributes we ignore (`<guid isPermaLink="false">`,
/// `<category domain="...">`).
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}

pub struct RssSource {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl RssSource {
    /// Parse a document held in memory (tests, dry runs).
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Fetch `url` on every poll; the source is named after the URL.
    pub fn from_url(url: impl Into<String>, request_timeout: Duration) -> Self {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("feedwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            name: url.clone(),
            mode: Mode::Http { url, client },
        }
    }

    pub fn parse_items_from_str(origin: &str, s: &str) -> Result<Vec<RawItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|source| FetchError::Malformed {
            origin: origin.to_string(),
            source,
        })?;

        let out: Vec<RawItem> = rss
            .channel
            .item
            .into_iter()
            .map(|it| RawItem {
                id: it.guid.map(|g| g.text).unwrap_or_default(),
                title: it.title.unwrap_or_default(),
                link: it.link.unwrap_or_default(),
                summary: it.description.unwrap_or_default(),
                category: it
                    .category
                    .into_iter()
                    .map(|c| c.text)
                    .find(|t| !t.trim().is_empty()),
            })
            .collect();

        histogram!("feedwatch_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for RssSource {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(&self.name, s),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await.map_err(|source| FetchError::Http {
                    url: url.clone(),
                    source,
                })?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.clone(),
                        status,
                    });
                }
                let body = resp.text().await.map_err(|source| FetchError::Http {
                    url: url.clone(),
                    source,
                })?;
                Self::parse_items_from_str(url, &body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// XML only knows five named entities; feeds routinely ship HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
<item>
  <title>Brazil wins &amp; celebrates</title>
  <link>https://example.test/a</link>
  <guid isPermaLink="false">tag:a</guid>
  <category domain="x">Sports</category>
  <category>World</category>
  <description><![CDATA[<p>The <b>World Cup</b> final</p>]]></description>
</item>
<item>
  <title>No guid&nbsp;here</title>
  <link>https://example.test/b</link>
</item>
</channel></rss>"#;

    #[tokio::test]
    async fn parses_items_with_attributes_and_cdata() {
        let src = RssSource::from_fixture("fixture", DOC);
        let items = src.fetch_latest().await.expect("parse ok");
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].id, "tag:a");
        assert_eq!(items[0].title, "Brazil wins & celebrates");
        assert_eq!(items[0].category.as_deref(), Some("Sports"));
        assert_eq!(items[0].summary, "<p>The <b>World Cup</b> final</p>");

        assert_eq!(items[1].id, "");
        assert_eq!(items[1].title, "No guid here");
        assert_eq!(items[1].category, None);
    }

    #[tokio::test]
    async fn blank_leading_category_is_skipped() {
        let doc = r#"<rss><channel><item>
  <title>x</title>
  <category></category>
  <category>Sports</category>
</item></channel></rss>"#;
        let items = RssSource::parse_items_from_str("doc", doc).unwrap();
        assert_eq!(items[0].category.as_deref(), Some("Sports"));
    }

    #[tokio::test]
    async fn malformed_document_is_a_fetch_error() {
        let src = RssSource::from_fixture("broken", "<rss><channel><item>");
        let err = src.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert!(err.to_string().starts_with("malformed feed from broken:"));
    }

    #[tokio::test]
    async fn empty_channel_yields_no_items() {
        let src = RssSource::from_fixture(
            "empty",
            "<rss><channel><title>x</title></channel></rss>",
        );
        assert!(src.fetch_latest().await.unwrap().is_empty());
    }
}
