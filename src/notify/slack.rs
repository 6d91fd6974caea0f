// src/notify/slack.rs
use reqwest::Client;

use super::Presenter;
use crate::error::PresenterError;
use crate::trigger::Record;

pub struct SlackPresenter {
    webhook_url: String,
    client: Client,
}

impl SlackPresenter {
    /// `None` when `SLACK_WEBHOOK_URL` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("SLACK_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
        }
    }
}

fn message(record: &Record) -> serde_json::Value {
    let text = format!("*<{}|{}>*\n{}", record.link, record.title, record.summary);
    serde_json::json!({ "text": text })
}

#[async_trait::async_trait]
impl Presenter for SlackPresenter {
    async fn display(&self, record: &Record) -> Result<(), PresenterError> {
        let webhook = |source| PresenterError::Webhook {
            target: "slack",
            source,
        };
        self.client
            .post(&self.webhook_url)
            .json(&message(record))
            .send()
            .await
            .map_err(webhook)?
            .error_for_status()
            .map_err(webhook)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
