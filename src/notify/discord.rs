// src/notify/discord.rs
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use super::Presenter;
use crate::error::PresenterError;
use crate::trigger::Record;

// Discord rejects embed descriptions above 4096 chars.
const MAX_DESCRIPTION_CHARS: usize = 4000;

#[derive(Clone)]
pub struct DiscordPresenter {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordPresenter {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// `None` when `DISCORD_WEBHOOK_URL` is unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait::async_trait]
impl Presenter for DiscordPresenter {
    async fn display(&self, record: &Record) -> Result<(), PresenterError> {
        let payload = DiscordWebhookPayload::from_record(record);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await
                .and_then(|rsp| rsp.error_for_status());

            match res {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!(
                        target: "notify",
                        attempt,
                        error = %e,
                        "discord webhook retry"
                    );
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(source) => {
                    return Err(PresenterError::Webhook {
                        target: "discord",
                        source,
                    });
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    url: String,
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn from_record(record: &Record) -> Self {
        let mut description: String = record
            .summary
            .chars()
            .take(MAX_DESCRIPTION_CHARS)
            .collect();
        if !record.subject.is_empty() {
            description = format!("**{}**\n{}", record.subject, description);
        }
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: record.title.clone(),
                description,
                url: record.link.clone(),
            }],
        }
    }
}
