// src/notify/stdout.rs
use std::io::Write;

use chrono::Utc;

use super::Presenter;
use crate::error::PresenterError;
use crate::trigger::Record;

/// Prints one block per record.
#[derive(Debug, Default)]
pub struct StdoutPresenter;

impl StdoutPresenter {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn render(record: &Record) -> String {
    let ts = Utc::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = format!("[{ts}] {}\n", record.title);
    if !record.subject.is_empty() {
        out.push_str(&format!("  subject: {}\n", record.subject));
    }
    if !record.summary.is_empty() {
        out.push_str(&format!("  {}\n", record.summary.replace('\n', "\n  ")));
    }
    out.push_str(&format!("  {}\n", record.link));
    out
}

#[async_trait::async_trait]
impl Presenter for StdoutPresenter {
    async fn display(&self, record: &Record) -> Result<(), PresenterError> {
        let text = render(record);
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
