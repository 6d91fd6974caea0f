// src/error.rs
//! Error taxonomy: fatal config errors, per-source fetch errors and
//! per-record presenter errors.

use std::path::PathBuf;
use std::time::Duration;

/// Trigger file or process configuration is unusable. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("line {line}: unknown rule type `{kind}`")]
    UnknownKind { line: usize, kind: String },

    #[error("line {line}: `{kind}` needs {expected} argument(s), got {got}")]
    MissingArgs {
        line: usize,
        kind: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: reference to undefined trigger `{name}`")]
    UndefinedName { line: usize, name: String },

    #[error("line {line}: word `{word}` contains no letters or digits")]
    EmptyWord { line: usize, word: String },

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// One feed source failed for one cycle. Recovered by skipping the source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed feed from {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("fetching {origin} timed out after {timeout:?}")]
    Timeout { origin: String, timeout: Duration },
}

/// Hand-off or display of a single record failed. The poll loop keeps going.
#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    #[error("presenter queue still full after {0:?}")]
    EnqueueTimeout(Duration),

    #[error("presenter channel closed")]
    ChannelClosed,

    #[error("{target} webhook delivery failed: {source}")]
    Webhook {
        target: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("writing to stdout failed: {0}")]
    Stdout(#[from] std::io::Error),
}
