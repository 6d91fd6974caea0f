// src/trigger/mod.rs
//! Trigger engine: the record under evaluation, the predicate language,
//! the trigger-file compiler and the filter stage.

pub mod compiler;
pub mod filter;
pub mod predicate;

pub use compiler::{compile, load_rule_book, ActiveRule, RuleBook, RuleKind};
pub use filter::filter;
pub use predicate::{tokenize, Predicate};

use serde::Serialize;

/// One normalized feed item. Text fields are plain text (already decoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub summary: String,
    pub link: String,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subject: impl Into<String>,
        summary: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subject: subject.into(),
            summary: summary.into(),
            link: link.into(),
        }
    }
}
