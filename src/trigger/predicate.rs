// src/trigger/predicate.rs
//! Boolean predicates over a [`Record`].
//!
//! Word predicates are case-insensitive and token based: the field is
//! lower-cased, ASCII punctuation becomes whitespace, and the configured word
//! must appear as whole token(s). Phrase predicates are a plain, case-sensitive
//! substring test on title, subject and summary.

use std::fmt;
use std::sync::Arc;

use super::Record;

/// Lower-case `text`, treat ASCII punctuation as a separator and split on
/// whitespace. Never yields empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// A configured trigger word, pre-tokenized with the same rules as the fields.
///
/// Usually a single token; `U.S.` becomes `["u", "s"]` and then has to appear
/// as a contiguous run of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    raw: String,
    tokens: Vec<String>,
}

impl Word {
    /// Returns `None` when the word has no tokens left (e.g. `"..."`).
    pub fn new(raw: &str) -> Option<Self> {
        let tokens = tokenize(raw);
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whole-word containment in `text`.
    pub fn is_in(&self, text: &str) -> bool {
        let field = tokenize(text);
        match self.tokens.as_slice() {
            [single] => field.iter().any(|t| t == single),
            many => field.windows(many.len()).any(|w| w == many),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    TitleWord(Word),
    SubjectWord(Word),
    SummaryWord(Word),
    Phrase(String),
    Not(Arc<Predicate>),
    And(Arc<Predicate>, Arc<Predicate>),
    Or(Arc<Predicate>, Arc<Predicate>),
}

impl Predicate {
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::TitleWord(w) => w.is_in(&record.title),
            Predicate::SubjectWord(w) => w.is_in(&record.subject),
            Predicate::SummaryWord(w) => w.is_in(&record.summary),
            Predicate::Phrase(p) => {
                record.title.contains(p.as_str())
                    || record.subject.contains(p.as_str())
                    || record.summary.contains(p.as_str())
            }
            Predicate::Not(p) => !p.evaluate(record),
            Predicate::And(a, b) => a.evaluate(record) && b.evaluate(record),
            Predicate::Or(a, b) => a.evaluate(record) || b.evaluate(record),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::TitleWord(w) => write!(f, "TITLE({})", w.as_str()),
            Predicate::SubjectWord(w) => write!(f, "SUBJECT({})", w.as_str()),
            Predicate::SummaryWord(w) => write!(f, "SUMMARY({})", w.as_str()),
            Predicate::Phrase(p) => write!(f, "PHRASE({p:?})"),
            Predicate::Not(p) => write!(f, "NOT({p})"),
            Predicate::And(a, b) => write!(f, "AND({a}, {b})"),
            Predicate::Or(a, b) => write!(f, "OR({a}, {b})"),
        }
    }
}
