// src/trigger/compiler.rs
//! Trigger-file compiler.
//!
//! Line grammar (tokens separated by whitespace, `#` comments and blank lines
//! skipped):
//!
//! ```text
//! <name> TITLE <word>
//! <name> SUBJECT <word>
//! <name> SUMMARY <word>
//! <name> PHRASE <word> [<word> ...]
//! <name> NOT <ref>
//! <name> AND <ref1> <ref2>
//! <name> OR <ref1> <ref2>
//! ADD <ref> [<ref> ...]
//! ```
//!
//! A name must be defined before it is referenced. Redefining a name replaces
//! it for every later line (last write wins).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::predicate::{Predicate, Word};
use crate::error::ConfigError;

const ADD_DIRECTIVE: &str = "ADD";

/// Rule-type keywords accepted after a trigger name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Title,
    Subject,
    Summary,
    Phrase,
    Not,
    And,
    Or,
}

/// Arguments a kind reads. Fixed-arity kinds ignore surplus tokens.
struct Arity {
    min: usize,
    variadic: bool,
}

impl RuleKind {
    fn arity(self) -> Arity {
        match self {
            RuleKind::Title | RuleKind::Subject | RuleKind::Summary | RuleKind::Not => Arity {
                min: 1,
                variadic: false,
            },
            RuleKind::Phrase => Arity {
                min: 1,
                variadic: true,
            },
            RuleKind::And | RuleKind::Or => Arity {
                min: 2,
                variadic: false,
            },
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            RuleKind::Title => "TITLE",
            RuleKind::Subject => "SUBJECT",
            RuleKind::Summary => "SUMMARY",
            RuleKind::Phrase => "PHRASE",
            RuleKind::Not => "NOT",
            RuleKind::And => "AND",
            RuleKind::Or => "OR",
        }
    }
}

impl FromStr for RuleKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TITLE" => Ok(RuleKind::Title),
            "SUBJECT" => Ok(RuleKind::Subject),
            "SUMMARY" => Ok(RuleKind::Summary),
            "PHRASE" => Ok(RuleKind::Phrase),
            "NOT" => Ok(RuleKind::Not),
            "AND" => Ok(RuleKind::And),
            "OR" => Ok(RuleKind::Or),
            _ => Err(()),
        }
    }
}

/// A predicate selected by `ADD`, kept with the name it was added under.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    pub name: String,
    pub predicate: Arc<Predicate>,
}

/// Compiled trigger file: every named predicate plus the active rule set.
#[derive(Debug, Default)]
pub struct RuleBook {
    registry: HashMap<String, Arc<Predicate>>,
    active: Vec<ActiveRule>,
}

impl RuleBook {
    pub fn get(&self, name: &str) -> Option<&Arc<Predicate>> {
        self.registry.get(name)
    }

    pub fn registry(&self) -> &HashMap<String, Arc<Predicate>> {
        &self.registry
    }

    /// Predicates applied during filtering, in `ADD` order.
    pub fn active(&self) -> &[ActiveRule] {
        &self.active
    }

    pub fn into_active(self) -> Vec<ActiveRule> {
        self.active
    }

    fn lookup(&self, line: usize, name: &str) -> Result<Arc<Predicate>, ConfigError> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UndefinedName {
                line,
                name: name.to_string(),
            })
    }

    fn define(
        &mut self,
        line: usize,
        name: &str,
        kind: RuleKind,
        args: &[&str],
    ) -> Result<(), ConfigError> {
        let arity = kind.arity();
        if args.len() < arity.min {
            return Err(ConfigError::MissingArgs {
                line,
                kind: kind.keyword().to_string(),
                expected: arity.min,
                got: args.len(),
            });
        }
        let args = if !arity.variadic && args.len() > arity.min {
            warn!(
                target: "compiler",
                line,
                name,
                kind = kind.keyword(),
                ignored = %args[arity.min..].join(" "),
                "surplus arguments ignored"
            );
            &args[..arity.min]
        } else {
            args
        };

        let word = |raw: &str| {
            Word::new(raw).ok_or_else(|| ConfigError::EmptyWord {
                line,
                word: raw.to_string(),
            })
        };

        let predicate = match kind {
            RuleKind::Title => Predicate::TitleWord(word(args[0])?),
            RuleKind::Subject => Predicate::SubjectWord(word(args[0])?),
            RuleKind::Summary => Predicate::SummaryWord(word(args[0])?),
            RuleKind::Phrase => Predicate::Phrase(args.join(" ")),
            RuleKind::Not => Predicate::Not(self.lookup(line, args[0])?),
            RuleKind::And => {
                Predicate::And(self.lookup(line, args[0])?, self.lookup(line, args[1])?)
            }
            RuleKind::Or => Predicate::Or(self.lookup(line, args[0])?, self.lookup(line, args[1])?),
        };

        if self
            .registry
            .insert(name.to_string(), Arc::new(predicate))
            .is_some()
        {
            debug!(target: "compiler", line, name, "trigger redefined; later definition wins");
        }
        Ok(())
    }

    fn activate(&mut self, line: usize, names: &[&str]) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::MissingArgs {
                line,
                kind: ADD_DIRECTIVE.to_string(),
                expected: 1,
                got: 0,
            });
        }
        for name in names {
            let predicate = self.lookup(line, name)?;
            self.active.push(ActiveRule {
                name: name.to_string(),
                predicate,
            });
        }
        Ok(())
    }
}

/// Compile trigger definitions from text.
pub fn compile(text: &str) -> Result<RuleBook, ConfigError> {
    let mut book = RuleBook::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some((&head, rest)) = tokens.split_first() else {
            continue;
        };
        if head.starts_with('#') {
            continue;
        }

        if head == ADD_DIRECTIVE {
            book.activate(line, rest)?;
            continue;
        }

        let Some((&keyword, args)) = rest.split_first() else {
            return Err(ConfigError::MissingArgs {
                line,
                kind: head.to_string(),
                expected: 1,
                got: 0,
            });
        };
        let kind = RuleKind::from_str(keyword).map_err(|_| ConfigError::UnknownKind {
            line,
            kind: keyword.to_string(),
        })?;
        book.define(line, head, kind, args)?;
    }

    Ok(book)
}

/// Read and compile a trigger file.
pub fn load_rule_book(path: &Path) -> Result<RuleBook, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let book = compile(&content)?;
    info!(
        target: "compiler",
        path = %path.display(),
        defined = book.registry.len(),
        active = book.active.len(),
        "trigger file compiled"
    );
    Ok(book)
}
