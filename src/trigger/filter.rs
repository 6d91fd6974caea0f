// src/trigger/filter.rs
use super::{ActiveRule, Record};

/// Keep every record some active rule fires on.
///
/// A record is emitted once per matching rule, in input order; dedup by id
/// happens later at dispatch.
pub fn filter(records: &[Record], rules: &[ActiveRule]) -> Vec<Record> {
    let mut out = Vec::new();
    for record in records {
        for rule in rules {
            if rule.predicate.evaluate(record) {
                tracing::trace!(
                    target: "filter",
                    id = %record.id,
                    rule = %rule.name,
                    "trigger fired"
                );
                out.push(record.clone());
            }
        }
    }
    out
}
