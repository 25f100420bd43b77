//! Collection building.
//!
//! Each collection selects files by glob, optionally stable-sorts them by a
//! metadata field and then reverses the sorted order. Sort-then-reverse is
//! not the same as a descending sort: records with equal keys end up in
//! reverse encounter order.
//!
//! Records missing the sort field sort as the lowest value, so after a
//! `reverse` they come last.

use crate::{
    config::CollectionConfig,
    pipeline::{BuildContext, Collection, RecordId, Transform, compare_values},
    plugins::{compile_glob, glob_matches},
};
use anyhow::Result;
use glob::Pattern;
use serde_json::Value;
use std::collections::BTreeMap;

struct Rule {
    name: String,
    pattern: Pattern,
    sort_by: Option<String>,
    reverse: bool,
}

pub struct Collections {
    rules: Vec<Rule>,
}

impl Collections {
    pub fn new(config: &BTreeMap<String, CollectionConfig>) -> Result<Self> {
        let rules = config
            .iter()
            .map(|(name, c)| -> Result<Rule> {
                Ok(Rule {
                    name: name.clone(),
                    pattern: compile_glob(&c.pattern)?,
                    sort_by: c.sort_by.clone(),
                    reverse: c.reverse,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }
}

impl Transform for Collections {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for rule in &self.rules {
            let mut items: Vec<RecordId> = ctx
                .files
                .ids()
                .filter(|(_, path)| glob_matches(&rule.pattern, path))
                .map(|(id, _)| id)
                .collect();

            if let Some(field) = &rule.sort_by {
                let files = &ctx.files;
                // Vec::sort_by is stable
                items.sort_by(|a, b| {
                    let a = files.by_id(*a).and_then(|r| r.metadata.get(field));
                    let b = files.by_id(*b).and_then(|r| r.metadata.get(field));
                    compare_values(a, b)
                });
            }
            if rule.reverse {
                items.reverse();
            }

            for &id in &items {
                if let Some(record) = ctx.files.by_id_mut(id) {
                    tag_member(&mut record.metadata, &rule.name);
                }
            }
            ctx.collections
                .insert(rule.name.clone(), Collection { items });
        }
        Ok(())
    }
}

/// Append `name` to the record's `collection` list.
fn tag_member(metadata: &mut crate::pipeline::Metadata, name: &str) {
    let entry = metadata
        .entry("collection")
        .or_insert_with(|| Value::Array(Vec::new()));
    match entry {
        Value::Array(names) => {
            if !names.iter().any(|n| n.as_str() == Some(name)) {
                names.push(Value::String(name.to_owned()));
            }
        }
        Value::String(existing) => {
            let existing = std::mem::take(existing);
            *entry = Value::Array(vec![Value::String(existing), Value::String(name.to_owned())]);
        }
        other => *other = Value::Array(vec![Value::String(name.to_owned())]),
    }
}
