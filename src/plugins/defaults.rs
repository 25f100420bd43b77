//! Default metadata by path pattern.

use crate::{
    config::DefaultsRule,
    pipeline::{BuildContext, Metadata, Transform},
    plugins::{compile_glob, glob_matches},
};
use anyhow::Result;
use glob::Pattern;

pub struct Defaults {
    rules: Vec<(Pattern, Metadata)>,
}

impl Defaults {
    pub fn new(rules: &[DefaultsRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| -> Result<(Pattern, Metadata)> {
                Ok((compile_glob(&rule.pattern)?, rule.defaults.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }
}

impl Transform for Defaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (path, record) in ctx.files.records_mut() {
            for (pattern, defaults) in &self.rules {
                if !glob_matches(pattern, path) {
                    continue;
                }
                for (key, value) in defaults {
                    record
                        .metadata
                        .entry(key.as_str())
                        .or_insert_with(|| value.clone());
                }
            }
        }
        Ok(())
    }
}
