//! Draft removal.

use crate::pipeline::{BuildContext, Transform};
use anyhow::Result;

/// Drops every file whose `draft` metadata is `true`.
pub struct Drafts;

impl Transform for Drafts {
    fn name(&self) -> &'static str {
        "drafts"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        let drafts: Vec<String> = ctx
            .files
            .iter()
            .filter(|(_, record)| record.flag("draft"))
            .map(|(path, _)| path.to_owned())
            .collect();

        for path in drafts {
            ctx.files.remove(&path);
        }
        Ok(())
    }
}
