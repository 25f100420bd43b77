//! Pretty URLs.
//!
//! Moves every HTML file to `<public path>/index.html` so it is served from
//! a directory URL, and records the public path as `path` metadata.
//!
//! | Source | Output | `path` |
//! |--------|--------|--------|
//! | `blog/2017/hello.html` | `blog/2017/hello/index.html` | `blog/2017/hello` |
//! | `pages/about.html` (linkset `:title`) | `about-me/index.html` | `about-me` |
//! | `blog/page/2/index.html` | unchanged | `blog/page/2` |
//!
//! A string `permalink` in front matter overrides the computed path;
//! `permalink: false` leaves the file alone.

use crate::{
    config::{Linkset, PermalinksConfig},
    pipeline::{BuildContext, FileRecord, RecordId, Transform},
    plugins::is_html,
    utils::slug::slugify,
};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

pub struct Permalinks {
    pattern: Option<String>,
    linksets: Vec<Linkset>,
    token: Regex,
}

impl Permalinks {
    pub fn new(config: &PermalinksConfig) -> Result<Self> {
        Ok(Self {
            pattern: config.pattern.clone(),
            linksets: config.linksets.clone(),
            token: Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)")?,
        })
    }

    /// Public directory path of `record`, without slashes at either end.
    fn public_path(&self, path: &str, record: &FileRecord) -> String {
        if let Some(explicit) = record.str_meta("permalink") {
            return explicit.trim_matches('/').to_owned();
        }

        let pattern = self
            .linksets
            .iter()
            .find(|set| record.in_collection(&set.matches.collection))
            .map(|set| set.pattern.as_str())
            .or(self.pattern.as_deref());

        pattern
            .and_then(|pattern| self.expand(pattern, record))
            .unwrap_or_else(|| source_dir_path(path))
    }

    /// Substitute `:key` tokens with slugified metadata.
    ///
    /// Returns `None` when a token has no usable value.
    fn expand(&self, pattern: &str, record: &FileRecord) -> Option<String> {
        let mut out = String::with_capacity(pattern.len());
        let mut last = 0;
        for caps in self.token.captures_iter(pattern) {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = match record.metadata.get(key.as_str())? {
                Value::String(s) => slugify(s),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            if value.is_empty() {
                return None;
            }
            out.push_str(&pattern[last..whole.start()]);
            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&pattern[last..]);

        let out = out.trim_matches('/').to_owned();
        (!out.is_empty()).then_some(out)
    }
}

/// `blog/post.html` → `blog/post`, `blog/index.html` → `blog`.
fn source_dir_path(path: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", path),
    };
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    match (dir, stem) {
        (dir, "index") => dir.to_owned(),
        ("", stem) => stem.to_owned(),
        (dir, stem) => format!("{dir}/{stem}"),
    }
}

fn output_path(public: &str) -> String {
    if public.is_empty() {
        "index.html".to_owned()
    } else {
        format!("{public}/index.html")
    }
}

impl Transform for Permalinks {
    fn name(&self) -> &'static str {
        "permalinks"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        let targets: Vec<(RecordId, String)> = ctx
            .files
            .ids()
            .filter(|(_, path)| is_html(path))
            .filter_map(|(id, path)| {
                let record = ctx.files.by_id(id)?;
                if matches!(record.metadata.get("permalink"), Some(Value::Bool(false))) {
                    return None;
                }
                Some((id, self.public_path(path, record)))
            })
            .collect();

        let moves: Vec<(RecordId, String)> = targets
            .iter()
            .map(|(id, public)| (*id, output_path(public)))
            .collect();
        ctx.files
            .rename_all(&moves)
            .context("cannot move files to their permalinks")?;

        for (id, public) in targets {
            if let Some(record) = ctx.files.by_id_mut(id) {
                record.metadata.insert("path".into(), Value::String(public));
            }
        }
        Ok(())
    }
}
