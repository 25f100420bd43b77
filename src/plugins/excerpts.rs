//! Excerpt extraction: the first paragraph of each HTML file.

use crate::{
    pipeline::{BuildContext, Transform},
    plugins::is_html,
};
use anyhow::Result;
use regex::Regex;
use serde_json::Value;

pub struct Excerpts {
    paragraph: Regex,
}

impl Excerpts {
    pub fn new() -> Result<Self> {
        Ok(Self {
            paragraph: Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p>")?,
        })
    }

    fn first_paragraph<'a>(&self, html: &'a str) -> Option<&'a str> {
        self.paragraph
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }
}

impl Transform for Excerpts {
    fn name(&self) -> &'static str {
        "excerpts"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (path, record) in ctx.files.records_mut() {
            if !is_html(path) || record.metadata.contains_key("excerpt") {
                continue;
            }
            let excerpt = record
                .text()
                .and_then(|html| self.first_paragraph(html))
                .map(str::to_owned);
            if let Some(excerpt) = excerpt {
                record.metadata.insert("excerpt".into(), Value::String(excerpt));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FileMap, FileRecord, Metadata};
    use serde_json::json;

    fn run(entries: &[(&str, &str)]) -> BuildContext {
        let mut files = FileMap::new();
        for (path, html) in entries {
            files.insert(*path, FileRecord::new(*html, Metadata::new()));
        }
        let mut ctx = BuildContext::new(files, Default::default());
        Excerpts::new().unwrap().apply(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_first_paragraph_inner_html() {
        let ctx = run(&[(
            "a/index.html",
            "<h1>T</h1>\n<p>First <em>one</em>\nspans lines.</p>\n<p>Second</p>",
        )]);
        assert_eq!(
            ctx.files.get("a/index.html").unwrap().metadata["excerpt"],
            json!("First <em>one</em>\nspans lines.")
        );
    }

    #[test]
    fn test_paragraph_with_attributes() {
        let ctx = run(&[("a.html", r#"<pre>x</pre><p class="lead">Hi</p>"#)]);
        assert_eq!(ctx.files.get("a.html").unwrap().metadata["excerpt"], json!("Hi"));
    }

    #[test]
    fn test_skips_non_html_and_paragraphless() {
        let ctx = run(&[("notes.txt", "<p>no</p>"), ("b.html", "<pre>code</pre>")]);
        assert!(!ctx.files.get("notes.txt").unwrap().metadata.contains_key("excerpt"));
        assert!(!ctx.files.get("b.html").unwrap().metadata.contains_key("excerpt"));
    }

    #[test]
    fn test_existing_excerpt_kept() {
        let mut files = FileMap::new();
        let mut metadata = Metadata::new();
        metadata.insert("excerpt".into(), json!("Custom"));
        files.insert("a.html", FileRecord::new("<p>Body</p>", metadata));
        let mut ctx = BuildContext::new(files, Default::default());

        Excerpts::new().unwrap().apply(&mut ctx).unwrap();
        assert_eq!(ctx.files.get("a.html").unwrap().metadata["excerpt"], json!("Custom"));
    }
}
