//! Author expansion.
//!
//! Replaces the `author` key of collection members with the full author
//! record. Records without a `url` link to the site itself.

use crate::{
    config::AuthorConfig,
    pipeline::{BuildContext, BuildError, Metadata, Transform},
};
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

pub struct Author {
    collection: String,
    authors: BTreeMap<String, Metadata>,
}

impl Author {
    pub fn new(config: &AuthorConfig, siteurl: &str) -> Self {
        let authors = config
            .authors
            .iter()
            .map(|(key, record)| {
                let mut record = record.clone();
                record
                    .entry("url")
                    .or_insert_with(|| Value::String(siteurl.to_owned()));
                (key.clone(), record)
            })
            .collect();
        Self {
            collection: config.collection.clone(),
            authors,
        }
    }
}

impl Transform for Author {
    fn name(&self) -> &'static str {
        "author"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (path, record) in ctx.files.records_mut() {
            if !record.in_collection(&self.collection) {
                continue;
            }
            let Some(key) = record.str_meta("author") else {
                continue;
            };
            let author = self.authors.get(key).ok_or_else(|| {
                BuildError::config(format!("{path}: unknown author `{key}`"))
            })?;
            record
                .metadata
                .insert("author".into(), Value::Object(author.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::config_defaults,
        pipeline::{FileMap, FileRecord},
    };
    use serde_json::json;

    fn member(author: Option<&str>, collection: &str) -> FileRecord {
        let mut metadata = Metadata::new();
        metadata.insert("collection".into(), json!([collection]));
        if let Some(author) = author {
            metadata.insert("author".into(), json!(author));
        }
        FileRecord::new("", metadata)
    }

    fn transform() -> Author {
        Author::new(&config_defaults::pipeline::author(), "https://blog.example.com/")
    }

    #[test]
    fn test_expands_known_author_with_site_url() {
        let mut files = FileMap::new();
        files.insert("blog/a.md", member(Some("me"), "posts"));
        let mut ctx = BuildContext::new(files, Default::default());

        transform().apply(&mut ctx).unwrap();

        let author = &ctx.files.get("blog/a.md").unwrap().metadata["author"];
        assert_eq!(author["name"], json!("Vitaliy Bobrov"));
        assert_eq!(author["url"], json!("https://blog.example.com/"));
        assert_eq!(author["twitter"], json!("https://twitter.com/bobrov1989"));
    }

    #[test]
    fn test_explicit_author_url_is_kept() {
        let mut config = config_defaults::pipeline::author();
        config
            .authors
            .get_mut("me")
            .unwrap()
            .insert("url".into(), json!("https://me.example.org/"));
        let mut files = FileMap::new();
        files.insert("blog/a.md", member(Some("me"), "posts"));
        let mut ctx = BuildContext::new(files, Default::default());

        Author::new(&config, "https://blog.example.com/")
            .apply(&mut ctx)
            .unwrap();

        let author = &ctx.files.get("blog/a.md").unwrap().metadata["author"];
        assert_eq!(author["url"], json!("https://me.example.org/"));
    }

    #[test]
    fn test_skips_non_members_and_missing_author() {
        let mut files = FileMap::new();
        files.insert("pages/about.md", member(Some("someone"), "pages"));
        files.insert("blog/b.md", member(None, "posts"));
        let mut ctx = BuildContext::new(files, Default::default());

        transform().apply(&mut ctx).unwrap();

        assert_eq!(
            ctx.files.get("pages/about.md").unwrap().metadata["author"],
            json!("someone")
        );
        assert!(!ctx.files.get("blog/b.md").unwrap().metadata.contains_key("author"));
    }

    #[test]
    fn test_unknown_author_is_config_error() {
        let mut files = FileMap::new();
        files.insert("blog/a.md", member(Some("ghost"), "posts"));
        let mut ctx = BuildContext::new(files, Default::default());

        let err = transform().apply(&mut ctx).unwrap_err();
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::Config(msg)) => assert!(msg.contains("ghost")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
