//! Content-change tracking.
//!
//! Keeps a JSON file mapping each source path to the hash of its contents
//! and the date that hash was first seen. Files whose hash changed get
//! today's date as `updated`.
//!
//! ```json
//! { "blog/hello.md": { "hash": "af13...", "updated": "2017-05-01" } }
//! ```

use crate::{
    config::UpdatedConfig,
    pipeline::{BuildContext, BuildError, SideOutput, Transform},
    utils::date::Ymd,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fs, io::ErrorKind, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    hash: String,
    updated: String,
}

type Tracking = BTreeMap<String, Entry>;

pub struct Updated {
    /// Tracking file on disk
    file: PathBuf,
    /// Same file, relative to the destination directory
    output: PathBuf,
    today: String,
}

impl Updated {
    pub fn new(config: &UpdatedConfig, destination: PathBuf) -> Self {
        Self {
            file: destination.join(&config.file),
            output: config.file.clone(),
            today: Ymd::today(),
        }
    }

    /// Pin the date stamped on changed files.
    #[cfg(test)]
    pub fn with_today(mut self, today: impl Into<String>) -> Self {
        self.today = today.into();
        self
    }

    fn read_tracking(&self) -> Result<Tracking, BuildError> {
        match fs::read(&self.file) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                BuildError::config(format!(
                    "tracking file `{}` is not valid: {err}",
                    self.file.display()
                ))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Tracking::new()),
            Err(err) => Err(BuildError::io(&self.file, err)),
        }
    }
}

impl Transform for Updated {
    fn name(&self) -> &'static str {
        "updated"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        let previous = self.read_tracking()?;
        let mut current = Tracking::new();

        for (path, record) in ctx.files.records_mut() {
            let hash = blake3::hash(&record.contents).to_hex().to_string();
            let updated = match previous.get(path) {
                Some(entry) if entry.hash == hash => entry.updated.clone(),
                _ => self.today.clone(),
            };

            record
                .metadata
                .entry("updated")
                .or_insert_with(|| Value::String(updated.clone()));
            current.insert(path.to_owned(), Entry { hash, updated });
        }

        ctx.outputs.push(SideOutput {
            path: self.output.clone(),
            contents: serde_json::to_vec_pretty(&current)?,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FileMap, FileRecord, Metadata};
    use serde_json::json;
    use tempfile::TempDir;

    fn context(entries: &[(&str, &str)]) -> BuildContext {
        let mut files = FileMap::new();
        for (path, contents) in entries {
            files.insert(*path, FileRecord::new(contents.as_bytes(), Metadata::new()));
        }
        BuildContext::new(files, Default::default())
    }

    fn transform(dir: &TempDir) -> Updated {
        Updated::new(&UpdatedConfig::default(), dir.path().join("build")).with_today("2020-02-02")
    }

    fn tracking_file(dir: &TempDir) -> PathBuf {
        fs::create_dir_all(dir.path().join("build")).unwrap();
        dir.path().join("build/../service-files/.updated.json")
    }

    #[test]
    fn test_new_files_get_today() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&[("a.md", "hello")]);

        transform(&dir).apply(&mut ctx).unwrap();

        assert_eq!(ctx.files.get("a.md").unwrap().metadata["updated"], json!("2020-02-02"));
        assert_eq!(ctx.outputs.len(), 1);
        assert_eq!(ctx.outputs[0].path, PathBuf::from("../service-files/.updated.json"));
        let tracking: Tracking = serde_json::from_slice(&ctx.outputs[0].contents).unwrap();
        assert_eq!(tracking["a.md"].updated, "2020-02-02");
    }

    #[test]
    fn test_unchanged_files_keep_recorded_date() {
        let dir = TempDir::new().unwrap();
        let hash = blake3::hash(b"hello").to_hex().to_string();
        let file = tracking_file(&dir);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(
            &file,
            serde_json::to_vec(&json!({
                "a.md": { "hash": hash, "updated": "2017-01-01" },
                "b.md": { "hash": "stale", "updated": "2017-01-01" },
            }))
            .unwrap(),
        )
        .unwrap();
        let mut ctx = context(&[("a.md", "hello"), ("b.md", "changed")]);

        transform(&dir).apply(&mut ctx).unwrap();

        assert_eq!(ctx.files.get("a.md").unwrap().metadata["updated"], json!("2017-01-01"));
        assert_eq!(ctx.files.get("b.md").unwrap().metadata["updated"], json!("2020-02-02"));
    }

    #[test]
    fn test_front_matter_updated_wins() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&[("a.md", "hello")]);
        ctx.files
            .get_mut("a.md")
            .unwrap()
            .metadata
            .insert("updated".into(), json!("2016-06-06"));

        transform(&dir).apply(&mut ctx).unwrap();

        assert_eq!(ctx.files.get("a.md").unwrap().metadata["updated"], json!("2016-06-06"));
    }

    #[test]
    fn test_corrupt_tracking_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = tracking_file(&dir);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "not json").unwrap();

        let err = transform(&dir).apply(&mut context(&[])).unwrap_err();
        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::Config(_))));
    }
}
