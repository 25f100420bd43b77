//! Core data model of the content pipeline.
//!
//! # Architecture
//!
//! ```text
//! load_source() ──► FileMap ──► Chain::run(&mut BuildContext) ──► write_output()
//!                                  │
//!                                  ├── updated, defaults, drafts
//!                                  ├── collections, author, pagination
//!                                  ├── markdown, permalinks, excerpts
//!                                  └── layouts, disqus, twitter_card, sitemap
//! ```
//!
//! Records live in an arena and are addressed by a stable [`RecordId`].
//! The path index can be rewritten (rename, remove) without invalidating
//! the ids held by collections and pagination pages.

pub mod chain;
pub mod error;

pub use chain::{Chain, Transform};
pub use error::BuildError;

use crate::config::SiteMetadata;
use serde_json::{Map, Value};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

/// Front-matter and transform-provided metadata of a file.
pub type Metadata = Map<String, Value>;

/// Stable handle to a record in a [`FileMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(usize);

// ============================================================================
// File Records
// ============================================================================

/// A single file flowing through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FileRecord {
    pub contents: Vec<u8>,
    pub metadata: Metadata,
    /// Set on page files created by the paginator
    pub pagination: Option<Page>,
}

impl FileRecord {
    pub fn new(contents: impl Into<Vec<u8>>, metadata: Metadata) -> Self {
        Self {
            contents: contents.into(),
            metadata,
            pagination: None,
        }
    }

    /// Contents as UTF-8 text, if they are valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }

    pub fn str_meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// `true` only when the key holds the JSON boolean `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.metadata.get(key), Some(Value::Bool(true)))
    }

    pub fn in_collection(&self, name: &str) -> bool {
        self.metadata
            .get("collection")
            .and_then(Value::as_array)
            .is_some_and(|names| names.iter().any(|n| n.as_str() == Some(name)))
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Records shown on this page, in collection order
    pub items: Vec<RecordId>,
    /// 1-based page number
    pub number: usize,
    pub total: usize,
    pub path: String,
    pub first: String,
    pub previous: Option<String>,
    pub next: Option<String>,
}

// ============================================================================
// File Map
// ============================================================================

#[derive(Debug, Clone)]
struct Slot {
    path: String,
    record: FileRecord,
}

/// Mapping from unique relative path to [`FileRecord`].
#[derive(Debug, Clone, Default)]
pub struct FileMap {
    slots: Vec<Option<Slot>>,
    index: BTreeMap<String, RecordId>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert a record at `path`, replacing any record already there.
    pub fn insert(&mut self, path: impl Into<String>, record: FileRecord) -> RecordId {
        let path = path.into();
        if let Some(&id) = self.index.get(&path) {
            self.slots[id.0] = Some(Slot { path, record });
            return id;
        }
        let id = RecordId(self.slots.len());
        self.slots.push(Some(Slot {
            path: path.clone(),
            record,
        }));
        self.index.insert(path, id);
        id
    }

    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        let id = self.index.remove(path)?;
        self.slots[id.0].take().map(|slot| slot.record)
    }

    /// Move the record at `from` to `to`, keeping its id.
    ///
    /// Fails if `from` is missing or `to` is taken by another record.
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> Result<RecordId, BuildError> {
        let to = to.into();
        if from == to {
            return self.id_of(from).ok_or_else(|| missing(from));
        }
        if self.index.contains_key(&to) {
            return Err(BuildError::config(format!(
                "cannot move `{from}` to `{to}`: path already exists"
            )));
        }
        let id = self.index.remove(from).ok_or_else(|| missing(from))?;
        if let Some(slot) = self.slots[id.0].as_mut() {
            slot.path.clone_from(&to);
        }
        self.index.insert(to, id);
        Ok(id)
    }

    /// Move several records at once, keeping their ids.
    ///
    /// Targets are checked against the layout after every move, so a record
    /// may take a path that another record of the same batch vacates.
    /// Nothing moves when any target collides.
    pub fn rename_all(&mut self, moves: &[(RecordId, String)]) -> Result<(), BuildError> {
        let mut vacated = BTreeSet::new();
        for (id, _) in moves {
            let from = self
                .path_of(*id)
                .ok_or_else(|| BuildError::config(format!("no file with id {}", id.0)))?;
            vacated.insert(from.to_owned());
        }

        let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
        for (id, to) in moves {
            let from = self.path_of(*id).unwrap_or_default();
            if let Some(other) = claimed.insert(to, from) {
                return Err(BuildError::config(format!(
                    "`{other}` and `{from}` both move to `{to}`"
                )));
            }
            if self.index.contains_key(to) && !vacated.contains(to) {
                return Err(BuildError::config(format!(
                    "cannot move `{from}` to `{to}`: path already exists"
                )));
            }
        }

        for from in &vacated {
            self.index.remove(from);
        }
        for (id, to) in moves {
            if let Some(slot) = self.slots[id.0].as_mut() {
                slot.path.clone_from(to);
            }
            self.index.insert(to.clone(), *id);
        }
        Ok(())
    }

    pub fn id_of(&self, path: &str) -> Option<RecordId> {
        self.index.get(path).copied()
    }

    pub fn path_of(&self, id: RecordId) -> Option<&str> {
        self.slot(id).map(|slot| slot.path.as_str())
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.id_of(path).and_then(|id| self.by_id(id))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        let id = self.id_of(path)?;
        self.by_id_mut(id)
    }

    pub fn by_id(&self, id: RecordId) -> Option<&FileRecord> {
        self.slot(id).map(|slot| &slot.record)
    }

    pub fn by_id_mut(&mut self, id: RecordId) -> Option<&mut FileRecord> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .map(|slot| &mut slot.record)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate `(path, record)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.index
            .iter()
            .filter_map(|(path, &id)| self.by_id(id).map(|record| (path.as_str(), record)))
    }

    /// Iterate `(id, path)` pairs in path order.
    pub fn ids(&self) -> impl Iterator<Item = (RecordId, &str)> {
        self.index.iter().map(|(path, &id)| (id, path.as_str()))
    }

    /// Mutable access to every live record, in no particular order.
    pub fn records_mut(&mut self) -> impl Iterator<Item = (&str, &mut FileRecord)> {
        self.slots
            .iter_mut()
            .filter_map(Option::as_mut)
            .map(|slot| (slot.path.as_str(), &mut slot.record))
    }

    fn slot(&self, id: RecordId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }
}

fn missing(path: &str) -> BuildError {
    BuildError::config(format!("no file at `{path}`"))
}

// ============================================================================
// Build Context
// ============================================================================

/// A named, ordered view over records of the file map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub items: Vec<RecordId>,
}

/// Extra file written next to the destination tree.
///
/// `path` is relative to the destination directory and may climb out of it.
#[derive(Debug, Clone)]
pub struct SideOutput {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Mutable state threaded through the transform chain.
#[derive(Debug, Default)]
pub struct BuildContext {
    pub files: FileMap,
    pub site: SiteMetadata,
    pub collections: BTreeMap<String, Collection>,
    pub outputs: Vec<SideOutput>,
}

impl BuildContext {
    pub fn new(files: FileMap, site: SiteMetadata) -> Self {
        Self {
            files,
            site,
            ..Default::default()
        }
    }
}

// ============================================================================
// Metadata ordering
// ============================================================================

/// Total order over metadata values used for sorting.
///
/// Missing values (`None`) and `null` sort lowest. Values of different
/// types order by type rank: bool < number < string < array < object.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(title: &str) -> FileRecord {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!(title));
        FileRecord::new(Vec::new(), metadata)
    }

    #[test]
    fn test_insert_and_get() {
        let mut files = FileMap::new();
        let id = files.insert("blog/a.md", record("A"));
        assert_eq!(files.len(), 1);
        assert_eq!(files.id_of("blog/a.md"), Some(id));
        assert_eq!(files.get("blog/a.md").unwrap().str_meta("title"), Some("A"));
    }

    #[test]
    fn test_insert_existing_path_replaces() {
        let mut files = FileMap::new();
        let first = files.insert("a.md", record("old"));
        let second = files.insert("a.md", record("new"));
        assert_eq!(first, second);
        assert_eq!(files.len(), 1);
        assert_eq!(files.get("a.md").unwrap().str_meta("title"), Some("new"));
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut files = FileMap::new();
        let id = files.insert("blog/a.md", record("A"));
        let renamed = files.rename("blog/a.md", "blog/a.html").unwrap();
        assert_eq!(id, renamed);
        assert!(!files.contains("blog/a.md"));
        assert_eq!(files.path_of(id), Some("blog/a.html"));
    }

    #[test]
    fn test_rename_onto_existing_path_fails() {
        let mut files = FileMap::new();
        files.insert("a.html", record("A"));
        files.insert("b.html", record("B"));
        assert!(files.rename("a.html", "b.html").is_err());
        assert!(files.contains("a.html"));
    }

    #[test]
    fn test_rename_all_into_vacated_path() {
        let mut files = FileMap::new();
        let old = files.insert("old.html", record("Old"));
        let index = files.insert("old/index.html", record("Index"));

        files
            .rename_all(&[
                (old, "old/index.html".into()),
                (index, "new/index.html".into()),
            ])
            .unwrap();

        assert_eq!(files.path_of(old), Some("old/index.html"));
        assert_eq!(files.path_of(index), Some("new/index.html"));
        assert!(!files.contains("old.html"));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_rename_all_collisions_move_nothing() {
        let mut files = FileMap::new();
        let a = files.insert("a.html", record("A"));
        let b = files.insert("b.html", record("B"));
        files.insert("c.html", record("C"));

        assert!(files.rename_all(&[(a, "c.html".into())]).is_err());
        assert!(
            files
                .rename_all(&[(a, "same.html".into()), (b, "same.html".into())])
                .is_err()
        );
        assert_eq!(files.path_of(a), Some("a.html"));
        assert_eq!(files.path_of(b), Some("b.html"));
    }

    #[test]
    fn test_remove_invalidates_id() {
        let mut files = FileMap::new();
        let id = files.insert("a.md", record("A"));
        assert!(files.remove("a.md").is_some());
        assert!(files.by_id(id).is_none());
        assert!(files.is_empty());
    }

    #[test]
    fn test_iter_is_path_ordered() {
        let mut files = FileMap::new();
        files.insert("c.md", record("C"));
        files.insert("a.md", record("A"));
        files.insert("b.md", record("B"));
        let paths: Vec<_> = files.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_flag_requires_true_bool() {
        let mut r = record("A");
        r.metadata.insert("draft".into(), json!("true"));
        assert!(!r.flag("draft"));
        r.metadata.insert("draft".into(), json!(true));
        assert!(r.flag("draft"));
    }

    #[test]
    fn test_compare_values_missing_is_lowest() {
        let date = json!("2017-01-01");
        assert_eq!(compare_values(None, Some(&date)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(compare_values(Some(&date), None), Ordering::Greater);
    }

    #[test]
    fn test_compare_values_within_type() {
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("2017-05-01")), Some(&json!("2016-12-31"))),
            Ordering::Greater
        );
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!("a"))), Ordering::Less);
    }
}
