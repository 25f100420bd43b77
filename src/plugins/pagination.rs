//! Collection pagination.
//!
//! Splits a built collection into pages of `perPage` items and adds one
//! empty page file per page. Layouts render the page items from
//! [`FileRecord::pagination`].
//!
//! ```text
//! posts (17) ─► page 1: index.html            items 0..8
//!               page 2: blog/page/2/index.html items 8..16
//!               page 3: blog/page/3/index.html items 16..17
//! ```

use crate::{
    config::PaginationConfig,
    pipeline::{BuildContext, BuildError, FileRecord, Page, RecordId, Transform},
};
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder for the page number in the path template
const NUM: &str = ":num";

/// Prefix of collection keys in the pagination table
const COLLECTIONS_PREFIX: &str = "collections.";

pub struct Pagination {
    targets: Vec<(String, PaginationConfig)>,
}

impl Pagination {
    pub fn new(config: &BTreeMap<String, PaginationConfig>) -> Result<Self> {
        let targets = config
            .iter()
            .map(|(key, options)| -> Result<(String, PaginationConfig)> {
                let name = key.strip_prefix(COLLECTIONS_PREFIX).ok_or_else(|| {
                    BuildError::config(format!(
                        "pagination key `{key}` must have the form `collections.<name>`"
                    ))
                })?;
                if options.per_page <= 0 {
                    return Err(BuildError::config(format!(
                        "pagination `{key}`: perPage must be positive, got {}",
                        options.per_page
                    ))
                    .into());
                }
                Ok((name.to_owned(), options.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { targets })
    }
}

impl Transform for Pagination {
    fn name(&self) -> &'static str {
        "pagination"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (name, options) in &self.targets {
            let collection = ctx.collections.get(name).ok_or_else(|| {
                BuildError::config(format!("pagination: no collection named `{name}`"))
            })?;
            let items: Vec<RecordId> = collection
                .items
                .iter()
                .copied()
                .filter(|&id| ctx.files.by_id(id).is_some())
                .collect();

            for (path, page) in paginate(&items, options) {
                if ctx.files.contains(&path) {
                    return Err(BuildError::config(format!(
                        "pagination: `{path}` already exists"
                    ))
                    .into());
                }
                ctx.files.insert(path, page_record(page, options));
            }
        }
        Ok(())
    }
}

/// Destination of page `number`.
fn page_path(options: &PaginationConfig, number: usize) -> String {
    match &options.first {
        Some(first) if number == 1 && options.no_page_one => first.clone(),
        _ => options.path.replace(NUM, &number.to_string()),
    }
}

/// Split `items` into pages, keyed by output path.
///
/// When `first` is set without `noPageOne`, page 1 is emitted twice: at its
/// numbered path and at `first`.
fn paginate(items: &[RecordId], options: &PaginationConfig) -> Vec<(String, Page)> {
    let per_page = usize::try_from(options.per_page).unwrap_or(1).max(1);
    let total = items.len().div_ceil(per_page);
    let paths: Vec<String> = (1..=total).map(|n| page_path(options, n)).collect();
    let first = options.first.clone().unwrap_or_else(|| page_path(options, 1));

    let mut pages: Vec<(String, Page)> = items
        .chunks(per_page)
        .enumerate()
        .map(|(i, chunk)| {
            let page = Page {
                items: chunk.to_vec(),
                number: i + 1,
                total,
                path: paths[i].clone(),
                first: first.clone(),
                previous: i.checked_sub(1).map(|p| paths[p].clone()),
                next: paths.get(i + 1).cloned(),
            };
            (paths[i].clone(), page)
        })
        .collect();

    if let (Some(first), false) = (&options.first, options.no_page_one) {
        if let Some((_, page_one)) = pages.first() {
            let copy = Page {
                path: first.clone(),
                ..page_one.clone()
            };
            pages.push((first.clone(), copy));
        }
    }
    pages
}

fn page_record(page: Page, options: &PaginationConfig) -> FileRecord {
    let mut metadata = options.page_metadata.clone();
    if let Some(layout) = &options.layout {
        metadata.insert("layout".into(), Value::String(layout.clone()));
    }
    FileRecord {
        contents: Vec::new(),
        metadata,
        pagination: Some(page),
    }
}
