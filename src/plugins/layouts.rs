//! Layout rendering with Tera.
//!
//! Templates come from the layouts directory (named by their relative path,
//! e.g. `post.html`) and the partials directory (named `partials/<path>`).
//! Every HTML file is rendered with its `layout` metadata or the default
//! layout; `layout: false` leaves the file as is.
//!
//! # Template context
//!
//! | Variable | Value |
//! |----------|-------|
//! | `sitename`, `siteurl`, ... | site metadata |
//! | `title`, `created`, ... | the file's own metadata |
//! | `contents` | the file's HTML before layout |
//! | `path` | public path of the file |
//! | `collections.<name>` | list of member views |
//! | `pagination` | page data on paginator output |
//!
//! A view is a member's metadata plus `contents` and `path`. All views are
//! taken before any file is rendered. Autoescaping is off: layouts are
//! trusted and escape with `| escape` where needed.

use crate::{
    config::LayoutsConfig,
    helpers,
    pipeline::{BuildContext, BuildError, FileMap, FileRecord, Page, RecordId, Transform},
    plugins::is_html,
    source::collect_all_files,
};
use anyhow::{Context as _, Result};
use rayon::prelude::*;
use serde_json::{Value, json};
use std::{collections::BTreeMap, fs, path::Path};
use tera::{Context, Tera};

/// Template name prefix for partials
const PARTIALS: &str = "partials";

pub struct Layouts {
    tera: Tera,
    default: String,
}

impl Layouts {
    pub fn new(config: &LayoutsConfig) -> Result<Self> {
        if !config.directory.is_dir() {
            return Err(BuildError::io(
                &config.directory,
                std::io::Error::new(std::io::ErrorKind::NotFound, "layouts directory not found"),
            )
            .into());
        }

        let mut templates = read_templates(&config.directory, None)?;
        if config.partials.is_dir() {
            templates.extend(read_templates(&config.partials, Some(PARTIALS))?);
        }

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        tera.add_raw_templates(templates)
            .context("failed to load layouts")?;
        helpers::register(&mut tera);

        Ok(Self {
            tera,
            default: config.default.clone(),
        })
    }

    /// Layout for `record`, `None` when it opts out.
    fn layout_of<'a>(&'a self, record: &'a FileRecord) -> Option<&'a str> {
        match record.metadata.get("layout") {
            Some(Value::Bool(false)) => None,
            Some(Value::String(name)) => Some(name.as_str()),
            _ => Some(self.default.as_str()),
        }
    }
}

/// Read every file under `dir` as a `(name, source)` template.
fn read_templates(dir: &Path, prefix: Option<&str>) -> Result<Vec<(String, String)>> {
    collect_all_files(dir)?
        .into_iter()
        .map(|path| -> Result<(String, String)> {
            let relative = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let name = match prefix {
                Some(prefix) => format!("{prefix}/{relative}"),
                None => relative,
            };
            let source = fs::read_to_string(&path).map_err(|err| BuildError::io(&path, err))?;
            Ok((name, source))
        })
        .collect()
}

// ============================================================================
// Views
// ============================================================================

fn file_view(path: &str, record: &FileRecord) -> Value {
    let mut view = record.metadata.clone();
    view.insert(
        "contents".into(),
        Value::String(String::from_utf8_lossy(&record.contents).into_owned()),
    );
    view.entry("path")
        .or_insert_with(|| Value::String(path.to_owned()));
    Value::Object(view)
}

fn view_of(files: &FileMap, id: RecordId) -> Option<Value> {
    Some(file_view(files.path_of(id)?, files.by_id(id)?))
}

fn collection_views(ctx: &BuildContext) -> BTreeMap<&str, Vec<Value>> {
    ctx.collections
        .iter()
        .map(|(name, collection)| {
            let views = collection
                .items
                .iter()
                .filter_map(|&id| view_of(&ctx.files, id))
                .collect();
            (name.as_str(), views)
        })
        .collect()
}

fn pagination_view(page: &Page, files: &FileMap) -> Value {
    let items: Vec<Value> = page
        .items
        .iter()
        .filter_map(|&id| view_of(files, id))
        .collect();
    json!({
        "pageNumber": page.number,
        "totalPages": page.total,
        "path": page.path,
        "firstPagePath": page.first,
        "previousPagePath": page.previous,
        "nextPagePath": page.next,
        "files": items,
    })
}

impl Transform for Layouts {
    fn name(&self) -> &'static str {
        "layouts"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        let mut base = Context::from_serialize(&ctx.site)?;
        base.insert("collections", &collection_views(ctx));

        let mut jobs: Vec<(RecordId, String, String, Context)> = Vec::new();
        for (id, path) in ctx.files.ids() {
            let Some(record) = ctx.files.by_id(id) else {
                continue;
            };
            if !is_html(path) {
                continue;
            }
            let Some(layout) = self.layout_of(record) else {
                continue;
            };

            let mut context = base.clone();
            for (key, value) in &record.metadata {
                context.insert(key.as_str(), value);
            }
            context.insert("contents", &String::from_utf8_lossy(&record.contents));
            if !record.metadata.contains_key("path") {
                context.insert("path", path);
            }
            if let Some(page) = &record.pagination {
                context.insert("pagination", &pagination_view(page, &ctx.files));
            }
            jobs.push((id, path.to_owned(), layout.to_owned(), context));
        }

        let rendered: Vec<(RecordId, String)> = jobs
            .into_par_iter()
            .map(|(id, path, layout, context)| -> Result<(RecordId, String)> {
                let html = self
                    .tera
                    .render(&layout, &context)
                    .with_context(|| format!("failed to render `{path}` with layout `{layout}`"))?;
                Ok((id, html))
            })
            .collect::<Result<_>>()?;

        for (id, html) in rendered {
            if let Some(record) = ctx.files.by_id_mut(id) {
                record.contents = html.into_bytes();
            }
        }
        Ok(())
    }
}
