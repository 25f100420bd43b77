//! Content loading.
//!
//! Reads the source tree into a [`FileMap`]. Text files may start with a
//! YAML front-matter block:
//!
//! ```text
//! ---
//! title: Hello
//! created: 2017-05-01
//! ---
//! Body text...
//! ```

use crate::pipeline::{BuildError, FileMap, FileRecord, Metadata};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

const FENCE: &str = "---";

/// Collect all files from a directory recursively.
///
/// Symlinks are followed. Any entry that cannot be read fails the walk.
pub fn collect_all_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(dir, err))?;
        let name = entry.file_name().to_str().unwrap_or_default();
        if entry.file_type().is_file() && !IGNORED_FILES.contains(&name) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn walk_error(dir: &Path, err: walkdir::Error) -> BuildError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    let source = match err.into_io_error() {
        Some(io) => io,
        None => io::Error::other("filesystem loop"),
    };
    BuildError::io(path, source)
}

/// Load every file under `dir`, parsing front matter where present.
pub fn load_source(dir: &Path) -> Result<FileMap, BuildError> {
    if !dir.is_dir() {
        return Err(BuildError::io(
            dir,
            io::Error::new(io::ErrorKind::NotFound, "source directory not found"),
        ));
    }

    let mut files = FileMap::new();
    for path in collect_all_files(dir)? {
        let relative = relative_key(dir, &path)?;
        let bytes = fs::read(&path).map_err(|err| BuildError::io(&path, err))?;
        let record = parse_record(bytes)
            .map_err(|err| BuildError::config(format!("{relative}: {err}")))?;
        files.insert(relative, record);
    }
    Ok(files)
}

/// Path of `path` under `root`, with forward slashes.
fn relative_key(root: &Path, path: &Path) -> Result<String, BuildError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| BuildError::config(format!("{} is outside the source", path.display())))?;
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

/// Split raw bytes into front matter and body.
///
/// Binary files and files without a leading fence pass through with empty
/// metadata.
pub fn parse_record(bytes: Vec<u8>) -> Result<FileRecord, String> {
    let split = std::str::from_utf8(&bytes)
        .ok()
        .and_then(split_front_matter)
        .map(|(yaml, body)| (parse_front_matter(yaml), body.to_owned()));

    match split {
        Some((metadata, body)) => Ok(FileRecord::new(body, metadata?)),
        None => Ok(FileRecord::new(bytes, Metadata::new())),
    }
}

/// Returns `(yaml, body)` when `text` opens with a `---` fence that is closed.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix(FENCE)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

fn parse_front_matter(yaml: &str) -> Result<Metadata, String> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }
    match serde_yaml::from_str::<serde_json::Value>(yaml) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(serde_json::Value::Null) => Ok(Metadata::new()),
        Ok(_) => Err("front matter must be a mapping".into()),
        Err(err) => Err(format!("invalid front matter: {err}")),
    }
}
