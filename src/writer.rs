//! Output writing.
//!
//! Serializes the final [`BuildContext`] into the destination directory.
//! Existing files that the build does not produce are left alone unless
//! `[build].clean` is set.

use crate::{
    config::SiteConfig,
    pipeline::{BuildContext, BuildError},
    utils::minify::minify_output,
};
use std::{fs, path::Path};

/// Write every file and side output, returning the number of files written.
pub fn write_output(ctx: &BuildContext, config: &SiteConfig) -> Result<usize, BuildError> {
    let destination = &config.build.destination;

    if config.build.clean && destination.exists() {
        fs::remove_dir_all(destination).map_err(|err| BuildError::io(destination, err))?;
    }
    fs::create_dir_all(destination).map_err(|err| BuildError::io(destination, err))?;

    let mut written = 0;
    for (path, record) in ctx.files.iter() {
        let contents = minify_output(path, &record.contents, config.build.minify);
        write_file(&destination.join(path), &contents)?;
        written += 1;
    }

    for output in &ctx.outputs {
        write_file(&destination.join(&output.path), &output.contents)?;
    }

    Ok(written)
}

/// Write `contents`, creating parent directories.
fn write_file(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| BuildError::io(parent, err))?;
    }
    fs::write(path, contents).map_err(|err| BuildError::io(path, err))
}
