//! Command-line interface definitions.

use clap::Parser;

/// Build the blog from `source/` into `build/`
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override base URL for the site.
    ///
    /// Useful when the deployed URL differs from the one in site.toml,
    /// e.g. a preview deployment:
    ///   inkwell --url "https://preview.example.com/"
    #[arg(long)]
    pub url: Option<String>,
}
