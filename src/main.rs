//! inkwell - A static blog generator with an ordered transform chain.

mod build;
mod cli;
mod config;
mod helpers;
mod pipeline;
mod plugins;
mod source;
mod utils;
mod writer;

use build::build_site;
use clap::Parser;
use cli::Cli;
use config::SiteConfig;
use std::{path::Path, process::ExitCode};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = SiteConfig::load(Path::new("./"), &cli).and_then(|config| build_site(&config));
    match result {
        Ok(written) => {
            log!("build"; "done: {written} files written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log!("error"; "{err:#}");
            ExitCode::FAILURE
        }
    }
}
