//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── load_source()      source/ ──► FileMap
//!     │
//!     ├── standard_chain()   transforms in order, first failure aborts
//!     │
//!     └── write_output()     FileMap + side outputs ──► build/
//! ```
//!
//! Nothing is written unless every transform succeeds.

use crate::{
    config::SiteConfig,
    pipeline::{BuildContext, Chain},
    plugins::{
        author::Author, collections::Collections, defaults::Defaults, disqus::Disqus,
        drafts::Drafts, excerpts::Excerpts, layouts::Layouts, markdown::Markdown,
        pagination::Pagination, permalinks::Permalinks, sitemap::SitemapPlugin,
        twitter_card::TwitterCard, updated::Updated,
    },
    source::load_source,
    writer::write_output,
};
use anyhow::{Context, Result};

/// The blog's transform chain, configured from `config`.
///
/// Optional stages (`updated`, `disqus`, `twitter_card`, `sitemap`) are left
/// out when disabled.
pub fn standard_chain(config: &SiteConfig) -> Result<Chain> {
    let site = &config.site;
    let mut chain = Chain::new();

    if config.updated.enable {
        chain = chain.with(Updated::new(&config.updated, config.build.destination.clone()));
    }

    chain = chain
        .with(Defaults::new(&config.defaults)?)
        .with(Drafts)
        .with(Collections::new(&config.collections)?)
        .with(Author::new(&config.author, &site.siteurl))
        .with(Pagination::new(&config.pagination)?)
        .with(Markdown::new(&config.markdown, &config.highlight, &site.siteurl))
        .with(Permalinks::new(&config.permalinks)?)
        .with(Excerpts::new()?)
        .with(Layouts::new(&config.layouts)?);

    if config.disqus.enable {
        chain = chain.with(Disqus::new(&config.disqus, &site.siteurl));
    }
    if config.twitter.enable {
        chain = chain.with(TwitterCard::new(&config.twitter, &site.siteurl, &site.siteogimg));
    }
    if config.sitemap.enable {
        chain = chain.with(SitemapPlugin::new(config));
    }

    Ok(chain)
}

/// Build the site, returning the number of files written.
pub fn build_site(config: &SiteConfig) -> Result<usize> {
    let files = load_source(&config.build.source)?;
    let chain = standard_chain(config).context("failed to set up the build")?;

    let mut ctx = BuildContext::new(files, config.site.clone());
    chain.run(&mut ctx)?;

    Ok(write_output(&ctx, config)?)
}
