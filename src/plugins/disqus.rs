//! Disqus comments loader.
//!
//! Pages with `comments: true` get the embed script injected before
//! `</body>`. The layout provides the `<div id="disqus_thread">` target.

use crate::{
    config::DisqusConfig,
    helpers::resolve_link,
    pipeline::{BuildContext, Transform},
    plugins::{inject_before, is_html},
    utils::slug::permalink,
};
use anyhow::Result;

const BODY_END: &str = "</body>";

pub struct Disqus {
    shortname: String,
    siteurl: String,
}

impl Disqus {
    pub fn new(config: &DisqusConfig, siteurl: &str) -> Self {
        Self {
            shortname: config.shortname.clone(),
            siteurl: siteurl.to_owned(),
        }
    }

    /// Loader for the page written to `output`.
    fn snippet(&self, output: &str, identifier: &str) -> Result<String> {
        let link = permalink(output);
        let url = resolve_link(&self.siteurl, link.trim_start_matches('/'))?;
        let url = serde_json::to_string(&url)?;
        let identifier = serde_json::to_string(identifier)?;
        let shortname = &self.shortname;
        Ok(format!(
            r#"<script>var disqus_config = function () {{ this.page.url = {url}; this.page.identifier = {identifier}; }};
(function () {{ var d = document, s = d.createElement('script'); s.src = 'https://{shortname}.disqus.com/embed.js'; s.setAttribute('data-timestamp', +new Date()); (d.head || d.body).appendChild(s); }})();</script>"#
        ))
    }
}

impl Transform for Disqus {
    fn name(&self) -> &'static str {
        "disqus"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (path, record) in ctx.files.records_mut() {
            if !is_html(path) || !record.flag("comments") {
                continue;
            }
            let identifier = record.str_meta("path").unwrap_or(path);
            let snippet = self.snippet(path, identifier)?;
            let injected = record
                .text()
                .and_then(|html| inject_before(html, BODY_END, &snippet));
            if let Some(html) = injected {
                record.contents = html.into_bytes();
            }
        }
        Ok(())
    }
}
