//! Twitter card meta tags.
//!
//! Pages with `twitter: true` get `twitter:*` meta tags injected before
//! `</head>`. Title, description and image alt text are read from the
//! metadata keys named in the config; a missing key omits its tag.

use crate::{
    config::TwitterConfig,
    helpers::resolve_link,
    pipeline::{BuildContext, FileRecord, Transform},
    plugins::{escape_xml, inject_before, is_html},
};
use anyhow::Result;

const HEAD_END: &str = "</head>";

pub struct TwitterCard {
    config: TwitterConfig,
    siteurl: String,
    siteogimg: String,
}

impl TwitterCard {
    pub fn new(config: &TwitterConfig, siteurl: &str, siteogimg: &str) -> Self {
        Self {
            config: config.clone(),
            siteurl: siteurl.to_owned(),
            siteogimg: siteogimg.to_owned(),
        }
    }

    fn tags(&self, record: &FileRecord) -> Result<String> {
        let mut tags: Vec<(&str, String)> = vec![
            ("twitter:card", self.config.card.clone()),
            ("twitter:site", self.config.site.clone()),
        ];
        let sourced = [
            ("twitter:title", &self.config.title),
            ("twitter:description", &self.config.description),
            ("twitter:image:alt", &self.config.image_alt),
        ];
        for (name, key) in sourced {
            if let Some(value) = record.str_meta(key) {
                tags.push((name, value.to_owned()));
            }
        }

        let image = record.str_meta("ogimage").unwrap_or(&self.siteogimg);
        if !image.is_empty() {
            tags.push(("twitter:image", resolve_link(&self.siteurl, image)?));
        }

        Ok(tags
            .into_iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(name, content)| {
                format!(r#"<meta name="{name}" content="{}">"#, escape_xml(&content))
            })
            .collect())
    }
}

impl Transform for TwitterCard {
    fn name(&self) -> &'static str {
        "twitter_card"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        for (path, record) in ctx.files.records_mut() {
            if !is_html(path) || !record.flag("twitter") {
                continue;
            }
            let tags = self.tags(record)?;
            let injected = record
                .text()
                .and_then(|html| inject_before(html, HEAD_END, &tags));
            if let Some(html) = injected {
                record.contents = html.into_bytes();
            }
        }
        Ok(())
    }
}
