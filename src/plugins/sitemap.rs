//! Sitemap generation.
//!
//! Adds a sitemap.xml listing every HTML page for search engine indexing.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2017-05-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use crate::{
    config::SiteConfig,
    helpers::resolve_link,
    pipeline::{BuildContext, BuildError, FileRecord, Metadata, Transform},
    plugins::{escape_xml, is_html},
    utils::{date::Ymd, slug::permalink},
};
use anyhow::Result;

// ============================================================================
// Constants
// ============================================================================

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Metadata keys tried for `<lastmod>`, in order
const LASTMOD_KEYS: [&str; 2] = ["updated", "created"];

// ============================================================================
// Transform
// ============================================================================

pub struct SitemapPlugin {
    hostname: String,
    output: String,
}

impl SitemapPlugin {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            hostname: config.sitemap_hostname().to_owned(),
            output: config.sitemap.output.clone(),
        }
    }
}

impl Transform for SitemapPlugin {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        if ctx.files.contains(&self.output) {
            return Err(BuildError::config(format!("`{}` already exists", self.output)).into());
        }

        let urls = ctx
            .files
            .iter()
            .filter(|(path, record)| is_html(path) && !record.flag("private"))
            .map(|(path, record)| UrlEntry::new(&self.hostname, path, record))
            .collect::<Result<Vec<_>>>()?;

        let xml = Sitemap { urls }.into_xml();
        ctx.files
            .insert(self.output.clone(), FileRecord::new(xml, Metadata::new()));
        Ok(())
    }
}

// ============================================================================
// Sitemap Implementation
// ============================================================================

/// Sitemap data structure
struct Sitemap {
    /// List of URL entries
    urls: Vec<UrlEntry>,
}

/// Single URL entry in the sitemap
struct UrlEntry {
    /// Full URL location
    loc: String,
    /// Last modification date (optional, YYYY-MM-DD format)
    lastmod: Option<String>,
}

impl UrlEntry {
    fn new(hostname: &str, path: &str, record: &FileRecord) -> Result<Self> {
        let link = permalink(path);
        Ok(Self {
            loc: resolve_link(hostname, link.trim_start_matches('/'))?,
            lastmod: lastmod(record),
        })
    }
}

/// First of `updated`/`created` that starts with a valid date.
fn lastmod(record: &FileRecord) -> Option<String> {
    LASTMOD_KEYS
        .iter()
        .filter_map(|key| record.str_meta(key))
        .find_map(Ymd::parse_prefix)
        .map(|date| date.to_string())
}

impl Sitemap {
    /// Generate sitemap XML string.
    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = entry.lastmod {
                xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FileMap;
    use serde_json::json;

    fn make_entry(loc: &str, lastmod: Option<&str>) -> UrlEntry {
        UrlEntry {
            loc: loc.to_string(),
            lastmod: lastmod.map(str::to_string),
        }
    }

    fn dated(key: &str, value: &str) -> FileRecord {
        let mut metadata = Metadata::new();
        metadata.insert(key.into(), json!(value));
        FileRecord::new("", metadata)
    }

    fn run(files: FileMap) -> String {
        let mut config = SiteConfig::default();
        config.site.siteurl = "https://example.com/".into();
        let mut ctx = BuildContext::new(files, Default::default());
        SitemapPlugin::new(&config).apply(&mut ctx).unwrap();
        ctx.files.get("sitemap.xml").unwrap().text().unwrap().to_owned()
    }

    #[test]
    fn test_sitemap_empty() {
        let xml = Sitemap { urls: Vec::new() }.into_xml();

        assert!(xml.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#)));
        assert!(xml.contains("</urlset>"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_sitemap_without_lastmod() {
        let xml = Sitemap {
            urls: vec![make_entry("https://example.com/", None)],
        }
        .into_xml();

        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(!xml.contains("<lastmod>"));
    }

    #[test]
    fn test_sitemap_escapes_special_chars() {
        let xml = Sitemap {
            urls: vec![make_entry("https://example.com/search?q=a&b=c", None)],
        }
        .into_xml();

        assert!(xml.contains("<loc>https://example.com/search?q=a&amp;b=c</loc>"));
    }

    #[test]
    fn test_sitemap_xml_structure() {
        let xml = Sitemap {
            urls: vec![make_entry("https://example.com/", Some("2017-01-01"))],
        }
        .into_xml();

        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines[0], r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        assert!(lines[1].starts_with("<urlset"));
        assert!(lines.last().unwrap().trim() == "</urlset>");
    }

    #[test]
    fn test_lastmod_prefers_updated() {
        let mut record = dated("created", "2016-03-04");
        assert_eq!(lastmod(&record).as_deref(), Some("2016-03-04"));

        record.metadata.insert("updated".into(), json!("2017-05-01T10:00:00Z"));
        assert_eq!(lastmod(&record).as_deref(), Some("2017-05-01"));

        record.metadata.insert("updated".into(), json!("yesterday"));
        assert_eq!(lastmod(&record).as_deref(), Some("2016-03-04"));
    }

    #[test]
    fn test_lists_html_pages_in_path_order() {
        let mut files = FileMap::new();
        files.insert("index.html", dated("updated", "2017-01-02"));
        files.insert("blog/hello/index.html", dated("created", "2017-01-01"));
        files.insert("css/site.css", FileRecord::default());
        files.insert("secret/index.html", {
            let mut r = FileRecord::default();
            r.metadata.insert("private".into(), json!(true));
            r
        });

        let xml = run(files);

        assert_eq!(xml.matches("<url>").count(), 2);
        let blog = xml.find("<loc>https://example.com/blog/hello/</loc>").unwrap();
        let home = xml.find("<loc>https://example.com/</loc>").unwrap();
        assert!(blog < home);
        assert!(xml.contains("<lastmod>2017-01-01</lastmod>"));
        assert!(xml.contains("<lastmod>2017-01-02</lastmod>"));
        assert!(!xml.contains("css"));
        assert!(!xml.contains("secret"));
    }

    #[test]
    fn test_hostname_override_keeps_sub_path() {
        let mut config = SiteConfig::default();
        config.sitemap.hostname = Some("https://example.com/blog/".into());
        let mut files = FileMap::new();
        files.insert("about/index.html", FileRecord::default());
        let mut ctx = BuildContext::new(files, Default::default());

        SitemapPlugin::new(&config).apply(&mut ctx).unwrap();

        let xml = ctx.files.get("sitemap.xml").unwrap().text().unwrap();
        assert!(xml.contains("<loc>https://example.com/blog/about/</loc>"));
    }
}
