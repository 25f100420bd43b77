//! Site configuration management.
//!
//! Handles loading, parsing, and validating the optional `site.toml` file.
//! Every field has a default, so a missing file yields the stock blog
//! configuration.

use crate::{cli::Cli, pipeline::Metadata};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "site.toml";

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default values for serde deserialization
pub mod config_defaults {
    pub fn r#true() -> bool {
        true
    }

    pub mod site {
        pub fn locale() -> String {
            "en".into()
        }
        pub fn sitename() -> String {
            "Bobrov Blog".into()
        }
        pub fn siteurl() -> String {
            "https://vitaliy-bobrov.github.io/".into()
        }
        pub fn sitelogo() -> String {
            "/images/logo".into()
        }
        pub fn siteogimg() -> String {
            "images/blog-og.jpg".into()
        }
        pub fn description() -> String {
            "Blog about web development, but not only...".into()
        }
        pub fn theme_color() -> String {
            "#00bcd4".into()
        }
        pub fn facebook_app_id() -> Option<u64> {
            Some(393821434298248)
        }
        pub fn generatorname() -> String {
            "inkwell".into()
        }
        pub fn generatorurl() -> String {
            "https://crates.io/crates/inkwell".into()
        }
    }

    pub mod build {
        use std::path::PathBuf;

        pub fn source() -> PathBuf {
            "source".into()
        }
        pub fn destination() -> PathBuf {
            "build".into()
        }
    }

    pub mod updated {
        use std::path::PathBuf;

        pub fn file() -> PathBuf {
            "../service-files/.updated.json".into()
        }
    }

    pub const PAGES_PATTERN: &str = "pages/*.md";
    pub const POSTS_PATTERN: &str = "blog/**/*.md";

    pub mod pipeline {
        use super::{PAGES_PATTERN, POSTS_PATTERN};
        use crate::config::{
            AuthorConfig, CollectionConfig, DefaultsRule, Linkset, LinksetMatch, PaginationConfig,
        };
        use crate::pipeline::Metadata;
        use serde_json::json;
        use std::collections::BTreeMap;

        fn metadata(value: serde_json::Value) -> Metadata {
            match value {
                serde_json::Value::Object(map) => map,
                _ => Metadata::new(),
            }
        }

        pub fn defaults() -> Vec<DefaultsRule> {
            vec![
                DefaultsRule {
                    pattern: PAGES_PATTERN.into(),
                    defaults: metadata(json!({ "layout": "page.html" })),
                },
                DefaultsRule {
                    pattern: POSTS_PATTERN.into(),
                    defaults: metadata(json!({
                        "draft": false,
                        "author": "me",
                        "comments": true,
                        "twitter": true,
                    })),
                },
            ]
        }

        pub fn collections() -> BTreeMap<String, CollectionConfig> {
            BTreeMap::from([
                (
                    "pages".into(),
                    CollectionConfig {
                        pattern: PAGES_PATTERN.into(),
                        sort_by: None,
                        reverse: false,
                    },
                ),
                (
                    "posts".into(),
                    CollectionConfig {
                        pattern: POSTS_PATTERN.into(),
                        sort_by: Some("created".into()),
                        reverse: true,
                    },
                ),
            ])
        }

        pub fn author() -> AuthorConfig {
            AuthorConfig {
                collection: "posts".into(),
                authors: BTreeMap::from([(
                    "me".into(),
                    metadata(json!({
                        "name": "Vitaliy Bobrov",
                        "avatar": "/images/authors/bobrov/avatar",
                        "github": "https://github.com/vitaliy-bobrov",
                        "twitter": "https://twitter.com/bobrov1989",
                        "linkedin": "https://www.linkedin.com/in/vitaliybobrov",
                        "facebook": "https://www.facebook.com/bobrov1989",
                    })),
                )]),
            }
        }

        pub fn pagination() -> BTreeMap<String, PaginationConfig> {
            BTreeMap::from([(
                "collections.posts".into(),
                PaginationConfig {
                    per_page: 8,
                    layout: Some("blog.html".into()),
                    first: Some("index.html".into()),
                    no_page_one: true,
                    path: "blog/page/:num/index.html".into(),
                    page_metadata: Metadata::new(),
                },
            )])
        }

        pub fn linksets() -> Vec<Linkset> {
            vec![Linkset {
                matches: LinksetMatch {
                    collection: "pages".into(),
                },
                pattern: ":title".into(),
            }]
        }
    }

    pub mod markdown {
        pub fn tab_replace() -> String {
            "  ".into()
        }
        pub fn languages() -> Vec<String> {
            vec!["js".into(), "html".into(), "css".into()]
        }
    }

    pub mod layouts {
        use std::path::PathBuf;

        pub fn directory() -> PathBuf {
            "layouts".into()
        }
        pub fn partials() -> PathBuf {
            "partials".into()
        }
        pub fn default() -> String {
            "post.html".into()
        }
    }

    pub mod disqus {
        pub fn shortname() -> String {
            "bobrov-blog".into()
        }
    }

    pub mod twitter {
        pub fn card() -> String {
            "summary_large_image".into()
        }
        pub fn site() -> String {
            "@bobrov1989".into()
        }
        pub fn title() -> String {
            "title".into()
        }
        pub fn description() -> String {
            "description".into()
        }
    }

    pub mod sitemap {
        pub fn output() -> String {
            "sitemap.xml".into()
        }
    }
}

// ============================================================================
// Site metadata
// ============================================================================

/// `[site]` section: global metadata exposed to every layout.
///
/// Field names are the variable names templates see.
#[derive(Debug, Clone, PartialEq, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteMetadata {
    #[serde(default = "config_defaults::site::locale")]
    #[educe(Default = config_defaults::site::locale())]
    pub locale: String,

    #[serde(default = "config_defaults::site::sitename")]
    #[educe(Default = config_defaults::site::sitename())]
    pub sitename: String,

    /// Base URL every absolute link resolves against
    #[serde(default = "config_defaults::site::siteurl")]
    #[educe(Default = config_defaults::site::siteurl())]
    pub siteurl: String,

    #[serde(default = "config_defaults::site::sitelogo")]
    #[educe(Default = config_defaults::site::sitelogo())]
    pub sitelogo: String,

    /// Default Open Graph image, relative to `siteurl`
    #[serde(default = "config_defaults::site::siteogimg")]
    #[educe(Default = config_defaults::site::siteogimg())]
    pub siteogimg: String,

    #[serde(default = "config_defaults::site::description")]
    #[educe(Default = config_defaults::site::description())]
    pub description: String,

    #[serde(rename = "themeColor", default = "config_defaults::site::theme_color")]
    #[educe(Default = config_defaults::site::theme_color())]
    pub theme_color: String,

    #[serde(rename = "facebookAppId", default = "config_defaults::site::facebook_app_id")]
    #[educe(Default = config_defaults::site::facebook_app_id())]
    pub facebook_app_id: Option<u64>,

    #[serde(default = "config_defaults::site::generatorname")]
    #[educe(Default = config_defaults::site::generatorname())]
    pub generatorname: String,

    #[serde(default = "config_defaults::site::generatorurl")]
    #[educe(Default = config_defaults::site::generatorurl())]
    pub generatorurl: String,
}

// ============================================================================
// Build sections
// ============================================================================

/// `[build]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(default = "config_defaults::build::source")]
    #[educe(Default = config_defaults::build::source())]
    pub source: PathBuf,

    #[serde(default = "config_defaults::build::destination")]
    #[educe(Default = config_defaults::build::destination())]
    pub destination: PathBuf,

    /// Remove the destination directory before writing
    #[serde(default)]
    pub clean: bool,

    /// Minify written html
    #[serde(default)]
    pub minify: bool,
}

/// `[updated]` section: content-change tracking file
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct UpdatedConfig {
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Tracking file, relative to the destination directory
    #[serde(default = "config_defaults::updated::file")]
    #[educe(Default = config_defaults::updated::file())]
    pub file: PathBuf,
}

/// One `[[defaults]]` rule: metadata applied to files matching `pattern`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsRule {
    pub pattern: String,
    #[serde(default)]
    pub defaults: Metadata,
}

/// `[collections.<name>]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    pub pattern: String,
    #[serde(rename = "sortBy", default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub reverse: bool,
}

/// `[author]` section: author records attached to a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorConfig {
    pub collection: String,
    #[serde(default)]
    pub authors: BTreeMap<String, Metadata>,
}

/// `[pagination."collections.<name>"]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    #[serde(rename = "perPage")]
    pub per_page: i64,
    #[serde(default)]
    pub layout: Option<String>,
    /// Destination of page one
    #[serde(default)]
    pub first: Option<String>,
    /// Write page one only at `first`
    #[serde(rename = "noPageOne", default)]
    pub no_page_one: bool,
    /// Destination template, `:num` is the 1-based page number
    pub path: String,
    #[serde(rename = "pageMetadata", default)]
    pub page_metadata: Metadata,
}

/// `[markdown]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Smart quotes and dashes
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub typographer: bool,

    /// Open off-site links in a new tab
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub external_links: bool,
}

/// `[highlight]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct HighlightConfig {
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    #[serde(default = "config_defaults::markdown::tab_replace")]
    #[educe(Default = config_defaults::markdown::tab_replace())]
    pub tab_replace: String,

    /// Fenced-block languages that get highlighted
    #[serde(default = "config_defaults::markdown::languages")]
    #[educe(Default = config_defaults::markdown::languages())]
    pub languages: Vec<String>,
}

/// Linkset selector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinksetMatch {
    pub collection: String,
}

/// Permalink pattern for files in a collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Linkset {
    #[serde(rename = "match")]
    pub matches: LinksetMatch,
    pub pattern: String,
}

/// `[permalinks]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct PermalinksConfig {
    /// Pattern for files outside every linkset; `None` keeps the source path
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default = "config_defaults::pipeline::linksets")]
    #[educe(Default = config_defaults::pipeline::linksets())]
    pub linksets: Vec<Linkset>,
}

/// `[layouts]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutsConfig {
    #[serde(default = "config_defaults::layouts::directory")]
    #[educe(Default = config_defaults::layouts::directory())]
    pub directory: PathBuf,

    #[serde(default = "config_defaults::layouts::partials")]
    #[educe(Default = config_defaults::layouts::partials())]
    pub partials: PathBuf,

    /// Layout for files without a `layout` key
    #[serde(default = "config_defaults::layouts::default")]
    #[educe(Default = config_defaults::layouts::default())]
    pub default: String,
}

/// `[disqus]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DisqusConfig {
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    #[serde(default = "config_defaults::disqus::shortname")]
    #[educe(Default = config_defaults::disqus::shortname())]
    pub shortname: String,
}

/// `[twitter]` section: card tags and the metadata keys they read
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TwitterConfig {
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    #[serde(default = "config_defaults::twitter::card")]
    #[educe(Default = config_defaults::twitter::card())]
    pub card: String,

    #[serde(default = "config_defaults::twitter::site")]
    #[educe(Default = config_defaults::twitter::site())]
    pub site: String,

    #[serde(default = "config_defaults::twitter::title")]
    #[educe(Default = config_defaults::twitter::title())]
    pub title: String,

    #[serde(default = "config_defaults::twitter::description")]
    #[educe(Default = config_defaults::twitter::description())]
    pub description: String,

    #[serde(rename = "image:alt", default = "config_defaults::twitter::title")]
    #[educe(Default = config_defaults::twitter::title())]
    pub image_alt: String,
}

/// `[sitemap]` section
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SitemapConfig {
    #[serde(default = "config_defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Defaults to `[site].siteurl`
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default = "config_defaults::sitemap::output")]
    #[educe(Default = config_defaults::sitemap::output())]
    pub output: String,
}

// ============================================================================
// Root config
// ============================================================================

/// Root configuration, one section per pipeline concern.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteMetadata,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub updated: UpdatedConfig,

    #[serde(default = "config_defaults::pipeline::defaults")]
    #[educe(Default = config_defaults::pipeline::defaults())]
    pub defaults: Vec<DefaultsRule>,

    #[serde(default = "config_defaults::pipeline::collections")]
    #[educe(Default = config_defaults::pipeline::collections())]
    pub collections: BTreeMap<String, CollectionConfig>,

    #[serde(default = "config_defaults::pipeline::author")]
    #[educe(Default = config_defaults::pipeline::author())]
    pub author: AuthorConfig,

    #[serde(default = "config_defaults::pipeline::pagination")]
    #[educe(Default = config_defaults::pipeline::pagination())]
    pub pagination: BTreeMap<String, PaginationConfig>,

    #[serde(default)]
    pub markdown: MarkdownConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub permalinks: PermalinksConfig,

    #[serde(default)]
    pub layouts: LayoutsConfig,

    #[serde(default)]
    pub disqus: DisqusConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub sitemap: SitemapConfig,
}

impl SiteConfig {
    /// Load configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).map_err(ConfigError::Toml)?;
        let mut config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        if !table.contains_key("pagination") {
            config.drop_orphan_pagination();
        }
        Ok(config)
    }

    /// Drop defaulted pagination entries whose collection is not configured
    fn drop_orphan_pagination(&mut self) {
        let collections = &self.collections;
        self.pagination.retain(|key, _| {
            key.strip_prefix("collections.")
                .is_some_and(|name| collections.contains_key(name))
        });
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `site.toml` from `root` if present, apply CLI overrides and validate.
    pub fn load(root: &Path, cli: &Cli) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_root(root);
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.site.siteurl, cli.url.as_ref());
    }

    /// Hostname the sitemap resolves against
    pub fn sitemap_hostname(&self) -> &str {
        self.sitemap.hostname.as_deref().unwrap_or(&self.site.siteurl)
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Make directory paths relative to `root`
    fn update_with_root(&mut self, root: &Path) {
        self.build.source = root.join(&self.build.source);
        self.build.destination = root.join(&self.build.destination);
        self.layouts.directory = root.join(&self.layouts.directory);
        self.layouts.partials = root.join(&self.layouts.partials);
    }

    /// Validate configuration before the build starts
    pub fn validate(&self) -> Result<()> {
        Self::check_url("[site.siteurl]", &self.site.siteurl)?;
        if let Some(hostname) = &self.sitemap.hostname {
            Self::check_url("[sitemap.hostname]", hostname)?;
        }

        for rule in &self.defaults {
            Self::check_glob("[defaults.pattern]", &rule.pattern)?;
        }
        for (name, collection) in &self.collections {
            Self::check_glob(&format!("[collections.{name}.pattern]"), &collection.pattern)?;
        }

        for (key, pagination) in &self.pagination {
            if pagination.per_page <= 0 {
                bail!(ConfigError::Validation(format!(
                    "[pagination.\"{key}\".perPage] must be positive, got {}",
                    pagination.per_page
                )));
            }
            if !pagination.path.contains(":num") {
                bail!(ConfigError::Validation(format!(
                    "[pagination.\"{key}\".path] must contain `:num`"
                )));
            }
        }

        Ok(())
    }

    fn check_url(field: &str, value: &str) -> Result<()> {
        match url::Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => bail!(ConfigError::Validation(format!(
                "{field} must be an absolute http:// or https:// url, got `{value}`"
            ))),
        }
    }

    fn check_glob(field: &str, pattern: &str) -> Result<()> {
        glob::Pattern::new(pattern).map_err(|err| {
            ConfigError::Validation(format!("{field} `{pattern}` is not a valid glob: {err}"))
        })?;
        Ok(())
    }
}
