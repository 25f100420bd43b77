//! Transforms of the standard build chain.
//!
//! Each module holds one [`Transform`](crate::pipeline::Transform), listed
//! here in chain order.

pub mod updated;
pub mod defaults;
pub mod drafts;
pub mod collections;
pub mod author;
pub mod pagination;
pub mod markdown;
pub mod permalinks;
pub mod excerpts;
pub mod layouts;
pub mod disqus;
pub mod twitter_card;
pub mod sitemap;

use crate::pipeline::BuildError;
use anyhow::Result;
use glob::{MatchOptions, Pattern};

/// `*` and `?` never match `/`; `**/` spans directories.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile a path glob, reporting failures as configuration errors.
pub fn compile_glob(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|err| {
        BuildError::config(format!("invalid pattern `{pattern}`: {err}")).into()
    })
}

pub fn glob_matches(pattern: &Pattern, path: &str) -> bool {
    pattern.matches_with(path, GLOB_OPTIONS)
}

/// Escape text for XML content and attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Whether an output path is an HTML page.
pub fn is_html(path: &str) -> bool {
    path.ends_with(".html")
}

/// Insert `snippet` before the last occurrence of `marker` in `html`.
///
/// Returns `None` when the marker is absent.
pub fn inject_before(html: &str, marker: &str, snippet: &str) -> Option<String> {
    let at = html.rfind(marker)?;
    let mut out = String::with_capacity(html.len() + snippet.len());
    out.push_str(&html[..at]);
    out.push_str(snippet);
    out.push_str(&html[at..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_stays_in_directory() {
        let pattern = compile_glob("pages/*.md").unwrap();
        assert!(glob_matches(&pattern, "pages/about.md"));
        assert!(!glob_matches(&pattern, "pages/nested/about.md"));
    }

    #[test]
    fn test_glob_double_star_spans_directories() {
        let pattern = compile_glob("blog/**/*.md").unwrap();
        assert!(glob_matches(&pattern, "blog/post.md"));
        assert!(glob_matches(&pattern, "blog/2017/05/post.md"));
        assert!(!glob_matches(&pattern, "pages/post.md"));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = compile_glob("blog/[").unwrap_err();
        assert!(matches!(err.downcast_ref::<BuildError>(), Some(BuildError::Config(_))));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_inject_before_last_marker() {
        assert_eq!(
            inject_before("<body>a</body></body>", "</body>", "X").unwrap(),
            "<body>a</body>X</body>"
        );
        assert!(inject_before("<p>no body</p>", "</body>", "X").is_none());
    }
}
