//! Output minification.
//!
//! Pages are minified with `minify_html`; XML feeds only lose the
//! indentation between tags. Everything else is written as is.

use std::borrow::Cow;

/// Minify `contents` according to the extension of `path`.
///
/// Returns the input untouched when `enabled` is false or the file type is
/// not minified.
pub fn minify_output<'a>(path: &str, contents: &'a [u8], enabled: bool) -> Cow<'a, [u8]> {
    if !enabled {
        return Cow::Borrowed(contents);
    }
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") => Cow::Owned(minify_page(contents)),
        Some("xml") => std::str::from_utf8(contents)
            .map(|xml| Cow::Owned(collapse_xml(xml).into_bytes()))
            .unwrap_or(Cow::Borrowed(contents)),
        _ => Cow::Borrowed(contents),
    }
}

fn minify_page(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    // layouts open the document themselves and inject scripts before `</body>`
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.minify_css = true;
    cfg.minify_js = true;
    minify_html::minify(html, &cfg)
}

/// Drop line breaks and indentation; text spanning lines keeps one space.
fn collapse_xml(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    for line in xml.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let between_tags = out.is_empty() || out.ends_with('>') || line.starts_with('<');
        if !between_tags {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}
