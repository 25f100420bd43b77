//! URL slugification and permalink utilities.

/// Convert text to a lowercase ASCII slug.
///
/// Non-ASCII characters are transliterated first; runs of anything that is
/// not alphanumeric collapse into a single hyphen.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut prev_hyphen = true; // suppress leading hyphen
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Public URL path of an output file.
///
/// | Output path | Permalink |
/// |-------------|-----------|
/// | `index.html` | `/` |
/// | `blog/page/2/index.html` | `/blog/page/2/` |
/// | `sitemap.xml` | `/sitemap.xml` |
pub fn permalink(path: &str) -> String {
    let path = path.trim_start_matches('/');
    match path.strip_suffix("index.html") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => format!("/{dir}"),
        _ => format!("/{path}"),
    }
}
