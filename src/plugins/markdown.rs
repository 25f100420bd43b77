//! Markdown rendering.
//!
//! Renders `*.md` files to HTML with pulldown-cmark and renames them to
//! `*.html`. Two rewrites run over the event stream:
//!
//! - off-site links open in a new tab (`target="_blank" rel="nofollow noopener"`)
//! - fenced blocks in a configured language are highlighted by syntect into
//!   class-based spans (`<pre><code class="hljs language-js">`)

use crate::{
    config::{HighlightConfig, MarkdownConfig},
    pipeline::{BuildContext, Transform},
    plugins::escape_xml,
};
use anyhow::{Context, Result, anyhow};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html::push_html};
use rayon::prelude::*;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};
use url::Url;

const EXTENSIONS: &[&str] = &[".md", ".markdown"];

pub struct Markdown {
    options: Options,
    /// Host of the site; links elsewhere are external
    site_host: Option<String>,
    external_links: bool,
    highlighter: Option<Highlighter>,
}

impl Markdown {
    pub fn new(markdown: &MarkdownConfig, highlight: &HighlightConfig, siteurl: &str) -> Self {
        let mut options =
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
        if markdown.typographer {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }

        Self {
            options,
            site_host: Url::parse(siteurl)
                .ok()
                .and_then(|url| url.host_str().map(str::to_owned)),
            external_links: markdown.external_links,
            highlighter: highlight.enable.then(|| Highlighter::new(highlight)),
        }
    }

    /// Render one Markdown document to an HTML fragment.
    pub fn render(&self, text: &str) -> Result<String> {
        let parser = Parser::new_ext(text, self.options);
        let events = self.rewrite(parser)?;

        let mut html = String::with_capacity(text.len() * 2);
        push_html(&mut html, events.into_iter());
        Ok(html)
    }

    fn rewrite<'a>(&self, parser: Parser<'a>) -> Result<Vec<Event<'a>>> {
        let mut events = Vec::new();
        // one entry per open link: was it rewritten
        let mut links: Vec<bool> = Vec::new();
        // (language, buffered code) inside a highlighted block
        let mut code: Option<(String, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::Link { dest_url, title, .. }) if self.is_external(&dest_url) => {
                    links.push(true);
                    events.push(Event::Html(external_anchor(&dest_url, &title).into()));
                }
                Event::Start(tag @ Tag::Link { .. }) => {
                    links.push(false);
                    events.push(Event::Start(tag));
                }
                Event::End(TagEnd::Link) => {
                    if links.pop().unwrap_or(false) {
                        events.push(Event::Html(CowStr::Borrowed("</a>")));
                    } else {
                        events.push(Event::End(TagEnd::Link));
                    }
                }
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                    if self.highlights(info) =>
                {
                    let lang = info.split_whitespace().next().unwrap_or_default();
                    code = Some((lang.to_owned(), String::new()));
                }
                Event::Text(text) if code.is_some() => {
                    if let Some((_, buffer)) = code.as_mut() {
                        buffer.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if code.is_some() => {
                    if let (Some((lang, buffer)), Some(highlighter)) = (code.take(), &self.highlighter) {
                        events.push(Event::Html(highlighter.highlight(&lang, &buffer)?.into()));
                    }
                }
                other => events.push(other),
            }
        }
        Ok(events)
    }

    fn is_external(&self, dest: &str) -> bool {
        if !self.external_links {
            return false;
        }
        match Url::parse(dest) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                url.host_str() != self.site_host.as_deref()
            }
            _ => false,
        }
    }

    fn highlights(&self, info: &str) -> bool {
        let lang = info.split_whitespace().next().unwrap_or_default();
        self.highlighter
            .as_ref()
            .is_some_and(|h| h.languages.iter().any(|l| l == lang))
    }
}

fn external_anchor(dest: &str, title: &str) -> String {
    let title = if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_xml(title))
    };
    format!(
        r#"<a href="{}"{title} target="_blank" rel="nofollow noopener">"#,
        escape_xml(dest)
    )
}

/// Output path of a rendered document.
fn html_path(path: &str) -> String {
    let stem = EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path);
    format!("{stem}.html")
}

fn is_markdown(path: &str) -> bool {
    EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

impl Transform for Markdown {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn apply(&self, ctx: &mut BuildContext) -> Result<()> {
        let sources: Vec<(String, String)> = ctx
            .files
            .iter()
            .filter(|(path, _)| is_markdown(path))
            .map(|(path, record)| {
                (path.to_owned(), String::from_utf8_lossy(&record.contents).into_owned())
            })
            .collect();

        let rendered: Vec<(String, String)> = sources
            .into_par_iter()
            .map(|(path, text)| -> Result<(String, String)> {
                let html = self
                    .render(&text)
                    .with_context(|| format!("failed to render `{path}`"))?;
                Ok((path, html))
            })
            .collect::<Result<_>>()?;

        for (path, html) in rendered {
            if let Some(record) = ctx.files.get_mut(&path) {
                record.contents = html.into_bytes();
            }
            ctx.files.rename(&path, html_path(&path))?;
        }
        Ok(())
    }
}

// ============================================================================
// Syntax highlighting
// ============================================================================

struct Highlighter {
    syntaxes: SyntaxSet,
    languages: Vec<String>,
    tab_replace: String,
}

impl Highlighter {
    fn new(config: &HighlightConfig) -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            languages: config.languages.clone(),
            tab_replace: config.tab_replace.clone(),
        }
    }

    fn highlight(&self, lang: &str, code: &str) -> Result<String> {
        let code = code.replace('\t', &self.tab_replace);
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(&code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| anyhow!("highlighting `{lang}` failed: {err}"))?;
        }

        Ok(format!(
            "<pre><code class=\"hljs language-{lang}\">{}</code></pre>\n",
            generator.finalize()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FileMap, FileRecord, Metadata};

    fn markdown() -> Markdown {
        Markdown::new(
            &MarkdownConfig::default(),
            &HighlightConfig::default(),
            "https://blog.example.com/",
        )
    }

    #[test]
    fn test_renders_basic_markdown() {
        let html = markdown().render("# Title\n\nSome *text*.\n").unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Some <em>text</em>.</p>"));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = markdown()
            .render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n")
            .unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_typographer_quotes() {
        let html = markdown().render("\"quoted\" -- dash\n").unwrap();
        assert!(html.contains("\u{201c}quoted\u{201d}"));
        assert!(html.contains('\u{2013}'));

        let plain = Markdown::new(
            &MarkdownConfig {
                typographer: false,
                ..Default::default()
            },
            &HighlightConfig::default(),
            "https://blog.example.com/",
        );
        assert!(!plain.render("\"quoted\"\n").unwrap().contains('\u{201c}'));
    }

    #[test]
    fn test_external_links_open_in_new_tab() {
        let html = markdown()
            .render("[out](https://github.com/x \"GitHub\") [in](https://blog.example.com/about/) [rel](/blog/)\n")
            .unwrap();
        assert!(html.contains(
            r#"<a href="https://github.com/x" title="GitHub" target="_blank" rel="nofollow noopener">out</a>"#
        ));
        assert!(html.contains(r#"<a href="https://blog.example.com/about/">in</a>"#));
        assert!(html.contains(r#"<a href="/blog/">rel</a>"#));
    }

    #[test]
    fn test_configured_language_is_highlighted() {
        let html = markdown()
            .render("```js\nconst a = 1;\n\tfoo();\n```\n")
            .unwrap();
        assert!(html.contains(r#"<pre><code class="hljs language-js">"#));
        assert!(html.contains("<span class=\""));
        assert!(!html.contains('\t'));
    }

    #[test]
    fn test_other_languages_are_left_plain() {
        let html = markdown().render("```rust\nlet a = 1 < 2;\n```\n").unwrap();
        assert!(html.contains(r#"<pre><code class="language-rust">"#));
        assert!(html.contains("1 &lt; 2"));
        assert!(!html.contains("hljs"));
    }

    #[test]
    fn test_highlight_disabled() {
        let md = Markdown::new(
            &MarkdownConfig::default(),
            &HighlightConfig {
                enable: false,
                ..Default::default()
            },
            "https://blog.example.com/",
        );
        let html = md.render("```js\nlet a;\n```\n").unwrap();
        assert!(html.contains(r#"<pre><code class="language-js">"#));
    }

    #[test]
    fn test_html_path() {
        assert_eq!(html_path("blog/post.md"), "blog/post.html");
        assert_eq!(html_path("notes.markdown"), "notes.html");
    }

    #[test]
    fn test_apply_renames_markdown_only() {
        let mut files = FileMap::new();
        files.insert("blog/post.md", FileRecord::new("Hello", Metadata::new()));
        files.insert("images/a.png", FileRecord::new(vec![0u8, 159, 146], Metadata::new()));
        let mut ctx = BuildContext::new(files, Default::default());
        let id = ctx.files.id_of("blog/post.md").unwrap();

        markdown().apply(&mut ctx).unwrap();

        assert!(!ctx.files.contains("blog/post.md"));
        let record = ctx.files.get("blog/post.html").unwrap();
        assert_eq!(record.text().unwrap().trim(), "<p>Hello</p>");
        assert_eq!(ctx.files.id_of("blog/post.html"), Some(id));
        assert_eq!(ctx.files.get("images/a.png").unwrap().contents, vec![0u8, 159, 146]);
    }
}
