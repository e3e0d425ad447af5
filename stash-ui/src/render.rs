//! Chat answer rendering.

use pulldown_cmark::html::push_html;
use pulldown_cmark::{Options, Parser};
use pulldown_cmark_escape::escape_html;
use regex::Regex;
use std::sync::OnceLock;

/// Markdown to HTML. Optional: without one, answers show as plain text.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CmarkRenderer;

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> Result<String, String> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        let mut html = String::new();
        push_html(&mut html, Parser::new_ext(markdown, options));
        Ok(html.trim_end().to_string())
    }
}

/// A chat bubble's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Renderer output, links opening in a new tab.
    Markup(String),
    /// Raw answer text.
    Plain(String),
}

impl Rendered {
    pub fn plain(text: impl Into<String>) -> Self {
        Rendered::Plain(text.into())
    }

    /// Display HTML. Plain text is escaped and each newline becomes `<br>`.
    pub fn to_html(&self) -> String {
        match self {
            Rendered::Markup(html) => html.clone(),
            Rendered::Plain(text) => {
                let mut out = String::with_capacity(text.len());
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        out.push_str("<br>");
                    }
                    let _ = escape_html(&mut out, line);
                }
                out
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Rendered::Markup(s) | Rendered::Plain(s) => s,
        }
    }
}

/// Render with `renderer` when present; a missing or failing renderer yields
/// the raw text.
pub fn render_answer(renderer: Option<&dyn MarkdownRenderer>, text: &str) -> Rendered {
    let Some(renderer) = renderer else {
        return Rendered::plain(text);
    };
    match renderer.render(text) {
        Ok(html) => Rendered::Markup(open_links_in_new_tab(&html)),
        Err(e) => {
            tracing::warn!(error = %e, "render.markdown_failed");
            Rendered::plain(text)
        }
    }
}

fn open_links_in_new_tab(html: &str) -> String {
    static ANCHOR: OnceLock<Option<Regex>> = OnceLock::new();
    static STALE: OnceLock<Option<Regex>> = OnceLock::new();
    let (Some(anchor), Some(stale)) = (
        ANCHOR.get_or_init(|| Regex::new(r"(?i)<a\b([^>]*)>").ok()),
        STALE.get_or_init(|| Regex::new(r#"(?i)\s(target|rel)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).ok()),
    ) else {
        return html.to_string();
    };
    anchor
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let attrs = stale.replace_all(&caps[1], "");
            format!(r#"<a{attrs} target="_blank" rel="noopener noreferrer">"#)
        })
        .into_owned()
}
