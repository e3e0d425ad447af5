//! The page under capture: where it came from, its raw HTML, and the text a
//! reader would see rendered.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid page url: {0}")]
    Url(String),
    #[error("page fetch failed: {0}")]
    Fetch(String),
    #[error("page returned status {0}")]
    Status(u16),
    #[error("page read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    /// `<title>` text, or empty.
    pub title: String,
    pub html: String,
    /// Visible text of `<body>`, line structure kept.
    pub rendered_text: String,
}

impl Page {
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            url: url.into(),
            title: document_title(&html).unwrap_or_default(),
            rendered_text: render_text(&html),
            html,
        }
    }

    /// Load a local HTML file; the url is its `file://` form.
    pub fn from_file(path: &Path) -> Result<Self, PageError> {
        let html = std::fs::read_to_string(path)?;
        let abs = std::fs::canonicalize(path)?;
        let url = Url::from_file_path(&abs)
            .map_err(|_| PageError::Url(abs.display().to_string()))?;
        Ok(Self::from_html(url.to_string(), html))
    }
}

/// GET a page and capture it. The url recorded is the final one after
/// redirects.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<Page, PageError> {
    let parsed = Url::parse(url).map_err(|e| PageError::Url(e.to_string()))?;
    let resp = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| PageError::Fetch(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PageError::Status(status.as_u16()));
    }
    let final_url = resp.url().to_string();
    let html = resp
        .text()
        .await
        .map_err(|e| PageError::Fetch(e.to_string()))?;
    tracing::debug!(url = %final_url, bytes = html.len(), "page.fetched");
    Ok(Page::from_html(final_url, html))
}

/// Compile `pattern` into `cell` on first use.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Regex>,
    pattern: &str,
) -> Result<&'static Regex, regex::Error> {
    if let Some(r) = cell.get() {
        return Ok(r);
    }
    let compiled = Regex::new(pattern)?;
    Ok(cell.get_or_init(|| compiled))
}

pub(crate) fn document_title(html: &str) -> Option<String> {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    let title_re = cached_regex(&TITLE, r"(?is)<title[^>]*>(.*?)</title>")
        .map_err(|e| tracing::warn!(error = %e, "page.title_regex"))
        .ok()?;
    let caps = title_re.captures(html)?;
    let title = collapse_spaces(&decode_entities(&strip_tags(&caps[1])));
    (!title.is_empty()).then_some(title)
}

/// Rendered text of an HTML document: the body without scripts, styles, or
/// markup, one line per block.
///
/// ```
/// let text = stash_extract::render_text(
///     "<head><title>t</title></head><body><p>a &amp; b</p><script>x()</script><div>c</div></body>",
/// );
/// assert_eq!(text, "a & b\nc");
/// ```
pub fn render_text(html: &str) -> String {
    let text = match block_text(html) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "page.render_regex");
            decode_entities(&strip_tags(html))
        }
    };
    text.lines()
        .map(collapse_spaces)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops non-visible regions and turns block boundaries into newlines.
fn block_text(html: &str) -> Result<String, regex::Error> {
    static HEAD: OnceLock<Regex> = OnceLock::new();
    static HIDDEN: OnceLock<Regex> = OnceLock::new();
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    static BLOCK: OnceLock<Regex> = OnceLock::new();

    let s = cached_regex(&HEAD, r"(?is)<head\b.*?</head>")?.replace_all(html, "");
    let s = cached_regex(&COMMENT, r"(?s)<!--.*?-->")?.replace_all(&s, "");
    let s = cached_regex(
        &HIDDEN,
        r"(?is)<(script|style|noscript|template|title)\b.*?</(script|style|noscript|template|title)\s*>",
    )?
    .replace_all(&s, "");
    let s = cached_regex(
        &BLOCK,
        r"(?i)<br\s*/?>|</?(p|div|section|article|main|header|footer|aside|nav|h[1-6]|li|ul|ol|tr|table|blockquote|pre)\b[^>]*>",
    )?
    .replace_all(&s, "\n");
    Ok(decode_entities(&strip_tags(&s)))
}

pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub(crate) fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
