use crate::page::{cached_regex, collapse_spaces, strip_tags};
use crate::{Article, ExtractError, MarkupConverter, Page, Reader};
use regex::Regex;
use std::sync::OnceLock;

/// Picks the main content region of a page.
///
/// The first `<article>`, else the first `<main>`, else `<body>`. The title
/// comes from `og:title`, then the first `<h1>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleReader;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex, ExtractError> {
    cached_regex(cell, pattern).map_err(|e| ExtractError::Reader(e.to_string()))
}

impl ArticleReader {
    fn region(html: &str) -> Result<Option<String>, ExtractError> {
        static ARTICLE: OnceLock<Regex> = OnceLock::new();
        static MAIN: OnceLock<Regex> = OnceLock::new();
        static BODY: OnceLock<Regex> = OnceLock::new();

        let candidates = [
            regex(&ARTICLE, r"(?is)<article\b[^>]*>(.*?)</article\s*>")?,
            regex(&MAIN, r"(?is)<main\b[^>]*>(.*?)</main\s*>")?,
            regex(&BODY, r"(?is)<body\b[^>]*>(.*)</body\s*>")?,
        ];
        Ok(candidates
            .iter()
            .find_map(|re| re.captures(html).map(|c| c[1].to_string())))
    }

    fn title(html: &str) -> Result<Option<String>, ExtractError> {
        static OG_TITLE: OnceLock<Regex> = OnceLock::new();
        static H1: OnceLock<Regex> = OnceLock::new();

        let og = regex(
            &OG_TITLE,
            r#"(?is)<meta\b[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']*)["']"#,
        )?;
        if let Some(c) = og.captures(html) {
            let t = collapse_spaces(&c[1]);
            if !t.is_empty() {
                return Ok(Some(t));
            }
        }
        let h1 = regex(&H1, r"(?is)<h1\b[^>]*>(.*?)</h1\s*>")?;
        Ok(h1
            .captures(html)
            .map(|c| collapse_spaces(&strip_tags(&c[1])))
            .filter(|t| !t.is_empty()))
    }
}

impl Reader for ArticleReader {
    fn parse(&self, page: &Page) -> Result<Option<Article>, ExtractError> {
        let Some(content_html) = Self::region(&page.html)? else {
            return Ok(None);
        };
        if collapse_spaces(&strip_tags(&content_html)).is_empty() {
            return Ok(None);
        }
        Ok(Some(Article {
            title: Self::title(&page.html)?,
            content_html,
        }))
    }
}

/// HTML to markdown-flavoured text via `html2text`.
#[derive(Debug, Clone, Copy)]
pub struct Html2TextConverter {
    pub width: usize,
}

impl Default for Html2TextConverter {
    fn default() -> Self {
        Self { width: 80 }
    }
}

impl MarkupConverter for Html2TextConverter {
    fn convert(&self, html: &str) -> Result<String, ExtractError> {
        html2text::from_read(html.as_bytes(), self.width)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| ExtractError::Convert(e.to_string()))
    }
}
