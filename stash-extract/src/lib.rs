//! Page capture: readable content as markup, with a fallback chain that
//! never fails.
//!
//! - `readability`: the [`Reader`] found an article and the
//!   [`MarkupConverter`] turned it into markup
//! - `fallback_innerText`: no usable article, so the page's rendered text
//! - `error_fallback`: something went wrong on the way (missing collaborator,
//!   reader/converter error, panic); rendered text plus an `error` message
//!
//! ```
//! use stash_extract::{ExtractionMethod, Extractor, Page};
//!
//! let page = Page::from_html(
//!     "https://example.com/post",
//!     "<html><head><title>Post</title></head><body><article><h1>Hello</h1><p>World</p></article></body></html>",
//! );
//! let got = Extractor::default().extract(&page);
//! assert_eq!(got.extraction_method, ExtractionMethod::Readability);
//! assert!(got.content.contains("World"));
//! ```

mod page;
mod reader;

pub use page::{Page, PageError, fetch_page, render_text};
pub use reader::{ArticleReader, Html2TextConverter};

use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;

/// What a [`Reader`] pulls out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: Option<String>,
    pub content_html: String,
}

/// Failures inside the collaborators. Never escapes [`Extractor::extract`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reader not loaded")]
    ReaderMissing,
    #[error("markup converter not loaded")]
    ConverterMissing,
    #[error("reader failed: {0}")]
    Reader(String),
    #[error("markup conversion failed: {0}")]
    Convert(String),
}

/// Structured article extraction.
pub trait Reader: Send + Sync {
    /// `Ok(None)` when the page has no recognisable article.
    fn parse(&self, page: &Page) -> Result<Option<Article>, ExtractError>;
}

/// HTML to lightweight markup.
pub trait MarkupConverter: Send + Sync {
    fn convert(&self, html: &str) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionMethod {
    #[serde(rename = "readability")]
    Readability,
    #[serde(rename = "fallback_innerText")]
    FallbackInnerText,
    #[serde(rename = "error_fallback")]
    ErrorFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Readability => "readability",
            ExtractionMethod::FallbackInnerText => "fallback_innerText",
            ExtractionMethod::ErrorFallback => "error_fallback",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub title: String,
    pub url: String,
    /// Markup, or rendered text on the fallback paths. Never absent.
    pub content: String,
    pub extraction_method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Extraction {
    fn fallback(page: &Page, method: ExtractionMethod, error: Option<String>) -> Self {
        Self {
            title: page.title.clone(),
            url: page.url.clone(),
            content: page.rendered_text.clone(),
            extraction_method: method,
            error,
        }
    }
}

pub struct Extractor {
    reader: Option<Box<dyn Reader>>,
    converter: Option<Box<dyn MarkupConverter>>,
}

impl Default for Extractor {
    /// [`ArticleReader`] + [`Html2TextConverter`].
    fn default() -> Self {
        Self::new(Box::new(ArticleReader), Box::new(Html2TextConverter::default()))
    }
}

impl Extractor {
    pub fn new(reader: Box<dyn Reader>, converter: Box<dyn MarkupConverter>) -> Self {
        Self {
            reader: Some(reader),
            converter: Some(converter),
        }
    }

    /// An extractor with no collaborators; every page takes `error_fallback`.
    pub fn unloaded() -> Self {
        Self {
            reader: None,
            converter: None,
        }
    }

    /// Run the fallback chain. Never fails.
    pub fn extract(&self, page: &Page) -> Extraction {
        tracing::debug!(url = %page.url, "extract.start");

        let outcome = catch_unwind(AssertUnwindSafe(|| self.structured(page)));
        let extraction = match outcome {
            Ok(Ok(Some((title, content)))) => Extraction {
                title,
                url: page.url.clone(),
                content,
                extraction_method: ExtractionMethod::Readability,
                error: None,
            },
            Ok(Ok(None)) => {
                tracing::warn!(url = %page.url, "extract.reader_empty");
                Extraction::fallback(page, ExtractionMethod::FallbackInnerText, None)
            }
            Ok(Err(e)) => {
                tracing::error!(url = %page.url, error = %e, "extract.error");
                Extraction::fallback(page, ExtractionMethod::ErrorFallback, Some(e.to_string()))
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "extraction panicked".to_string());
                tracing::error!(url = %page.url, error = %message, "extract.panic");
                Extraction::fallback(page, ExtractionMethod::ErrorFallback, Some(message))
            }
        };

        tracing::info!(
            url = %extraction.url,
            method = %extraction.extraction_method,
            content_len = extraction.content.len(),
            "extract.done"
        );
        extraction
    }

    fn structured(&self, page: &Page) -> Result<Option<(String, String)>, ExtractError> {
        let reader = self.reader.as_deref().ok_or(ExtractError::ReaderMissing)?;
        let converter = self
            .converter
            .as_deref()
            .ok_or(ExtractError::ConverterMissing)?;

        let article = match reader.parse(page)? {
            Some(a) if !a.content_html.trim().is_empty() => a,
            _ => return Ok(None),
        };

        let markup = converter.convert(&article.content_html)?;
        if markup.trim().is_empty() {
            return Ok(None);
        }
        let title = article
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| page.title.clone());
        Ok(Some((title, markup)))
    }
}
