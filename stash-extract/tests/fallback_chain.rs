use serde_json::json;
use stash_extract::{
    Article, ArticleReader, ExtractError, ExtractionMethod, Extractor, Html2TextConverter,
    MarkupConverter, Page, Reader, fetch_page,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoArticle;
impl Reader for NoArticle {
    fn parse(&self, _page: &Page) -> Result<Option<Article>, ExtractError> {
        Ok(None)
    }
}

struct BrokenReader;
impl Reader for BrokenReader {
    fn parse(&self, _page: &Page) -> Result<Option<Article>, ExtractError> {
        Err(ExtractError::Reader("bad DOM".into()))
    }
}

struct PanickingReader;
impl Reader for PanickingReader {
    fn parse(&self, _page: &Page) -> Result<Option<Article>, ExtractError> {
        panic!("reader blew up")
    }
}

struct BrokenConverter;
impl MarkupConverter for BrokenConverter {
    fn convert(&self, _html: &str) -> Result<String, ExtractError> {
        Err(ExtractError::Convert("unsupported".into()))
    }
}

fn page() -> Page {
    Page::from_html(
        "https://example.com/a",
        "<html><head><title>Doc</title></head><body><article><h1>Headline</h1><p>Body text</p></article></body></html>",
    )
}

#[test]
fn structured_path_uses_article_title_and_markup() {
    let got = Extractor::default().extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::Readability);
    assert_eq!(got.title, "Headline");
    assert_eq!(got.url, "https://example.com/a");
    assert!(got.content.contains("Body text"));
    assert_eq!(got.error, None);
}

#[test]
fn reader_without_article_falls_back_to_rendered_text() {
    let ex = Extractor::new(Box::new(NoArticle), Box::new(Html2TextConverter::default()));
    let got = ex.extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::FallbackInnerText);
    assert_eq!(got.title, "Doc");
    assert_eq!(got.content, "Headline\nBody text");
    assert_eq!(got.error, None);

    let v = serde_json::to_value(&got).unwrap();
    assert_eq!(v["extractionMethod"], json!("fallback_innerText"));
    assert!(v["content"].is_string());
    assert!(v.get("error").is_none());
}

#[test]
fn empty_page_still_yields_content() {
    let ex = Extractor::new(Box::new(NoArticle), Box::new(Html2TextConverter::default()));
    let got = ex.extract(&Page::from_html("about:blank", ""));
    assert_eq!(got.extraction_method, ExtractionMethod::FallbackInnerText);
    assert_eq!(got.content, "");
}

#[test]
fn reader_error_is_surfaced_not_raised() {
    let ex = Extractor::new(Box::new(BrokenReader), Box::new(Html2TextConverter::default()));
    let got = ex.extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::ErrorFallback);
    assert_eq!(got.error.as_deref(), Some("reader failed: bad DOM"));
    assert_eq!(got.content, "Headline\nBody text");
}

#[test]
fn converter_error_is_surfaced_not_raised() {
    let ex = Extractor::new(Box::new(ArticleReader), Box::new(BrokenConverter));
    let got = ex.extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::ErrorFallback);
    assert!(got.error.unwrap().contains("unsupported"));
}

#[test]
fn panics_are_contained() {
    let ex = Extractor::new(Box::new(PanickingReader), Box::new(Html2TextConverter::default()));
    let got = ex.extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::ErrorFallback);
    assert_eq!(got.error.as_deref(), Some("reader blew up"));
}

#[test]
fn missing_collaborators_degrade() {
    let got = Extractor::unloaded().extract(&page());
    assert_eq!(got.extraction_method, ExtractionMethod::ErrorFallback);
    assert_eq!(got.error.as_deref(), Some("reader not loaded"));
    assert_eq!(got.title, "Doc");
}

#[tokio::test]
async fn fetch_page_captures_html_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Remote</title><body><p>hello</p></body>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let page = fetch_page(&client, &format!("{}/post", server.uri()))
        .await
        .unwrap();
    assert_eq!(page.title, "Remote");
    assert_eq!(page.rendered_text, "hello");
    assert!(page.url.ends_with("/post"));

    let err = fetch_page(&client, &format!("{}/gone", server.uri()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}
