//! Single-shot JSON-over-HTTP client with bearer auth and error classification.
//!
//! - One attempt per call: no retries, no backoff, transport default timeouts
//! - Fixed `Content-Type: application/json`, plus `Authorization: Bearer <token>`
//!   when a token is supplied; caller headers can never replace either
//! - Non-2xx responses are classified per [`ErrorPolicy`] into [`ApiError`]
//! - Optional *raw* request/response logging via `STASH_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), stash_http::ApiError> {
//! use stash_http::{ErrorPolicy, HttpClient, RequestOpts};
//!
//! let client = HttpClient::new()?;
//! let recent: serde_json::Value = client
//!     .get_json(
//!         "http://localhost",
//!         "/recent?limit=10",
//!         RequestOpts::bearer("token", ErrorPolicy::Authenticated),
//!     )
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: tokens are sanitized before use, and logs only ever include the
//! auth kind (bearer/none), never the secret.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "STASH_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

/// Fallback message for a 401 without a usable `detail`.
pub const UNAUTHORIZED_FALLBACK: &str = "Unauthorized";
/// Fallback message for a 403 without a usable `detail`.
pub const ACCESS_DENIED_FALLBACK: &str = "Pilot Mode Access Denied";
/// Fallback message for other failures on the authenticated client.
pub const REQUEST_FAILED_FALLBACK: &str = "API Request Failed";
/// Message of the local short-circuit when no token is set.
pub const UNAUTHENTICATED_MESSAGE: &str = "No Auth Token. Please login.";

static REQ_SEQ: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            let mut s = s.to_string();
            if s.len() > RAW_MAX_BODY {
                truncate_at_boundary(&mut s, RAW_MAX_BODY);
                s.push('…');
            }
            parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let shown = if query.is_empty() {
        format!("{}://{}", url.scheme(), host_path)
    } else {
        format!("{}://{}?{}", url.scheme(), host_path, query)
    };
    parts.push(format!("'{}'", shown));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") {
                val = "Bearer <redacted>".into();
            }
            (key, val)
        })
        .collect()
}

/// "host[:port]/path" plus the query pairs with secret values redacted.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host = url.host_str().unwrap_or("-");
    let host_path = match url.port() {
        Some(port) => format!("{host}:{port}{}", url.path()),
        None => format!("{host}{}", url.path()),
    };
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

// ==============================
// Errors
// ==============================

/// Every way a call can fail. The `Display` of the three HTTP-classified
/// kinds is exactly the server's `detail` (or the fallback message).
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token was set; nothing was sent.
    #[error("No Auth Token. Please login.")]
    Unauthenticated,
    /// HTTP 401.
    #[error("{0}")]
    Unauthorized(String),
    /// HTTP 403 on the authenticated client ("Pilot Mode").
    #[error("{0}")]
    AccessDenied(String),
    /// Any other non-2xx with a JSON body.
    #[error("{message}")]
    RequestFailed { status: StatusCode, message: String },
    /// DNS, refused connection, reset, aborted body.
    #[error("network error: {0}")]
    Transport(String),
    /// A body that had to be JSON was not.
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
}

impl ApiError {
    /// True for the pilot-mode gate, including messages that name it.
    pub fn is_access_denied(&self) -> bool {
        match self {
            ApiError::AccessDenied(_) => true,
            other => {
                let msg = other.to_string();
                msg.contains("Pilot Mode") || msg.contains("Access Denied")
            }
        }
    }

    /// HTTP status behind the error, when a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Classification policy
// ==============================

/// How non-2xx responses are classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// 401 → `Unauthorized`, 403 → `AccessDenied`, else → `RequestFailed`.
    Authenticated,
    /// 401 → `Unauthorized`, else → `RequestFailed` with `fallback`.
    Public { fallback: &'static str },
}

impl ErrorPolicy {
    fn generic_fallback(&self) -> &'static str {
        match self {
            ErrorPolicy::Authenticated => REQUEST_FAILED_FALLBACK,
            ErrorPolicy::Public { fallback } => fallback,
        }
    }

    /// Map a non-2xx status and its body to an [`ApiError`].
    ///
    /// 401/403 tolerate an unparseable body; every other status requires JSON.
    pub fn classify(&self, status: StatusCode, body: &[u8]) -> ApiError {
        let parsed = serde_json::from_slice::<Value>(body);

        if status == StatusCode::UNAUTHORIZED {
            let message = parsed
                .ok()
                .and_then(|v| extract_detail(&v))
                .unwrap_or_else(|| UNAUTHORIZED_FALLBACK.to_string());
            return ApiError::Unauthorized(message);
        }

        if status == StatusCode::FORBIDDEN && *self == ErrorPolicy::Authenticated {
            let message = parsed
                .ok()
                .and_then(|v| extract_detail(&v))
                .unwrap_or_else(|| ACCESS_DENIED_FALLBACK.to_string());
            return ApiError::AccessDenied(message);
        }

        match parsed {
            Ok(v) => ApiError::RequestFailed {
                status,
                message: extract_detail(&v)
                    .unwrap_or_else(|| self.generic_fallback().to_string()),
            },
            Err(e) => ApiError::Decode(e.to_string(), snip_body(body)),
        }
    }
}

/// `detail` from an error body: strings verbatim, other values as compact
/// JSON, `null`/empty/missing as absent.
fn extract_detail(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ==============================
// Request Options
// ==============================

/// Per-request knobs.
///
/// ```
/// use stash_http::{ErrorPolicy, RequestOpts};
///
/// let opts = RequestOpts::bearer("t0k", ErrorPolicy::Authenticated);
/// assert_eq!(opts.bearer, Some("t0k"));
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct RequestOpts<'a> {
    /// `Authorization: Bearer <token>` when set.
    pub bearer: Option<&'a str>,
    /// Extra headers; merged under the fixed ones.
    pub headers: Option<HeaderMap>,
    pub policy: ErrorPolicy,
}

impl<'a> RequestOpts<'a> {
    pub fn bearer(token: &'a str, policy: ErrorPolicy) -> Self {
        Self {
            bearer: Some(token),
            headers: None,
            policy,
        }
    }

    pub fn anonymous(policy: ErrorPolicy) -> Self {
        Self {
            bearer: None,
            headers: None,
            policy,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Construct a client with the transport's default timeouts.
    pub fn new() -> Result<Self, ApiError> {
        let inner = Client::builder()
            .build()
            .map_err(|e| ApiError::Build(e.to_string()))?;
        Ok(Self { inner })
    }

    /// GET JSON from `base` + `path`.
    pub async fn get_json<T>(
        &self,
        base: &str,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request_json::<(), T>(Method::GET, base, path, None, opts)
            .await
    }

    /// POST a JSON body to `base` + `path`.
    pub async fn post_json<B, T>(
        &self,
        base: &str,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, base, path, Some(body), opts)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    /// Issue one request and classify the outcome.
    ///
    /// The URL is `base` and `path` concatenated as-is; `path` keeps its own
    /// query string.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        base: &str,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = Url::parse(&format!("{base}{path}")).map_err(|e| ApiError::Url(e.to_string()))?;
        let headers = merge_headers(opts.headers.as_ref(), opts.bearer)?;

        let request_body = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| ApiError::Build(e.to_string()))?),
            None => None,
        };

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(bytes) = &request_body {
            rb = rb.body(bytes.clone());
        }

        // ----- Safe request logging (pre-send) -----
        let req_id = format!("r{:x}", REQ_SEQ.fetch_add(1, Ordering::Relaxed));
        let auth_kind = if opts.bearer.is_some() { "bearer" } else { "none" };
        let (host_path, redacted_q) = redact_query(&url);

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%host_path,
            query=?redacted_q,
            auth_kind,
            has_body=%request_body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, &headers, request_body.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            ApiError::Transport(message)
        })?;
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            ApiError::Transport(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let x_request_id = resp_headers
            .get("x-request-id")
            .or_else(|| resp_headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%x_request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&resp_headers);
            let truncated = bytes.len() > RAW_MAX_BODY;
            let shown = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            let text = String::from_utf8_lossy(shown);
            tracing::info!(
                target: "http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

        // ----- Success path -----
        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                ApiError::Decode(e.to_string(), snippet)
            });
        }

        let err = opts.policy.classify(status, &bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%err,
            x_request_id=%x_request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(err)
    }
}

// ==============================
// Helpers
// ==============================

/// Caller headers first, then the fixed ones on top so they always win.
fn merge_headers(extra: Option<&HeaderMap>, bearer: Option<&str>) -> Result<HeaderMap, ApiError> {
    let mut headers = extra.cloned().unwrap_or_default();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(raw) = bearer {
        let token = sanitize_token(raw)?;
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ApiError::Build(format!("invalid Authorization header: {e}")))?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        truncate_at_boundary(&mut snip, SNIPPET_MAX);
        snip.push_str("...");
    }
    snip
}

fn truncate_at_boundary(s: &mut String, max: usize) {
    let mut cut = max.min(s.len());
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

fn sanitize_token(raw: &str) -> Result<String, ApiError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(ApiError::Build("token is empty".into()));
    }
    if !s.is_ascii() {
        return Err(ApiError::Build("token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(ApiError::Build("token contains control characters".into()));
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderName;
    use serde_json::json;

    #[test]
    fn detail_rules() {
        assert_eq!(extract_detail(&json!({"detail": "X"})).as_deref(), Some("X"));
        assert_eq!(extract_detail(&json!({"detail": ""})), None);
        assert_eq!(extract_detail(&json!({"detail": null})), None);
        assert_eq!(extract_detail(&json!({"other": 1})), None);
        assert_eq!(extract_detail(&json!([1, 2])), None);
        assert_eq!(
            extract_detail(&json!({"detail": [{"loc": ["body"]}]})).as_deref(),
            Some(r#"[{"loc":["body"]}]"#)
        );
    }

    #[test]
    fn classify_authenticated() {
        let p = ErrorPolicy::Authenticated;
        match p.classify(StatusCode::UNAUTHORIZED, b"<html>") {
            ApiError::Unauthorized(m) => assert_eq!(m, UNAUTHORIZED_FALLBACK),
            other => panic!("unexpected {other:?}"),
        }
        match p.classify(StatusCode::FORBIDDEN, b"") {
            ApiError::AccessDenied(m) => assert_eq!(m, ACCESS_DENIED_FALLBACK),
            other => panic!("unexpected {other:?}"),
        }
        match p.classify(StatusCode::BAD_REQUEST, b"{}") {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, REQUEST_FAILED_FALLBACK);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            p.classify(StatusCode::INTERNAL_SERVER_ERROR, b"oops"),
            ApiError::Decode(..)
        ));
    }

    #[test]
    fn classify_public_has_no_access_denied() {
        let p = ErrorPolicy::Public {
            fallback: "Failed to search bookmarks",
        };
        match p.classify(StatusCode::FORBIDDEN, b"{}") {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "Failed to search bookmarks");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            p.classify(StatusCode::FORBIDDEN, b"not json"),
            ApiError::Decode(..)
        ));
        assert!(matches!(
            p.classify(StatusCode::UNAUTHORIZED, b"not json"),
            ApiError::Unauthorized(_)
        ));
    }

    #[test]
    fn fixed_headers_override_caller() {
        let mut extra = HeaderMap::new();
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        extra.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        extra.insert(
            HeaderName::from_static("x-client"),
            HeaderValue::from_static("stash"),
        );
        let h = merge_headers(Some(&extra), Some("tok")).unwrap();
        assert_eq!(h.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(h.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(h.get("x-client").unwrap(), "stash");
        assert_eq!(h.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_token(" \"ab c\n\" ").unwrap(), "abc");
        assert!(matches!(sanitize_token("tök"), Err(ApiError::Build(_))));
        assert!(matches!(sanitize_token("  "), Err(ApiError::Build(_))));
    }

    #[test]
    fn query_secrets_are_redacted() {
        let url = Url::parse("http://localhost:8000/recent?limit=5&token=abc").unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "localhost:8000/recent");
        assert_eq!(
            q,
            vec![
                ("limit".to_string(), "5".to_string()),
                ("token".to_string(), "<redacted>".to_string())
            ]
        );
    }

    #[test]
    fn curl_never_contains_token() {
        let url = Url::parse("http://localhost/chat").unwrap();
        let h = merge_headers(None, Some("supersecret")).unwrap();
        let curl = make_curl(&Method::POST, &url, &h, Some(br#"{"query":"q"}"#));
        assert!(!curl.contains("supersecret"));
        assert!(curl.contains("Bearer <redacted>"));
        assert!(curl.contains("'http://localhost/chat'"));
    }

    #[test]
    fn access_denied_detection() {
        assert!(ApiError::AccessDenied("x".into()).is_access_denied());
        assert!(ApiError::Unauthorized("Pilot Mode only".into()).is_access_denied());
        assert!(!ApiError::Unauthorized("nope".into()).is_access_denied());
    }
}
