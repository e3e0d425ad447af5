//! OAuth implicit-flow helpers: build the authorize URL, read the token back
//! out of the redirect.

use stash_config::{OAuthConfig, StateError};
use thiserror::Error;
use url::Url;

const GOOGLE_AUTHORIZE: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const SCOPES: &str = "openid email profile";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("OAuth client id is not configured")]
    MissingClientId,
    #[error("OAuth redirect uri is not configured")]
    MissingRedirectUri,
    #[error("invalid redirect url: {0}")]
    InvalidRedirect(String),
    #[error("No access token found in redirect.")]
    MissingToken,
    #[error(transparent)]
    State(#[from] StateError),
}

/// Authorize URL for the implicit flow (`response_type=token`).
///
/// ```
/// use stash_config::OAuthConfig;
///
/// let url = stash_ui::authorize_url(&OAuthConfig {
///     client_id: Some("cid".into()),
///     redirect_uri: Some("https://ext.example/cb".into()),
/// })
/// .unwrap();
/// assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?client_id=cid"));
/// assert!(url.contains("response_type=token"));
/// ```
pub fn authorize_url(oauth: &OAuthConfig) -> Result<String, AuthError> {
    let client_id = oauth
        .client_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingClientId)?;
    let redirect_uri = oauth
        .redirect_uri
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MissingRedirectUri)?;

    let url = Url::parse_with_params(
        GOOGLE_AUTHORIZE,
        &[
            ("client_id", client_id),
            ("response_type", "token"),
            ("redirect_uri", redirect_uri),
            ("scope", SCOPES),
        ],
    )
    .map_err(|e| AuthError::InvalidRedirect(e.to_string()))?;
    Ok(url.to_string())
}

/// `access_token` from the fragment of an implicit-flow redirect.
///
/// ```
/// let token = stash_ui::parse_access_token(
///     "https://ext.example/cb#access_token=ya29.abc&token_type=Bearer&expires_in=3599",
/// )
/// .unwrap();
/// assert_eq!(token, "ya29.abc");
/// ```
pub fn parse_access_token(redirect: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirect).map_err(|e| AuthError::InvalidRedirect(e.to_string()))?;
    let fragment = url.fragment().unwrap_or_default();
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(k, _)| k == "access_token")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_must_be_in_fragment() {
        assert!(matches!(
            parse_access_token("https://cb/?access_token=abc"),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            parse_access_token("https://cb/#error=access_denied"),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            parse_access_token("https://cb/#access_token="),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            parse_access_token("not a url"),
            Err(AuthError::InvalidRedirect(_))
        ));
    }

    #[test]
    fn token_is_percent_decoded() {
        assert_eq!(parse_access_token("https://cb/#access_token=a%2Fb").unwrap(), "a/b");
    }

    #[test]
    fn authorize_url_requires_client_id() {
        let err = authorize_url(&OAuthConfig::default()).unwrap_err();
        assert!(matches!(err, AuthError::MissingClientId));
    }

    #[test]
    fn authorize_url_encodes_redirect_and_scope() {
        let url = authorize_url(&OAuthConfig {
            client_id: Some("cid".into()),
            redirect_uri: Some("https://ext.example/cb?x=1".into()),
        })
        .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("redirect_uri".into(), "https://ext.example/cb?x=1".into())));
        assert!(pairs.contains(&("scope".into(), "openid email profile".into())));
    }
}
