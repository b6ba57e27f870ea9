//! # Credentials
//!
//! Every call starts from the headers handed out by a [`CredentialProvider`]. Acquiring them may be
//! asynchronous and may fail; a failure is delivered through the call's callback and the exchange
//! is never attempted.
use crate::BoxError;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{InvalidHeaderName, InvalidHeaderValue},
};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Failed to acquire request headers: '{0}'")]
    Acquire(#[source] BoxError),
    #[error("Invalid credential header name '{key}': '{source}'")]
    InvalidHeaderName {
        key: String,
        source: InvalidHeaderName,
    },
    #[error("Invalid credential header value for '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: InvalidHeaderValue,
    },
}

/// Source of the authentication headers attached to every call.
pub trait CredentialProvider: Send + Sync + 'static {
    /// Returns the headers to attach to the next request.
    fn request_headers(&self) -> BoxFuture<'_, Result<Vec<(String, String)>, CredentialError>>;

    /// One-time setup awaited when a stub is created.
    fn prepare(&self) -> BoxFuture<'_, Result<(), CredentialError>> {
        async { Ok(()) }.boxed()
    }
}

/// Attaches no headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn request_headers(&self) -> BoxFuture<'_, Result<Vec<(String, String)>, CredentialError>> {
        async { Ok(Vec::new()) }.boxed()
    }
}

/// A fixed set of headers, e.g. a pre-issued bearer token.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Vec<(String, String)>,
}

impl StaticHeaders {
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self { headers }
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::new(vec![(
            "authorization".to_string(),
            format!("Bearer {}", token.as_ref()),
        )])
    }
}

impl CredentialProvider for StaticHeaders {
    fn request_headers(&self) -> BoxFuture<'_, Result<Vec<(String, String)>, CredentialError>> {
        async { Ok(self.headers.clone()) }.boxed()
    }
}

/// Resolves the provider's headers into a [`HeaderMap`].
pub(crate) async fn resolve_headers(
    provider: &dyn CredentialProvider,
) -> Result<HeaderMap, CredentialError> {
    let mut map = HeaderMap::new();
    for (k, v) in provider.request_headers().await? {
        let key = HeaderName::from_str(&k).map_err(|source| CredentialError::InvalidHeaderName {
            key: k.clone(),
            source,
        })?;
        let val = HeaderValue::from_str(&v)
            .map_err(|source| CredentialError::InvalidHeaderValue { key: k, source })?;
        map.insert(key, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_token_becomes_an_authorization_header() {
        let headers = resolve_headers(&StaticHeaders::bearer("SOME_TOKEN"))
            .await
            .unwrap();

        assert_eq!(headers["authorization"], "Bearer SOME_TOKEN");
    }

    #[tokio::test]
    async fn no_credentials_attach_nothing() {
        let headers = resolve_headers(&NoCredentials).await.unwrap();

        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn invalid_header_names_are_rejected() {
        let provider = StaticHeaders::new(vec![("bad header".to_string(), "x".to_string())]);

        let err = resolve_headers(&provider).await.unwrap_err();
        assert!(matches!(err, CredentialError::InvalidHeaderName { .. }));
    }
}
