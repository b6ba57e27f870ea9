//! # Request/Response Transport
//!
//! The stub never talks to the network directly. It hands a [`FetchRequest`] to a [`Transport`]
//! and gets back a [`FetchResponse`] whose body is read separately, mirroring a `fetch`-like
//! primitive. Transports are injected into the client, so tests swap in recording fakes and
//! applications can bring their own HTTP stack.
//!
//! [`HyperTransport`] is the default implementation, built on `hyper-util`'s legacy client with a
//! `hyper-rustls` connector (plain `http` and `https` with webpki roots).
use crate::BoxError;
use crate::cancel::AbortSignal;
use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::fmt;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("Request failed: '{0}'")]
    Request(#[source] BoxError),
    #[error("Failed to read response body: '{0}'")]
    Body(#[source] BoxError),
    #[error("Exchange aborted")]
    Aborted,
}

/// One outgoing exchange.
#[derive(Debug)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Tripped when the call is cancelled. Transports may use it to stop early.
    pub signal: AbortSignal,
}

/// The head of a response. The body is read on demand with [`FetchResponse::read_body`].
pub struct FetchResponse {
    status: StatusCode,
    body: BoxFuture<'static, Result<Bytes, TransportError>>,
}

impl FetchResponse {
    /// A response with an already buffered body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            body: async move { Ok(body) }.boxed(),
        }
    }

    /// A response whose body is produced by `body` once read.
    pub fn from_future<F>(status: StatusCode, body: F) -> Self
    where
        F: Future<Output = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            status,
            body: body.boxed(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is in the `2xx` range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub async fn read_body(self) -> Result<Bytes, TransportError> {
        self.body.await
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A plain request/response exchange primitive.
pub trait Transport: Send + Sync + 'static {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> BoxFuture<'static, Result<FetchResponse, TransportError>>;
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP/1.1 transport over `hyper`.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    inner: HttpsClient,
}

impl HyperTransport {
    pub fn new() -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();

        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Self { inner }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> BoxFuture<'static, Result<FetchResponse, TransportError>> {
        let client = self.inner.clone();

        async move {
            let FetchRequest {
                url,
                method,
                headers,
                body,
                mut signal,
            } = request;

            let uri: hyper::Uri = url
                .parse()
                .map_err(|_| TransportError::InvalidUrl(url.clone()))?;

            let mut req = hyper::Request::builder()
                .method(method)
                .uri(uri)
                .body(Full::new(body))
                .map_err(|e| TransportError::Request(Box::new(e)))?;
            req.headers_mut().extend(headers);

            let res = tokio::select! {
                biased;
                _ = signal.aborted() => return Err(TransportError::Aborted),
                res = client.request(req) => res.map_err(|e| TransportError::Request(Box::new(e)))?,
            };

            let (parts, body) = res.into_parts();

            Ok(FetchResponse::from_future(parts.status, async move {
                body.collect()
                    .await
                    .map(|collected| collected.to_bytes())
                    .map_err(|e| TransportError::Body(Box::new(e)))
            }))
        }
        .boxed()
    }
}
