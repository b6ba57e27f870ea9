//! # Call Invoker
//!
//! The generic routine behind every [`StubMethod`]:
//!
//! 1. Validates the caller's headers and routing parameters, and encodes the request against the
//!    method's input type. Failures here are returned synchronously as [`InvokeError`].
//! 2. Creates the call's cancellation primitive and spawns the exchange on the current runtime.
//! 3. The exchange resolves the credential headers, overlays the caller's headers, posts the body
//!    to the method URL and waits for the response.
//! 4. An ok response is decoded against the method's output type. Any other response is decoded as
//!    a `google.rpc.Status` and surfaces as [`CallError::Status`].
//!
//! The callback runs exactly once per accepted call, from the spawned task.
use super::Capabilities;
use crate::{
    auth::{self, CredentialError},
    cancel::{AbortSignal, CallHandle, CallState},
    codec::{DecodeError, EncodeError, JsonCodec},
    options::{CallOptions, Endpoint, Metadata},
    routing_header::{self, ROUTING_HEADER},
    status::StatusEnvelope,
    transport::{FetchRequest, TransportError},
};
use bytes::Bytes;
use http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    header::{CONTENT_TYPE, InvalidHeaderName, InvalidHeaderValue},
};
use prost_reflect::MethodDescriptor;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Errors raised synchronously by [`StubMethod::invoke`], before any exchange starts.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Failed to encode request: '{0}'")]
    Encode(#[from] EncodeError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidHeaderName {
        key: String,
        source: InvalidHeaderName,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: InvalidHeaderValue,
    },
    #[error("No Tokio runtime available to drive the call")]
    NoRuntime,
}

/// Errors delivered to the callback of an accepted call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The server answered with a `google.rpc.Status`. Displays as its JSON text.
    #[error("{0}")]
    Status(StatusEnvelope),
    #[error("Transport error: '{0}'")]
    Transport(#[from] TransportError),
    #[error("Exchange failed with HTTP status {status} and no decodable status body")]
    UndecodableStatus {
        status: StatusCode,
        #[source]
        source: Option<prost::DecodeError>,
    },
    #[error("Failed to acquire credentials: '{0}'")]
    Credentials(#[from] CredentialError),
    #[error("Failed to decode response: '{0}'")]
    Decode(#[from] DecodeError),
    #[error("Call cancelled")]
    Cancelled,
    /// Only returned by the awaitable helpers, never passed to a callback.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    /// Only returned by [`Stub::call`](super::Stub::call).
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
}

/// One RPC method bound to a stub.
#[derive(Clone)]
pub struct StubMethod {
    inner: Arc<Invoker>,
}

struct Invoker {
    method: MethodDescriptor,
    codec: JsonCodec,
    url: String,
    capabilities: Capabilities,
}

impl StubMethod {
    pub(crate) fn new(
        method: MethodDescriptor,
        endpoint: &Endpoint,
        capabilities: Capabilities,
    ) -> Self {
        let codec = JsonCodec::new(method.input(), method.output());
        let url = endpoint.method_url(&method);

        Self {
            inner: Arc::new(Invoker {
                method,
                codec,
                url,
                capabilities,
            }),
        }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.inner.method
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Starts a call and returns its handle immediately.
    ///
    /// `callback` receives the decoded response or the call's error, exactly once. If the call is
    /// cancelled through the returned handle before it completes, the callback receives
    /// [`CallError::Cancelled`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn invoke<F>(
        &self,
        request: serde_json::Value,
        metadata: Metadata,
        options: CallOptions,
        callback: F,
    ) -> Result<CallHandle, InvokeError>
    where
        F: FnOnce(Result<serde_json::Value, CallError>) + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| InvokeError::NoRuntime)?;

        let headers = caller_headers(&metadata, &options)?;
        let body = self.inner.codec.encode(&request)?;

        let cancellation = self.inner.capabilities.cancellation.create();
        let state = CallState::default();

        tracing::debug!(
            method = self.inner.method.full_name(),
            url = %self.inner.url,
            "dispatching call"
        );

        let invoker = self.inner.clone();
        let mut signal = cancellation.signal();
        let task_state = state.clone();

        runtime.spawn(async move {
            let exchange_signal = signal.clone();
            let outcome = tokio::select! {
                biased;
                _ = signal.aborted() => Err(CallError::Cancelled),
                outcome = invoker.exchange(headers, body, exchange_signal) => outcome,
            };

            if task_state.complete() {
                callback(outcome);
            } else {
                callback(Err(CallError::Cancelled));
            }
        });

        Ok(CallHandle::new(cancellation, state))
    }

    /// Awaitable form of [`StubMethod::invoke`]. Dropping the future cancels the call.
    pub async fn call(
        &self,
        request: serde_json::Value,
        metadata: Metadata,
        options: CallOptions,
    ) -> Result<serde_json::Value, CallError> {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = self.invoke(request, metadata, options, move |result| {
            let _ = tx.send(result);
        })?;
        let _guard = CancelOnDrop(handle);

        rx.await.unwrap_or(Err(CallError::Cancelled))
    }
}

impl fmt::Debug for StubMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubMethod")
            .field("method", &self.inner.method.full_name())
            .field("url", &self.inner.url)
            .finish()
    }
}

impl Invoker {
    async fn exchange(
        &self,
        caller_headers: HeaderMap,
        body: Bytes,
        signal: AbortSignal,
    ) -> Result<serde_json::Value, CallError> {
        let mut headers = auth::resolve_headers(self.capabilities.auth.as_ref()).await?;
        for (name, value) in caller_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTOBUF_CONTENT_TYPE));

        let request = FetchRequest {
            url: self.url.clone(),
            method: Method::POST,
            headers,
            body,
            signal,
        };

        let response = self.capabilities.transport.fetch(request).await?;
        let status = response.status();
        let ok = response.ok();
        let bytes = response.read_body().await?;

        tracing::trace!(%status, body_len = bytes.len(), "exchange completed");

        if ok {
            return Ok(self.codec.decode(&bytes)?);
        }

        if bytes.is_empty() {
            tracing::warn!(%status, url = %self.url, "error response without a status body");
            return Err(CallError::UndecodableStatus {
                status,
                source: None,
            });
        }

        match StatusEnvelope::decode(&bytes) {
            Ok(envelope) => Err(CallError::Status(envelope)),
            Err(source) => {
                tracing::warn!(%status, url = %self.url, "undecodable error response body");
                Err(CallError::UndecodableStatus {
                    status,
                    source: Some(source),
                })
            }
        }
    }
}

/// Cancels the wrapped call when dropped. A no-op once the call completed.
struct CancelOnDrop(CallHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Builds the caller-supplied headers: metadata headers, then call option headers, then the
/// routing header.
fn caller_headers(metadata: &Metadata, options: &CallOptions) -> Result<HeaderMap, InvokeError> {
    let mut map = HeaderMap::new();

    for (k, v) in metadata
        .headers
        .iter()
        .chain(options.other_args.headers.iter())
    {
        insert_header(&mut map, k, v)?;
    }

    if !metadata.routing_params.is_empty() {
        let value = routing_header::from_params(
            metadata
                .routing_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        insert_header(&mut map, ROUTING_HEADER, &value)?;
    }

    Ok(map)
}

fn insert_header(map: &mut HeaderMap, k: &str, v: &str) -> Result<(), InvokeError> {
    let key = HeaderName::from_str(k).map_err(|source| InvokeError::InvalidHeaderName {
        key: k.to_string(),
        source,
    })?;
    let val = HeaderValue::from_str(v).map_err(|source| InvokeError::InvalidHeaderValue {
        key: k.to_string(),
        source,
    })?;
    map.insert(key, val);
    Ok(())
}
