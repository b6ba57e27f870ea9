//! # Options
//!
//! * [`StubOptions`]: where a stub sends its calls (`protocol`, `service_path`, `port`) plus an
//!   open bag of extra keys that are kept but never validated.
//! * [`Endpoint`]: the resolved, immutable form of [`StubOptions`] captured by every method of a
//!   stub.
//! * [`Metadata`] and [`CallOptions`]: per-call extras. Both can carry headers, and [`Metadata`]
//!   also carries the routing parameters serialized into the routing header.
use prost_reflect::MethodDescriptor;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROTOCOL: &str = "https";
pub const DEFAULT_PORT: u16 = 443;

/// Errors raised while resolving [`StubOptions`] into an [`Endpoint`].
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("No service path configured")]
    MissingServicePath,
}

/// Endpoint configuration for a stub.
///
/// Unrecognized keys end up in [`StubOptions::extra`] when deserializing:
///
/// ```
/// use fallback_core::options::StubOptions;
///
/// let options: StubOptions = serde_json::from_value(serde_json::json!({
///     "servicePath": "foo.example.com",
///     "port": 443,
///     "other_dummy_options": "test",
/// }))
/// .unwrap();
///
/// assert_eq!(options.service_path.as_deref(), Some("foo.example.com"));
/// assert_eq!(options.extra["other_dummy_options"], "test");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubOptions {
    #[serde(default, alias = "service_path", skip_serializing_if = "Option::is_none")]
    pub service_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StubOptions {
    pub fn new(service_path: impl Into<String>) -> Self {
        Self {
            service_path: Some(service_path.into()),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fills every unset value from `defaults`. Extra keys from both sides are kept, with
    /// `self` winning on conflicts.
    pub fn merged_with(&self, defaults: &StubOptions) -> StubOptions {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra.clone());

        StubOptions {
            service_path: self
                .service_path
                .clone()
                .or_else(|| defaults.service_path.clone()),
            port: self.port.or(defaults.port),
            protocol: self.protocol.clone().or_else(|| defaults.protocol.clone()),
            extra,
        }
    }
}

/// Resolved target of a stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub service_path: String,
    pub port: u16,
}

impl Endpoint {
    /// The URL of one RPC method: `{protocol}://{service_path}:{port}/$rpc/{package.Service}/{Method}`.
    pub fn method_url(&self, method: &MethodDescriptor) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol,
            self.service_path,
            self.port,
            method_path(method)
        )
    }
}

/// Path part of a method URL: `/$rpc/{package.Service}/{Method}`.
pub fn method_path(method: &MethodDescriptor) -> String {
    format!(
        "/$rpc/{}/{}",
        method.parent_service().full_name(),
        method.name()
    )
}

impl TryFrom<&StubOptions> for Endpoint {
    type Error = EndpointError;

    fn try_from(options: &StubOptions) -> Result<Self, Self::Error> {
        let service_path = options
            .service_path
            .clone()
            .filter(|path| !path.trim().is_empty())
            .ok_or(EndpointError::MissingServicePath)?;

        Ok(Self {
            protocol: options
                .protocol
                .clone()
                .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
            service_path,
            port: options.port.unwrap_or(DEFAULT_PORT),
        })
    }
}

/// Per-call metadata: extra headers and routing parameters, both kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub headers: Vec<(String, String)>,
    pub routing_params: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_routing_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.routing_params.push((key.into(), value.into()));
        self
    }
}

/// Per-call options.
///
/// Only [`OtherArgs::headers`] affects the exchange. Everything else a higher layer wants to
/// thread through (retry or pagination settings, for instance) goes into `extra` and is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    pub other_args: OtherArgs,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtherArgs {
    pub headers: Vec<(String, String)>,
}

impl CallOptions {
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.other_args.headers.push((key.into(), value.into()));
        self
    }
}
