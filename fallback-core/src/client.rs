//! # Fallback Client
//!
//! [`FallbackClient`] is the entry point of the crate. It owns the capabilities every stub it
//! creates will use (transport, credential provider and cancellation factory), plus a set of
//! default [`StubOptions`] that per-stub options are merged over.
//!
//! ```rust,no_run
//! use fallback_core::auth::StaticHeaders;
//! use fallback_core::client::FallbackClient;
//! use fallback_core::options::StubOptions;
//!
//! # async fn run(descriptor: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let client = FallbackClient::new()
//!     .with_credentials(StaticHeaders::bearer("SOME_TOKEN"))
//!     .with_options(StubOptions::default().with_protocol("http"));
//!
//! let root = client.load_proto(&descriptor)?;
//! let service = root.lookup_service("google.showcase.v1beta1.Echo").ok_or("missing")?;
//! let stub = client
//!     .create_stub(&service, StubOptions::new("localhost").with_port(7469))
//!     .await?;
//! # Ok(())
//! # }
//! ```
use crate::{
    auth::CredentialProvider,
    cancel::CancellationFactory,
    options::StubOptions,
    registry::{LoadProtoError, ProtoRoot},
    stub::{self, Capabilities, CreateStubError, Stub},
    transport::Transport,
};
use prost_reflect::ServiceDescriptor;
use std::sync::Arc;

/// Loads descriptors and creates stubs that share one set of capabilities.
#[derive(Debug, Clone, Default)]
pub struct FallbackClient {
    options: StubOptions,
    capabilities: Capabilities,
}

impl FallbackClient {
    /// A client using the `hyper` transport, no credentials and plain abort controllers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.capabilities.transport = Arc::new(transport);
        self
    }

    pub fn with_credentials(mut self, auth: impl CredentialProvider) -> Self {
        self.capabilities.auth = Arc::new(auth);
        self
    }

    pub fn with_cancellation_factory(mut self, factory: impl CancellationFactory) -> Self {
        self.capabilities.cancellation = Arc::new(factory);
        self
    }

    /// Default options, used for every value a stub's own options leave unset.
    pub fn with_options(mut self, options: StubOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StubOptions {
        &self.options
    }

    /// Loads the canonical JSON form of a `FileDescriptorSet`.
    pub fn load_proto(&self, descriptor: &serde_json::Value) -> Result<ProtoRoot, LoadProtoError> {
        ProtoRoot::from_json(descriptor)
    }

    /// Loads a binary-encoded `FileDescriptorSet`.
    pub fn load_proto_bytes(&self, bytes: &[u8]) -> Result<ProtoRoot, LoadProtoError> {
        ProtoRoot::from_bytes(bytes)
    }

    /// Creates a stub for `service`, with `options` taking precedence over the client defaults.
    pub async fn create_stub(
        &self,
        service: &ServiceDescriptor,
        options: StubOptions,
    ) -> Result<Stub, CreateStubError> {
        let options = options.merged_with(&self.options);
        stub::create_stub(service, &options, self.capabilities.clone()).await
    }
}
