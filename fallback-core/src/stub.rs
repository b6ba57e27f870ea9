//! # Stubs
//!
//! A [`Stub`] is built from a `ServiceDescriptor` at runtime: one [`StubMethod`] is bound per RPC
//! method, all sharing the same generic invoker parameterized by the method's descriptor. There is
//! no generated code per service.
//!
//! Besides its methods, a stub carries four housekeeping members (see [`HOUSEKEEPING_MEMBERS`]):
//! the credential provider, the resolved endpoint, the transport and the cancellation factory.
//!
//! ## Calling convention
//!
//! Every method takes the same 4 arguments, whether or not the RPC makes use of them:
//!
//! ```rust,no_run
//! # use fallback_core::stub::Stub;
//! # use fallback_core::options::{CallOptions, Metadata};
//! # fn run(stub: &Stub) -> Result<(), Box<dyn std::error::Error>> {
//! let echo = stub.method("echo").ok_or("no such method")?;
//!
//! let handle = echo.invoke(
//!     serde_json::json!({ "content": "hi" }),
//!     Metadata::new(),
//!     CallOptions::default(),
//!     |result| match result {
//!         Ok(response) => println!("{response}"),
//!         Err(err) => eprintln!("{err}"),
//!     },
//! )?;
//!
//! handle.cancel();
//! # Ok(())
//! # }
//! ```
//!
//! Only unary semantics are provided. Streaming methods are bound too, but each call is still a
//! single request/response exchange.
mod invoker;

pub use invoker::{CallError, InvokeError, StubMethod};

use crate::{
    auth::{CredentialError, CredentialProvider, NoCredentials},
    cancel::{AbortControllerFactory, CancellationFactory},
    options::{Endpoint, EndpointError, StubOptions},
    transport::{HyperTransport, Transport},
};
use prost_reflect::ServiceDescriptor;
use std::fmt;
use std::sync::Arc;

/// Members every stub exposes besides its methods.
pub const HOUSEKEEPING_MEMBERS: [&str; 4] = ["auth", "endpoint", "transport", "cancellation"];

#[derive(Debug, thiserror::Error)]
pub enum CreateStubError {
    #[error("Invalid stub options: '{0}'")]
    Endpoint(#[from] EndpointError),
    #[error("Failed to prepare credentials: '{0}'")]
    Credentials(#[from] CredentialError),
    #[error("Service '{service}' declares method '{method}' more than once")]
    DuplicateMethod { service: String, method: String },
}

/// The injected capabilities a stub works with.
#[derive(Clone)]
pub struct Capabilities {
    pub transport: Arc<dyn Transport>,
    pub auth: Arc<dyn CredentialProvider>,
    pub cancellation: Arc<dyn CancellationFactory>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            transport: Arc::new(HyperTransport::new()),
            auth: Arc::new(NoCredentials),
            cancellation: Arc::new(AbortControllerFactory),
        }
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

/// Client-side object exposing one callable per RPC method of a service.
pub struct Stub {
    service: ServiceDescriptor,
    endpoint: Endpoint,
    capabilities: Capabilities,
    methods: Vec<(String, StubMethod)>,
}

/// Builds a [`Stub`] for `service`.
///
/// `options` are expected to be merged with any client defaults already; unset values fall back to
/// `https` and port `443`. The credential provider is prepared before any method is bound.
pub async fn create_stub(
    service: &ServiceDescriptor,
    options: &StubOptions,
    capabilities: Capabilities,
) -> Result<Stub, CreateStubError> {
    let endpoint = Endpoint::try_from(options)?;

    capabilities.auth.prepare().await?;

    let mut methods: Vec<(String, StubMethod)> = Vec::new();
    for method in service.methods() {
        let name = member_name(method.name());
        if methods.iter().any(|(existing, _)| *existing == name) {
            return Err(CreateStubError::DuplicateMethod {
                service: service.full_name().to_string(),
                method: method.name().to_string(),
            });
        }

        let bound = StubMethod::new(method, &endpoint, capabilities.clone());
        methods.push((name, bound));
    }

    tracing::debug!(
        service = service.full_name(),
        endpoint = ?endpoint,
        methods = methods.len(),
        "created stub"
    );

    Ok(Stub {
        service: service.clone(),
        endpoint,
        capabilities,
        methods,
    })
}

impl Stub {
    /// Looks up a method by member name (`pagedExpand`) or by RPC name (`PagedExpand`).
    pub fn method(&self, name: &str) -> Option<&StubMethod> {
        self.methods
            .iter()
            .find(|(member, _)| member == name)
            .or_else(|| {
                self.methods
                    .iter()
                    .find(|(_, method)| method.descriptor().name() == name)
            })
            .map(|(_, method)| method)
    }

    /// Bound methods, in declaration order, keyed by member name.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &StubMethod)> {
        self.methods
            .iter()
            .map(|(name, method)| (name.as_str(), method))
    }

    /// Every member of the stub: its methods followed by [`HOUSEKEEPING_MEMBERS`].
    pub fn members(&self) -> Vec<&str> {
        self.methods
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(HOUSEKEEPING_MEMBERS)
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.methods.len() + HOUSEKEEPING_MEMBERS.len()
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn auth(&self) -> &Arc<dyn CredentialProvider> {
        &self.capabilities.auth
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.capabilities.transport
    }

    pub fn cancellation(&self) -> &Arc<dyn CancellationFactory> {
        &self.capabilities.cancellation
    }

    /// Calls the method `name` and waits for its result.
    pub async fn call(
        &self,
        name: &str,
        request: serde_json::Value,
        metadata: crate::options::Metadata,
        options: crate::options::CallOptions,
    ) -> Result<serde_json::Value, CallError> {
        let method = self
            .method(name)
            .ok_or_else(|| CallError::MethodNotFound(name.to_string()))?;

        method.call(request, metadata, options).await
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("service", &self.service.full_name())
            .field("endpoint", &self.endpoint)
            .field("members", &self.members())
            .finish()
    }
}

/// `PagedExpand` -> `pagedExpand`.
fn member_name(rpc_name: &str) -> String {
    let mut chars = rpc_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
