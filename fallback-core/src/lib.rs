//! # Fallback Core
//!
//! `fallback-core` builds callable RPC stubs from a Protobuf service descriptor and runs every
//! call as a single binary request/response exchange. It is meant for environments that can
//! speak plain HTTP but have no native gRPC stack.
//!
//! ## Key Components
//!
//! * **[`FallbackClient`](client::FallbackClient):** The main entry point. It loads descriptors
//!   and creates stubs, holding the injected transport, credential provider and cancellation
//!   factory.
//! * **[`Stub`](stub::Stub):** One [`StubMethod`](stub::StubMethod) per RPC method plus a fixed set
//!   of housekeeping members. Every method follows the same 4-argument calling convention:
//!   `(request, metadata, call_options, callback)`.
//! * **[`CallHandle`](cancel::CallHandle):** Returned by every invocation. It exposes a best-effort,
//!   single-shot `cancel()`.
//! * **[`StatusEnvelope`](status::StatusEnvelope):** The decoded `google.rpc.Status` carried by
//!   every failed exchange, independent of the calling service's own types.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fallback_core::client::FallbackClient;
//! use fallback_core::options::{CallOptions, Metadata, StubOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FallbackClient::new();
//! let bytes = std::fs::read("descriptor.bin")?;
//! let root = client.load_proto_bytes(&bytes)?;
//! let service = root.lookup_service("Echo").ok_or("service not found")?;
//!
//! let stub = client
//!     .create_stub(&service, StubOptions::new("localhost").with_port(8080))
//!     .await?;
//!
//! let response = stub
//!     .call(
//!         "echo",
//!         serde_json::json!({ "content": "hello" }),
//!         Metadata::new().with_routing_param("name", "projects/p"),
//!         CallOptions::default(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod auth;
pub mod cancel;
pub mod client;
pub mod codec;
pub mod options;
pub mod registry;
pub mod routing_header;
pub mod status;
pub mod stub;
pub mod transport;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
