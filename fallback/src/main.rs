//! # Fallback CLI Entry Point
//!
//! The main executable for the `fallback` tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Installs the log subscriber and parses command-line arguments using
//!    [`cli::Cli`].
//! 2. **Schema**: Loads the descriptor set the user points at.
//! 3. **Execution**: Creates a stub through `FallbackClient` and performs the call, or answers an
//!    introspection command straight from the descriptor.
//! 4. **Presentation**: Formats and prints the resulting data to standard output, or the error to
//!    standard error with exit code 1.

mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, DescribeCommands, ListCommands};
use fallback_core::{
    auth::StaticHeaders,
    client::FallbackClient,
    options::{CallOptions, Metadata, StubOptions},
    registry::ProtoRoot,
};
use formatter::{FormattedString, GenericError, ServiceList};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Everything `call` needs besides the descriptor.
struct CallRequest {
    service_path: String,
    service: String,
    method: String,
    body: serde_json::Value,
    port: Option<u16>,
    protocol: Option<String>,
    token: Option<String>,
    headers: Vec<(String, String)>,
    routing: Vec<(String, String)>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Cli::parse();

    let root = match load_root(&args.descriptor) {
        Ok(root) => root,
        Err(err) => {
            let err = GenericError("Failed to load descriptor", format!("{err:#}"));
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Call {
            service_path,
            endpoint: (service, method),
            body,
            port,
            protocol,
            token,
            headers,
            routing,
        } => {
            let request = CallRequest {
                service_path,
                service,
                method,
                body,
                port,
                protocol,
                token,
                headers,
                routing,
            };
            run_call(&root, request).await
        }
        Commands::List { sub } => match sub {
            ListCommands::Services => Ok(FormattedString::from(ServiceList(root.services()))),
        },
        Commands::Describe { sub } => match sub {
            DescribeCommands::Service { service } => describe_service(&root, &service),
            DescribeCommands::Method {
                method: (service, method),
            } => describe_method(&root, &service, &method),
            DescribeCommands::Message { message } => describe_message(&root, &message),
        },
    };

    match result {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout only ever carries results.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_root(path: &Path) -> anyhow::Result<ProtoRoot> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    parse_descriptor(path, &bytes)
}

/// `.json` files hold the canonical JSON form of the set, anything else its binary encoding.
fn parse_descriptor(path: &Path, bytes: &[u8]) -> anyhow::Result<ProtoRoot> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).context("Descriptor file is not valid JSON")?;
        Ok(ProtoRoot::from_json(&value)?)
    } else {
        Ok(ProtoRoot::from_bytes(bytes)?)
    }
}

async fn run_call(root: &ProtoRoot, request: CallRequest) -> Result<FormattedString, FormattedString> {
    let service = root
        .lookup_service(&request.service)
        .ok_or_else(|| GenericError("Service not found", request.service.clone()))?;

    let mut client = FallbackClient::new();
    if let Some(token) = &request.token {
        client = client.with_credentials(StaticHeaders::bearer(token));
    }

    let mut options = StubOptions::new(request.service_path);
    if let Some(port) = request.port {
        options = options.with_port(port);
    }
    if let Some(protocol) = request.protocol {
        options = options.with_protocol(protocol);
    }

    let stub = client.create_stub(&service, options).await?;
    let method = stub
        .method(&request.method)
        .ok_or_else(|| GenericError("Method not found", request.method.clone()))?;

    let metadata = request
        .headers
        .into_iter()
        .fold(Metadata::new(), |m, (k, v)| m.with_header(k, v));
    let metadata = request
        .routing
        .into_iter()
        .fold(metadata, |m, (k, v)| m.with_routing_param(k, v));

    tracing::debug!(url = method.url(), "calling method");

    let response = method
        .call(request.body, metadata, CallOptions::default())
        .await?;

    Ok(FormattedString::from(response))
}

fn describe_service(root: &ProtoRoot, name: &str) -> Result<FormattedString, FormattedString> {
    root.lookup_service(name)
        .map(FormattedString::from)
        .ok_or_else(|| GenericError("Service not found", name.to_string()).into())
}

fn describe_method(
    root: &ProtoRoot,
    service: &str,
    method: &str,
) -> Result<FormattedString, FormattedString> {
    root.lookup_method(service, method)
        .map(FormattedString::from)
        .ok_or_else(|| GenericError("Method not found", format!("{service}/{method}")).into())
}

fn describe_message(root: &ProtoRoot, name: &str) -> Result<FormattedString, FormattedString> {
    root.lookup_symbol(name)
        .map(FormattedString::from)
        .ok_or_else(|| GenericError("Symbol not found", name.to_string()).into())
}
