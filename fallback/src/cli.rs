//! # CLI
//!
//! This module defines the command-line interface of `fallback` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are
//! `key:value` and routing parameters are `key=value`).
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "fallback",
    version,
    about = "Call Protobuf services over plain HTTP"
)]
pub struct Cli {
    /// Path to the descriptor set (`.json` for the canonical JSON form, binary otherwise)
    #[arg(short, long)]
    pub descriptor: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Perform a call against a service
    ///
    /// The request is encoded with the method's input type and posted to
    /// `{protocol}://{service_path}:{port}/$rpc/{package.Service}/{Method}`.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// fallback -d echo.json call localhost google.showcase.v1beta1.Echo/Echo --body '{"content": "hi"}'
    /// ```
    Call {
        /// Host serving the API (e.g. foo.example.com)
        service_path: String,

        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// JSON body of the request
        #[arg(long, value_parser = parse_body)]
        body: serde_json::Value,

        #[arg(long)]
        port: Option<u16>,

        /// `http` or `https`
        #[arg(long)]
        protocol: Option<String>,

        /// Bearer token sent as the authorization header
        #[arg(long, env = "FALLBACK_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Routing parameter, serialized into the routing header
        #[arg(short = 'R', long = "routing", value_parser = parse_routing_param)]
        routing: Vec<(String, String)>,
    },

    /// List available services or other resources
    List {
        #[command(subcommand)]
        sub: ListCommands,
    },

    /// Describe a service, a method or a message in detail
    Describe {
        #[command(subcommand)]
        sub: DescribeCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
    /// List all services declared in the descriptor
    Services,
}

#[derive(Subcommand, Debug)]
pub enum DescribeCommands {
    /// Describe a specific service (list its methods)
    Service {
        /// Service name (e.g. my.package.Service, or Service when unique)
        service: String,
    },
    /// Describe a specific method (Show method definition)
    Method {
        /// Method name (e.g. my.package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        method: (String, String),
    },
    /// Describe a specific message or enum
    Message {
        /// Message name (e.g. my.package.Message)
        message: String,
    },
}

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'",)
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_routing_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err("Format must be 'key=value'".to_string()),
    }
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}
