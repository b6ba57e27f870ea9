//! # Echo Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide the descriptor of the showcase
//! `google.showcase.v1beta1.Echo` service for testing `fallback_core` and the `fallback` CLI.
//! It is not intended for production use.
//!
//! The descriptor is assembled in code, so no `protoc` is needed to build the workspace. It is
//! available as a `FileDescriptorSet`, in its binary encoding, and in its canonical JSON form.
use prost::Message;
use prost_reflect::ReflectMessage;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const PACKAGE: &str = "google.showcase.v1beta1";
pub const SERVICE: &str = "google.showcase.v1beta1.Echo";

/// Message types matching the descriptor, for building and inspecting wire payloads in tests.
pub mod pb {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct EchoRequest {
        #[prost(string, tag = "1")]
        pub content: ::prost::alloc::string::String,
        #[prost(enumeration = "Severity", tag = "2")]
        pub severity: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct EchoResponse {
        #[prost(string, tag = "1")]
        pub content: ::prost::alloc::string::String,
        #[prost(enumeration = "Severity", tag = "2")]
        pub severity: i32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Severity {
        Unnecessary = 0,
        Necessary = 1,
        Urgent = 2,
        Critical = 3,
    }
}

/// The `echo.proto` file descriptor wrapped in a set.
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![echo_file()],
    }
}

/// Binary encoding of [`file_descriptor_set`].
pub fn file_descriptor_set_bytes() -> Vec<u8> {
    file_descriptor_set().encode_to_vec()
}

/// Canonical Protobuf JSON form of [`file_descriptor_set`] (`{"file": [...]}`).
pub fn descriptor_json() -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(file_descriptor_set().transcode_to_dynamic())
}

fn echo_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("google/showcase/v1beta1/echo.proto".to_string()),
        package: Some(PACKAGE.to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "EchoRequest",
                vec![
                    scalar("content", 1, Type::String),
                    enumeration("severity", 2, "Severity"),
                ],
            ),
            message(
                "EchoResponse",
                vec![
                    scalar("content", 1, Type::String),
                    enumeration("severity", 2, "Severity"),
                ],
            ),
            message("ExpandRequest", vec![scalar("content", 1, Type::String)]),
            message(
                "PagedExpandRequest",
                vec![
                    scalar("content", 1, Type::String),
                    scalar("page_size", 2, Type::Int32),
                    scalar("page_token", 3, Type::String),
                ],
            ),
            message(
                "PagedExpandResponse",
                vec![
                    FieldDescriptorProto {
                        label: Some(Label::Repeated as i32),
                        ..nested("responses", 1, "EchoResponse")
                    },
                    scalar("next_page_token", 2, Type::String),
                ],
            ),
            message(
                "WaitRequest",
                vec![
                    scalar("content", 1, Type::String),
                    scalar("delay_millis", 2, Type::Int64),
                ],
            ),
            message("WaitResponse", vec![scalar("content", 1, Type::String)]),
        ],
        enum_type: vec![EnumDescriptorProto {
            name: Some("Severity".to_string()),
            value: ["UNNECESSARY", "NECESSARY", "URGENT", "CRITICAL"]
                .iter()
                .zip(0..)
                .map(|(name, number)| EnumValueDescriptorProto {
                    name: Some(name.to_string()),
                    number: Some(number),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }],
        service: vec![ServiceDescriptorProto {
            name: Some("Echo".to_string()),
            method: vec![
                method("Echo", "EchoRequest", "EchoResponse", false, false),
                method("Expand", "ExpandRequest", "EchoResponse", false, true),
                method("Collect", "EchoRequest", "EchoResponse", true, false),
                method("Chat", "EchoRequest", "EchoResponse", true, true),
                method(
                    "PagedExpand",
                    "PagedExpandRequest",
                    "PagedExpandResponse",
                    false,
                    false,
                ),
                method("Wait", "WaitRequest", "WaitResponse", false, false),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn scalar(name: &str, number: i32, kind: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(kind as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn enumeration(name: &str, number: i32, enum_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".{PACKAGE}.{enum_name}")),
        ..scalar(name, number, Type::Enum)
    }
}

fn nested(name: &str, number: i32, message_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".{PACKAGE}.{message_name}")),
        ..scalar(name, number, Type::Message)
    }
}

fn method(
    name: &str,
    input: &str,
    output: &str,
    client_streaming: bool,
    server_streaming: bool,
) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".{PACKAGE}.{input}")),
        output_type: Some(format!(".{PACKAGE}.{output}")),
        client_streaming: Some(client_streaming),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

/// `page_token` -> `pageToken`.
fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
