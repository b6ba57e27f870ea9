//! # JSON <-> Protobuf Codec
//!
//! Stubs take requests and hand back responses as `serde_json::Value`. This module transcodes
//! them to and from the Protobuf binary format using the method's descriptors, so no generated
//! Rust structs are needed.
//!
//! ## How it works
//!
//! 1. **Encode (JSON -> Proto)**:
//!    - Takes a `serde_json::Value`.
//!    - Uses `prost_reflect::DynamicMessage` to coerce the JSON into the request `MessageDescriptor`.
//!    - Serializes the message into the request body.
//!
//! 2. **Decode (Proto -> JSON)**:
//!    - Decodes the raw response body into a `DynamicMessage` of the response `MessageDescriptor`.
//!    - Converts the message back into a `serde_json::Value`.
use bytes::Bytes;
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("JSON structure does not match Protobuf schema '{message}': '{source}'")]
    SchemaMismatch {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to decode Protobuf bytes as '{message}': '{source}'")]
    Protobuf {
        message: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("Failed to map '{message}' to JSON: '{source}'")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Bridges `serde_json::Value` and the Protobuf binary format for one RPC method.
///
/// It holds the descriptors (schemas) for both the request and the response messages.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    /// Schema for the input message.
    req_desc: MessageDescriptor,
    /// Schema for the output message.
    res_desc: MessageDescriptor,
}

impl JsonCodec {
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }

    pub fn request_descriptor(&self) -> &MessageDescriptor {
        &self.req_desc
    }

    pub fn response_descriptor(&self) -> &MessageDescriptor {
        &self.res_desc
    }

    /// Coerces `value` into the request type and serializes it.
    pub fn encode(&self, value: &serde_json::Value) -> Result<Bytes, EncodeError> {
        // serde_json::Value implements Deserializer, so it can feed DynamicMessage directly.
        let msg = DynamicMessage::deserialize(self.req_desc.clone(), value.clone()).map_err(
            |source| EncodeError::SchemaMismatch {
                message: self.req_desc.full_name().to_string(),
                source,
            },
        )?;

        Ok(Bytes::from(msg.encode_to_vec()))
    }

    /// Decodes a response body into JSON.
    pub fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, DecodeError> {
        let msg = DynamicMessage::decode(self.res_desc.clone(), bytes).map_err(|source| {
            DecodeError::Protobuf {
                message: self.res_desc.full_name().to_string(),
                source,
            }
        })?;

        serde_json::to_value(&msg).map_err(|source| DecodeError::Json {
            message: self.res_desc.full_name().to_string(),
            source,
        })
    }
}
