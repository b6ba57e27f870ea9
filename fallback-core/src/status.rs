//! # Status Decoder
//!
//! Every failed exchange carries a binary `google.rpc.Status` in its body. This module decodes it
//! into a [`StatusEnvelope`] without consulting any loaded descriptor, so the failure path of
//! every service shares the same decoder.
//!
//! The envelope renders as the JSON text of `{code, message, details}`, which is what callers see
//! as the error message of a failed call.
use base64::Engine;
use bytes::Bytes;
use prost::Message;
use serde::{Serialize, Serializer};
use std::fmt;

/// Wire representation of `google.rpc.Status`.
mod rpc {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Status {
        #[prost(int32, tag = "1")]
        pub code: i32,
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "3")]
        pub details: ::prost::alloc::vec::Vec<::prost_types::Any>,
    }
}

/// A decoded `google.rpc.Status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEnvelope {
    pub code: i32,
    pub message: String,
    pub details: Vec<StatusDetail>,
}

/// One opaque, typed entry of [`StatusEnvelope::details`] (a `google.protobuf.Any`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDetail {
    pub type_url: String,
    #[serde(serialize_with = "serialize_base64")]
    pub value: Vec<u8>,
}

impl StatusEnvelope {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, type_url: impl Into<String>, value: Vec<u8>) -> Self {
        self.details.push(StatusDetail {
            type_url: type_url.into(),
            value,
        });
        self
    }

    /// Decodes a raw `google.rpc.Status` body.
    ///
    /// # Returns
    ///
    /// * `Ok(StatusEnvelope)` - The body is a valid status message.
    /// * `Err(DecodeError)` - The body is not a valid encoding of `google.rpc.Status`.
    pub fn decode(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let status = rpc::Status::decode(bytes)?;

        Ok(Self {
            code: status.code,
            message: status.message,
            details: status
                .details
                .into_iter()
                .map(|any| StatusDetail {
                    type_url: any.type_url,
                    value: any.value,
                })
                .collect(),
        })
    }

    /// Encodes the envelope as a binary `google.rpc.Status`.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        rpc::Status {
            code: self.code,
            message: self.message.clone(),
            details: self
                .details
                .iter()
                .map(|detail| prost_types::Any {
                    type_url: detail.type_url.clone(),
                    value: detail.value.clone(),
                })
                .collect(),
        }
        .encode_to_vec()
    }

    /// The status code as a gRPC [`tonic::Code`]. Unknown values map to `Code::Unknown`.
    pub fn code(&self) -> tonic::Code {
        tonic::Code::from_i32(self.code)
    }
}

impl fmt::Display for StatusEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<StatusEnvelope> for tonic::Status {
    fn from(envelope: StatusEnvelope) -> Self {
        let details = Bytes::from(envelope.encode_to_vec());
        tonic::Status::with_details(envelope.code(), envelope.message, details)
    }
}

fn serialize_base64<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(value))
}
