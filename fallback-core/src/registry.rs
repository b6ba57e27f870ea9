//! # Descriptor Registry
//!
//! Loads Protobuf `FileDescriptorSet`s into a [`ProtoRoot`] and resolves services, messages and
//! enums out of it. A root can be loaded from the binary encoding of the set or from its canonical
//! Protobuf JSON form (`{"file": [...]}`).
//!
//! Loading an empty descriptor (`{}` or zero bytes) is not an error: it yields a root without any
//! nested members.
use prost_reflect::{
    DescriptorError, DescriptorPool, DynamicMessage, EnumDescriptor, MessageDescriptor,
    MethodDescriptor, ReflectMessage, ServiceDescriptor,
};
use prost_types::FileDescriptorSet;

#[derive(Debug, thiserror::Error)]
pub enum LoadProtoError {
    #[error("Descriptor JSON is not a valid FileDescriptorSet: '{0}'")]
    Json(#[source] serde_json::Error),
    #[error("Failed to decode file descriptor set: '{0}'")]
    Decode(#[source] DescriptorError),
    #[error("Failed to build descriptor pool: '{0}'")]
    Descriptor(#[source] DescriptorError),
}

/// A generic wrapper for the descriptors a symbol can resolve to.
#[derive(Debug, Clone)]
pub enum Descriptor {
    MessageDescriptor(MessageDescriptor),
    ServiceDescriptor(ServiceDescriptor),
    EnumDescriptor(EnumDescriptor),
}

impl Descriptor {
    /// Returns the full_name (e.g.,`my.package.v1.MyMessage`) of the inner descriptor
    pub fn full_name(&self) -> &str {
        match self {
            Descriptor::MessageDescriptor(v) => v.full_name(),
            Descriptor::ServiceDescriptor(v) => v.full_name(),
            Descriptor::EnumDescriptor(v) => v.full_name(),
        }
    }
}

/// The root of a loaded set of descriptors.
#[derive(Debug, Clone, Default)]
pub struct ProtoRoot {
    pool: DescriptorPool,
}

impl ProtoRoot {
    /// Loads the canonical Protobuf JSON form of a `FileDescriptorSet`.
    pub fn from_json(descriptor: &serde_json::Value) -> Result<Self, LoadProtoError> {
        let set = DynamicMessage::deserialize(
            FileDescriptorSet::default().descriptor(),
            descriptor.clone(),
        )
        .map_err(LoadProtoError::Json)?
        .transcode_to::<FileDescriptorSet>()
        .map_err(|e| LoadProtoError::Json(serde::de::Error::custom(e)))?;

        Self::from_file_descriptor_set(set)
    }

    /// Loads a binary-encoded `FileDescriptorSet`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadProtoError> {
        let pool = DescriptorPool::decode(bytes).map_err(LoadProtoError::Decode)?;
        Ok(Self { pool })
    }

    pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Self, LoadProtoError> {
        let pool =
            DescriptorPool::from_file_descriptor_set(set).map_err(LoadProtoError::Descriptor)?;
        Ok(Self { pool })
    }

    pub fn descriptor_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    pub fn is_empty(&self) -> bool {
        self.pool.files().next().is_none()
    }

    /// Fully qualified names of every top-level service, message and enum, or `None` when the root
    /// holds nothing.
    pub fn nested(&self) -> Option<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for file in self.pool.files() {
            names.extend(file.services().map(|s| s.full_name().to_string()));
            names.extend(file.messages().map(|m| m.full_name().to_string()));
            names.extend(file.enums().map(|e| e.full_name().to_string()));
        }

        if names.is_empty() { None } else { Some(names) }
    }

    /// Lists all services, as fully qualified names (e.g. `helloworld.Greeter`).
    pub fn services(&self) -> Vec<String> {
        self.pool
            .services()
            .map(|s| s.full_name().to_string())
            .collect()
    }

    /// Resolves a service by its fully qualified name, or by its short name when that is unique.
    pub fn lookup_service(&self, name: &str) -> Option<ServiceDescriptor> {
        let name = name.trim_start_matches('.');
        if let Some(service) = self.pool.get_service_by_name(name) {
            return Some(service);
        }
        unique(self.pool.services().filter(|s| s.name() == name))
    }

    /// Resolves a message type by its fully qualified name, or by its short name when that is
    /// unique.
    pub fn lookup_type(&self, name: &str) -> Option<MessageDescriptor> {
        let name = name.trim_start_matches('.');
        if let Some(message) = self.pool.get_message_by_name(name) {
            return Some(message);
        }
        unique(self.pool.all_messages().filter(|m| m.name() == name))
    }

    pub fn lookup_method(&self, service: &str, method: &str) -> Option<MethodDescriptor> {
        self.lookup_service(service)?
            .methods()
            .find(|m| m.name() == method)
    }

    /// Looks up a service, message or enum by its fully qualified name.
    pub fn lookup_symbol(&self, symbol: &str) -> Option<Descriptor> {
        if let Some(descriptor) = self.lookup_service(symbol) {
            return Some(Descriptor::ServiceDescriptor(descriptor));
        }
        if let Some(descriptor) = self.lookup_type(symbol) {
            return Some(Descriptor::MessageDescriptor(descriptor));
        }
        if let Some(descriptor) = self.pool.get_enum_by_name(symbol.trim_start_matches('.')) {
            return Some(Descriptor::EnumDescriptor(descriptor));
        }
        None
    }
}

fn unique<T>(mut candidates: impl Iterator<Item = T>) -> Option<T> {
    let first = candidates.next()?;
    match candidates.next() {
        Some(_) => None,
        None => Some(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use prost_types::{DescriptorProto, FileDescriptorProto};

    fn file(package: &str, message: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(format!("{package}.proto")),
            package: Some(package.to_string()),
            syntax: Some("proto3".to_string()),
            message_type: vec![DescriptorProto {
                name: Some(message.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn empty_json_yields_an_empty_root() {
        let root = ProtoRoot::from_json(&serde_json::json!({})).unwrap();

        assert!(root.is_empty());
        assert_eq!(root.nested(), None);
    }

    #[test]
    fn empty_bytes_yield_an_empty_root() {
        let root = ProtoRoot::from_bytes(&[]).unwrap();

        assert!(root.is_empty());
        assert_eq!(root.nested(), None);
    }

    #[test]
    fn ambiguous_short_names_do_not_resolve() {
        let set = FileDescriptorSet {
            file: vec![file("a", "Thing"), file("b", "Thing")],
        };
        let root = ProtoRoot::from_bytes(&set.encode_to_vec()).unwrap();

        assert!(root.lookup_type("Thing").is_none());
        assert_eq!(root.lookup_type("a.Thing").unwrap().full_name(), "a.Thing");
        assert_eq!(root.lookup_type(".b.Thing").unwrap().full_name(), "b.Thing");
    }

    #[test]
    fn rejects_json_that_is_not_a_descriptor_set() {
        let err = ProtoRoot::from_json(&serde_json::json!({ "nope": [] })).unwrap_err();

        assert!(matches!(err, LoadProtoError::Json(_)));
    }
}
