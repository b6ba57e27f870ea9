use colored::*;
use fallback_core::{
    prost_reflect::{EnumDescriptor, Kind, MessageDescriptor, MethodDescriptor, ServiceDescriptor},
    options::method_path,
    registry::Descriptor,
    stub::{CallError, CreateStubError},
};
use std::fmt::Display;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<String>);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Status(envelope) => FormattedString(format!(
                "{} code={:?} message={:?}\n\n{}",
                "Call Failed:".red().bold(),
                envelope.code(),
                envelope.message,
                envelope
            )),
            other => FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), other)),
        }
    }
}

impl From<CreateStubError> for FormattedString {
    fn from(err: CreateStubError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to create stub:".red().bold(),
            err
        ))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Available Services:\n");
        for svc in services {
            out.push_str(&format!("  - {}\n", svc.green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<Descriptor> for FormattedString {
    fn from(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::ServiceDescriptor(d) => FormattedString::from(d),
            Descriptor::MessageDescriptor(d) => FormattedString::from(d),
            Descriptor::EnumDescriptor(d) => FormattedString::from(d),
        }
    }
}

impl From<ServiceDescriptor> for FormattedString {
    fn from(service: ServiceDescriptor) -> Self {
        let mut out = format!("{} {}\n", "service".cyan(), service.full_name().green());
        for method in service.methods() {
            out.push_str(&format!("\n{}", FormattedString::from(method).0));
        }
        FormattedString(out)
    }
}

/// One line for the signature, one for the path the method is posted to.
impl From<MethodDescriptor> for FormattedString {
    fn from(method: MethodDescriptor) -> Self {
        let streaming = match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => "",
            (true, false) => " [client streaming]",
            (false, true) => " [server streaming]",
            (true, true) => " [bidi streaming]",
        };

        FormattedString(format!(
            "  {}({}) -> {}{}\n    {} {}\n",
            method.name().green(),
            method.input().full_name().yellow(),
            method.output().full_name().yellow(),
            streaming.purple(),
            "POST".cyan(),
            method_path(&method)
        ))
    }
}

impl From<MessageDescriptor> for FormattedString {
    fn from(message: MessageDescriptor) -> Self {
        let mut out = format!("{} {}\n", "message".cyan(), message.full_name().green());
        for field in message.fields() {
            let type_name = match field.kind() {
                Kind::Message(m) => m.full_name().to_string(),
                Kind::Enum(e) => e.full_name().to_string(),
                scalar => format!("{scalar:?}").to_lowercase(),
            };
            let label = if field.is_map() {
                " (map)"
            } else if field.is_list() {
                " (repeated)"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {} = {}: {}{}\n",
                field.number(),
                field.json_name(),
                type_name.yellow(),
                label
            ));
        }
        FormattedString(out)
    }
}

impl From<EnumDescriptor> for FormattedString {
    fn from(enum_desc: EnumDescriptor) -> Self {
        let mut out = format!("{} {}\n", "enum".cyan(), enum_desc.full_name().green());
        for value in enum_desc.values() {
            out.push_str(&format!("  {} = {}\n", value.number(), value.name()));
        }
        FormattedString(out)
    }
}
