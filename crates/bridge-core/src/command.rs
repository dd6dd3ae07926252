//! # Commands and Replies
//!
//! A `Command` is one named invocation from the host application.
//! A `Reply` is the single terminal answer it receives.

use crate::error::{BridgeResult, ErrorDescriptor};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Opaque argument mapping received from the transport boundary
pub type Arguments = Map<String, Value>;

/// Key under which every failure is reported
pub const ERROR_KEY: &str = "error";

/// A named command and its arguments. Immutable once built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Command {
    name: String,
    #[serde(default)]
    arguments: Arguments,
}

impl Command {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Command without arguments
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Arguments::new())
    }

    /// Build from a JSON object value; non-objects yield no arguments
    pub fn with_value(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Arguments::new(),
        };
        Self::new(name, arguments)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

/// Terminal answer to a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Reply mapping; carries either the success key or `error`
    Payload(Map<String, Value>),
    /// Command name is not part of the surface
    NotImplemented,
}

impl Reply {
    /// Successful reply. Commands without a success key reply with `{}`.
    pub fn success(key: Option<&str>, value: Value) -> Self {
        let mut payload = Map::new();
        if let Some(key) = key {
            payload.insert(key.to_string(), value);
            payload.insert(ERROR_KEY.to_string(), Value::Null);
        }
        Reply::Payload(payload)
    }

    /// Failed reply; the success key, if any, is present and `null`
    pub fn failure(key: Option<&str>, error: &ErrorDescriptor) -> Self {
        let mut payload = Map::new();
        if let Some(key) = key {
            payload.insert(key.to_string(), Value::Null);
        }
        let error = serde_json::to_value(error).unwrap_or_else(|_| {
            Value::String(error.to_string())
        });
        payload.insert(ERROR_KEY.to_string(), error);
        Reply::Payload(payload)
    }

    pub fn from_result(key: Option<&str>, result: BridgeResult<Value>) -> Self {
        match result {
            Ok(value) => Self::success(key, value),
            Err(error) => Self::failure(key, &error),
        }
    }

    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            Reply::Payload(payload) => Some(payload),
            Reply::NotImplemented => None,
        }
    }

    /// Value under `key`, if the reply carries it
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload().and_then(|p| p.get(key))
    }

    /// Parsed error descriptor, if the reply is a failure
    pub fn error(&self) -> Option<ErrorDescriptor> {
        self.get(ERROR_KEY)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Payload(_)) && self.error().is_none()
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Reply::NotImplemented)
    }

    /// Convert to a single JSON value for transport
    pub fn into_value(self) -> Value {
        match self {
            Reply::Payload(payload) => Value::Object(payload),
            Reply::NotImplemented => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_command_from_json() {
        let command: Command = serde_json::from_value(json!({
            "name": "getPaymentStatus",
            "arguments": { "paymentId": 5 }
        }))
        .unwrap();

        assert_eq!(command.name(), "getPaymentStatus");
        assert_eq!(command.arguments()["paymentId"], 5);

        let bare: Command = serde_json::from_value(json!({ "name": "initialize" })).unwrap();
        assert!(bare.arguments().is_empty());
    }

    #[test]
    fn test_keyed_replies_are_exclusive() {
        let ok = Reply::success(Some("payment"), json!({ "paymentId": 1 }));
        assert_eq!(ok.clone().into_value(), json!({ "payment": { "paymentId": 1 }, "error": null }));
        assert!(ok.is_success());

        let err = Reply::failure(Some("payment"), &ErrorDescriptor::not_initialized());
        let value = err.clone().into_value();
        assert!(value["payment"].is_null());
        assert_eq!(value["error"]["errorCode"], "NOT_INITIALIZED");
        assert_eq!(err.error().unwrap().code(), ErrorCode::NotInitialized);
    }

    #[test]
    fn test_unkeyed_replies() {
        assert_eq!(Reply::success(None, Value::Null).into_value(), json!({}));

        let err = Reply::failure(None, &ErrorDescriptor::invalid_arguments(&["url"]));
        let value = err.into_value();
        assert_eq!(value.as_object().unwrap().len(), 1);
        assert_eq!(value["error"]["errorCode"], "INVALID_ARGUMENTS");
    }
}
