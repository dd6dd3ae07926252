//! # Error Taxonomy
//!
//! Canonical, caller-facing error handling for the bridge.
//! Every failure that crosses the command boundary is an `ErrorDescriptor`
//! carrying one code from the fixed `ErrorCode` taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fixed set of error codes exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or wrong-typed command argument
    InvalidArguments,
    /// No provider has been initialized yet
    NotInitialized,
    /// The host has no surface to present a payment view on
    NoHostSurface,
    /// The active provider lacks the requested capability
    Unsupported,
    /// Provider rejected the request contents
    ValidationError,
    /// Provider response could not be parsed
    ParsingError,
    /// Provider SDK used before configuration
    SdkNotConfigured,
    /// Provider SDK was cleared before the operation completed
    SdkCleared,
    /// Payment view was not attached to the provider SDK
    WebviewNotInitialized,
    /// Payment page failed to load or complete
    WebviewFailed,
    /// Connection could not be established
    ConnectionFailed,
    /// Connection timed out
    ConnectionTimeout,
    /// TLS or payload integrity failure
    NetworkIntegrity,
    /// Provider answered with a protocol-level error
    ProtocolError,
    /// Network failure of unknown kind
    NetworkUnknown,
    /// Provider could not initialize the payment
    PaymentInitFailed,
    /// Provider declined or failed the transaction
    TransactionError,
    /// Unexpected fault caught at the adapter boundary
    InfrastructureError,
    /// Anything not matching a known category
    Unknown,
}

/// Taxonomy tier of an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    /// Caught before any adapter call; fixable by the caller
    Input,
    /// Fixed per active provider, never transient
    Capability,
    /// Reported by the provider
    Provider,
    /// Did not match any known category
    Unanticipated,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::NoHostSurface => "NO_HOST_SURFACE",
            ErrorCode::Unsupported => "UNSUPPORTED",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ParsingError => "PARSING_ERROR",
            ErrorCode::SdkNotConfigured => "SDK_NOT_CONFIGURED",
            ErrorCode::SdkCleared => "SDK_CLEARED",
            ErrorCode::WebviewNotInitialized => "WEBVIEW_NOT_INITIALIZED",
            ErrorCode::WebviewFailed => "WEBVIEW_FAILED",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorCode::NetworkIntegrity => "NETWORK_INTEGRITY",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::NetworkUnknown => "NETWORK_UNKNOWN",
            ErrorCode::PaymentInitFailed => "PAYMENT_INIT_FAILED",
            ErrorCode::TransactionError => "TRANSACTION_ERROR",
            ErrorCode::InfrastructureError => "INFRASTRUCTURE_ERROR",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Returns the taxonomy tier this code belongs to
    pub fn tier(&self) -> ErrorTier {
        match self {
            ErrorCode::InvalidArguments | ErrorCode::NotInitialized | ErrorCode::NoHostSurface => {
                ErrorTier::Input
            }
            ErrorCode::Unsupported => ErrorTier::Capability,
            ErrorCode::Unknown => ErrorTier::Unanticipated,
            _ => ErrorTier::Provider,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical failure payload delivered under the `error` reply key.
///
/// `details` is always serialized, as `null` when absent, so the reply
/// shape does not depend on which provider produced the error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error_code}: {description}")]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub error_code: ErrorCode,
    pub description: String,
    pub details: Option<String>,
}

impl ErrorDescriptor {
    pub fn new(error_code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            error_code,
            description: description.into(),
            details: None,
        }
    }

    /// Builder: attach raw diagnostic details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Required arguments missing or wrong-typed; `fields` are listed in the description
    pub fn invalid_arguments<S: AsRef<str>>(fields: &[S]) -> Self {
        let list = fields
            .iter()
            .map(|f| f.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            ErrorCode::InvalidArguments,
            format!("invalid or missing arguments: {}", list),
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "payment provider is not initialized",
        )
    }

    pub fn no_host_surface() -> Self {
        Self::new(
            ErrorCode::NoHostSurface,
            "bridge is not attached to a host surface",
        )
    }

    /// `command` is reported as invoked by the caller
    pub fn unsupported(command: &str) -> Self {
        Self::new(
            ErrorCode::Unsupported,
            format!("{} is not supported by the active provider", command),
        )
    }

    pub fn infrastructure(details: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InfrastructureError,
            "unexpected provider fault",
        )
        .with_details(details)
    }

    /// Fallback for native errors the normalizers do not recognise
    pub fn unknown(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self::new(ErrorCode::Unknown, raw.clone()).with_details(raw)
    }

    pub fn code(&self) -> ErrorCode {
        self.error_code
    }
}

/// Result type alias for adapter and validator operations
pub type BridgeResult<T> = Result<T, ErrorDescriptor>;
