//! # Canonical Models
//!
//! Typed requests handed to adapters and the canonical payloads every
//! adapter returns. Nothing here depends on a provider SDK.
//!
//! Reply payloads serialize absent fields as explicit `null` so the shape a
//! caller sees is the same whichever provider generation is active.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Fixed-precision amount stored in minor units (two decimal places)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    minor: i64,
}

impl Amount {
    const SCALE: f64 = 100.0;

    /// Convert a decimal amount, rounding to the nearest minor unit.
    /// Returns `None` for NaN, infinities and amounts outside the `i64`
    /// range of minor units.
    pub fn from_decimal(value: f64) -> Option<Self> {
        let minor = (value * Self::SCALE).round();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range
        if !minor.is_finite() || minor < i64::MIN as f64 || minor >= i64::MAX as f64 {
            return None;
        }
        Some(Self {
            minor: minor as i64,
        })
    }

    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    pub fn minor(&self) -> i64 {
        self.minor
    }

    pub fn as_decimal(&self) -> f64 {
        self.minor as f64 / Self::SCALE
    }

    pub fn is_negative(&self) -> bool {
        self.minor < 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Stored card used for a tokenized payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardReference {
    /// Card token issued by the current provider generation
    Token(String),
    /// Numeric card id issued by the legacy provider generation
    Id(i64),
}

/// Which flow a payment request goes through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentKind {
    /// Hosted payment page shown in the overlay
    Standard,
    /// Charge against a stored card
    Tokenized(CardReference),
    /// Platform wallet (Google Pay)
    Wallet,
}

/// A payment request built from validated command arguments
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub kind: PaymentKind,
    pub amount: Amount,
    pub description: String,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    /// Extra provider parameters; values are always strings
    pub extra_params: HashMap<String, String>,
}

impl PaymentRequest {
    pub fn new(kind: PaymentKind, amount: Amount, description: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            description: description.into(),
            order_id: None,
            user_id: None,
            extra_params: HashMap::new(),
        }
    }

    /// The stored card, for tokenized requests
    pub fn card(&self) -> Option<&CardReference> {
        match &self.kind {
            PaymentKind::Tokenized(card) => Some(card),
            _ => None,
        }
    }
}

/// A recurring charge against an existing recurring profile
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringPaymentRequest {
    pub amount: Amount,
    pub description: String,
    pub recurring_profile: String,
    pub order_id: Option<String>,
    pub extra_params: HashMap<String, String>,
}

/// Canonical payment status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    New,
    Waiting,
    Processing,
    Incomplete,
    Success,
    Error,
    /// Raw provider value that matched no known status
    Unknown(String),
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::New => f.write_str("New"),
            PaymentStatus::Waiting => f.write_str("Waiting"),
            PaymentStatus::Processing => f.write_str("Processing"),
            PaymentStatus::Incomplete => f.write_str("Incomplete"),
            PaymentStatus::Success => f.write_str("Success"),
            PaymentStatus::Error => f.write_str("Error"),
            PaymentStatus::Unknown(raw) => write!(f, "Unknown({})", raw),
        }
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical success payload for payment-producing commands
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub status: PaymentStatus,
    pub payment_id: i64,
    pub merchant_id: Option<String>,
    pub order_id: Option<String>,
    pub redirect_url: Option<String>,
}

impl PaymentResult {
    pub fn new(status: PaymentStatus, payment_id: i64) -> Self {
        Self {
            status,
            payment_id,
            merchant_id: None,
            order_id: None,
            redirect_url: None,
        }
    }
}

/// Detailed payment state returned by `getPaymentStatus`.
///
/// Union of the fields both provider generations report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub status: Option<String>,
    pub payment_id: Option<i64>,
    pub transaction_status: Option<String>,
    pub can_reject: Option<bool>,
    pub payment_method: Option<String>,
    pub amount: Option<f64>,
    pub clearing_amount: Option<f64>,
    pub revoked_amount: Option<f64>,
    pub refund_amount: Option<f64>,
    pub currency: Option<String>,
    pub order_id: Option<String>,
    pub is_captured: Option<bool>,
    pub card_pan: Option<String>,
    pub create_date: Option<String>,
}

/// Outcome of a clearing (capture) operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearingStatus {
    Success,
    Failed,
    ExceedsPaymentAmount,
    Unknown(String),
}

impl fmt::Display for ClearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearingStatus::Success => f.write_str("Success"),
            ClearingStatus::Failed => f.write_str("Failed"),
            ClearingStatus::ExceedsPaymentAmount => f.write_str("ExceedsPaymentAmount"),
            ClearingStatus::Unknown(raw) => write!(f, "Unknown({})", raw),
        }
    }
}

impl Serialize for ClearingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical payload under the `capture` reply key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearingResult {
    pub status: ClearingStatus,
    pub amount: Option<f64>,
    pub clearing_amount: Option<f64>,
}

impl ClearingResult {
    pub fn succeeded(amount: f64) -> Self {
        Self {
            status: ClearingStatus::Success,
            amount: Some(amount),
            clearing_amount: Some(amount),
        }
    }

    pub fn without_amount(status: ClearingStatus) -> Self {
        Self {
            status,
            amount: None,
            clearing_amount: None,
        }
    }
}

/// Stored-card metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub status: String,
    pub merchant_id: String,
    pub card_id: Option<i64>,
    pub card_token: Option<String>,
    pub recurring_profile: Option<String>,
    pub card_hash: String,
    pub timestamp: String,
}

/// A removed card has the same shape; generation-specific fields are nulled
pub type RemovedCardRecord = CardRecord;

/// Wallet payment created by the provider and awaiting a wallet token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletPayment {
    pub payment_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_coercion() {
        assert_eq!(Amount::from_decimal(10.5).unwrap().minor(), 1050);
        assert_eq!(Amount::from_decimal(10.0).unwrap().minor(), 1000);
        assert_eq!(Amount::from_decimal(0.1 + 0.2).unwrap().minor(), 30);
        assert!(Amount::from_decimal(f64::NAN).is_none());
        assert!(Amount::from_decimal(-1.0).unwrap().is_negative());
        assert!(Amount::from_decimal(1e300).is_none());
        assert!(Amount::from_decimal(-1e300).is_none());
        assert!(Amount::from_decimal(f64::INFINITY).is_none());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_minor(1050).to_string(), "10.50");
        assert_eq!(Amount::from_minor(7).to_string(), "0.07");
        assert_eq!(Amount::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_payment_result_keeps_absent_fields() {
        let result = PaymentResult::new(PaymentStatus::Success, 42);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["status"], "Success");
        assert_eq!(value["paymentId"], 42);
        assert!(value.get("redirectUrl").unwrap().is_null());
        assert!(value.get("merchantId").unwrap().is_null());
    }

    #[test]
    fn test_unknown_status_preserves_raw() {
        let status = PaymentStatus::Unknown("partial".into());
        assert_eq!(serde_json::to_value(&status).unwrap(), "Unknown(partial)");
    }

    #[test]
    fn test_tokenized_card_accessor() {
        let request = PaymentRequest::new(
            PaymentKind::Tokenized(CardReference::Token("tok".into())),
            Amount::from_minor(100),
            "coffee",
        );
        assert_eq!(request.card(), Some(&CardReference::Token("tok".into())));
    }
}
