//! # Current Generation
//!
//! Adapter over the merchant SDK that answers with a typed
//! `Result<T, FreedomError>`. The native types below mirror that SDK; the
//! `normalize_*` functions are the only place they are converted into the
//! canonical model.

use async_trait::async_trait;
use bridge_core::{
    Amount, BridgeResult, Capability, CapabilitySet, CardRecord, CardReference, ClearingResult,
    ClearingStatus, ErrorCode, ErrorDescriptor, PaymentRequest, PaymentResult, PaymentStatus,
    ProviderAdapter, ProviderConfiguration, RemovedCardRecord, StatusRecord, SurfaceToken,
    WalletPayment,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::factory::Platform;

// =============================================================================
// Native SDK types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StandardPaymentRequest {
    pub amount: f64,
    pub description: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub extra_params: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedPaymentRequest {
    pub amount: f64,
    pub description: String,
    pub card_token: String,
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub extra_params: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    New,
    Waiting,
    Processing,
    Incomplete,
    Success,
    Error(String),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResponse {
    pub status: ResponseStatus,
    pub payment_id: i64,
    pub merchant_id: String,
    pub order_id: Option<String>,
}

/// Detailed payment state as reported by the SDK
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub status: Option<String>,
    pub payment_id: Option<i64>,
    pub payment_status: Option<String>,
    pub can_reject: Option<bool>,
    pub payment_method: Option<String>,
    pub amount: Option<f64>,
    pub clearing_amount: Option<f64>,
    pub revoked_amount: Option<f64>,
    pub refund_amount: Option<f64>,
    pub currency: Option<String>,
    pub order_id: Option<String>,
    pub captured: Option<bool>,
    pub card_pan: Option<String>,
    pub create_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NativeClearingStatus {
    Success { amount: f64 },
    Failed,
    ExceedsPaymentAmount,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub status: String,
    pub merchant_id: String,
    pub recurring_profile_id: Option<String>,
    pub card_hash: String,
    pub created_at: String,
    pub card_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedCard {
    pub status: String,
    pub merchant_id: String,
    pub card_hash: String,
    pub deleted_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GooglePayment {
    pub payment_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkUserConfiguration {
    pub user_phone: Option<String>,
    pub user_contact_email: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkOperationalConfiguration {
    pub check_url: Option<String>,
    pub result_url: Option<String>,
    pub testing_mode: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdkConfiguration {
    pub user: SdkUserConfiguration,
    pub operational: SdkOperationalConfiguration,
}

impl From<&ProviderConfiguration> for SdkConfiguration {
    fn from(configuration: &ProviderConfiguration) -> Self {
        Self {
            user: SdkUserConfiguration {
                user_phone: configuration.user.phone.clone(),
                user_contact_email: configuration.user.contact_email.clone(),
                user_email: configuration.user.email.clone(),
            },
            operational: SdkOperationalConfiguration {
                check_url: configuration.operational.check_url.clone(),
                result_url: configuration.operational.result_url.clone(),
                testing_mode: None,
            },
        }
    }
}

// =============================================================================
// Native errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorType {
    InvalidAmount,
    InvalidDescription,
    InvalidOrderId,
    InvalidUserId,
    InvalidCardToken,
    InvalidPaymentId,
    InvalidToken,
    Empty,
}

impl ValidationErrorType {
    /// Native constant name
    pub fn name(&self) -> &'static str {
        match self {
            ValidationErrorType::InvalidAmount => "INVALID_AMOUNT",
            ValidationErrorType::InvalidDescription => "INVALID_DESCRIPTION",
            ValidationErrorType::InvalidOrderId => "INVALID_ORDER_ID",
            ValidationErrorType::InvalidUserId => "INVALID_USER_ID",
            ValidationErrorType::InvalidCardToken => "INVALID_CARD_TOKEN",
            ValidationErrorType::InvalidPaymentId => "INVALID_PAYMENT_ID",
            ValidationErrorType::InvalidToken => "INVALID_TOKEN",
            ValidationErrorType::Empty => "EMPTY",
        }
    }

    /// `INVALID_ORDER_ID` becomes `InvalidOrderId`; names without an
    /// underscore are kept as they are
    pub fn readable(&self) -> String {
        let name = self.name();
        if !name.contains('_') {
            return name.to_string();
        }
        name.split('_')
            .map(|part| {
                let lower = part.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfrastructureError {
    #[error("parsing error")]
    Parsing,
    #[error("sdk not configured")]
    SdkNotConfigured,
    #[error("sdk cleared")]
    SdkCleared,
    #[error("payment view is not initialized")]
    PaymentViewNotInitialized,
    #[error("web view failed")]
    WebViewFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("connection failed")]
    ConnectionFailed,
    #[error("connection timeout")]
    ConnectionTimeout,
    #[error("integrity")]
    Integrity,
    #[error("protocol")]
    Protocol,
    #[error("unknown")]
    Unknown,
}

/// Error half of the SDK's result type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FreedomError {
    #[error("validation error: {0:?}")]
    Validation(Vec<ValidationErrorType>),

    #[error("infrastructure error: {0}")]
    Infrastructure(InfrastructureError),

    #[error("network error: {0}")]
    Network(NetworkError),

    #[error("payment initialization failed")]
    PaymentInitializationFailed,

    #[error("transaction error {code}: {}", .description.as_deref().unwrap_or("no description"))]
    Transaction {
        code: i32,
        description: Option<String>,
    },

    /// Variant this bridge does not know about
    #[error("{0}")]
    Other(String),
}

/// Typed merchant SDK
#[async_trait]
pub trait FreedomSdk: Send + Sync {
    fn set_configuration(&self, configuration: SdkConfiguration);

    /// Attach the host view the next hosted page renders into
    fn set_payment_view(&self, view: SurfaceToken);

    async fn create_payment_page(
        &self,
        request: StandardPaymentRequest,
    ) -> Result<PaymentResponse, FreedomError>;

    async fn create_card_payment(
        &self,
        request: TokenizedPaymentRequest,
    ) -> Result<PaymentResponse, FreedomError>;

    async fn confirm_card_payment(&self, payment_id: i64) -> Result<PaymentResponse, FreedomError>;

    async fn get_payment_status(&self, payment_id: i64) -> Result<Status, FreedomError>;

    async fn make_revoke_payment(
        &self,
        payment_id: i64,
        amount: f64,
    ) -> Result<PaymentResponse, FreedomError>;

    async fn make_clearing_payment(
        &self,
        payment_id: i64,
        amount: Option<f64>,
    ) -> Result<NativeClearingStatus, FreedomError>;

    async fn make_cancel_payment(&self, payment_id: i64) -> Result<PaymentResponse, FreedomError>;

    async fn add_new_card(
        &self,
        user_id: String,
        post_link: Option<String>,
    ) -> Result<PaymentResponse, FreedomError>;

    async fn remove_added_card(
        &self,
        card_token: String,
        user_id: String,
    ) -> Result<RemovedCard, FreedomError>;

    async fn get_added_cards(&self, user_id: String) -> Result<Vec<Card>, FreedomError>;

    async fn confirm_direct_payment(&self, payment_id: i64)
        -> Result<PaymentResponse, FreedomError>;

    async fn create_google_payment(
        &self,
        request: StandardPaymentRequest,
    ) -> Result<GooglePayment, FreedomError>;

    async fn confirm_google_payment(
        &self,
        payment: GooglePayment,
        token: String,
    ) -> Result<PaymentResponse, FreedomError>;
}

pub type BoxedFreedomSdk = Arc<dyn FreedomSdk>;

// =============================================================================
// Normalization
// =============================================================================

pub fn normalize_error(error: FreedomError) -> ErrorDescriptor {
    match error {
        FreedomError::Validation(errors) => {
            let names: Vec<String> = errors.iter().map(ValidationErrorType::readable).collect();
            ErrorDescriptor::new(ErrorCode::ValidationError, names.join(","))
        }
        FreedomError::Infrastructure(infra) => {
            let (code, description) = match infra {
                InfrastructureError::Parsing => (ErrorCode::ParsingError, "Failed to parse response"),
                InfrastructureError::SdkNotConfigured => {
                    (ErrorCode::SdkNotConfigured, "SDK not configured")
                }
                InfrastructureError::SdkCleared => {
                    (ErrorCode::SdkCleared, "SDK cleared before completion")
                }
                InfrastructureError::PaymentViewNotInitialized => {
                    (ErrorCode::WebviewNotInitialized, "PaymentView is not attached")
                }
                InfrastructureError::WebViewFailed => (ErrorCode::WebviewFailed, "Payment page failed"),
            };
            ErrorDescriptor::new(code, description)
        }
        FreedomError::Network(network) => {
            let (code, description) = match network {
                NetworkError::ConnectionFailed => (ErrorCode::ConnectionFailed, "Connection failed"),
                NetworkError::ConnectionTimeout => {
                    (ErrorCode::ConnectionTimeout, "Connection timeout")
                }
                NetworkError::Integrity => (ErrorCode::NetworkIntegrity, "Network integrity issue"),
                NetworkError::Protocol => (ErrorCode::ProtocolError, "Protocol error"),
                NetworkError::Unknown => (ErrorCode::NetworkUnknown, "Unknown network error"),
            };
            ErrorDescriptor::new(code, description)
        }
        FreedomError::PaymentInitializationFailed => {
            ErrorDescriptor::new(ErrorCode::PaymentInitFailed, "Failed to initialize payment")
        }
        transaction @ FreedomError::Transaction { .. } => {
            let details = transaction.to_string();
            let description = match transaction {
                FreedomError::Transaction {
                    description: Some(description),
                    ..
                } if !description.is_empty() => description,
                _ => "Transaction failed".to_string(),
            };
            ErrorDescriptor::new(ErrorCode::TransactionError, description).with_details(details)
        }
        FreedomError::Other(raw) => ErrorDescriptor::unknown(raw),
    }
}

pub fn normalize_status(status: ResponseStatus) -> PaymentStatus {
    match status {
        ResponseStatus::New => PaymentStatus::New,
        ResponseStatus::Waiting => PaymentStatus::Waiting,
        ResponseStatus::Processing => PaymentStatus::Processing,
        ResponseStatus::Incomplete => PaymentStatus::Incomplete,
        ResponseStatus::Success => PaymentStatus::Success,
        ResponseStatus::Error(_) => PaymentStatus::Error,
        ResponseStatus::Unknown(raw) => PaymentStatus::Unknown(raw),
    }
}

pub fn normalize_payment(response: PaymentResponse) -> PaymentResult {
    PaymentResult {
        status: normalize_status(response.status),
        payment_id: response.payment_id,
        merchant_id: Some(response.merchant_id),
        order_id: response.order_id,
        // Not provided by this generation
        redirect_url: None,
    }
}

pub fn normalize_status_record(status: Status) -> StatusRecord {
    StatusRecord {
        status: status.status,
        payment_id: status.payment_id,
        transaction_status: status.payment_status,
        can_reject: status.can_reject,
        payment_method: status.payment_method,
        amount: status.amount,
        clearing_amount: status.clearing_amount,
        revoked_amount: status.revoked_amount,
        refund_amount: status.refund_amount,
        currency: status.currency,
        order_id: status.order_id,
        is_captured: status.captured,
        card_pan: status.card_pan,
        create_date: status.create_date,
    }
}

pub fn normalize_clearing(status: NativeClearingStatus) -> ClearingResult {
    match status {
        NativeClearingStatus::Success { amount } => ClearingResult::succeeded(amount),
        NativeClearingStatus::Failed => ClearingResult::without_amount(ClearingStatus::Failed),
        NativeClearingStatus::ExceedsPaymentAmount => {
            ClearingResult::without_amount(ClearingStatus::ExceedsPaymentAmount)
        }
        NativeClearingStatus::Other(raw) => {
            ClearingResult::without_amount(ClearingStatus::Unknown(raw))
        }
    }
}

pub fn normalize_card(card: Card) -> CardRecord {
    CardRecord {
        status: card.status,
        merchant_id: card.merchant_id,
        card_id: None,
        card_token: Some(card.card_token),
        recurring_profile: card.recurring_profile_id,
        card_hash: card.card_hash,
        timestamp: card.created_at,
    }
}

pub fn normalize_removed_card(card: RemovedCard) -> RemovedCardRecord {
    CardRecord {
        status: card.status,
        merchant_id: card.merchant_id,
        card_id: None,
        card_token: None,
        recurring_profile: None,
        card_hash: card.card_hash,
        timestamp: card.deleted_at,
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Adapter for the typed merchant SDK
pub struct CurrentAdapter {
    sdk: BoxedFreedomSdk,
    platform: Platform,
}

impl CurrentAdapter {
    pub const NAME: &'static str = "current";

    pub fn new(sdk: BoxedFreedomSdk, platform: Platform) -> Self {
        Self { sdk, platform }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn standard_request(request: PaymentRequest) -> StandardPaymentRequest {
        StandardPaymentRequest {
            amount: request.amount.as_decimal(),
            description: request.description,
            user_id: request.user_id,
            order_id: request.order_id,
            extra_params: request.extra_params,
        }
    }
}

impl fmt::Debug for CurrentAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentAdapter")
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for CurrentAdapter {
    fn provider_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        let capabilities = CapabilitySet::all().without(Capability::CreateRecurringPayment);
        match self.platform {
            Platform::Android => capabilities,
            Platform::Ios => capabilities
                .without(Capability::CreateWalletPayment)
                .without(Capability::ConfirmWalletPayment),
        }
    }

    fn apply_configuration(&self, configuration: &ProviderConfiguration) {
        self.sdk.set_configuration(SdkConfiguration::from(configuration));
        info!("Applied configuration to {} adapter", Self::NAME);
    }

    #[instrument(skip(self, request), fields(surface = surface.id()))]
    async fn create_payment(
        &self,
        request: PaymentRequest,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        self.sdk.set_payment_view(surface);
        self.sdk
            .create_payment_page(Self::standard_request(request))
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self, request))]
    async fn create_tokenized_payment(&self, request: PaymentRequest) -> BridgeResult<PaymentResult> {
        let card_token = match request.card() {
            Some(CardReference::Token(token)) => token.clone(),
            _ => return Err(ErrorDescriptor::invalid_arguments(&["cardToken"])),
        };
        let native = TokenizedPaymentRequest {
            amount: request.amount.as_decimal(),
            description: request.description,
            card_token,
            user_id: request.user_id,
            order_id: request.order_id,
            extra_params: request.extra_params,
        };
        self.sdk
            .create_card_payment(native)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self))]
    async fn confirm_card_payment(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        self.sdk
            .confirm_card_payment(payment_id)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self))]
    async fn get_status(&self, payment_id: i64) -> BridgeResult<StatusRecord> {
        self.sdk
            .get_payment_status(payment_id)
            .await
            .map(normalize_status_record)
            .map_err(normalize_error)
    }

    #[instrument(skip(self, amount), fields(amount = %amount))]
    async fn revoke(&self, payment_id: i64, amount: Amount) -> BridgeResult<PaymentResult> {
        self.sdk
            .make_revoke_payment(payment_id, amount.as_decimal())
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self, amount))]
    async fn clear(&self, payment_id: i64, amount: Option<Amount>) -> BridgeResult<ClearingResult> {
        self.sdk
            .make_clearing_payment(payment_id, amount.map(|a| a.as_decimal()))
            .await
            .map(normalize_clearing)
            .map_err(normalize_error)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        self.sdk
            .make_cancel_payment(payment_id)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self, post_link), fields(surface = surface.id()))]
    async fn add_card(
        &self,
        user_id: String,
        post_link: Option<String>,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        self.sdk.set_payment_view(surface);
        self.sdk
            .add_new_card(user_id, post_link)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    /// This generation removes cards by token; the card id is passed as one
    #[instrument(skip(self))]
    async fn remove_card(&self, card_id: i64, user_id: String) -> BridgeResult<RemovedCardRecord> {
        self.sdk
            .remove_added_card(card_id.to_string(), user_id)
            .await
            .map(normalize_removed_card)
            .map_err(normalize_error)
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, user_id: String) -> BridgeResult<Vec<CardRecord>> {
        self.sdk
            .get_added_cards(user_id)
            .await
            .map(|cards| cards.into_iter().map(normalize_card).collect())
            .map_err(normalize_error)
    }

    #[instrument(skip(self))]
    async fn confirm_direct_payment(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        self.sdk
            .confirm_direct_payment(payment_id)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }

    #[instrument(skip(self, request))]
    async fn create_wallet_payment(&self, request: PaymentRequest) -> BridgeResult<WalletPayment> {
        self.sdk
            .create_google_payment(Self::standard_request(request))
            .await
            .map(|payment| WalletPayment {
                payment_id: payment.payment_id,
            })
            .map_err(normalize_error)
    }

    #[instrument(skip(self, token))]
    async fn confirm_wallet_payment(
        &self,
        payment_id: String,
        token: String,
    ) -> BridgeResult<PaymentResult> {
        self.sdk
            .confirm_google_payment(GooglePayment { payment_id }, token)
            .await
            .map(normalize_payment)
            .map_err(normalize_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_validation_names() {
        assert_eq!(ValidationErrorType::InvalidAmount.readable(), "InvalidAmount");
        assert_eq!(ValidationErrorType::InvalidOrderId.readable(), "InvalidOrderId");
        assert_eq!(ValidationErrorType::Empty.readable(), "EMPTY");

        let err = normalize_error(FreedomError::Validation(vec![
            ValidationErrorType::InvalidAmount,
            ValidationErrorType::InvalidUserId,
        ]));
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.description, "InvalidAmount,InvalidUserId");
    }

    #[test]
    fn test_error_mapping_is_total() {
        let cases = vec![
            (FreedomError::Infrastructure(InfrastructureError::Parsing), ErrorCode::ParsingError),
            (FreedomError::Infrastructure(InfrastructureError::SdkCleared), ErrorCode::SdkCleared),
            (
                FreedomError::Infrastructure(InfrastructureError::PaymentViewNotInitialized),
                ErrorCode::WebviewNotInitialized,
            ),
            (FreedomError::Network(NetworkError::ConnectionTimeout), ErrorCode::ConnectionTimeout),
            (FreedomError::Network(NetworkError::Protocol), ErrorCode::ProtocolError),
            (FreedomError::PaymentInitializationFailed, ErrorCode::PaymentInitFailed),
            (FreedomError::Other("Quota".into()), ErrorCode::Unknown),
        ];

        for (native, expected) in cases {
            assert_eq!(normalize_error(native).code(), expected);
        }
    }

    #[test]
    fn test_transaction_error_keeps_details() {
        let err = normalize_error(FreedomError::Transaction {
            code: 1234,
            description: Some("Insufficient funds".into()),
        });
        assert_eq!(err.code(), ErrorCode::TransactionError);
        assert_eq!(err.description, "Insufficient funds");
        assert_eq!(
            err.details.as_deref(),
            Some("transaction error 1234: Insufficient funds")
        );

        let err = normalize_error(FreedomError::Transaction { code: 1, description: None });
        assert_eq!(err.description, "Transaction failed");
    }

    #[test]
    fn test_unknown_status_keeps_raw_value() {
        let result = normalize_payment(PaymentResponse {
            status: ResponseStatus::Unknown("partial".into()),
            payment_id: 7,
            merchant_id: "555".into(),
            order_id: None,
        });
        assert_eq!(result.status, PaymentStatus::Unknown("partial".into()));
        assert!(result.redirect_url.is_none());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "Unknown(partial)");
        assert!(value["redirectUrl"].is_null());
    }

    #[test]
    fn test_card_fields_are_nulled() {
        let record = normalize_removed_card(RemovedCard {
            status: "deleted".into(),
            merchant_id: "555".into(),
            card_hash: "4400-xx".into(),
            deleted_at: "2026-01-01T00:00:00Z".into(),
        });
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["cardId"].is_null());
        assert!(value["cardToken"].is_null());
        assert!(value["recurringProfile"].is_null());
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_clearing_mapping() {
        let value = serde_json::to_value(normalize_clearing(NativeClearingStatus::Success {
            amount: 12.5,
        }))
        .unwrap();
        assert_eq!(value["status"], "Success");
        assert_eq!(value["clearingAmount"], 12.5);

        let value =
            serde_json::to_value(normalize_clearing(NativeClearingStatus::Other("Pending".into())))
                .unwrap();
        assert_eq!(value["status"], "Unknown(Pending)");
        assert!(value["amount"].is_null());
    }
}
