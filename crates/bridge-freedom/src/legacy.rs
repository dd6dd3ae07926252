//! # Legacy Generation
//!
//! Adapter over the older SDK, which reports every outcome through a
//! nullable-pair callback `(Option<T>, Option<LegacyError>)`. Each call is
//! bridged onto a `oneshot` channel and awaited, so the adapter exposes the
//! same `BridgeResult` surface as the current generation.
//!
//! Callback outcomes:
//!
//! | value  | error  | result                                 |
//! |--------|--------|----------------------------------------|
//! | Some   | None   | success                                |
//! | any    | Some   | normalized error (the error wins)      |
//! | None   | None   | `INFRASTRUCTURE_ERROR`                 |
//! | callback dropped | | `INFRASTRUCTURE_ERROR`               |

use async_trait::async_trait;
use bridge_core::{
    Amount, BridgeResult, Capability, CapabilitySet, CardRecord, CardReference, ClearingResult,
    ClearingStatus, ErrorCode, ErrorDescriptor, PaymentRequest, PaymentResult, PaymentStatus,
    ProviderAdapter, ProviderConfiguration, RecurringPaymentRequest, RemovedCardRecord,
    StatusRecord, SurfaceToken,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

/// Nullable-pair completion callback of the legacy SDK
pub type Callback<T> = Box<dyn FnOnce(Option<T>, Option<LegacyError>) + Send + 'static>;

/// Error reported by the legacy SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyError {
    pub code: i32,
    pub description: String,
}

impl LegacyError {
    pub const VALIDATION: i32 = -2;
    pub const PAYMENT_INIT: i32 = -3;
    pub const NETWORK: i32 = -4;
    pub const INFRASTRUCTURE: i32 = -5;

    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

impl fmt::Display for LegacyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.description)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyPayment {
    pub status: Option<String>,
    pub payment_id: Option<i64>,
    pub merchant_id: Option<String>,
    pub order_id: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyRecurringPayment {
    pub status: Option<String>,
    pub payment_id: Option<i64>,
    pub currency: Option<String>,
    pub amount: Option<f64>,
    pub recurring_profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyStatus {
    pub status: Option<String>,
    pub payment_id: Option<i64>,
    pub transaction_status: Option<String>,
    pub can_reject: Option<bool>,
    pub is_captured: Option<bool>,
    pub card_pan: Option<String>,
    pub create_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyCapture {
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub clear_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyCard {
    pub status: Option<String>,
    pub merchant_id: Option<String>,
    pub card_id: Option<i64>,
    pub recurring_profile: Option<String>,
    pub card_hash: Option<String>,
    pub date: Option<String>,
}

/// Flat configuration object of the legacy SDK
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyConfiguration {
    pub check_url: Option<String>,
    pub result_url: Option<String>,
    pub user_phone: Option<String>,
    pub user_contact_email: Option<String>,
    pub user_email: Option<String>,
}

impl From<&ProviderConfiguration> for LegacyConfiguration {
    fn from(configuration: &ProviderConfiguration) -> Self {
        Self {
            check_url: configuration.operational.check_url.clone(),
            result_url: configuration.operational.result_url.clone(),
            user_phone: configuration.user.phone.clone(),
            user_contact_email: configuration.user.contact_email.clone(),
            user_email: configuration.user.email.clone(),
        }
    }
}

/// Native payment parameters shared by the creating calls
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyPaymentParams {
    pub amount: f64,
    pub description: String,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    pub extra_params: HashMap<String, String>,
}

/// Callback-based legacy SDK
pub trait LegacySdk: Send + Sync {
    fn set_configuration(&self, configuration: LegacyConfiguration);

    fn set_payment_view(&self, view: SurfaceToken);

    fn create_payment(&self, params: LegacyPaymentParams, callback: Callback<LegacyPayment>);

    fn create_recurring_payment(
        &self,
        params: LegacyPaymentParams,
        recurring_profile: String,
        callback: Callback<LegacyRecurringPayment>,
    );

    fn create_card_payment(
        &self,
        params: LegacyPaymentParams,
        card_id: i64,
        callback: Callback<LegacyPayment>,
    );

    fn pay_by_card(&self, payment_id: i64, callback: Callback<LegacyPayment>);

    fn get_payment_status(&self, payment_id: i64, callback: Callback<LegacyStatus>);

    fn make_revoke_payment(&self, payment_id: i64, amount: f64, callback: Callback<LegacyPayment>);

    fn make_clearing_payment(
        &self,
        payment_id: i64,
        amount: Option<f64>,
        callback: Callback<LegacyCapture>,
    );

    fn make_cancel_payment(&self, payment_id: i64, callback: Callback<LegacyPayment>);

    fn add_new_card(
        &self,
        user_id: String,
        post_link: Option<String>,
        callback: Callback<LegacyPayment>,
    );

    fn remove_added_card(&self, card_id: i64, user_id: String, callback: Callback<LegacyCard>);

    fn get_added_cards(&self, user_id: String, callback: Callback<Vec<LegacyCard>>);
}

pub type BoxedLegacySdk = Arc<dyn LegacySdk>;

// =============================================================================
// Normalization
// =============================================================================

pub fn normalize_error(error: LegacyError) -> ErrorDescriptor {
    match error.code {
        LegacyError::VALIDATION => ErrorDescriptor::new(ErrorCode::ValidationError, error.description),
        LegacyError::PAYMENT_INIT => {
            ErrorDescriptor::new(ErrorCode::PaymentInitFailed, error.description)
        }
        LegacyError::NETWORK => ErrorDescriptor::new(ErrorCode::NetworkUnknown, error.description),
        LegacyError::INFRASTRUCTURE => {
            ErrorDescriptor::new(ErrorCode::InfrastructureError, error.description.clone())
                .with_details(error.to_string())
        }
        code if code > 0 => ErrorDescriptor::new(ErrorCode::TransactionError, error.description.clone())
            .with_details(error.to_string()),
        _ => ErrorDescriptor::unknown(error.to_string()),
    }
}

/// Raw marker for a status the SDK left out
const MISSING_STATUS: &str = "null";

/// Lookup table for the legacy status strings
pub fn normalize_status(raw: Option<&str>) -> PaymentStatus {
    let Some(raw) = raw else {
        return PaymentStatus::Unknown(MISSING_STATUS.to_string());
    };
    match raw.to_ascii_lowercase().as_str() {
        "ok" | "success" => PaymentStatus::Success,
        "new" => PaymentStatus::New,
        "waiting" | "pending" => PaymentStatus::Waiting,
        "process" | "processing" => PaymentStatus::Processing,
        "incomplete" => PaymentStatus::Incomplete,
        "error" | "failed" => PaymentStatus::Error,
        _ => PaymentStatus::Unknown(raw.to_string()),
    }
}

fn require_payment_id(payment_id: Option<i64>) -> BridgeResult<i64> {
    payment_id.ok_or_else(|| {
        ErrorDescriptor::new(ErrorCode::ParsingError, "payment id missing from provider response")
    })
}

pub fn normalize_payment(payment: LegacyPayment) -> BridgeResult<PaymentResult> {
    Ok(PaymentResult {
        status: normalize_status(payment.status.as_deref()),
        payment_id: require_payment_id(payment.payment_id)?,
        merchant_id: payment.merchant_id,
        order_id: payment.order_id,
        redirect_url: payment.redirect_url,
    })
}

pub fn normalize_recurring(payment: LegacyRecurringPayment) -> BridgeResult<PaymentResult> {
    Ok(PaymentResult::new(
        normalize_status(payment.status.as_deref()),
        require_payment_id(payment.payment_id)?,
    ))
}

pub fn normalize_status_record(status: LegacyStatus) -> StatusRecord {
    StatusRecord {
        status: status.status,
        payment_id: status.payment_id,
        transaction_status: status.transaction_status,
        can_reject: status.can_reject,
        is_captured: status.is_captured,
        card_pan: status.card_pan,
        create_date: status.create_date,
        ..StatusRecord::default()
    }
}

pub fn normalize_capture(capture: LegacyCapture) -> ClearingResult {
    let raw = capture.status.unwrap_or_else(|| MISSING_STATUS.to_string());
    let status = match raw.to_ascii_lowercase().as_str() {
        "ok" | "success" => ClearingStatus::Success,
        "error" | "failed" => ClearingStatus::Failed,
        "exceeds" | "exceeds_payment_amount" => ClearingStatus::ExceedsPaymentAmount,
        _ => ClearingStatus::Unknown(raw),
    };
    ClearingResult {
        status,
        amount: capture.amount,
        clearing_amount: capture.clear_amount,
    }
}

pub fn normalize_card(card: LegacyCard) -> CardRecord {
    CardRecord {
        status: card.status.unwrap_or_default(),
        merchant_id: card.merchant_id.unwrap_or_default(),
        card_id: card.card_id,
        // Not provided by this generation
        card_token: None,
        recurring_profile: card.recurring_profile,
        card_hash: card.card_hash.unwrap_or_default(),
        timestamp: card.date.unwrap_or_default(),
    }
}

/// Bridge one callback-style call onto a future
pub async fn await_callback<T, F>(register: F) -> BridgeResult<T>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>),
{
    let (tx, rx) = oneshot::channel();
    register(Box::new(move |value, error| {
        let _ = tx.send((value, error));
    }));

    match rx.await {
        Ok((_, Some(error))) => Err(normalize_error(error)),
        Ok((Some(value), None)) => Ok(value),
        Ok((None, None)) => {
            warn!("Legacy SDK answered with neither a value nor an error");
            Err(ErrorDescriptor::infrastructure(
                "provider returned neither a result nor an error",
            ))
        }
        Err(_) => {
            warn!("Legacy SDK dropped its callback");
            Err(ErrorDescriptor::infrastructure(
                "provider dropped the callback without answering",
            ))
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Adapter for the callback-based legacy SDK
pub struct LegacyAdapter {
    sdk: BoxedLegacySdk,
}

impl LegacyAdapter {
    pub const NAME: &'static str = "legacy";

    pub fn new(sdk: BoxedLegacySdk) -> Self {
        Self { sdk }
    }

    fn params(request: &PaymentRequest) -> LegacyPaymentParams {
        LegacyPaymentParams {
            amount: request.amount.as_decimal(),
            description: request.description.clone(),
            order_id: request.order_id.clone(),
            user_id: request.user_id.clone(),
            extra_params: request.extra_params.clone(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for LegacyAdapter {
    fn provider_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(&[
            Capability::CreatePayment,
            Capability::CreateTokenizedPayment,
            Capability::CreateRecurringPayment,
            Capability::ConfirmCardPayment,
            Capability::GetStatus,
            Capability::Revoke,
            Capability::Clear,
            Capability::Cancel,
            Capability::AddCard,
            Capability::RemoveCard,
            Capability::ListCards,
        ])
    }

    fn apply_configuration(&self, configuration: &ProviderConfiguration) {
        self.sdk.set_configuration(LegacyConfiguration::from(configuration));
        info!("Applied configuration to {} adapter", Self::NAME);
    }

    #[instrument(skip(self, request), fields(surface = surface.id()))]
    async fn create_payment(
        &self,
        request: PaymentRequest,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        self.sdk.set_payment_view(surface);
        let params = Self::params(&request);
        await_callback(|cb| self.sdk.create_payment(params, cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self, request))]
    async fn create_tokenized_payment(&self, request: PaymentRequest) -> BridgeResult<PaymentResult> {
        let card_id = match request.card() {
            Some(CardReference::Id(id)) => *id,
            _ => return Err(ErrorDescriptor::invalid_arguments(&["cardId"])),
        };
        let params = Self::params(&request);
        await_callback(|cb| self.sdk.create_card_payment(params, card_id, cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self, request))]
    async fn create_recurring_payment(
        &self,
        request: RecurringPaymentRequest,
    ) -> BridgeResult<PaymentResult> {
        let params = LegacyPaymentParams {
            amount: request.amount.as_decimal(),
            description: request.description,
            order_id: request.order_id,
            user_id: None,
            extra_params: request.extra_params,
        };
        let profile = request.recurring_profile;
        await_callback(|cb| self.sdk.create_recurring_payment(params, profile, cb))
            .await
            .and_then(normalize_recurring)
    }

    #[instrument(skip(self))]
    async fn confirm_card_payment(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        await_callback(|cb| self.sdk.pay_by_card(payment_id, cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self))]
    async fn get_status(&self, payment_id: i64) -> BridgeResult<StatusRecord> {
        await_callback(|cb| self.sdk.get_payment_status(payment_id, cb))
            .await
            .map(normalize_status_record)
    }

    #[instrument(skip(self, amount), fields(amount = %amount))]
    async fn revoke(&self, payment_id: i64, amount: Amount) -> BridgeResult<PaymentResult> {
        await_callback(|cb| self.sdk.make_revoke_payment(payment_id, amount.as_decimal(), cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self, amount))]
    async fn clear(&self, payment_id: i64, amount: Option<Amount>) -> BridgeResult<ClearingResult> {
        let amount = amount.map(|a| a.as_decimal());
        await_callback(|cb| self.sdk.make_clearing_payment(payment_id, amount, cb))
            .await
            .map(normalize_capture)
    }

    #[instrument(skip(self))]
    async fn cancel(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        await_callback(|cb| self.sdk.make_cancel_payment(payment_id, cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self, post_link), fields(surface = surface.id()))]
    async fn add_card(
        &self,
        user_id: String,
        post_link: Option<String>,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        self.sdk.set_payment_view(surface);
        await_callback(|cb| self.sdk.add_new_card(user_id, post_link, cb))
            .await
            .and_then(normalize_payment)
    }

    #[instrument(skip(self))]
    async fn remove_card(&self, card_id: i64, user_id: String) -> BridgeResult<RemovedCardRecord> {
        await_callback(|cb| self.sdk.remove_added_card(card_id, user_id, cb))
            .await
            .map(normalize_card)
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, user_id: String) -> BridgeResult<Vec<CardRecord>> {
        await_callback(|cb| self.sdk.get_added_cards(user_id, cb))
            .await
            .map(|cards| cards.into_iter().map(normalize_card).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = normalize_error(LegacyError::new(LegacyError::VALIDATION, "amount is empty"));
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.description, "amount is empty");

        assert_eq!(
            normalize_error(LegacyError::new(-3, "init")).code(),
            ErrorCode::PaymentInitFailed
        );
        assert_eq!(normalize_error(LegacyError::new(-4, "net")).code(), ErrorCode::NetworkUnknown);
        assert_eq!(
            normalize_error(LegacyError::new(-5, "infra")).code(),
            ErrorCode::InfrastructureError
        );

        let err = normalize_error(LegacyError::new(940, "Card expired"));
        assert_eq!(err.code(), ErrorCode::TransactionError);
        assert_eq!(err.details.as_deref(), Some("code 940: Card expired"));

        let err = normalize_error(LegacyError::new(-99, "strange"));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(err.details.as_deref(), Some("code -99: strange"));
    }

    #[test]
    fn test_status_table() {
        assert_eq!(normalize_status(Some("ok")), PaymentStatus::Success);
        assert_eq!(normalize_status(Some("PENDING")), PaymentStatus::Waiting);
        assert_eq!(normalize_status(Some("process")), PaymentStatus::Processing);
        assert_eq!(normalize_status(Some("failed")), PaymentStatus::Error);
        assert_eq!(
            normalize_status(Some("partial_refund")),
            PaymentStatus::Unknown("partial_refund".into())
        );
        assert_eq!(normalize_status(None), PaymentStatus::Unknown("null".into()));
        assert_eq!(normalize_status(None).to_string(), "Unknown(null)");
    }

    #[test]
    fn test_missing_payment_id_is_parsing_error() {
        let err = normalize_payment(LegacyPayment {
            status: Some("ok".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParsingError);
        assert!(err.description.contains("payment id missing"));

        let err = normalize_recurring(LegacyRecurringPayment {
            status: Some("ok".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParsingError);

        let result = normalize_payment(LegacyPayment {
            status: Some("ok".into()),
            payment_id: Some(7),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.payment_id, 7);
        assert_eq!(result.status, PaymentStatus::Success);
    }

    #[test]
    fn test_status_record_nulls_missing_fields() {
        let value = serde_json::to_value(normalize_status_record(LegacyStatus {
            status: Some("ok".into()),
            payment_id: Some(5),
            is_captured: Some(true),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(value["isCaptured"], true);
        assert!(value["currency"].is_null());
        assert!(value["refundAmount"].is_null());
    }

    #[tokio::test]
    async fn test_callback_outcomes() {
        let ok: BridgeResult<i32> = await_callback(|cb| cb(Some(1), None)).await;
        assert_eq!(ok.unwrap(), 1);

        let both: BridgeResult<i32> =
            await_callback(|cb| cb(Some(1), Some(LegacyError::new(5, "declined")))).await;
        assert_eq!(both.unwrap_err().code(), ErrorCode::TransactionError);

        let neither: BridgeResult<i32> = await_callback(|cb| cb(None, None)).await;
        assert_eq!(neither.unwrap_err().code(), ErrorCode::InfrastructureError);

        let dropped: BridgeResult<i32> = await_callback(|cb| drop(cb)).await;
        let err = dropped.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InfrastructureError);
        assert!(err.details.unwrap().contains("dropped"));
    }

    #[test]
    fn test_capture_mapping() {
        let result = normalize_capture(LegacyCapture {
            status: Some("ok".into()),
            amount: Some(20.0),
            clear_amount: Some(15.0),
        });
        assert_eq!(result.status, ClearingStatus::Success);
        assert_eq!(result.clearing_amount, Some(15.0));

        let result = normalize_capture(LegacyCapture {
            status: Some("rejected".into()),
            ..Default::default()
        });
        assert_eq!(result.status, ClearingStatus::Unknown("rejected".into()));

        let result = normalize_capture(LegacyCapture::default());
        assert_eq!(result.status, ClearingStatus::Unknown("null".into()));
    }
}
