//! # Mock Processor
//!
//! In-memory processor implementing both native SDK interfaces over one
//! ledger. Used by the headless host and by tests.
//!
//! Behaviors:
//! - `approve`: operations succeed against the ledger (business rules still apply)
//! - `decline`: every call fails with a transaction error
//! - `timeout`: every call fails with a connection timeout
//! - `silent`: calls never answer

use crate::current::{
    Card, FreedomError, FreedomSdk, GooglePayment, NativeClearingStatus, NetworkError,
    PaymentResponse, RemovedCard, ResponseStatus, SdkConfiguration, StandardPaymentRequest,
    Status, TokenizedPaymentRequest, ValidationErrorType,
};
use crate::factory::SdkConnector;
use crate::legacy::{
    Callback, LegacyCapture, LegacyCard, LegacyConfiguration, LegacyError, LegacyPayment,
    LegacyPaymentParams, LegacyRecurringPayment, LegacySdk, LegacyStatus,
};
use async_trait::async_trait;
use bridge_core::{BridgeResult, Credentials, SurfaceToken};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

const DECLINE_CODE: i32 = 10;
const NOT_FOUND_CODE: i32 = 404;
const CURRENCY: &str = "KZT";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MockBehavior {
    #[default]
    Approve,
    Decline,
    Timeout,
    Silent,
}

impl MockBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            MockBehavior::Approve => "approve",
            MockBehavior::Decline => "decline",
            MockBehavior::Timeout => "timeout",
            MockBehavior::Silent => "silent",
        }
    }
}

impl fmt::Display for MockBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MockBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(MockBehavior::Approve),
            "decline" => Ok(MockBehavior::Decline),
            "timeout" => Ok(MockBehavior::Timeout),
            "silent" => Ok(MockBehavior::Silent),
            other => Err(format!("unknown mock behavior: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
struct MockPayment {
    amount: f64,
    cleared: f64,
    revoked: f64,
    status: &'static str,
    order_id: Option<String>,
    created_at: String,
}

#[derive(Debug, Clone)]
struct MockCard {
    id: i64,
    token: String,
    user_id: String,
    hash: String,
    created_at: String,
    recurring_profile: Option<String>,
}

enum CardLookup<'a> {
    Token(&'a str),
    Id(i64),
    /// Either the token or the stringified id
    TokenOrId(&'a str),
}

#[derive(Debug, Default)]
struct Ledger {
    merchant_id: String,
    payments: HashMap<i64, MockPayment>,
    cards: Vec<MockCard>,
    next_id: i64,
}

impl Ledger {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn response(&self, payment_id: i64, status: ResponseStatus) -> PaymentResponse {
        PaymentResponse {
            status,
            payment_id,
            merchant_id: self.merchant_id.clone(),
            order_id: self.payments.get(&payment_id).and_then(|p| p.order_id.clone()),
        }
    }

    fn payment(&mut self, payment_id: i64) -> Result<&mut MockPayment, FreedomError> {
        self.payments
            .get_mut(&payment_id)
            .ok_or_else(|| FreedomError::Transaction {
                code: NOT_FOUND_CODE,
                description: Some(format!("Payment {} not found", payment_id)),
            })
    }

    fn create(&mut self, amount: f64, order_id: Option<String>) -> Result<i64, FreedomError> {
        if amount <= 0.0 {
            return Err(FreedomError::Validation(vec![ValidationErrorType::InvalidAmount]));
        }
        let payment_id = self.next_id();
        self.payments.insert(
            payment_id,
            MockPayment {
                amount,
                cleared: 0.0,
                revoked: 0.0,
                status: "success",
                order_id,
                created_at: Utc::now().to_rfc3339(),
            },
        );
        Ok(payment_id)
    }

    fn find_card(&self, lookup: &CardLookup<'_>) -> Option<usize> {
        self.cards.iter().position(|card| match lookup {
            CardLookup::Token(token) => card.token == *token,
            CardLookup::Id(id) => card.id == *id,
            CardLookup::TokenOrId(raw) => card.token == *raw || card.id.to_string() == *raw,
        })
    }

    fn pay_with_card(
        &mut self,
        amount: f64,
        order_id: Option<String>,
        lookup: CardLookup<'_>,
    ) -> Result<PaymentResponse, FreedomError> {
        if self.find_card(&lookup).is_none() {
            return Err(FreedomError::Validation(vec![ValidationErrorType::InvalidCardToken]));
        }
        let payment_id = self.create(amount, order_id)?;
        Ok(self.response(payment_id, ResponseStatus::Success))
    }

    fn confirm(&mut self, payment_id: i64) -> Result<PaymentResponse, FreedomError> {
        self.payment(payment_id)?.status = "success";
        Ok(self.response(payment_id, ResponseStatus::Success))
    }

    fn status(&mut self, payment_id: i64) -> Result<Status, FreedomError> {
        let payment = self.payment(payment_id)?.clone();
        Ok(Status {
            status: Some("ok".to_string()),
            payment_id: Some(payment_id),
            payment_status: Some(payment.status.to_string()),
            can_reject: Some(payment.revoked < payment.amount),
            payment_method: Some("bankcard".to_string()),
            amount: Some(payment.amount),
            clearing_amount: Some(payment.cleared),
            revoked_amount: Some(payment.revoked),
            refund_amount: Some(payment.revoked),
            currency: Some(CURRENCY.to_string()),
            order_id: payment.order_id,
            captured: Some(payment.cleared > 0.0),
            card_pan: Some("440043******0000".to_string()),
            create_date: Some(payment.created_at),
        })
    }

    fn revoke(&mut self, payment_id: i64, amount: f64) -> Result<PaymentResponse, FreedomError> {
        let payment = self.payment(payment_id)?;
        if amount <= 0.0 || payment.revoked + amount > payment.amount {
            return Err(FreedomError::Validation(vec![ValidationErrorType::InvalidAmount]));
        }
        payment.revoked += amount;
        payment.status = "revoked";
        Ok(self.response(payment_id, ResponseStatus::Success))
    }

    fn clear(
        &mut self,
        payment_id: i64,
        amount: Option<f64>,
    ) -> Result<NativeClearingStatus, FreedomError> {
        let payment = self.payment(payment_id)?;
        let amount = amount.unwrap_or(payment.amount);
        if amount > payment.amount {
            return Ok(NativeClearingStatus::ExceedsPaymentAmount);
        }
        payment.cleared = amount;
        Ok(NativeClearingStatus::Success { amount })
    }

    fn cancel(&mut self, payment_id: i64) -> Result<PaymentResponse, FreedomError> {
        self.payment(payment_id)?.status = "canceled";
        Ok(self.response(payment_id, ResponseStatus::Success))
    }

    fn add_card(&mut self, user_id: String) -> Result<PaymentResponse, FreedomError> {
        let id = self.next_id();
        self.cards.push(MockCard {
            id,
            token: format!("tok_{}", id),
            user_id,
            hash: format!("4400-43XX-XXXX-{:04}", id % 10_000),
            created_at: Utc::now().to_rfc3339(),
            recurring_profile: None,
        });
        Ok(self.response(id, ResponseStatus::New))
    }

    fn remove_card(&mut self, lookup: CardLookup<'_>, user_id: &str) -> Result<RemovedCard, FreedomError> {
        let index = self
            .find_card(&lookup)
            .filter(|i| self.cards[*i].user_id == user_id)
            .ok_or(FreedomError::Validation(vec![ValidationErrorType::InvalidCardToken]))?;
        let card = self.cards.remove(index);
        Ok(RemovedCard {
            status: "deleted".to_string(),
            merchant_id: self.merchant_id.clone(),
            card_hash: card.hash,
            deleted_at: Utc::now().to_rfc3339(),
        })
    }

    fn cards(&self, user_id: &str) -> Vec<&MockCard> {
        self.cards.iter().filter(|c| c.user_id == user_id).collect()
    }

    fn native_card(&self, card: &MockCard) -> Card {
        Card {
            status: "approved".to_string(),
            merchant_id: self.merchant_id.clone(),
            recurring_profile_id: card.recurring_profile.clone(),
            card_hash: card.hash.clone(),
            created_at: card.created_at.clone(),
            card_token: card.token.clone(),
        }
    }
}

fn legacy_error(error: FreedomError) -> LegacyError {
    match error {
        FreedomError::Validation(errors) => LegacyError::new(
            LegacyError::VALIDATION,
            errors.iter().map(|e| e.name()).collect::<Vec<_>>().join(", "),
        ),
        FreedomError::PaymentInitializationFailed => {
            LegacyError::new(LegacyError::PAYMENT_INIT, "Payment initialization failed")
        }
        FreedomError::Network(network) => {
            LegacyError::new(LegacyError::NETWORK, format!("Network error: {}", network))
        }
        FreedomError::Infrastructure(infra) => {
            LegacyError::new(LegacyError::INFRASTRUCTURE, format!("Infrastructure error: {}", infra))
        }
        FreedomError::Transaction { code, description } => {
            LegacyError::new(code, description.unwrap_or_default())
        }
        FreedomError::Other(raw) => LegacyError::new(-1, raw),
    }
}

fn legacy_payment(response: PaymentResponse) -> LegacyPayment {
    let status = match response.status {
        ResponseStatus::Success => "ok",
        ResponseStatus::New => "new",
        ResponseStatus::Waiting => "waiting",
        ResponseStatus::Processing => "process",
        ResponseStatus::Incomplete => "incomplete",
        ResponseStatus::Error(_) => "error",
        ResponseStatus::Unknown(_) => "unknown",
    };
    LegacyPayment {
        status: Some(status.to_string()),
        payment_id: Some(response.payment_id),
        merchant_id: Some(response.merchant_id),
        order_id: response.order_id,
        redirect_url: Some(format!("https://mock.freedompay.kz/pay/{}", response.payment_id)),
    }
}

/// In-memory processor for one merchant
pub struct MockProcessor {
    behavior: Mutex<MockBehavior>,
    latency: Option<Duration>,
    ledger: Mutex<Ledger>,
    current_configurations: Mutex<Vec<SdkConfiguration>>,
    legacy_configurations: Mutex<Vec<LegacyConfiguration>>,
    views: Mutex<Vec<SurfaceToken>>,
    held: Mutex<Vec<Box<dyn Any + Send>>>,
}

impl MockProcessor {
    pub fn new(merchant_id: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            latency: None,
            ledger: Mutex::new(Ledger {
                merchant_id: merchant_id.into(),
                ..Ledger::default()
            }),
            current_configurations: Mutex::new(Vec::new()),
            legacy_configurations: Mutex::new(Vec::new()),
            views: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    /// Builder: delay every answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn behavior(&self) -> MockBehavior {
        *lock(&self.behavior)
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *lock(&self.behavior) = behavior;
    }

    pub fn merchant_id(&self) -> String {
        lock(&self.ledger).merchant_id.clone()
    }

    /// Configurations applied through the current SDK, oldest first
    pub fn current_configurations(&self) -> Vec<SdkConfiguration> {
        lock(&self.current_configurations).clone()
    }

    pub fn legacy_configurations(&self) -> Vec<LegacyConfiguration> {
        lock(&self.legacy_configurations).clone()
    }

    /// Payment views attached so far
    pub fn views(&self) -> Vec<SurfaceToken> {
        lock(&self.views).clone()
    }

    /// Number of legacy callbacks held by the `silent` behavior
    pub fn held_callbacks(&self) -> usize {
        lock(&self.held).len()
    }

    /// Drop held legacy callbacks without answering them
    pub fn drop_held_callbacks(&self) {
        lock(&self.held).clear();
    }

    async fn respond<T, F>(&self, op: F) -> Result<T, FreedomError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, FreedomError> + Send,
    {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.behavior() {
            MockBehavior::Approve => {
                let mut ledger = lock(&self.ledger);
                op(&mut ledger)
            }
            MockBehavior::Decline => Err(FreedomError::Transaction {
                code: DECLINE_CODE,
                description: Some("Card declined".to_string()),
            }),
            MockBehavior::Timeout => Err(FreedomError::Network(NetworkError::ConnectionTimeout)),
            MockBehavior::Silent => std::future::pending().await,
        }
    }

    fn answer<T, F>(&self, callback: Callback<T>, op: F)
    where
        T: Send + 'static,
        F: FnOnce(&mut Ledger) -> Result<T, FreedomError>,
    {
        let (value, error) = match self.behavior() {
            MockBehavior::Silent => {
                debug!("Mock processor holding legacy callback");
                lock(&self.held).push(Box::new(callback));
                return;
            }
            MockBehavior::Decline => (None, Some(LegacyError::new(DECLINE_CODE, "Card declined"))),
            MockBehavior::Timeout => (
                None,
                Some(LegacyError::new(LegacyError::NETWORK, "Connection timeout")),
            ),
            MockBehavior::Approve => match op(&mut lock(&self.ledger)) {
                Ok(value) => (Some(value), None),
                Err(error) => (None, Some(legacy_error(error))),
            },
        };

        // Legacy callbacks fire on a background context
        match self.latency {
            Some(latency) => {
                tokio::spawn(async move {
                    tokio::time::sleep(latency).await;
                    callback(value, error);
                });
            }
            None => callback(value, error),
        }
    }
}

impl fmt::Debug for MockProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockProcessor")
            .field("merchant_id", &self.merchant_id())
            .field("behavior", &self.behavior())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FreedomSdk for MockProcessor {
    fn set_configuration(&self, configuration: SdkConfiguration) {
        lock(&self.current_configurations).push(configuration);
    }

    fn set_payment_view(&self, view: SurfaceToken) {
        lock(&self.views).push(view);
    }

    async fn create_payment_page(
        &self,
        request: StandardPaymentRequest,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| {
            let payment_id = ledger.create(request.amount, request.order_id)?;
            Ok(ledger.response(payment_id, ResponseStatus::Success))
        })
        .await
    }

    async fn create_card_payment(
        &self,
        request: TokenizedPaymentRequest,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| {
            ledger.pay_with_card(
                request.amount,
                request.order_id,
                CardLookup::Token(&request.card_token),
            )
        })
        .await
    }

    async fn confirm_card_payment(&self, payment_id: i64) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| ledger.confirm(payment_id)).await
    }

    async fn get_payment_status(&self, payment_id: i64) -> Result<Status, FreedomError> {
        self.respond(move |ledger| ledger.status(payment_id)).await
    }

    async fn make_revoke_payment(
        &self,
        payment_id: i64,
        amount: f64,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| ledger.revoke(payment_id, amount)).await
    }

    async fn make_clearing_payment(
        &self,
        payment_id: i64,
        amount: Option<f64>,
    ) -> Result<NativeClearingStatus, FreedomError> {
        self.respond(move |ledger| ledger.clear(payment_id, amount)).await
    }

    async fn make_cancel_payment(&self, payment_id: i64) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| ledger.cancel(payment_id)).await
    }

    async fn add_new_card(
        &self,
        user_id: String,
        _post_link: Option<String>,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| ledger.add_card(user_id)).await
    }

    async fn remove_added_card(
        &self,
        card_token: String,
        user_id: String,
    ) -> Result<RemovedCard, FreedomError> {
        self.respond(move |ledger| ledger.remove_card(CardLookup::TokenOrId(&card_token), &user_id))
            .await
    }

    async fn get_added_cards(&self, user_id: String) -> Result<Vec<Card>, FreedomError> {
        self.respond(move |ledger| {
            Ok(ledger
                .cards(&user_id)
                .into_iter()
                .map(|card| ledger.native_card(card))
                .collect())
        })
        .await
    }

    async fn confirm_direct_payment(
        &self,
        payment_id: i64,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| ledger.confirm(payment_id)).await
    }

    async fn create_google_payment(
        &self,
        request: StandardPaymentRequest,
    ) -> Result<GooglePayment, FreedomError> {
        self.respond(move |ledger| {
            let payment_id = ledger.create(request.amount, request.order_id)?;
            ledger.payment(payment_id)?.status = "waiting";
            Ok(GooglePayment {
                payment_id: payment_id.to_string(),
            })
        })
        .await
    }

    async fn confirm_google_payment(
        &self,
        payment: GooglePayment,
        token: String,
    ) -> Result<PaymentResponse, FreedomError> {
        self.respond(move |ledger| {
            if token.is_empty() {
                return Err(FreedomError::Validation(vec![ValidationErrorType::InvalidToken]));
            }
            let payment_id = payment
                .payment_id
                .parse::<i64>()
                .map_err(|_| FreedomError::Validation(vec![ValidationErrorType::InvalidPaymentId]))?;
            ledger.confirm(payment_id)
        })
        .await
    }
}

impl LegacySdk for MockProcessor {
    fn set_configuration(&self, configuration: LegacyConfiguration) {
        lock(&self.legacy_configurations).push(configuration);
    }

    fn set_payment_view(&self, view: SurfaceToken) {
        lock(&self.views).push(view);
    }

    fn create_payment(&self, params: LegacyPaymentParams, callback: Callback<LegacyPayment>) {
        self.answer(callback, move |ledger| {
            let payment_id = ledger.create(params.amount, params.order_id)?;
            Ok(legacy_payment(ledger.response(payment_id, ResponseStatus::Success)))
        })
    }

    fn create_recurring_payment(
        &self,
        params: LegacyPaymentParams,
        recurring_profile: String,
        callback: Callback<LegacyRecurringPayment>,
    ) {
        self.answer(callback, move |ledger| {
            let payment_id = ledger.create(params.amount, params.order_id)?;
            Ok(LegacyRecurringPayment {
                status: Some("ok".to_string()),
                payment_id: Some(payment_id),
                currency: Some(CURRENCY.to_string()),
                amount: Some(params.amount),
                recurring_profile: Some(recurring_profile),
            })
        })
    }

    fn create_card_payment(
        &self,
        params: LegacyPaymentParams,
        card_id: i64,
        callback: Callback<LegacyPayment>,
    ) {
        self.answer(callback, move |ledger| {
            ledger
                .pay_with_card(params.amount, params.order_id, CardLookup::Id(card_id))
                .map(legacy_payment)
        })
    }

    fn pay_by_card(&self, payment_id: i64, callback: Callback<LegacyPayment>) {
        self.answer(callback, move |ledger| ledger.confirm(payment_id).map(legacy_payment))
    }

    fn get_payment_status(&self, payment_id: i64, callback: Callback<LegacyStatus>) {
        self.answer(callback, move |ledger| {
            let status = ledger.status(payment_id)?;
            Ok(LegacyStatus {
                status: status.status,
                payment_id: status.payment_id,
                transaction_status: status.payment_status,
                can_reject: status.can_reject,
                is_captured: status.captured,
                card_pan: status.card_pan,
                create_date: status.create_date,
            })
        })
    }

    fn make_revoke_payment(&self, payment_id: i64, amount: f64, callback: Callback<LegacyPayment>) {
        self.answer(callback, move |ledger| {
            ledger.revoke(payment_id, amount).map(legacy_payment)
        })
    }

    fn make_clearing_payment(
        &self,
        payment_id: i64,
        amount: Option<f64>,
        callback: Callback<LegacyCapture>,
    ) {
        self.answer(callback, move |ledger| {
            let capture = match ledger.clear(payment_id, amount)? {
                NativeClearingStatus::Success { amount } => LegacyCapture {
                    status: Some("ok".to_string()),
                    amount: Some(amount),
                    clear_amount: Some(amount),
                },
                NativeClearingStatus::ExceedsPaymentAmount => LegacyCapture {
                    status: Some("exceeds".to_string()),
                    ..LegacyCapture::default()
                },
                NativeClearingStatus::Failed | NativeClearingStatus::Other(_) => LegacyCapture {
                    status: Some("error".to_string()),
                    ..LegacyCapture::default()
                },
            };
            Ok(capture)
        })
    }

    fn make_cancel_payment(&self, payment_id: i64, callback: Callback<LegacyPayment>) {
        self.answer(callback, move |ledger| ledger.cancel(payment_id).map(legacy_payment))
    }

    fn add_new_card(
        &self,
        user_id: String,
        _post_link: Option<String>,
        callback: Callback<LegacyPayment>,
    ) {
        self.answer(callback, move |ledger| ledger.add_card(user_id).map(legacy_payment))
    }

    fn remove_added_card(&self, card_id: i64, user_id: String, callback: Callback<LegacyCard>) {
        self.answer(callback, move |ledger| {
            let merchant_id = ledger.merchant_id.clone();
            let removed = ledger.remove_card(CardLookup::Id(card_id), &user_id)?;
            Ok(LegacyCard {
                status: Some(removed.status),
                merchant_id: Some(merchant_id),
                card_id: Some(card_id),
                recurring_profile: None,
                card_hash: Some(removed.card_hash),
                date: Some(removed.deleted_at),
            })
        })
    }

    fn get_added_cards(&self, user_id: String, callback: Callback<Vec<LegacyCard>>) {
        self.answer(callback, move |ledger| {
            Ok(ledger
                .cards(&user_id)
                .into_iter()
                .map(|card| LegacyCard {
                    status: Some("approved".to_string()),
                    merchant_id: Some(ledger.merchant_id.clone()),
                    card_id: Some(card.id),
                    recurring_profile: card.recurring_profile.clone(),
                    card_hash: Some(card.hash.clone()),
                    date: Some(card.created_at.clone()),
                })
                .collect())
        })
    }
}

/// Connector opening one `MockProcessor` per `initialize`
pub struct MockConnector {
    behavior: MockBehavior,
    latency: Option<Duration>,
    processors: Mutex<Vec<Arc<MockProcessor>>>,
}

impl MockConnector {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            latency: None,
            processors: Mutex::new(Vec::new()),
        }
    }

    /// Builder: processors opened from now on delay every answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn open(&self, credentials: &Credentials) -> Arc<MockProcessor> {
        let mut processor = MockProcessor::new(credentials.merchant_id.clone(), self.behavior);
        if let Some(latency) = self.latency {
            processor = processor.with_latency(latency);
        }
        let processor = Arc::new(processor);
        lock(&self.processors).push(processor.clone());
        processor
    }

    /// Most recently opened processor
    pub fn latest(&self) -> Option<Arc<MockProcessor>> {
        lock(&self.processors).last().cloned()
    }

    /// Merchant ids of every session opened, oldest first
    pub fn connections(&self) -> Vec<String> {
        lock(&self.processors).iter().map(|p| p.merchant_id()).collect()
    }
}

impl SdkConnector for MockConnector {
    fn connect_current(&self, credentials: &Credentials) -> BridgeResult<Arc<dyn FreedomSdk>> {
        Ok(self.open(credentials))
    }

    fn connect_legacy(&self, credentials: &Credentials) -> BridgeResult<Arc<dyn LegacySdk>> {
        Ok(self.open(credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(amount: f64) -> StandardPaymentRequest {
        StandardPaymentRequest {
            amount,
            description: "Order".into(),
            user_id: None,
            order_id: Some("o-1".into()),
            extra_params: HashMap::new(),
        }
    }

    #[test]
    fn test_behavior_parsing() {
        assert_eq!("TIMEOUT".parse::<MockBehavior>().unwrap(), MockBehavior::Timeout);
        assert!("explode".parse::<MockBehavior>().is_err());
        assert_eq!(MockBehavior::default().to_string(), "approve");
    }

    #[tokio::test]
    async fn test_ledger_lifecycle() {
        let processor = MockProcessor::new("555", MockBehavior::Approve);

        let payment = processor.create_payment_page(standard(100.0)).await.unwrap();
        assert_eq!(payment.merchant_id, "555");
        assert_eq!(payment.order_id.as_deref(), Some("o-1"));

        let cleared = FreedomSdk::make_clearing_payment(&processor, payment.payment_id, Some(150.0))
            .await
            .unwrap();
        assert_eq!(cleared, NativeClearingStatus::ExceedsPaymentAmount);

        let cleared = FreedomSdk::make_clearing_payment(&processor, payment.payment_id, None)
            .await
            .unwrap();
        assert_eq!(cleared, NativeClearingStatus::Success { amount: 100.0 });

        FreedomSdk::make_revoke_payment(&processor, payment.payment_id, 40.0).await.unwrap();
        let status = FreedomSdk::get_payment_status(&processor, payment.payment_id).await.unwrap();
        assert_eq!(status.revoked_amount, Some(40.0));
        assert_eq!(status.captured, Some(true));

        let err = FreedomSdk::make_revoke_payment(&processor, payment.payment_id, 80.0)
            .await
            .unwrap_err();
        assert_eq!(err, FreedomError::Validation(vec![ValidationErrorType::InvalidAmount]));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_by_processor() {
        let processor = MockProcessor::new("555", MockBehavior::Approve);
        let err = processor.create_payment_page(standard(0.0)).await.unwrap_err();
        assert!(matches!(err, FreedomError::Validation(_)));
    }

    #[tokio::test]
    async fn test_decline_and_timeout() {
        let processor = MockProcessor::new("555", MockBehavior::Decline);
        let err = FreedomSdk::get_payment_status(&processor, 1).await.unwrap_err();
        assert!(matches!(err, FreedomError::Transaction { code: DECLINE_CODE, .. }));

        processor.set_behavior(MockBehavior::Timeout);
        let err = FreedomSdk::make_cancel_payment(&processor, 1).await.unwrap_err();
        assert_eq!(err, FreedomError::Network(NetworkError::ConnectionTimeout));
    }

    #[test]
    fn test_silent_legacy_holds_callbacks() {
        let processor = MockProcessor::new("555", MockBehavior::Silent);
        processor.pay_by_card(1, Box::new(|_, _| panic!("silent processor answered")));
        assert_eq!(processor.held_callbacks(), 1);

        processor.drop_held_callbacks();
        assert_eq!(processor.held_callbacks(), 0);
    }

    #[test]
    fn test_legacy_cards_by_id() {
        let processor = MockProcessor::new("555", MockBehavior::Approve);
        let added = Arc::new(Mutex::new(None));

        let slot = added.clone();
        LegacySdk::add_new_card(
            &processor,
            "u1".into(),
            None,
            Box::new(move |value, _| *slot.lock().unwrap() = value),
        );
        let card_id = added.lock().unwrap().clone().unwrap().payment_id.unwrap();

        let listed = Arc::new(Mutex::new(None));
        let slot = listed.clone();
        LegacySdk::get_added_cards(
            &processor,
            "u1".into(),
            Box::new(move |value, _| *slot.lock().unwrap() = value),
        );
        let cards = listed.lock().unwrap().clone().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].card_id, Some(card_id));
    }
}
