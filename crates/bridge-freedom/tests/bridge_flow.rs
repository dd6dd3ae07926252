//! End-to-end command flows against both provider generations.

use bridge_core::{Bridge, Command, ErrorCode, HostSurface, Reply, SurfaceError, SurfaceToken};
use bridge_freedom::{freedom_registry, MockBehavior, MockConnector, Platform};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Default)]
struct RecordingHost {
    next: AtomicU64,
    live: Mutex<Vec<SurfaceToken>>,
    dismissed: Mutex<Vec<SurfaceToken>>,
}

impl RecordingHost {
    fn live(&self) -> Vec<SurfaceToken> {
        self.live.lock().unwrap().clone()
    }

    fn dismissed(&self) -> Vec<SurfaceToken> {
        self.dismissed.lock().unwrap().clone()
    }

    fn presented(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl HostSurface for RecordingHost {
    fn present(&self, _command: &str) -> Result<SurfaceToken, SurfaceError> {
        let token = SurfaceToken::new(self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().unwrap().push(token);
        Ok(token)
    }

    fn dismiss(&self, token: SurfaceToken) {
        self.live.lock().unwrap().retain(|t| *t != token);
        self.dismissed.lock().unwrap().push(token);
    }
}

struct Harness {
    bridge: Bridge,
    connector: Arc<MockConnector>,
    host: Arc<RecordingHost>,
}

impl Harness {
    fn new(connector: MockConnector, platform: Platform) -> Self {
        let connector = Arc::new(connector);
        let bridge = Bridge::new(freedom_registry(connector.clone(), platform, "current"));
        let host = Arc::new(RecordingHost::default());
        bridge.attach_surface(host.clone());
        Self {
            bridge,
            connector,
            host,
        }
    }

    fn approving() -> Self {
        Self::new(MockConnector::new(MockBehavior::Approve), Platform::Android)
    }

    async fn call(&self, name: &str, arguments: Value) -> Reply {
        self.bridge
            .call(Command::with_value(name, arguments))
            .await
            .expect("reply delivered")
    }

    fn dispatch(&self, name: &str, arguments: Value) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.bridge.dispatch(Command::with_value(name, arguments), tx);
        rx
    }

    async fn initialize(&self, merchant_id: &str, provider: &str) {
        let reply = self
            .call(
                "initialize",
                json!({ "merchantId": merchant_id, "secretKey": "k", "provider": provider }),
            )
            .await;
        assert_eq!(reply.into_value(), json!({}));
    }
}

fn error_code(reply: &Reply) -> ErrorCode {
    reply.error().expect("error reply").code()
}

/// One of the success key and `error` is null, never both
fn assert_keyed(reply: &Reply, key: &str) {
    let success = reply.get(key).expect("success key present");
    let error = reply.get("error").expect("error key present");
    assert_ne!(success.is_null(), error.is_null(), "reply {:?}", reply);
}

fn payment_id(reply: &Reply) -> i64 {
    reply.get("payment").unwrap()["paymentId"].as_i64().unwrap()
}

#[tokio::test]
async fn test_not_initialized_then_initialized() {
    let harness = Harness::approving();

    let reply = harness.call("getPaymentStatus", json!({ "paymentId": 5 })).await;
    assert!(reply.get("status").unwrap().is_null());
    assert_eq!(error_code(&reply), ErrorCode::NotInitialized);

    let reply = harness
        .call("initialize", json!({ "merchantId": 123, "secretKey": "k" }))
        .await;
    assert_eq!(reply.into_value(), json!({}));
    assert_eq!(harness.bridge.provider_name(), Some("current"));
    assert_eq!(harness.connector.connections(), vec!["123".to_string()]);
}

#[tokio::test]
async fn test_invalid_arguments_acquire_no_overlay() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness
        .call("createPayment", json!({ "amount": -1, "description": "Order" }))
        .await;
    assert_keyed(&reply, "payment");
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);

    let reply = harness
        .call("createPayment", json!({ "amount": 10, "description": "" }))
        .await;
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);

    let reply = harness
        .call(
            "createCardPayment",
            json!({ "amount": 10, "description": "Order", "orderId": "o1", "userId": "u1" }),
        )
        .await;
    assert!(reply.get("payment").unwrap().is_null());
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);

    assert_eq!(harness.host.presented(), 0);
    assert_eq!(harness.bridge.overlay().grants(), 0);
}

#[tokio::test]
async fn test_unsupported_wallet_on_legacy() {
    let harness = Harness::approving();
    harness.initialize("555", "legacy").await;

    let reply = harness
        .call("createWalletPayment", json!({ "amount": 10, "description": "Order" }))
        .await;
    assert_eq!(
        reply.into_value(),
        json!({
            "paymentId": null,
            "error": {
                "errorCode": "UNSUPPORTED",
                "description": "createWalletPayment is not supported by the active provider",
                "details": null
            }
        })
    );

    let reply = harness
        .call("confirmGooglePayment", json!({ "paymentId": "1", "token": "gp" }))
        .await;
    assert_eq!(
        reply.error().unwrap().description,
        "confirmGooglePayment is not supported by the active provider"
    );
}

#[tokio::test]
async fn test_unknown_command_is_not_implemented() {
    let harness = Harness::approving();
    let reply = harness.call("refundEverything", json!({})).await;
    assert!(reply.is_not_implemented());
}

#[tokio::test]
async fn test_no_host_surface() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;
    harness.bridge.detach_surface();

    let reply = harness
        .call("createPayment", json!({ "amount": 10, "description": "Order" }))
        .await;
    assert_eq!(error_code(&reply), ErrorCode::NoHostSurface);
}

#[tokio::test(start_paused = true)]
async fn test_second_interactive_command_takes_the_overlay() {
    let harness = Harness::new(
        MockConnector::new(MockBehavior::Approve).with_latency(Duration::from_millis(50)),
        Platform::Android,
    );
    harness.initialize("555", "current").await;

    let first = harness.dispatch("createPayment", json!({ "amount": 10, "description": "A" }));
    let second = harness.dispatch("createPayment", json!({ "amount": 20, "description": "B" }));

    assert_eq!(harness.host.live(), vec![SurfaceToken::new(2)]);
    assert_eq!(harness.host.dismissed(), vec![SurfaceToken::new(1)]);

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(first.is_success());
    assert!(second.is_success());
    assert_ne!(payment_id(&first), payment_id(&second));

    assert!(harness.host.live().is_empty());
    assert_eq!(harness.host.presented(), 2);
    assert!(!harness.bridge.overlay().is_presenting());
}

#[tokio::test]
async fn test_reinitialize_applies_full_configuration() {
    let harness = Harness::approving();

    // Accepted before initialize and applied once an adapter exists
    let reply = harness
        .call("setResultUrl", json!({ "url": "https://merchant.kz/result" }))
        .await;
    assert_eq!(reply.into_value(), json!({}));

    harness.initialize("555", "current").await;
    let first = harness.connector.latest().unwrap();
    let applied = first.current_configurations();
    assert_eq!(
        applied[0].operational.result_url.as_deref(),
        Some("https://merchant.kz/result")
    );

    harness
        .call("setCheckUrl", json!({ "url": "https://merchant.kz/check" }))
        .await;
    harness.initialize("777", "current").await;

    let reply = harness
        .call("setUserPhone", json!({ "phone": "+77001112233" }))
        .await;
    assert!(reply.is_success());

    let second = harness.connector.latest().unwrap();
    let latest = second.current_configurations().last().cloned().unwrap();
    assert_eq!(latest.user.user_phone.as_deref(), Some("+77001112233"));
    assert_eq!(latest.operational.check_url.as_deref(), Some("https://merchant.kz/check"));
    assert_eq!(latest.operational.result_url.as_deref(), Some("https://merchant.kz/result"));

    // The replaced session receives nothing after re-initialization
    assert_eq!(first.current_configurations().len(), 2);

    let reply = harness
        .call("createPayment", json!({ "amount": 10, "description": "Order" }))
        .await;
    assert_eq!(reply.get("payment").unwrap()["merchantId"], "777");
    assert_eq!(
        harness.connector.connections(),
        vec!["555".to_string(), "777".to_string()]
    );
}

#[tokio::test]
async fn test_setter_requires_value() {
    let harness = Harness::approving();
    let reply = harness.call("setUserEmail", json!({})).await;
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);
}

#[tokio::test(start_paused = true)]
async fn test_reply_after_reinitialize_is_dropped() {
    let harness = Harness::new(
        MockConnector::new(MockBehavior::Approve).with_latency(Duration::from_millis(100)),
        Platform::Android,
    );
    harness.initialize("555", "current").await;

    let stale = harness.dispatch("createPayment", json!({ "amount": 10, "description": "A" }));
    assert_eq!(harness.host.live().len(), 1);

    harness.initialize("555", "current").await;
    assert!(harness.host.live().is_empty());

    assert!(stale.await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_silences_in_flight_replies() {
    let harness = Harness::new(
        MockConnector::new(MockBehavior::Approve).with_latency(Duration::from_millis(20)),
        Platform::Android,
    );
    harness.initialize("555", "legacy").await;

    let in_flight = harness.dispatch("getPaymentStatus", json!({ "paymentId": 1 }));
    harness.bridge.teardown();

    assert!(in_flight.await.is_err());
    assert!(!harness.bridge.is_initialized());

    let reply = harness.call("getPaymentStatus", json!({ "paymentId": 1 })).await;
    assert_eq!(error_code(&reply), ErrorCode::NotInitialized);
}

#[tokio::test]
async fn test_current_generation_lifecycle() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness
        .call(
            "createPayment",
            json!({
                "amount": 100,
                "description": "Order 42",
                "orderId": "42",
                "extraParams": { "pg_lifetime": 300 }
            }),
        )
        .await;
    assert_keyed(&reply, "payment");
    let payment = reply.get("payment").unwrap();
    assert_eq!(payment["status"], "Success");
    assert_eq!(payment["orderId"], "42");
    assert!(payment["redirectUrl"].is_null());
    let id = payment_id(&reply);

    let reply = harness
        .call("makeClearingPayment", json!({ "paymentId": id, "amount": 150 }))
        .await;
    assert_eq!(reply.get("capture").unwrap()["status"], "ExceedsPaymentAmount");

    let reply = harness.call("makeClearingPayment", json!({ "paymentId": id })).await;
    assert_keyed(&reply, "capture");
    assert_eq!(reply.get("capture").unwrap()["clearingAmount"], 100.0);

    let reply = harness
        .call("makeRevokePayment", json!({ "paymentId": id, "amount": 30.5 }))
        .await;
    assert_keyed(&reply, "payment");

    let reply = harness.call("getPaymentStatus", json!({ "paymentId": id })).await;
    let status = reply.get("status").unwrap();
    assert_eq!(status["isCaptured"], true);
    assert_eq!(status["revokedAmount"], 30.5);
    assert_eq!(status["currency"], "KZT");

    let reply = harness
        .call("makeRevokePayment", json!({ "paymentId": id, "amount": 500 }))
        .await;
    let error = reply.error().unwrap();
    assert_eq!(error.code(), ErrorCode::ValidationError);
    assert_eq!(error.description, "InvalidAmount");

    let reply = harness.call("createNonAcceptancePayment", json!({ "paymentId": id })).await;
    assert_keyed(&reply, "payment");

    let reply = harness.call("makeCancelPayment", json!({ "paymentId": 9999 })).await;
    assert_eq!(error_code(&reply), ErrorCode::TransactionError);
}

#[tokio::test]
async fn test_current_generation_cards() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness.call("addNewCard", json!({ "userId": "u1", "postLink": "https://m/p" })).await;
    assert_eq!(reply.get("payment").unwrap()["status"], "New");
    let card_id = payment_id(&reply);
    assert!(harness.host.live().is_empty());
    assert_eq!(harness.connector.latest().unwrap().views().len(), 1);

    let reply = harness.call("getAddedCards", json!({ "userId": "u1" })).await;
    let cards = reply.get("cards").unwrap().as_array().unwrap().clone();
    assert_eq!(cards.len(), 1);
    assert!(cards[0]["cardId"].is_null());
    let token = cards[0]["cardToken"].as_str().unwrap().to_string();

    let reply = harness
        .call(
            "createCardPayment",
            json!({
                "amount": 10, "description": "Order", "orderId": "o1", "userId": "u1",
                "cardToken": token
            }),
        )
        .await;
    assert_keyed(&reply, "payment");
    assert!(reply.is_success());

    // A bare card id is not enough for this generation
    let reply = harness
        .call(
            "createCardPayment",
            json!({
                "amount": 10, "description": "Order", "orderId": "o1", "userId": "u1",
                "cardId": card_id
            }),
        )
        .await;
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);

    let reply = harness
        .call("removeAddedCard", json!({ "cardId": card_id, "userId": "u1" }))
        .await;
    assert_keyed(&reply, "card");
    let card = reply.get("card").unwrap();
    assert_eq!(card["status"], "deleted");
    assert!(card["cardToken"].is_null());

    let reply = harness.call("getAddedCards", json!({ "userId": "u1" })).await;
    assert_eq!(reply.get("cards").unwrap(), &json!([]));
}

#[tokio::test]
async fn test_current_generation_recurring_unsupported() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness
        .call(
            "createRecurringPayment",
            json!({ "amount": 10, "description": "Monthly", "recurringProfile": 77 }),
        )
        .await;
    assert!(reply.get("recurringPayment").unwrap().is_null());
    assert_eq!(error_code(&reply), ErrorCode::Unsupported);
}

#[tokio::test]
async fn test_wallet_payments_by_platform() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness
        .call("createGooglePayment", json!({ "amount": 10, "description": "Order" }))
        .await;
    assert_keyed(&reply, "paymentId");
    let wallet_id = reply.get("paymentId").unwrap().as_str().unwrap().to_string();

    let reply = harness
        .call("confirmWalletPayment", json!({ "paymentId": wallet_id, "token": "gp-token" }))
        .await;
    assert!(reply.is_success());
    assert_eq!(reply.get("payment").unwrap()["status"], "Success");

    let ios = Harness::new(MockConnector::new(MockBehavior::Approve), Platform::Ios);
    ios.initialize("555", "current").await;
    let reply = ios
        .call("createWalletPayment", json!({ "amount": 10, "description": "Order" }))
        .await;
    assert_eq!(error_code(&reply), ErrorCode::Unsupported);
}

#[tokio::test]
async fn test_zero_amount_reaches_the_provider() {
    let harness = Harness::approving();
    harness.initialize("555", "current").await;

    let reply = harness
        .call("createPayment", json!({ "amount": 0, "description": "Free" }))
        .await;
    assert_eq!(error_code(&reply), ErrorCode::ValidationError);
    assert_eq!(harness.host.presented(), 1);
    assert!(harness.host.live().is_empty());
}

#[tokio::test]
async fn test_legacy_generation_lifecycle() {
    let harness = Harness::approving();
    harness.initialize("555", "legacy").await;

    let reply = harness.call("addNewCard", json!({ "userId": "u1" })).await;
    let card_id = payment_id(&reply);

    let reply = harness.call("getAddedCards", json!({ "userId": "u1" })).await;
    let cards = reply.get("cards").unwrap().as_array().unwrap().clone();
    assert_eq!(cards[0]["cardId"], card_id);
    assert!(cards[0]["cardToken"].is_null());

    let reply = harness
        .call(
            "createCardPayment",
            json!({
                "amount": 10, "description": "Order", "orderId": "o1", "userId": "u1",
                "cardId": card_id
            }),
        )
        .await;
    let payment = reply.get("payment").unwrap();
    assert_eq!(payment["status"], "Success");
    assert!(payment["redirectUrl"].as_str().unwrap().ends_with(&payment["paymentId"].to_string()));

    let reply = harness
        .call(
            "createCardPayment",
            json!({
                "amount": 10, "description": "Order", "orderId": "o1", "userId": "u1",
                "cardToken": "tok_1"
            }),
        )
        .await;
    assert_eq!(error_code(&reply), ErrorCode::InvalidArguments);

    let reply = harness
        .call(
            "createRecurringPayment",
            json!({ "amount": 25, "description": "Monthly", "recurringProfile": "rp-9" }),
        )
        .await;
    assert_keyed(&reply, "recurringPayment");
    assert_eq!(reply.get("recurringPayment").unwrap()["status"], "Success");

    let reply = harness.call("makeClearingPayment", json!({ "paymentId": 9999 })).await;
    assert_keyed(&reply, "capture");
    assert_eq!(error_code(&reply), ErrorCode::TransactionError);

    let reply = harness.call("createNonAcceptancePayment", json!({ "paymentId": 1 })).await;
    assert_eq!(error_code(&reply), ErrorCode::Unsupported);

    let reply = harness
        .call("removeAddedCard", json!({ "cardId": card_id, "userId": "u1" }))
        .await;
    assert_eq!(reply.get("card").unwrap()["cardId"], card_id);
}

#[tokio::test]
async fn test_provider_failures_per_generation() {
    let harness = Harness::new(MockConnector::new(MockBehavior::Decline), Platform::Android);

    harness.initialize("555", "current").await;
    let reply = harness.call("getPaymentStatus", json!({ "paymentId": 1 })).await;
    assert_keyed(&reply, "status");
    let error = reply.error().unwrap();
    assert_eq!(error.code(), ErrorCode::TransactionError);
    assert_eq!(error.description, "Card declined");
    assert_eq!(error.details.as_deref(), Some("transaction error 10: Card declined"));

    harness.initialize("555", "legacy").await;
    let reply = harness.call("getPaymentStatus", json!({ "paymentId": 1 })).await;
    let error = reply.error().unwrap();
    assert_eq!(error.code(), ErrorCode::TransactionError);
    assert_eq!(error.details.as_deref(), Some("code 10: Card declined"));

    let timeouts = Harness::new(MockConnector::new(MockBehavior::Timeout), Platform::Android);
    timeouts.initialize("555", "current").await;
    let reply = timeouts.call("makeCancelPayment", json!({ "paymentId": 1 })).await;
    assert_eq!(error_code(&reply), ErrorCode::ConnectionTimeout);

    timeouts.initialize("555", "legacy").await;
    let reply = timeouts.call("makeCancelPayment", json!({ "paymentId": 1 })).await;
    assert_eq!(error_code(&reply), ErrorCode::NetworkUnknown);
}

#[tokio::test]
async fn test_dropped_legacy_callback_is_infrastructure_error() {
    let harness = Harness::new(MockConnector::new(MockBehavior::Silent), Platform::Android);
    harness.initialize("555", "legacy").await;
    let processor = harness.connector.latest().unwrap();

    let pending = harness.dispatch("payByCard", json!({ "paymentId": 1 }));
    while processor.held_callbacks() == 0 {
        tokio::task::yield_now().await;
    }
    processor.drop_held_callbacks();

    let reply = pending.await.unwrap();
    assert_keyed(&reply, "payment");
    let error = reply.error().unwrap();
    assert_eq!(error.code(), ErrorCode::InfrastructureError);
    assert!(error.details.unwrap().contains("dropped"));
}
