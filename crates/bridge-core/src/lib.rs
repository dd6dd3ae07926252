//! # bridge-core
//!
//! Core types and traits for the freedompay payment-command bridge.
//!
//! This crate provides:
//! - `Bridge`, the command router host applications dispatch into
//! - `ProviderAdapter` trait and `AdapterRegistry` for provider generations
//! - `OverlayManager` owning the single transient payment view
//! - `CompletionDispatcher` for exactly-once reply delivery
//! - `ErrorDescriptor` and the canonical `ErrorCode` taxonomy
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_core::{AdapterRegistry, Bridge, Command};
//! use serde_json::json;
//!
//! let bridge = Bridge::new(AdapterRegistry::new("current").with_factory(factory));
//! bridge.attach_surface(host);
//!
//! bridge.call(Command::with_value("initialize", json!({ "merchantId": 123, "secretKey": "k" }))).await;
//!
//! let reply = bridge
//!     .call(Command::with_value("createPayment", json!({ "amount": 10.5, "description": "Order 42" })))
//!     .await;
//! ```

pub mod adapter;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod overlay;
pub mod router;
pub mod validate;

// Re-exports for convenience
pub use adapter::{
    AdapterFactory, AdapterRegistry, BoxedAdapterFactory, BoxedProviderAdapter, Capability,
    CapabilitySet, ProviderAdapter, UnsupportedAdapter,
};
pub use command::{Arguments, Command, Reply, ERROR_KEY};
pub use config::{
    ConfigField, Credentials, OperationalConfiguration, ProviderConfiguration, Region,
    UserConfiguration,
};
pub use dispatch::{Completion, CompletionDispatcher, ImmediateContext, UiContext, UiThread};
pub use error::{BridgeResult, ErrorCode, ErrorDescriptor, ErrorTier};
pub use model::{
    Amount, CardRecord, CardReference, ClearingResult, ClearingStatus, PaymentKind,
    PaymentRequest, PaymentResult, PaymentStatus, RecurringPaymentRequest, RemovedCardRecord,
    StatusRecord, WalletPayment,
};
pub use overlay::{HostSurface, OverlayHandle, OverlayLease, OverlayManager, SurfaceError, SurfaceToken};
pub use router::{Bridge, CommandRegistry, HandlerDescriptor, HandlerKind};
pub use validate::ProviderRequest;
