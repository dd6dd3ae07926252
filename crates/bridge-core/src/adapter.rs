//! # Provider Adapter Trait
//!
//! Capability-qualified contract every payment backend implements.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   ProviderAdapter (trait)                   │
//! │  ├── capabilities()                                         │
//! │  ├── apply_configuration()                                  │
//! │  └── create_payment() / get_status() / list_cards() / ...   │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┼─────────────────┐
//!          │                 │                 │
//!  ┌───────┴───────┐ ┌───────┴───────┐ ┌───────┴────────┐
//!  │CurrentAdapter │ │ LegacyAdapter │ │ Unsupported    │
//!  │               │ │               │ │ Adapter        │
//!  └───────────────┘ └───────────────┘ └────────────────┘
//! ```
//!
//! Every method has a default body answering `UNSUPPORTED`, so an adapter
//! only overrides what its `CapabilitySet` declares. The router consults the
//! set before calling, so the defaults are only reached by direct callers.

use crate::config::{Credentials, ProviderConfiguration};
use crate::error::{BridgeResult, ErrorDescriptor};
use crate::model::{
    Amount, CardRecord, ClearingResult, PaymentRequest, PaymentResult, RecurringPaymentRequest,
    RemovedCardRecord, StatusRecord, WalletPayment,
};
use crate::overlay::SurfaceToken;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An operation an adapter may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreatePayment,
    CreateTokenizedPayment,
    CreateRecurringPayment,
    ConfirmCardPayment,
    GetStatus,
    Revoke,
    Clear,
    Cancel,
    AddCard,
    RemoveCard,
    ListCards,
    ConfirmDirectPayment,
    CreateWalletPayment,
    ConfirmWalletPayment,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
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
        Capability::ConfirmDirectPayment,
        Capability::CreateWalletPayment,
        Capability::ConfirmWalletPayment,
    ];

    /// Canonical command name that exercises this capability
    pub fn command(&self) -> &'static str {
        match self {
            Capability::CreatePayment => "createPayment",
            Capability::CreateTokenizedPayment => "createCardPayment",
            Capability::CreateRecurringPayment => "createRecurringPayment",
            Capability::ConfirmCardPayment => "payByCard",
            Capability::GetStatus => "getPaymentStatus",
            Capability::Revoke => "makeRevokePayment",
            Capability::Clear => "makeClearingPayment",
            Capability::Cancel => "makeCancelPayment",
            Capability::AddCard => "addNewCard",
            Capability::RemoveCard => "removeAddedCard",
            Capability::ListCards => "getAddedCards",
            Capability::ConfirmDirectPayment => "createNonAcceptancePayment",
            Capability::CreateWalletPayment => "createWalletPayment",
            Capability::ConfirmWalletPayment => "confirmWalletPayment",
        }
    }

    fn bit(&self) -> u32 {
        1 << (*self as u32)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Set of capabilities, known statically per adapter
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet {
    bits: u32,
}

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn all() -> Self {
        Self::of(&Capability::ALL)
    }

    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities
            .iter()
            .fold(Self::empty(), |set, c| set.with(*c))
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.bits |= capability.bit();
        self
    }

    pub fn without(mut self, capability: Capability) -> Self {
        self.bits &= !capability.bit();
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.bits & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

fn unsupported<T>(capability: Capability) -> BridgeResult<T> {
    Err(ErrorDescriptor::unsupported(capability.command()))
}

/// Core trait for payment backends.
///
/// Every method resolves to a canonical value or an `ErrorDescriptor`;
/// provider-native types never leave the implementation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Get the provider name (for logging and selection)
    fn provider_name(&self) -> &'static str;

    /// Operations this adapter implements
    fn capabilities(&self) -> CapabilitySet;

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Apply the full configuration; called after every mutation
    fn apply_configuration(&self, configuration: &ProviderConfiguration);

    /// Present the hosted payment page on `surface`
    async fn create_payment(
        &self,
        request: PaymentRequest,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        let _ = (request, surface);
        unsupported(Capability::CreatePayment)
    }

    async fn create_tokenized_payment(&self, request: PaymentRequest) -> BridgeResult<PaymentResult> {
        let _ = request;
        unsupported(Capability::CreateTokenizedPayment)
    }

    async fn create_recurring_payment(
        &self,
        request: RecurringPaymentRequest,
    ) -> BridgeResult<PaymentResult> {
        let _ = request;
        unsupported(Capability::CreateRecurringPayment)
    }

    async fn confirm_card_payment(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        let _ = payment_id;
        unsupported(Capability::ConfirmCardPayment)
    }

    async fn get_status(&self, payment_id: i64) -> BridgeResult<StatusRecord> {
        let _ = payment_id;
        unsupported(Capability::GetStatus)
    }

    async fn revoke(&self, payment_id: i64, amount: Amount) -> BridgeResult<PaymentResult> {
        let _ = (payment_id, amount);
        unsupported(Capability::Revoke)
    }

    async fn clear(&self, payment_id: i64, amount: Option<Amount>) -> BridgeResult<ClearingResult> {
        let _ = (payment_id, amount);
        unsupported(Capability::Clear)
    }

    async fn cancel(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        let _ = payment_id;
        unsupported(Capability::Cancel)
    }

    /// Present the card-registration page on `surface`
    async fn add_card(
        &self,
        user_id: String,
        post_link: Option<String>,
        surface: SurfaceToken,
    ) -> BridgeResult<PaymentResult> {
        let _ = (user_id, post_link, surface);
        unsupported(Capability::AddCard)
    }

    async fn remove_card(&self, card_id: i64, user_id: String) -> BridgeResult<RemovedCardRecord> {
        let _ = (card_id, user_id);
        unsupported(Capability::RemoveCard)
    }

    async fn list_cards(&self, user_id: String) -> BridgeResult<Vec<CardRecord>> {
        let _ = user_id;
        unsupported(Capability::ListCards)
    }

    async fn confirm_direct_payment(&self, payment_id: i64) -> BridgeResult<PaymentResult> {
        let _ = payment_id;
        unsupported(Capability::ConfirmDirectPayment)
    }

    async fn create_wallet_payment(&self, request: PaymentRequest) -> BridgeResult<WalletPayment> {
        let _ = request;
        unsupported(Capability::CreateWalletPayment)
    }

    async fn confirm_wallet_payment(
        &self,
        payment_id: String,
        token: String,
    ) -> BridgeResult<PaymentResult> {
        let _ = (payment_id, token);
        unsupported(Capability::ConfirmWalletPayment)
    }
}

/// Type alias for a shared adapter (dynamic dispatch)
pub type BoxedProviderAdapter = Arc<dyn ProviderAdapter>;

/// Adapter that supports nothing.
///
/// Stands in for a backend that is not available on the running platform.
#[derive(Debug, Default)]
pub struct UnsupportedAdapter;

#[async_trait]
impl ProviderAdapter for UnsupportedAdapter {
    fn provider_name(&self) -> &'static str {
        "unsupported"
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::empty()
    }

    fn apply_configuration(&self, _configuration: &ProviderConfiguration) {}
}

/// Builds an adapter for a set of credentials.
///
/// This is the `initialize` operation of a provider generation.
pub trait AdapterFactory: Send + Sync {
    fn provider_name(&self) -> &'static str;

    fn create(&self, credentials: &Credentials) -> BridgeResult<BoxedProviderAdapter>;
}

/// Type alias for a shared factory
pub type BoxedAdapterFactory = Arc<dyn AdapterFactory>;

/// Selects a provider generation by name
#[derive(Clone)]
pub struct AdapterRegistry {
    factories: HashMap<String, BoxedAdapterFactory>,
    default_provider: String,
}

impl AdapterRegistry {
    /// Create a new registry with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            factories: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, factory: BoxedAdapterFactory) {
        let name = factory.provider_name().to_string();
        self.factories.insert(name, factory);
    }

    /// Register with builder pattern
    pub fn with_factory(mut self, factory: BoxedAdapterFactory) -> Self {
        self.register(factory);
        self
    }

    pub fn default_factory(&self) -> Option<&BoxedAdapterFactory> {
        self.factories.get(&self.default_provider)
    }

    pub fn get(&self, provider: &str) -> Option<&BoxedAdapterFactory> {
        self.factories.get(provider)
    }

    /// Get factory or fall back to default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedAdapterFactory> {
        match provider {
            Some(p) => self.get(p).or_else(|| self.default_factory()),
            None => self.default_factory(),
        }
    }

    pub fn providers(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        self.factories.contains_key(provider)
    }
}
