//! # Command Router
//!
//! Entry point of the bridge. A static table maps each command name to a
//! `HandlerDescriptor`; dispatch walks the fixed pipeline
//!
//! ```text
//! lookup ─▶ initialized? ─▶ capability? ─▶ validate ─▶ overlay ─▶ adapter ─▶ deliver
//! ```
//!
//! and every step that fails short-circuits into a delivered reply.

use crate::adapter::{AdapterRegistry, BoxedProviderAdapter, Capability};
use crate::command::{Arguments, Command, Reply};
use crate::config::{ConfigField, ProviderConfiguration};
use crate::dispatch::{Completion, CompletionDispatcher, ImmediateContext, UiContext};
use crate::error::{BridgeResult, ErrorDescriptor};
use crate::overlay::{HostSurface, OverlayManager, SurfaceToken};
use crate::validate::{self, ProviderRequest, Validator};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{info, info_span, warn, Instrument};

/// What a command does once its descriptor is found
#[derive(Clone, Copy)]
pub enum HandlerKind {
    Initialize,
    Configure(ConfigField),
    Provider(Validator),
}

/// Static description of one command
#[derive(Clone, Copy)]
pub struct HandlerDescriptor {
    pub name: &'static str,
    pub kind: HandlerKind,
    pub capability: Option<Capability>,
    pub requires_overlay: bool,
    /// Reply key of the success value; `None` replies with `{}`
    pub success_key: Option<&'static str>,
}

impl HandlerDescriptor {
    const fn setter(name: &'static str, field: ConfigField) -> Self {
        Self {
            name,
            kind: HandlerKind::Configure(field),
            capability: None,
            requires_overlay: false,
            success_key: None,
        }
    }

    const fn provider(
        name: &'static str,
        capability: Capability,
        success_key: &'static str,
        validator: Validator,
    ) -> Self {
        Self {
            name,
            kind: HandlerKind::Provider(validator),
            capability: Some(capability),
            requires_overlay: false,
            success_key: Some(success_key),
        }
    }

    const fn interactive(mut self) -> Self {
        self.requires_overlay = true;
        self
    }
}

const COMMANDS: &[HandlerDescriptor] = &[
    HandlerDescriptor {
        name: "initialize",
        kind: HandlerKind::Initialize,
        capability: None,
        requires_overlay: false,
        success_key: None,
    },
    HandlerDescriptor::setter("setResultUrl", ConfigField::ResultUrl),
    HandlerDescriptor::setter("setCheckUrl", ConfigField::CheckUrl),
    HandlerDescriptor::setter("setUserPhone", ConfigField::UserPhone),
    HandlerDescriptor::setter("setUserContactEmail", ConfigField::UserContactEmail),
    HandlerDescriptor::setter("setUserEmail", ConfigField::UserEmail),
    HandlerDescriptor::provider(
        "createPayment",
        Capability::CreatePayment,
        "payment",
        validate::create_payment,
    )
    .interactive(),
    HandlerDescriptor::provider(
        "createCardPayment",
        Capability::CreateTokenizedPayment,
        "payment",
        validate::create_card_payment,
    ),
    HandlerDescriptor::provider(
        "createRecurringPayment",
        Capability::CreateRecurringPayment,
        "recurringPayment",
        validate::create_recurring_payment,
    ),
    HandlerDescriptor::provider(
        "payByCard",
        Capability::ConfirmCardPayment,
        "payment",
        validate::pay_by_card,
    ),
    HandlerDescriptor::provider(
        "getPaymentStatus",
        Capability::GetStatus,
        "status",
        validate::get_payment_status,
    ),
    HandlerDescriptor::provider(
        "makeRevokePayment",
        Capability::Revoke,
        "payment",
        validate::revoke_payment,
    ),
    HandlerDescriptor::provider(
        "makeClearingPayment",
        Capability::Clear,
        "capture",
        validate::clearing_payment,
    ),
    HandlerDescriptor::provider(
        "makeCancelPayment",
        Capability::Cancel,
        "payment",
        validate::cancel_payment,
    ),
    HandlerDescriptor::provider(
        "addNewCard",
        Capability::AddCard,
        "payment",
        validate::add_new_card,
    )
    .interactive(),
    HandlerDescriptor::provider(
        "removeAddedCard",
        Capability::RemoveCard,
        "card",
        validate::remove_added_card,
    ),
    HandlerDescriptor::provider(
        "getAddedCards",
        Capability::ListCards,
        "cards",
        validate::get_added_cards,
    ),
    HandlerDescriptor::provider(
        "createNonAcceptancePayment",
        Capability::ConfirmDirectPayment,
        "payment",
        validate::non_acceptance_payment,
    ),
    HandlerDescriptor::provider(
        "createWalletPayment",
        Capability::CreateWalletPayment,
        "paymentId",
        validate::create_wallet_payment,
    ),
    HandlerDescriptor::provider(
        "createGooglePayment",
        Capability::CreateWalletPayment,
        "paymentId",
        validate::create_wallet_payment,
    ),
    HandlerDescriptor::provider(
        "confirmWalletPayment",
        Capability::ConfirmWalletPayment,
        "payment",
        validate::confirm_wallet_payment,
    ),
    HandlerDescriptor::provider(
        "confirmGooglePayment",
        Capability::ConfirmWalletPayment,
        "payment",
        validate::confirm_wallet_payment,
    ),
];

/// Command name to handler table
pub struct CommandRegistry {
    handlers: HashMap<&'static str, HandlerDescriptor>,
}

impl CommandRegistry {
    /// The full command surface
    pub fn standard() -> Self {
        Self {
            handlers: COMMANDS.iter().map(|d| (d.name, *d)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted command names
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_payload<T: Serialize>(value: T) -> BridgeResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ErrorDescriptor::infrastructure(format!("failed to encode result: {}", e)))
}

impl ProviderRequest {
    /// Run the request against `adapter` and encode the canonical result
    pub async fn invoke(
        self,
        adapter: BoxedProviderAdapter,
        surface: Option<SurfaceToken>,
    ) -> BridgeResult<Value> {
        match self {
            ProviderRequest::CreatePayment(request) => {
                let surface = surface.ok_or_else(ErrorDescriptor::no_host_surface)?;
                to_payload(adapter.create_payment(request, surface).await?)
            }
            ProviderRequest::CreateTokenizedPayment(request) => {
                to_payload(adapter.create_tokenized_payment(request).await?)
            }
            ProviderRequest::CreateRecurringPayment(request) => {
                to_payload(adapter.create_recurring_payment(request).await?)
            }
            ProviderRequest::ConfirmCardPayment { payment_id } => {
                to_payload(adapter.confirm_card_payment(payment_id).await?)
            }
            ProviderRequest::GetStatus { payment_id } => {
                to_payload(adapter.get_status(payment_id).await?)
            }
            ProviderRequest::Revoke { payment_id, amount } => {
                to_payload(adapter.revoke(payment_id, amount).await?)
            }
            ProviderRequest::Clear { payment_id, amount } => {
                to_payload(adapter.clear(payment_id, amount).await?)
            }
            ProviderRequest::Cancel { payment_id } => to_payload(adapter.cancel(payment_id).await?),
            ProviderRequest::AddCard { user_id, post_link } => {
                let surface = surface.ok_or_else(ErrorDescriptor::no_host_surface)?;
                to_payload(adapter.add_card(user_id, post_link, surface).await?)
            }
            ProviderRequest::RemoveCard { card_id, user_id } => {
                to_payload(adapter.remove_card(card_id, user_id).await?)
            }
            ProviderRequest::ListCards { user_id } => {
                to_payload(adapter.list_cards(user_id).await?)
            }
            ProviderRequest::ConfirmDirectPayment { payment_id } => {
                to_payload(adapter.confirm_direct_payment(payment_id).await?)
            }
            ProviderRequest::CreateWalletPayment(request) => {
                let wallet = adapter.create_wallet_payment(request).await?;
                Ok(Value::String(wallet.payment_id))
            }
            ProviderRequest::ConfirmWalletPayment { payment_id, token } => {
                to_payload(adapter.confirm_wallet_payment(payment_id, token).await?)
            }
        }
    }
}

#[derive(Default)]
struct BridgeState {
    configuration: ProviderConfiguration,
    adapter: Option<BoxedProviderAdapter>,
}

/// The payment-command bridge.
///
/// `dispatch` must be called from within a tokio runtime.
pub struct Bridge {
    commands: CommandRegistry,
    adapters: AdapterRegistry,
    state: Mutex<BridgeState>,
    overlay: Arc<OverlayManager>,
    dispatcher: CompletionDispatcher,
}

impl Bridge {
    /// Bridge delivering replies inline on the completing task
    pub fn new(adapters: AdapterRegistry) -> Self {
        Self::with_ui_context(adapters, Arc::new(ImmediateContext))
    }

    pub fn with_ui_context(adapters: AdapterRegistry, ui: Arc<dyn UiContext>) -> Self {
        let overlay = Arc::new(OverlayManager::new());
        Self {
            commands: CommandRegistry::standard(),
            adapters,
            state: Mutex::new(BridgeState::default()),
            dispatcher: CompletionDispatcher::new(Arc::clone(&overlay), ui),
            overlay,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Host view became available
    pub fn attach_surface(&self, host: Arc<dyn HostSurface>) {
        self.overlay.attach(host);
    }

    /// Host view went away; any presented overlay is torn down
    pub fn detach_surface(&self) {
        self.overlay.detach();
    }

    /// Bridge detached from its runtime.
    ///
    /// Drops the adapter and configuration, tears down the overlay and
    /// silences every reply still in flight.
    pub fn teardown(&self) {
        {
            let mut state = self.lock();
            *state = BridgeState::default();
        }
        self.dispatcher.invalidate();
        self.overlay.release_all();
        info!("Bridge torn down");
    }

    pub fn configuration(&self) -> ProviderConfiguration {
        self.lock().configuration.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().adapter.is_some()
    }

    /// Name of the active provider generation
    pub fn provider_name(&self) -> Option<&'static str> {
        self.lock().adapter.as_ref().map(|a| a.provider_name())
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn overlay(&self) -> &Arc<OverlayManager> {
        &self.overlay
    }

    /// Dispatch one command; exactly one reply is sent on `reply_to`,
    /// unless the bridge is re-initialized or torn down before it completes.
    pub fn dispatch(&self, command: Command, reply_to: oneshot::Sender<Reply>) {
        let Some(descriptor) = self.commands.get(command.name()).copied() else {
            warn!("Unknown command {}", command.name());
            let _ = reply_to.send(Reply::NotImplemented);
            return;
        };

        match descriptor.kind {
            HandlerKind::Initialize => {
                let reply = Reply::from_result(
                    None,
                    self.initialize(command.arguments()).map(|_| Value::Null),
                );
                // Begun after the generation bump so this reply is current
                self.dispatcher.begin(descriptor.name, reply_to).deliver(reply);
            }
            HandlerKind::Configure(field) => {
                let reply = Reply::from_result(
                    None,
                    self.configure(field, command.arguments()).map(|_| Value::Null),
                );
                self.dispatcher.begin(descriptor.name, reply_to).deliver(reply);
            }
            HandlerKind::Provider(validator) => {
                let completion = self.dispatcher.begin(descriptor.name, reply_to);
                self.dispatch_provider(&descriptor, validator, &command, completion);
            }
        }
    }

    /// Dispatch and wait for the reply. `None` means the reply was dropped
    /// as stale.
    pub async fn call(&self, command: Command) -> Option<Reply> {
        let (reply_to, reply) = oneshot::channel();
        self.dispatch(command, reply_to);
        reply.await.ok()
    }

    fn dispatch_provider(
        &self,
        descriptor: &HandlerDescriptor,
        validator: Validator,
        command: &Command,
        completion: Completion,
    ) {
        let key = descriptor.success_key;
        let span = info_span!(
            "command",
            name = %command.name(),
            invocation = %completion.invocation()
        );
        let _entered = span.enter();

        let fail = |error: ErrorDescriptor| {
            completion.deliver(Reply::failure(key, &error));
        };

        let adapter = self.lock().adapter.clone();
        let Some(adapter) = adapter else {
            return fail(ErrorDescriptor::not_initialized());
        };

        if let Some(capability) = descriptor.capability {
            if !adapter.supports(capability) {
                warn!(
                    "{} is not supported by {}",
                    command.name(),
                    adapter.provider_name()
                );
                return fail(ErrorDescriptor::unsupported(command.name()));
            }
        }

        let request = match validator(command.arguments()) {
            Ok(request) => request,
            Err(error) => return fail(error),
        };

        let surface = if descriptor.requires_overlay {
            match self.overlay.acquire(command.name()) {
                Ok(lease) => {
                    let token = lease.token();
                    completion.hold(lease);
                    Some(token)
                }
                Err(error) => return fail(error),
            }
        } else {
            None
        };

        let task_span = span.clone();
        tokio::spawn(
            async move {
                // Inner task so a panicking adapter surfaces as a JoinError
                let outcome = tokio::spawn(request.invoke(adapter, surface)).await;
                let result = outcome.unwrap_or_else(|join_error| {
                    warn!("Adapter task failed: {}", join_error);
                    Err(ErrorDescriptor::infrastructure(join_error.to_string()))
                });
                completion.deliver(Reply::from_result(key, result));
            }
            .instrument(task_span),
        );
    }

    fn initialize(&self, arguments: &Arguments) -> BridgeResult<()> {
        let request = validate::initialize(arguments)?;

        if let Some(requested) = request.provider.as_deref() {
            if !self.adapters.has_provider(requested) {
                warn!("Unknown provider {}, using the default", requested);
            }
        }
        let factory = self
            .adapters
            .get_or_default(request.provider.as_deref())
            .ok_or_else(|| ErrorDescriptor::infrastructure("no provider adapter is registered"))?;
        let adapter = factory.create(&request.credentials)?;

        {
            let mut state = self.lock();
            state.configuration.credentials = Some(request.credentials);
            adapter.apply_configuration(&state.configuration);
            info!(
                "Initialized {} for merchant {}",
                adapter.provider_name(),
                state.configuration.merchant_id().unwrap_or_default()
            );
            state.adapter = Some(adapter);
        }

        self.dispatcher.invalidate();
        self.overlay.release_all();
        Ok(())
    }

    fn configure(&self, field: ConfigField, arguments: &Arguments) -> BridgeResult<()> {
        let value = validate::setter_value(arguments, field.argument())?;

        let mut state = self.lock();
        state.configuration.set(field, value);
        if let Some(adapter) = &state.adapter {
            adapter.apply_configuration(&state.configuration);
        }
        Ok(())
    }
}
