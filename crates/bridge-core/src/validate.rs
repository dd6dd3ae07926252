//! # Argument Validation
//!
//! Extracts and type-checks named arguments, producing a typed request or a
//! single `INVALID_ARGUMENTS` descriptor that lists every offending field.
//! Nothing here touches an adapter or the overlay.
//!
//! Only presence and type are checked, plus the sign of amounts. Business
//! rules (limits, currencies) belong to the provider.

use crate::command::Arguments;
use crate::config::{Credentials, Region};
use crate::error::{BridgeResult, ErrorDescriptor};
use crate::model::{Amount, CardReference, PaymentKind, PaymentRequest, RecurringPaymentRequest};
use serde_json::Value;
use std::collections::HashMap;

/// Reads arguments and records every problem found
pub struct ArgumentReader<'a> {
    arguments: &'a Arguments,
    problems: Vec<String>,
}

impl<'a> ArgumentReader<'a> {
    pub fn new(arguments: &'a Arguments) -> Self {
        Self {
            arguments,
            problems: Vec::new(),
        }
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.arguments.get(key).filter(|v| !v.is_null())
    }

    fn reject<T>(&mut self, problem: String) -> BridgeResult<T> {
        let err = ErrorDescriptor::invalid_arguments(&[problem.as_str()]);
        self.problems.push(problem);
        Err(err)
    }

    /// Non-empty string
    pub fn string(&mut self, key: &str) -> BridgeResult<String> {
        match self.present(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => self.reject(format!("{} (must not be empty)", key)),
            Some(_) => self.reject(format!("{} (expected string)", key)),
            None => self.reject(key.to_string()),
        }
    }

    /// Optional string; empty strings count as absent
    pub fn optional_string(&mut self, key: &str) -> Option<String> {
        match self.present(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(_) => {
                let _ = self.reject::<()>(format!("{} (expected string)", key));
                None
            }
        }
    }

    /// Integer, or a float with no fractional part
    pub fn integer(&mut self, key: &str) -> BridgeResult<i64> {
        match self.present(key) {
            Some(value) => match as_integer(value) {
                Some(n) => Ok(n),
                None => self.reject(format!("{} (expected integer)", key)),
            },
            None => self.reject(key.to_string()),
        }
    }

    /// Identifier given either as a non-empty string or an integer
    pub fn identifier(&mut self, key: &str) -> BridgeResult<String> {
        match self.present(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(value) => match as_integer(value) {
                Some(n) => Ok(n.to_string()),
                None => self.reject(format!("{} (expected string or integer)", key)),
            },
            None => self.reject(key.to_string()),
        }
    }

    /// Non-negative number, integer or float, coerced to minor units
    pub fn amount(&mut self, key: &str) -> BridgeResult<Amount> {
        match self.present(key) {
            Some(_) => match self.optional_amount(key) {
                Some(amount) => Ok(amount),
                None => Err(ErrorDescriptor::invalid_arguments(&[key])),
            },
            None => self.reject(key.to_string()),
        }
    }

    pub fn optional_amount(&mut self, key: &str) -> Option<Amount> {
        let value = self.present(key)?;
        let problem = match value.as_f64().map(Amount::from_decimal) {
            Some(Some(amount)) if amount.is_negative() => "must not be negative",
            Some(Some(amount)) => return Some(amount),
            Some(None) => "out of range",
            None => "expected number",
        };
        let _ = self.reject::<()>(format!("{} ({})", key, problem));
        None
    }

    /// Optional map of extra parameters; values are stringified
    pub fn extra_params(&mut self, key: &str) -> HashMap<String, String> {
        match self.present(key) {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            Some(_) => {
                let _ = self.reject::<()>(format!("{} (expected map)", key));
                HashMap::new()
            }
            None => HashMap::new(),
        }
    }

    /// Fails with every recorded problem, if any
    pub fn finish(self) -> BridgeResult<()> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ErrorDescriptor::invalid_arguments(&self.problems))
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Validated request for a provider-backed command
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    CreatePayment(PaymentRequest),
    CreateTokenizedPayment(PaymentRequest),
    CreateRecurringPayment(RecurringPaymentRequest),
    ConfirmCardPayment { payment_id: i64 },
    GetStatus { payment_id: i64 },
    Revoke { payment_id: i64, amount: Amount },
    Clear { payment_id: i64, amount: Option<Amount> },
    Cancel { payment_id: i64 },
    AddCard { user_id: String, post_link: Option<String> },
    RemoveCard { card_id: i64, user_id: String },
    ListCards { user_id: String },
    ConfirmDirectPayment { payment_id: i64 },
    CreateWalletPayment(PaymentRequest),
    ConfirmWalletPayment { payment_id: String, token: String },
}

/// Validator signature stored in the command registry
pub type Validator = fn(&Arguments) -> BridgeResult<ProviderRequest>;

/// Validated `initialize` arguments
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeRequest {
    pub credentials: Credentials,
    /// Requested provider generation, if any
    pub provider: Option<String>,
}

pub fn initialize(arguments: &Arguments) -> BridgeResult<InitializeRequest> {
    let mut args = ArgumentReader::new(arguments);
    let merchant_id = args.identifier("merchantId");
    let secret_key = args.string("secretKey");
    let region = match args.optional_string("region") {
        Some(raw) => match raw.parse::<Region>() {
            Ok(region) => Some(region),
            Err(_) => {
                let _ = args.reject::<()>(format!("region (unknown value {})", raw));
                None
            }
        },
        None => None,
    };
    let provider = args.optional_string("provider");
    args.finish()?;

    Ok(InitializeRequest {
        credentials: Credentials::new(merchant_id?, secret_key?, region.unwrap_or_default()),
        provider,
    })
}

/// Value for a configuration setter
pub fn setter_value(arguments: &Arguments, key: &str) -> BridgeResult<String> {
    let mut args = ArgumentReader::new(arguments);
    let value = args.string(key);
    args.finish()?;
    value
}

fn payment_request(args: &mut ArgumentReader<'_>, kind: PaymentKind) -> BridgeResult<PaymentRequest> {
    let amount = args.amount("amount");
    let description = args.string("description");
    let order_id = args.optional_string("orderId");
    let user_id = args.optional_string("userId");
    let extra_params = args.extra_params("extraParams");
    let (amount, description) = (amount?, description?);

    Ok(PaymentRequest {
        kind,
        amount,
        description,
        order_id,
        user_id,
        extra_params,
    })
}

pub fn create_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let request = payment_request(&mut args, PaymentKind::Standard);
    args.finish()?;
    Ok(ProviderRequest::CreatePayment(request?))
}

pub fn create_card_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let card = match args.optional_string("cardToken") {
        Some(token) => Ok(CardReference::Token(token)),
        None => match args.present("cardId") {
            Some(_) => args.integer("cardId").map(CardReference::Id),
            None => args.reject("cardToken or cardId".to_string()),
        },
    };
    let order_id = args.string("orderId");
    let user_id = args.string("userId");
    let request = payment_request(&mut args, PaymentKind::Standard);
    args.finish()?;

    let mut request = request?;
    request.kind = PaymentKind::Tokenized(card?);
    request.order_id = Some(order_id?);
    request.user_id = Some(user_id?);
    Ok(ProviderRequest::CreateTokenizedPayment(request))
}

pub fn create_recurring_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let amount = args.amount("amount");
    let description = args.string("description");
    let recurring_profile = args.identifier("recurringProfile");
    let order_id = args.optional_string("orderId");
    let extra_params = args.extra_params("extraParams");
    args.finish()?;

    Ok(ProviderRequest::CreateRecurringPayment(RecurringPaymentRequest {
        amount: amount?,
        description: description?,
        recurring_profile: recurring_profile?,
        order_id,
        extra_params,
    }))
}

fn payment_id_only(arguments: &Arguments) -> BridgeResult<i64> {
    let mut args = ArgumentReader::new(arguments);
    let payment_id = args.integer("paymentId");
    args.finish()?;
    payment_id
}

pub fn pay_by_card(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let payment_id = payment_id_only(arguments)?;
    Ok(ProviderRequest::ConfirmCardPayment { payment_id })
}

pub fn get_payment_status(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let payment_id = payment_id_only(arguments)?;
    Ok(ProviderRequest::GetStatus { payment_id })
}

pub fn revoke_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let payment_id = args.integer("paymentId");
    let amount = args.amount("amount");
    args.finish()?;
    Ok(ProviderRequest::Revoke {
        payment_id: payment_id?,
        amount: amount?,
    })
}

pub fn clearing_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let payment_id = args.integer("paymentId");
    let amount = args.optional_amount("amount");
    args.finish()?;
    Ok(ProviderRequest::Clear {
        payment_id: payment_id?,
        amount,
    })
}

pub fn cancel_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let payment_id = payment_id_only(arguments)?;
    Ok(ProviderRequest::Cancel { payment_id })
}

pub fn add_new_card(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let user_id = args.string("userId");
    let post_link = args.optional_string("postLink");
    args.finish()?;
    Ok(ProviderRequest::AddCard {
        user_id: user_id?,
        post_link,
    })
}

pub fn remove_added_card(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let card_id = args.integer("cardId");
    let user_id = args.string("userId");
    args.finish()?;
    Ok(ProviderRequest::RemoveCard {
        card_id: card_id?,
        user_id: user_id?,
    })
}

pub fn get_added_cards(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let user_id = args.string("userId");
    args.finish()?;
    Ok(ProviderRequest::ListCards { user_id: user_id? })
}

pub fn non_acceptance_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let payment_id = payment_id_only(arguments)?;
    Ok(ProviderRequest::ConfirmDirectPayment { payment_id })
}

pub fn create_wallet_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let request = payment_request(&mut args, PaymentKind::Wallet);
    args.finish()?;
    Ok(ProviderRequest::CreateWalletPayment(request?))
}

pub fn confirm_wallet_payment(arguments: &Arguments) -> BridgeResult<ProviderRequest> {
    let mut args = ArgumentReader::new(arguments);
    let payment_id = args.identifier("paymentId");
    let token = args.string("token");
    args.finish()?;
    Ok(ProviderRequest::ConfirmWalletPayment {
        payment_id: payment_id?,
        token: token?,
    })
}
