//! # Provider Configuration
//!
//! Credentials plus the operational and user sub-configurations the bridge
//! forwards to the active adapter. The whole object is re-applied after every
//! mutation; adapters never receive a diff.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing region of the merchant account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Kz,
    Ru,
    Uz,
    Kg,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Kz => "kz",
            Region::Ru => "ru",
            Region::Uz => "uz",
            Region::Kg => "kg",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kz" => Ok(Region::Kz),
            "ru" => Ok(Region::Ru),
            "uz" => Ok(Region::Uz),
            "kg" => Ok(Region::Kg),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

/// Merchant credentials supplied by `initialize`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub merchant_id: String,
    pub secret_key: String,
    pub region: Region,
}

impl Credentials {
    pub fn new(merchant_id: impl Into<String>, secret_key: impl Into<String>, region: Region) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            secret_key: secret_key.into(),
            region,
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("merchant_id", &self.merchant_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Merchant callback URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalConfiguration {
    #[serde(default)]
    pub check_url: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
}

/// Customer contact details attached to every payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfiguration {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Configuration field a setter command mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    CheckUrl,
    ResultUrl,
    UserPhone,
    UserContactEmail,
    UserEmail,
}

impl ConfigField {
    /// Name of the command argument carrying the new value
    pub fn argument(&self) -> &'static str {
        match self {
            ConfigField::CheckUrl | ConfigField::ResultUrl => "url",
            ConfigField::UserPhone => "phone",
            ConfigField::UserContactEmail | ConfigField::UserEmail => "email",
        }
    }
}

/// Full configuration of the bridge instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfiguration {
    /// Set by `initialize`; `None` until then
    pub credentials: Option<Credentials>,
    pub operational: OperationalConfiguration,
    pub user: UserConfiguration,
}

impl ProviderConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value of one field
    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            ConfigField::CheckUrl => self.operational.check_url = value,
            ConfigField::ResultUrl => self.operational.result_url = value,
            ConfigField::UserPhone => self.user.phone = value,
            ConfigField::UserContactEmail => self.user.contact_email = value,
            ConfigField::UserEmail => self.user.email = value,
        }
    }

    pub fn merchant_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.merchant_id.as_str())
    }

    pub fn is_initialized(&self) -> bool {
        self.credentials.is_some()
    }
}
