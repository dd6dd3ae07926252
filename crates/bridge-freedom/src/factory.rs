//! # Provider Generations
//!
//! Factories that build an adapter per `initialize` call. An `SdkConnector`
//! supplies the native SDK handles, so the same factories run against the
//! real SDK bindings or the in-memory mock processor.

use crate::current::{BoxedFreedomSdk, CurrentAdapter};
use crate::legacy::{BoxedLegacySdk, LegacyAdapter};
use bridge_core::{AdapterFactory, AdapterRegistry, BoxedProviderAdapter, BridgeResult, Credentials};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Platform the host runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Opens native SDK sessions for a set of merchant credentials
pub trait SdkConnector: Send + Sync {
    fn connect_current(&self, credentials: &Credentials) -> BridgeResult<BoxedFreedomSdk>;

    fn connect_legacy(&self, credentials: &Credentials) -> BridgeResult<BoxedLegacySdk>;
}

pub type BoxedSdkConnector = Arc<dyn SdkConnector>;

/// Builds `CurrentAdapter`s
pub struct CurrentFactory {
    connector: BoxedSdkConnector,
    platform: Platform,
}

impl CurrentFactory {
    pub fn new(connector: BoxedSdkConnector, platform: Platform) -> Self {
        Self {
            connector,
            platform,
        }
    }
}

impl AdapterFactory for CurrentFactory {
    fn provider_name(&self) -> &'static str {
        CurrentAdapter::NAME
    }

    fn create(&self, credentials: &Credentials) -> BridgeResult<BoxedProviderAdapter> {
        debug!(
            "Connecting {} SDK for merchant {} ({}, {})",
            CurrentAdapter::NAME,
            credentials.merchant_id,
            credentials.region,
            self.platform
        );
        let sdk = self.connector.connect_current(credentials)?;
        Ok(Arc::new(CurrentAdapter::new(sdk, self.platform)))
    }
}

/// Builds `LegacyAdapter`s
pub struct LegacyFactory {
    connector: BoxedSdkConnector,
}

impl LegacyFactory {
    pub fn new(connector: BoxedSdkConnector) -> Self {
        Self { connector }
    }
}

impl AdapterFactory for LegacyFactory {
    fn provider_name(&self) -> &'static str {
        LegacyAdapter::NAME
    }

    fn create(&self, credentials: &Credentials) -> BridgeResult<BoxedProviderAdapter> {
        debug!(
            "Connecting {} SDK for merchant {} ({})",
            LegacyAdapter::NAME,
            credentials.merchant_id,
            credentials.region
        );
        let sdk = self.connector.connect_legacy(credentials)?;
        Ok(Arc::new(LegacyAdapter::new(sdk)))
    }
}

/// Registry with both generations; `default_provider` is used when
/// `initialize` names none or an unknown one
pub fn freedom_registry(
    connector: BoxedSdkConnector,
    platform: Platform,
    default_provider: &str,
) -> AdapterRegistry {
    AdapterRegistry::new(default_provider)
        .with_factory(Arc::new(CurrentFactory::new(connector.clone(), platform)))
        .with_factory(Arc::new(LegacyFactory::new(connector)))
}
