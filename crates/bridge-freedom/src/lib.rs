//! # bridge-freedom
//!
//! freedompay provider generations for freedompay-bridge.
//!
//! This crate provides two adapters behind the same `ProviderAdapter` surface:
//!
//! 1. **CurrentAdapter** - typed SDK answering with `Result<T, FreedomError>`
//!    - Tokenized payments by card token
//!    - Direct (non-acceptance) payments
//!    - Wallet payments on Android
//!
//! 2. **LegacyAdapter** - callback SDK answering with `(Option<T>, Option<LegacyError>)`
//!    - Tokenized payments by card id
//!    - Recurring payments
//!
//! Native SDK sessions are opened through an `SdkConnector`. `MockConnector`
//! backs both generations with an in-memory processor.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_freedom::{freedom_registry, MockBehavior, MockConnector, Platform};
//!
//! let connector = Arc::new(MockConnector::new(MockBehavior::Approve));
//! let bridge = Bridge::new(freedom_registry(connector, Platform::Android, "current"));
//! ```

pub mod current;
pub mod factory;
pub mod legacy;
pub mod mock;

pub use current::{BoxedFreedomSdk, CurrentAdapter, FreedomError, FreedomSdk};
pub use factory::{
    freedom_registry, BoxedSdkConnector, CurrentFactory, LegacyFactory, Platform, SdkConnector,
};
pub use legacy::{BoxedLegacySdk, LegacyAdapter, LegacyError, LegacySdk};
pub use mock::{MockBehavior, MockConnector, MockProcessor};
