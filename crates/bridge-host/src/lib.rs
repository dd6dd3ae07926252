//! # bridge-host
//!
//! Headless host for freedompay-bridge.
//!
//! This crate provides:
//! - `HostConfig` loaded from `.env`, `config/bridge.toml` and the environment
//! - `HeadlessSurface`, a host view that only logs payment views
//! - `Session`, the JSON-lines command loop over stdin/stdout
//!
//! ## Protocol
//!
//! | Direction | Line |
//! |-----------|------|
//! | in  | `{"name": "<command>", "arguments": {...}}` |
//! | out | `{"name": "<command>", "reply": {...}}` |
//! | out | `{"name": "<command>", "notImplemented": true}` |
//! | out | `{"name": null, "invalid": "<parse error>"}` |

pub mod config;
pub mod session;
pub mod state;
pub mod surface;

pub use config::{FileConfig, HostConfig, HostError, LogFormat};
pub use session::Session;
pub use state::HostState;
pub use surface::HeadlessSurface;
