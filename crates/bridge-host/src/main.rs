//! # freedompay-bridge
//!
//! Headless payment-command bridge backed by the mock processor.
//!
//! ## Usage
//!
//! ```bash
//! # Optional: pick the generation and the processor behavior
//! export BRIDGE_PROVIDER=legacy
//! export BRIDGE_MOCK_BEHAVIOR=decline
//!
//! echo '{"name":"initialize","arguments":{"merchantId":555,"secretKey":"k"}}' | freedompay-bridge
//! ```

use bridge_core::UiThread;
use bridge_host::{HostConfig, HostState, LogFormat, Session};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HostConfig::load()?;

    // Logs go to stderr; stdout carries the reply lines
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };
    tracing_subscriber::registry()
        .with(pretty)
        .with(json)
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = HostState::new(config, Arc::new(UiThread::spawn()));

    info!("Default provider: {}", state.config.provider);
    info!("Platform: {}", state.config.platform);
    info!("Mock behavior: {}", state.config.mock_behavior);
    info!("Commands: {}", state.bridge.commands().names().join(", "));

    let session = Session::new(state.bridge.clone(), state.config.shutdown_grace);
    session
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    Ok(())
}

fn print_banner() {
    eprintln!(
        r#"
  freedompay-bridge
  ━━━━━━━━━━━━━━━━━━━━━━━
  Payment-command bridge
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
