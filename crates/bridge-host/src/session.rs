//! # Command Session
//!
//! Line protocol between the headless host and its driver.
//!
//! Input, one JSON object per line:
//!
//! ```text
//! {"name": "createPayment", "arguments": {"amount": 10, "description": "Order 42"}}
//! ```
//!
//! Output, one JSON object per line, in completion order:
//!
//! ```text
//! {"name": "createPayment", "reply": {"payment": {...}, "error": null}}
//! {"name": "refundEverything", "notImplemented": true}
//! {"name": null, "invalid": "expected value at line 1 column 1"}
//! ```
//!
//! Replies dropped as stale produce no output line.

use bridge_core::{Bridge, Command, Reply};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Output line for one completed command
pub fn reply_line(name: &str, reply: Reply) -> Value {
    match reply {
        Reply::NotImplemented => json!({ "name": name, "notImplemented": true }),
        reply => json!({ "name": name, "reply": reply.into_value() }),
    }
}

fn invalid_line(error: &serde_json::Error) -> Value {
    json!({ "name": null, "invalid": error.to_string() })
}

async fn write_line<W>(writer: &mut W, value: &Value) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub struct Session {
    bridge: Arc<Bridge>,
    shutdown_grace: Duration,
}

impl Session {
    pub fn new(bridge: Arc<Bridge>, shutdown_grace: Duration) -> Self {
        Self {
            bridge,
            shutdown_grace,
        }
    }

    /// Serve commands from `reader` until it ends, then wait up to the
    /// shutdown grace for in-flight replies. Returns the number of lines
    /// written.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let mut lines = reader.lines();
        let mut written = 0;

        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(line) => self.handle(&line, &tx),
                    None => break,
                },
                Some(output) = rx.recv() => {
                    write_line(&mut writer, &output).await?;
                    written += 1;
                }
            }
        }

        debug!("Input closed, draining in-flight replies");
        drop(tx);
        let drain = async {
            while let Some(output) = rx.recv().await {
                write_line(&mut writer, &output).await?;
                written += 1;
            }
            anyhow::Ok(())
        };
        match tokio::time::timeout(self.shutdown_grace, drain).await {
            Ok(result) => result?,
            Err(_) => warn!(
                "Replies still in flight after {:?}, tearing down",
                self.shutdown_grace
            ),
        }

        self.bridge.teardown();
        info!("Session ended after {} output lines", written);
        Ok(written)
    }

    fn handle(&self, line: &str, tx: &mpsc::UnboundedSender<Value>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Invalid command line: {}", e);
                let _ = tx.send(invalid_line(&e));
                return;
            }
        };

        let name = command.name().to_string();
        let (reply_to, reply) = oneshot::channel();
        self.bridge.dispatch(command, reply_to);

        let tx = tx.clone();
        tokio::spawn(async move {
            match reply.await {
                Ok(reply) => {
                    let _ = tx.send(reply_line(&name, reply));
                }
                Err(_) => debug!("Reply to {} dropped as stale", name),
            }
        });
    }
}
