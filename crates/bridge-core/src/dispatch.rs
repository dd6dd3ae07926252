//! # Completion Dispatcher
//!
//! Every command gets one `Completion`. Delivering through it:
//!
//! 1. claims the pending reply channel (a second `deliver` is a no-op),
//! 2. hops onto the UI context,
//! 3. releases the overlay lease the command holds, if any,
//! 4. sends the reply, unless the bridge was re-initialized or torn down
//!    since the command started, in which case the reply is dropped.

use crate::command::Reply;
use crate::overlay::{OverlayLease, OverlayManager};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Unit of work executed on the UI context
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that owns overlay and reply delivery
pub trait UiContext: Send + Sync {
    fn run(&self, task: UiTask);
}

/// Runs tasks inline on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateContext;

impl UiContext for ImmediateContext {
    fn run(&self, task: UiTask) {
        task()
    }
}

/// Single task loop that serializes all UI work in submission order
pub struct UiThread {
    sender: mpsc::UnboundedSender<UiTask>,
}

impl UiThread {
    /// Spawn the loop on the current tokio runtime
    pub fn spawn() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UiTask>();
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                task();
            }
            debug!("UI task loop stopped");
        });
        Self { sender }
    }
}

impl UiContext for UiThread {
    fn run(&self, task: UiTask) {
        if let Err(mpsc::error::SendError(task)) = self.sender.send(task) {
            warn!("UI task loop is gone, running task inline");
            task();
        }
    }
}

/// Monotonic counter bumped whenever in-flight replies become invalid
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate everything started before now
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

struct Pending {
    reply_to: oneshot::Sender<Reply>,
    lease: Option<OverlayLease>,
}

struct CompletionInner {
    command: String,
    invocation: Uuid,
    epoch: u64,
    generation: Generation,
    overlay: Arc<OverlayManager>,
    ui: Arc<dyn UiContext>,
    pending: Mutex<Option<Pending>>,
}

/// Single-use completion handle of one command
#[derive(Clone)]
pub struct Completion {
    inner: Arc<CompletionInner>,
}

impl Completion {
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn invocation(&self) -> Uuid {
        self.inner.invocation
    }

    /// Hand the overlay lease to this completion so delivery releases it.
    ///
    /// Has no effect once the reply was delivered.
    pub fn hold(&self, lease: OverlayLease) {
        let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = pending.as_mut() {
            pending.lease = Some(lease);
            return;
        }
        drop(pending);
        self.inner.overlay.release(lease);
    }

    pub fn is_delivered(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Deliver the terminal reply. Returns `false` if already delivered.
    pub fn deliver(&self, reply: Reply) -> bool {
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(pending) = pending else {
            warn!(
                invocation = %self.inner.invocation,
                "Duplicate completion for {} ignored", self.inner.command
            );
            return false;
        };

        let inner = Arc::clone(&self.inner);
        self.inner.ui.run(Box::new(move || {
            if let Some(lease) = pending.lease {
                inner.overlay.release(lease);
            }

            if inner.generation.current() != inner.epoch {
                debug!(
                    invocation = %inner.invocation,
                    "Dropping stale reply for {}", inner.command
                );
                return;
            }

            if pending.reply_to.send(reply).is_err() {
                debug!(
                    invocation = %inner.invocation,
                    "Caller of {} stopped waiting for its reply", inner.command
                );
            }
        }));
        true
    }
}

/// Creates completions bound to the current generation
#[derive(Clone)]
pub struct CompletionDispatcher {
    overlay: Arc<OverlayManager>,
    ui: Arc<dyn UiContext>,
    generation: Generation,
}

impl CompletionDispatcher {
    pub fn new(overlay: Arc<OverlayManager>, ui: Arc<dyn UiContext>) -> Self {
        Self {
            overlay,
            ui,
            generation: Generation::new(),
        }
    }

    /// Start tracking one command
    pub fn begin(&self, command: &str, reply_to: oneshot::Sender<Reply>) -> Completion {
        Completion {
            inner: Arc::new(CompletionInner {
                command: command.to_string(),
                invocation: Uuid::new_v4(),
                epoch: self.generation.current(),
                generation: self.generation.clone(),
                overlay: Arc::clone(&self.overlay),
                ui: Arc::clone(&self.ui),
                pending: Mutex::new(Some(Pending {
                    reply_to,
                    lease: None,
                })),
            }),
        }
    }

    /// Drop the replies of every command started so far
    pub fn invalidate(&self) -> u64 {
        self.generation.advance()
    }

    pub fn overlay(&self) -> &Arc<OverlayManager> {
        &self.overlay
    }
}
