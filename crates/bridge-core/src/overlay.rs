//! # Overlay Resource Manager
//!
//! Owns the single transient payment view. States:
//!
//! ```text
//!            acquire()                      release(lease) / release_all()
//!   Idle ─────────────────▶ Presenting(h) ─────────────────────────────▶ Idle
//!                              │    ▲
//!                              └────┘ acquire(): dismiss h, present h'
//! ```
//!
//! A lease is bound to the handle it was granted for. Releasing a lease whose
//! handle was already force-released (because a newer command took the view)
//! is a no-op and never tears down the newer view.
//!
//! `HostSurface` implementations are called with the manager's lock held and
//! must not call back into the manager.

use crate::error::{BridgeResult, ErrorDescriptor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Opaque host-assigned identifier of a presented payment view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceToken(u64);

impl SurfaceToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Failure reported by the host when presenting a view
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("host has no visible window")]
    NoWindow,

    #[error("failed to present payment view: {0}")]
    Presentation(String),
}

/// Platform shim that creates and removes the payment view
pub trait HostSurface: Send + Sync {
    /// Create a full-screen payment view for `command`
    fn present(&self, command: &str) -> Result<SurfaceToken, SurfaceError>;

    /// Remove a view previously returned by `present`
    fn dismiss(&self, token: SurfaceToken);
}

/// The view currently presented, and for which command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayHandle {
    pub lease_id: u64,
    pub command: String,
    pub token: SurfaceToken,
}

/// Ownership token held by an in-flight command.
///
/// Not `Clone`: releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct OverlayLease {
    id: u64,
    token: SurfaceToken,
}

impl OverlayLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> SurfaceToken {
        self.token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OverlayState {
    Idle,
    Presenting(OverlayHandle),
}

struct OverlayInner {
    host: Option<Arc<dyn HostSurface>>,
    state: OverlayState,
    next_lease: u64,
    grants: u64,
}

/// Single owner of the payment view lifecycle
pub struct OverlayManager {
    inner: Mutex<OverlayInner>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(OverlayInner {
                host: None,
                state: OverlayState::Idle,
                next_lease: 1,
                grants: 0,
            }),
        }
    }

    /// Create a manager already attached to a host
    pub fn with_host(host: Arc<dyn HostSurface>) -> Self {
        let manager = Self::new();
        manager.attach(host);
        manager
    }

    fn lock(&self) -> MutexGuard<'_, OverlayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach (or replace) the host surface
    pub fn attach(&self, host: Arc<dyn HostSurface>) {
        self.lock().host = Some(host);
    }

    /// Detach the host, tearing down any presented view first
    pub fn detach(&self) {
        let mut inner = self.lock();
        Self::teardown(&mut inner);
        inner.host = None;
    }

    pub fn has_host(&self) -> bool {
        self.lock().host.is_some()
    }

    /// Grant the payment view to `command`, force-releasing any current holder.
    pub fn acquire(&self, command: &str) -> BridgeResult<OverlayLease> {
        let mut inner = self.lock();
        let host = inner
            .host
            .clone()
            .ok_or_else(ErrorDescriptor::no_host_surface)?;

        if let OverlayState::Presenting(previous) = &inner.state {
            warn!(
                "Force-releasing overlay held by {} (lease {}) for {}",
                previous.command, previous.lease_id, command
            );
        }
        Self::teardown(&mut inner);

        let token = host.present(command).map_err(|e| {
            warn!("Host failed to present overlay for {}: {}", command, e);
            ErrorDescriptor::no_host_surface().with_details(e.to_string())
        })?;

        let lease_id = inner.next_lease;
        inner.next_lease += 1;
        inner.grants += 1;
        inner.state = OverlayState::Presenting(OverlayHandle {
            lease_id,
            command: command.to_string(),
            token,
        });

        info!("Overlay granted to {} (lease {})", command, lease_id);
        Ok(OverlayLease { id: lease_id, token })
    }

    /// Release the view if `lease` still holds it.
    ///
    /// Returns `true` when a view was torn down.
    pub fn release(&self, lease: OverlayLease) -> bool {
        let mut inner = self.lock();
        let holds_view = matches!(
            &inner.state,
            OverlayState::Presenting(handle) if handle.lease_id == lease.id
        );
        if holds_view {
            Self::teardown(&mut inner);
        } else {
            debug!("Overlay lease {} already released", lease.id);
        }
        holds_view
    }

    /// Tear down whatever is presented
    pub fn release_all(&self) -> bool {
        let mut inner = self.lock();
        let was_presenting = matches!(inner.state, OverlayState::Presenting(_));
        Self::teardown(&mut inner);
        was_presenting
    }

    fn teardown(inner: &mut OverlayInner) {
        if let OverlayState::Presenting(handle) =
            std::mem::replace(&mut inner.state, OverlayState::Idle)
        {
            if let Some(host) = &inner.host {
                host.dismiss(handle.token);
            }
            debug!("Overlay for {} dismissed (lease {})", handle.command, handle.lease_id);
        }
    }

    pub fn is_presenting(&self) -> bool {
        matches!(self.lock().state, OverlayState::Presenting(_))
    }

    /// Handle of the currently presented view
    pub fn current(&self) -> Option<OverlayHandle> {
        match &self.lock().state {
            OverlayState::Presenting(handle) => Some(handle.clone()),
            OverlayState::Idle => None,
        }
    }

    /// Total number of grants since creation
    pub fn grants(&self) -> u64 {
        self.lock().grants
    }
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Host that records live views
    #[derive(Default)]
    pub(crate) struct RecordingHost {
        next: AtomicU64,
        pub(crate) live: Mutex<Vec<SurfaceToken>>,
        pub(crate) dismissed: Mutex<Vec<SurfaceToken>>,
    }

    impl RecordingHost {
        pub(crate) fn live_count(&self) -> usize {
            self.live.lock().unwrap().len()
        }
    }

    impl HostSurface for RecordingHost {
        fn present(&self, _command: &str) -> Result<SurfaceToken, SurfaceError> {
            let token = SurfaceToken::new(self.next.fetch_add(1, Ordering::SeqCst) + 1);
            let mut live = self.live.lock().unwrap();
            assert!(live.is_empty(), "presented while another view is live");
            live.push(token);
            Ok(token)
        }

        fn dismiss(&self, token: SurfaceToken) {
            self.live.lock().unwrap().retain(|t| *t != token);
            self.dismissed.lock().unwrap().push(token);
        }
    }

    struct BrokenHost;

    impl HostSurface for BrokenHost {
        fn present(&self, _command: &str) -> Result<SurfaceToken, SurfaceError> {
            Err(SurfaceError::NoWindow)
        }

        fn dismiss(&self, _token: SurfaceToken) {}
    }

    #[test]
    fn test_acquire_without_host() {
        let manager = OverlayManager::new();
        let err = manager.acquire("createPayment").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NoHostSurface);
        assert!(!manager.is_presenting());
    }

    #[test]
    fn test_acquire_and_release() {
        let host = Arc::new(RecordingHost::default());
        let manager = OverlayManager::with_host(host.clone());

        let lease = manager.acquire("createPayment").unwrap();
        assert_eq!(host.live_count(), 1);
        assert_eq!(manager.current().unwrap().command, "createPayment");

        assert!(manager.release(lease));
        assert_eq!(host.live_count(), 0);
        assert!(!manager.is_presenting());
    }

    #[test]
    fn test_second_acquire_force_releases_first() {
        let host = Arc::new(RecordingHost::default());
        let manager = OverlayManager::with_host(host.clone());

        let first = manager.acquire("createPayment").unwrap();
        let second = manager.acquire("addNewCard").unwrap();
        assert_eq!(host.live_count(), 1);
        assert_eq!(host.dismissed.lock().unwrap().as_slice(), &[first.token()]);

        // Stale lease must not tear down the newer view
        assert!(!manager.release(first));
        assert_eq!(host.live_count(), 1);
        assert_eq!(manager.current().unwrap().token, second.token());

        assert!(manager.release(second));
        assert_eq!(host.live_count(), 0);
        assert_eq!(manager.grants(), 2);
    }

    #[test]
    fn test_presentation_failure() {
        let manager = OverlayManager::with_host(Arc::new(BrokenHost));
        let err = manager.acquire("addNewCard").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NoHostSurface);
        assert_eq!(err.details.as_deref(), Some("host has no visible window"));
        assert!(!manager.is_presenting());
    }

    #[test]
    fn test_detach_tears_down() {
        let host = Arc::new(RecordingHost::default());
        let manager = OverlayManager::with_host(host.clone());

        let _lease = manager.acquire("createPayment").unwrap();
        manager.detach();

        assert_eq!(host.live_count(), 0);
        assert!(!manager.has_host());
        assert!(!manager.release_all());
    }
}
