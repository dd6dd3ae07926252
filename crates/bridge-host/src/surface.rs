//! Headless stand-in for the host view: payment views are only logged.

use bridge_core::{HostSurface, SurfaceError, SurfaceToken};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::info;

#[derive(Debug, Default)]
pub struct HeadlessSurface {
    next: AtomicU64,
    live: Mutex<Vec<SurfaceToken>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Views presented and not yet dismissed
    pub fn live(&self) -> Vec<SurfaceToken> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl HostSurface for HeadlessSurface {
    fn present(&self, command: &str) -> Result<SurfaceToken, SurfaceError> {
        let token = SurfaceToken::new(self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token);
        info!("Presenting payment view {} for {}", token.id(), command);
        Ok(token)
    }

    fn dismiss(&self, token: SurfaceToken) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|t| *t != token);
        info!("Dismissed payment view {}", token.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_and_dismiss() {
        let surface = HeadlessSurface::new();
        let first = surface.present("createPayment").unwrap();
        let second = surface.present("addNewCard").unwrap();
        assert_ne!(first, second);

        surface.dismiss(first);
        assert_eq!(surface.live(), vec![second]);
    }
}
