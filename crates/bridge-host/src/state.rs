//! # Host State
//!
//! The bridge the host serves, wired to the mock processor and the headless
//! surface according to `HostConfig`.

use crate::config::HostConfig;
use crate::surface::HeadlessSurface;
use bridge_core::{Bridge, UiContext};
use bridge_freedom::{freedom_registry, MockConnector};
use std::sync::Arc;

#[derive(Clone)]
pub struct HostState {
    pub bridge: Arc<Bridge>,
    pub connector: Arc<MockConnector>,
    pub surface: Arc<HeadlessSurface>,
    pub config: HostConfig,
}

impl HostState {
    pub fn new(config: HostConfig, ui: Arc<dyn UiContext>) -> Self {
        let mut connector = MockConnector::new(config.mock_behavior);
        if let Some(latency) = config.mock_latency {
            connector = connector.with_latency(latency);
        }
        let connector = Arc::new(connector);

        let registry = freedom_registry(connector.clone(), config.platform, &config.provider);
        let bridge = Arc::new(Bridge::with_ui_context(registry, ui));

        let surface = Arc::new(HeadlessSurface::new());
        bridge.attach_surface(surface.clone());

        Self {
            bridge,
            connector,
            surface,
            config,
        }
    }
}
