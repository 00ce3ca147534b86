// Background Locator Core — service lifecycle, provider switching, event delivery
//
// Keeps a location subscription alive while the host application is
// suspended and forwards every fix to whoever is listening.

pub mod events;
pub mod keys;
pub mod platform;
pub mod provider;

use std::sync::Arc;

pub use events::{
    main_context, BackgroundChannel, BackgroundEngine, EventListener, EventRecord, EventSink,
    LocationEvent, MainHandle, MainLoop,
};
pub use platform::{
    Command, LocationClient, LocatorService, MemoryPreferences, MethodCall, MethodResult,
    NotificationUpdate, PreferenceStore, ServiceCollaborators, ServiceConfig, ServiceIntent,
    ServiceState, SledPreferences, StartResult,
};
pub use provider::{
    LocationAccuracy, LocationBackends, LocationFix, LocationProvider, LocationRequest,
    LocationUpdateListener,
};

/// Install a `tracing` subscriber honoring `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();
}

// ============================================================================
// BACKGROUND LOCATOR
// ============================================================================

/// Owner of one service instance and the handles it delivers through
///
/// The component that starts the background process creates this and passes
/// it by reference; nothing here is process-global.
pub struct BackgroundLocator {
    service: Arc<LocatorService>,
    engine: BackgroundEngine,
    main: MainHandle,
}

impl BackgroundLocator {
    /// Build the service; the returned `MainLoop` must be driven by the caller
    pub fn new(collaborators: ServiceCollaborators) -> (Self, MainLoop) {
        let (main, main_loop) = main_context();
        let engine = BackgroundEngine::new();
        let service = Arc::new(LocatorService::new(
            collaborators,
            engine.clone(),
            main.clone(),
        ));

        (
            Self {
                service,
                engine,
                main,
            },
            main_loop,
        )
    }

    pub fn service(&self) -> &Arc<LocatorService> {
        &self.service
    }

    /// Slot the background channel is attached to
    pub fn engine(&self) -> &BackgroundEngine {
        &self.engine
    }

    pub fn main(&self) -> &MainHandle {
        &self.main
    }
}
