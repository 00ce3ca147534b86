//! Background location service lifecycle
//!
//! Platform code creates a `LocatorService` with its collaborators, calls
//! `on_create()`, then feeds every incoming command through
//! `on_start_command()` and acts on the returned `StartResult`.
//!
//! Transitions: Idle -> Running on START, Running/Idle -> Idle on SHUTDOWN.
//! The persisted running flag, not the in-memory state, decides whether START
//! and UPDATE_NOTIFICATION are honored, so a restarted process sees the
//! previous run.

use super::command::{Command, MethodCall, MethodResult, ServiceIntent, StartRequest, StartResult};
use super::config::{NotificationUpdate, ServiceConfig};
use super::host::{ServiceHost, WakeLock};
use super::notification::{Notification, NotificationManager};
use super::settings::{LocationClient, PreferenceStore};
use crate::events::{
    BackgroundEngine, EventListener, EventSink, LocationDispatcher, LocationEvent, MainHandle,
};
use crate::keys;
use crate::provider::{
    ActiveProvider, LocationBackends, LocationFix, LocationUpdateListener, SubscriptionGate,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key used for every diagnostic record the service emits
pub const LOG_KEY: &str = "locatorService";

// ============================================================================
// ENUMS & TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    Idle,
    Running,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
        }
    }
}

/// Host capabilities the service is built from
#[derive(Clone)]
pub struct ServiceCollaborators {
    pub preferences: Arc<dyn PreferenceStore>,
    pub notifications: Arc<dyn NotificationManager>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub host: Arc<dyn ServiceHost>,
    pub backends: Arc<dyn LocationBackends>,
}

// ============================================================================
// LOCATION FORWARDING
// ============================================================================

/// Listener handed to the active backend; runs on the backend's context
struct LocationForwarder {
    preferences: Arc<dyn PreferenceStore>,
    sink: EventSink,
    dispatcher: LocationDispatcher,
    gate: SubscriptionGate,
}

impl LocationUpdateListener for LocationForwarder {
    fn on_location_updated(&self, fix: Option<LocationFix>) {
        let Some(fix) = fix else {
            return;
        };

        let Some(callback) = self.preferences.callback_handle(keys::CALLBACK_HANDLE_KEY) else {
            tracing::warn!("No callback handle registered, dropping location");
            return;
        };

        self.sink.log(LOG_KEY, "New location");
        if self.dispatcher.deliver(LocationEvent { callback, location: fix }, &self.gate) {
            self.sink.log(LOG_KEY, "Send location");
        }
    }
}

// ============================================================================
// LOCATOR SERVICE
// ============================================================================

pub struct LocatorService {
    preferences: Arc<dyn PreferenceStore>,
    notifications: Arc<dyn NotificationManager>,
    wake_lock: Arc<dyn WakeLock>,
    host: Arc<dyn ServiceHost>,
    backends: Arc<dyn LocationBackends>,
    sink: EventSink,
    dispatcher: LocationDispatcher,
    main: MainHandle,
    /// Commands run one at a time
    commands: Mutex<()>,
    config: RwLock<ServiceConfig>,
    state: RwLock<ServiceState>,
    provider: Mutex<Option<ActiveProvider>>,
    /// Bumped by SHUTDOWN; queued notification updates from an older epoch
    /// are discarded instead of re-posting a removed notification
    notification_epoch: Arc<Mutex<u64>>,
}

impl LocatorService {
    /// Create an idle service delivering through `engine` on `main`
    pub fn new(collaborators: ServiceCollaborators, engine: BackgroundEngine, main: MainHandle) -> Self {
        Self {
            preferences: collaborators.preferences,
            notifications: collaborators.notifications,
            wake_lock: collaborators.wake_lock,
            host: collaborators.host,
            backends: collaborators.backends,
            sink: EventSink::new(main.clone()),
            dispatcher: LocationDispatcher::new(engine, main.clone()),
            main,
            commands: Mutex::new(()),
            config: RwLock::new(ServiceConfig::default()),
            state: RwLock::new(ServiceState::Idle),
            provider: Mutex::new(None),
            notification_epoch: Arc::new(Mutex::new(0)),
        }
    }

    // ------------------------------------------------------------------------
    // Host lifecycle
    // ------------------------------------------------------------------------

    /// Service process created: go foreground with the current notification
    pub fn on_create(&self) {
        let _guard = self.commands.lock();

        let config = self.config();
        if let Err(e) = self.show_foreground(&config) {
            tracing::warn!("Failed to enter foreground on create: {}", e);
        }
        self.sink.log(LOG_KEY, "onCreate");
    }

    /// Service process being torn down
    pub fn on_destroy(&self) {
        let _guard = self.commands.lock();
        self.set_running_flag(false);
    }

    /// Decode and run one command from the host
    ///
    /// Anything but an explicit SHUTDOWN asks to be restarted with the last
    /// command if the process is killed.
    pub fn on_start_command(&self, intent: Option<&ServiceIntent>) -> StartResult {
        let Some(intent) = intent else {
            tracing::debug!("Restarted without a command");
            return StartResult::ContinueRunning;
        };

        self.sink.log(LOG_KEY, "On start comm");
        match Command::parse(intent) {
            Ok(command) => self.handle_command(command),
            Err(e) => {
                tracing::warn!("Ignoring command: {}", e);
                StartResult::ContinueRunning
            }
        }
    }

    pub fn handle_command(&self, command: Command) -> StartResult {
        tracing::debug!("Handling {}", command.name());

        match command {
            Command::Shutdown => {
                self.shutdown();
                self.sink.log(LOG_KEY, "On start comm - shutdown");
                StartResult::StopRunning
            }
            Command::Start(request) => {
                self.start(request);
                self.sink.log(LOG_KEY, "On start comm - start");
                StartResult::ContinueRunning
            }
            Command::UpdateNotification(update) => {
                if self.update_notification(&update) {
                    self.sink.log(LOG_KEY, "On start comm - update");
                }
                StartResult::ContinueRunning
            }
        }
    }

    /// Inbound method call from the application layer
    pub fn on_method_call(&self, call: &MethodCall) -> MethodResult {
        match call.method.as_str() {
            keys::METHOD_SERVICE_INITIALIZED => {
                let _guard = self.commands.lock();
                self.set_running_flag(true);
                MethodResult::Success(serde_json::Value::Null)
            }
            other => {
                tracing::debug!("Method not implemented: {}", other);
                MethodResult::NotImplemented
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Start tracking; a no-op while the running flag is set
    pub fn start(&self, request: StartRequest) {
        let _guard = self.commands.lock();

        self.sink.log(LOG_KEY, "start");
        if self.preferences.is_service_running() {
            self.sink.log(LOG_KEY, "isAlready Running");
            return;
        }

        // Becomes the current config only once the start commits
        let config = request.config;

        match self.wake_lock.acquire(keys::WAKELOCK_TAG, config.wake_lock_duration()) {
            Ok(()) => self.sink.log(LOG_KEY, "Wake lock acquired"),
            Err(e) => tracing::warn!("Continuing without wake lock: {}", e),
        }

        // A provider left behind by a teardown without SHUTDOWN must not
        // stay subscribed next to the new one
        if let Some(mut stale) = self.provider.lock().take() {
            stale.remove_updates();
        }

        let client = self.preferences.location_client();
        self.sink.log(LOG_KEY, &format!("Location client - {}", client));

        let gate = SubscriptionGate::new();
        let forwarder = Arc::new(LocationForwarder {
            preferences: self.preferences.clone(),
            sink: self.sink.clone(),
            dispatcher: self.dispatcher.clone(),
            gate: gate.clone(),
        });
        let mut provider = ActiveProvider::open(client, self.backends.as_ref(), gate, forwarder);

        if let Err(e) = provider.request_updates(&request.location_request) {
            tracing::error!("Location request failed, abandoning start: {}", e);
            self.sink.log(LOG_KEY, "Location request failed");
            self.release_wake_lock();
            return;
        }

        if let Err(e) = self.show_foreground(&config) {
            tracing::error!("Failed to enter foreground, abandoning start: {}", e);
            provider.remove_updates();
            self.release_wake_lock();
            return;
        }

        *self.config.write() = config;
        *self.provider.lock() = Some(provider);
        self.set_running_flag(true);
        *self.state.write() = ServiceState::Running;

        tracing::info!("Location service started with {} client", client);
    }

    /// Stop tracking and leave the foreground; safe to call in any state
    pub fn shutdown(&self) {
        let _guard = self.commands.lock();

        self.release_wake_lock();

        if let Some(mut provider) = self.provider.lock().take() {
            provider.remove_updates();
        }

        self.set_running_flag(false);

        {
            let mut epoch = self.notification_epoch.lock();
            *epoch += 1;
            if let Err(e) = self.notifications.stop_foreground(true) {
                tracing::warn!("Failed to leave foreground: {}", e);
            }
        }
        self.host.stop_self();

        *self.state.write() = ServiceState::Idle;
        tracing::info!("Location service stopped");
    }

    /// Merge `update` into the notification and re-display it
    ///
    /// Returns false without touching anything when the service is not
    /// running.
    pub fn update_notification(&self, update: &NotificationUpdate) -> bool {
        let _guard = self.commands.lock();

        if !self.preferences.is_service_running() {
            tracing::debug!("Ignoring notification update, service not running");
            return false;
        }

        let notification = {
            let mut config = self.config.write();
            config.apply(update);
            Notification::from_config(&config)
        };

        let notifications = self.notifications.clone();
        let current_epoch = self.notification_epoch.clone();
        let epoch = *current_epoch.lock();
        self.main.post(move || {
            // Held while notifying so a concurrent SHUTDOWN cannot slip in
            let current = current_epoch.lock();
            if *current != epoch {
                tracing::debug!("Dropping notification update queued before shutdown");
                return;
            }
            if let Err(e) = notifications.create_channel(&notification.channel) {
                tracing::warn!("Failed to refresh notification channel: {}", e);
            }
            if let Err(e) = notifications.notify(keys::NOTIFICATION_ID, &notification) {
                tracing::warn!("Failed to update notification: {}", e);
            }
        });
        true
    }

    // ------------------------------------------------------------------------
    // Event sink
    // ------------------------------------------------------------------------

    /// Attach the diagnostic listener, replacing any previous one
    pub fn listen(&self, listener: Arc<dyn EventListener>) {
        self.sink.listen(listener);
    }

    /// Detach the diagnostic listener
    pub fn cancel(&self) {
        self.sink.cancel();
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    /// Persisted running flag
    pub fn is_running(&self) -> bool {
        self.preferences.is_service_running()
    }

    pub fn config(&self) -> ServiceConfig {
        self.config.read().clone()
    }

    /// Backend serving the current run, if subscribed
    pub fn active_client(&self) -> Option<LocationClient> {
        self.provider
            .lock()
            .as_ref()
            .filter(|p| p.is_subscribed())
            .map(|p| p.client())
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn show_foreground(&self, config: &ServiceConfig) -> Result<(), super::host::PlatformError> {
        let notification = Notification::from_config(config);
        self.notifications.create_channel(&notification.channel)?;
        self.sink.log(LOG_KEY, "Built notification");
        self.notifications
            .start_foreground(keys::NOTIFICATION_ID, &notification)?;
        self.sink.log(LOG_KEY, "Starting foreground");
        Ok(())
    }

    fn release_wake_lock(&self) {
        if !self.wake_lock.is_held() {
            return;
        }
        if let Err(e) = self.wake_lock.release() {
            tracing::warn!("Failed to release wake lock: {}", e);
        }
    }

    fn set_running_flag(&self, running: bool) {
        if let Err(e) = self.preferences.set_service_running(running) {
            tracing::warn!("Failed to persist running flag: {}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
