// Shared recording fakes for the integration tests
#![allow(dead_code)]

use background_locator_core::platform::{
    Notification, NotificationChannel, NotificationManager, PlatformError, ServiceHost, WakeLock,
};
use background_locator_core::{
    BackgroundChannel, BackgroundLocator, EventListener, EventRecord, LocationBackends,
    LocationClient, LocationFix, LocationProvider, LocationRequest, LocationUpdateListener,
    MainLoop, MemoryPreferences, PreferenceStore, ServiceCollaborators,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const CALLBACK_HANDLE: i64 = 4242;

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifications {
    pub channels: Mutex<Vec<NotificationChannel>>,
    /// Notification currently shown under each id
    pub shown: Mutex<Vec<(u32, Notification)>>,
    pub foreground: Mutex<bool>,
}

impl RecordingNotifications {
    pub fn displayed(&self, id: u32) -> Option<Notification> {
        self.shown
            .lock()
            .iter()
            .find(|(shown_id, _)| *shown_id == id)
            .map(|(_, n)| n.clone())
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().len()
    }

    fn show(&self, id: u32, notification: &Notification) {
        let mut shown = self.shown.lock();
        shown.retain(|(shown_id, _)| *shown_id != id);
        shown.push((id, notification.clone()));
    }
}

impl NotificationManager for RecordingNotifications {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError> {
        self.channels.lock().push(channel.clone());
        Ok(())
    }

    fn start_foreground(&self, id: u32, notification: &Notification) -> Result<(), PlatformError> {
        *self.foreground.lock() = true;
        self.show(id, notification);
        Ok(())
    }

    fn notify(&self, id: u32, notification: &Notification) -> Result<(), PlatformError> {
        self.show(id, notification);
        Ok(())
    }

    fn stop_foreground(&self, remove_notification: bool) -> Result<(), PlatformError> {
        *self.foreground.lock() = false;
        if remove_notification {
            self.shown.lock().clear();
        }
        Ok(())
    }
}

// ============================================================================
// WAKE LOCK & HOST
// ============================================================================

#[derive(Default)]
pub struct FakeWakeLock {
    pub held: Mutex<Option<Duration>>,
    pub acquisitions: Mutex<usize>,
    pub releases: Mutex<usize>,
}

impl WakeLock for FakeWakeLock {
    fn acquire(&self, _tag: &str, timeout: Duration) -> Result<(), PlatformError> {
        *self.held.lock() = Some(timeout);
        *self.acquisitions.lock() += 1;
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    fn release(&self) -> Result<(), PlatformError> {
        if self.held.lock().take().is_none() {
            return Err(PlatformError::WakeLock("not held".to_string()));
        }
        *self.releases.lock() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub stop_requests: Mutex<usize>,
}

impl ServiceHost for FakeHost {
    fn stop_self(&self) {
        *self.stop_requests.lock() += 1;
    }
}

// ============================================================================
// LOCATION BACKENDS
// ============================================================================

pub struct Subscription {
    pub client: LocationClient,
    pub listener: Arc<dyn LocationUpdateListener>,
    pub request: Option<LocationRequest>,
    pub active: bool,
}

/// Backends whose fixes are pushed by the test
#[derive(Default, Clone)]
pub struct ManualBackends {
    pub subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl ManualBackends {
    pub fn active_count(&self) -> usize {
        self.subscriptions.lock().iter().filter(|s| s.active).count()
    }

    pub fn created(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Emit from the most recently created backend, cancelled or not
    pub fn emit(&self, fix: Option<LocationFix>) {
        let listener = self
            .subscriptions
            .lock()
            .last()
            .map(|s| s.listener.clone())
            .expect("no backend created");
        listener.on_location_updated(fix);
    }

    fn create(&self, client: LocationClient, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider> {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.push(Subscription {
            client,
            listener,
            request: None,
            active: false,
        });
        Box::new(ManualProvider {
            index: subscriptions.len() - 1,
            subscriptions: self.subscriptions.clone(),
        })
    }
}

impl LocationBackends for ManualBackends {
    fn platform(&self, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider> {
        self.create(LocationClient::Platform, listener)
    }

    fn third_party(&self, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider> {
        self.create(LocationClient::ThirdParty, listener)
    }
}

struct ManualProvider {
    index: usize,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl LocationProvider for ManualProvider {
    fn request_location_updates(&mut self, request: &LocationRequest) -> Result<(), PlatformError> {
        let mut subscriptions = self.subscriptions.lock();
        let subscription = &mut subscriptions[self.index];
        subscription.request = Some(request.clone());
        subscription.active = true;
        Ok(())
    }

    fn remove_location_updates(&mut self) {
        self.subscriptions.lock()[self.index].active = false;
    }
}

// ============================================================================
// OUTBOUND CHANNELS
// ============================================================================

#[derive(Default)]
pub struct RecordingChannel {
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl BackgroundChannel for RecordingChannel {
    fn invoke_method(&self, method: &str, arguments: Value) {
        self.calls.lock().push((method.to_string(), arguments));
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub records: Mutex<Vec<EventRecord>>,
}

impl RecordingListener {
    pub fn values(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.value.clone()).collect()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, record: EventRecord) {
        self.records.lock().push(record);
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub locator: BackgroundLocator,
    pub preferences: Arc<MemoryPreferences>,
    pub notifications: Arc<RecordingNotifications>,
    pub wake_lock: Arc<FakeWakeLock>,
    pub host: Arc<FakeHost>,
    pub backends: ManualBackends,
}

/// Harness whose preferences carry a registered callback handle
pub fn harness() -> (Harness, MainLoop) {
    let preferences = Arc::new(MemoryPreferences::new());
    preferences
        .set_callback_handle(background_locator_core::keys::CALLBACK_HANDLE_KEY, CALLBACK_HANDLE)
        .unwrap();
    harness_with(preferences)
}

pub fn harness_with(preferences: Arc<MemoryPreferences>) -> (Harness, MainLoop) {
    background_locator_core::init_tracing("warn");

    let notifications = Arc::new(RecordingNotifications::default());
    let wake_lock = Arc::new(FakeWakeLock::default());
    let host = Arc::new(FakeHost::default());
    let backends = ManualBackends::default();

    let (locator, main_loop) = BackgroundLocator::new(ServiceCollaborators {
        preferences: preferences.clone(),
        notifications: notifications.clone(),
        wake_lock: wake_lock.clone(),
        host: host.clone(),
        backends: Arc::new(backends.clone()),
    });

    (
        Harness {
            locator,
            preferences,
            notifications,
            wake_lock,
            host,
            backends,
        },
        main_loop,
    )
}

pub fn fix(lat: f64, lng: f64) -> LocationFix {
    LocationFix::new(json!({"lat": lat, "lng": lng}).as_object().cloned().unwrap())
}
