//! Location provider abstraction
//!
//! Exactly two backends exist: the platform's own location manager and the
//! third-party fused client. Which one serves a run is read from preferences
//! once per start and held in an `ActiveProvider` until shutdown.
//!
//! Fixes reach the service through a `LocationUpdateListener` on whatever
//! worker context the backend uses. Every subscription carries a
//! `SubscriptionGate`; closing it before `remove_location_updates` guarantees
//! that nothing the backend emits afterwards is forwarded.

use crate::platform::config::{bag_f64, bag_i64, PropertyBag};
use crate::platform::host::PlatformError;
use crate::platform::settings::LocationClient;
use crate::keys;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// DATA
// ============================================================================

/// Opaque location reading produced by a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationFix(pub Map<String, Value>);

impl LocationFix {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for LocationFix {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LocationAccuracy {
    Powersave,
    Low,
    #[default]
    Balanced,
    High,
    Navigation,
}

impl LocationAccuracy {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Powersave),
            1 => Some(Self::Low),
            2 => Some(Self::Balanced),
            3 => Some(Self::High),
            4 => Some(Self::Navigation),
            _ => None,
        }
    }
}

pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// Subscription parameters handed to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub interval_ms: u64,
    pub accuracy: LocationAccuracy,
    /// Minimum displacement in meters between fixes
    pub distance_filter: f64,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            accuracy: LocationAccuracy::default(),
            distance_filter: 0.0,
        }
    }
}

impl LocationRequest {
    pub fn from_extras(extras: &PropertyBag) -> Self {
        let defaults = Self::default();

        let accuracy = match bag_i64(extras, keys::SETTINGS_ACCURACY) {
            Some(code) => LocationAccuracy::from_code(code).unwrap_or_else(|| {
                tracing::warn!("Unknown accuracy code {}, using default", code);
                defaults.accuracy
            }),
            None => defaults.accuracy,
        };

        Self {
            interval_ms: bag_i64(extras, keys::SETTINGS_INTERVAL)
                .map(|ms| ms.max(0) as u64)
                .unwrap_or(defaults.interval_ms),
            accuracy,
            distance_filter: bag_f64(extras, keys::SETTINGS_DISTANCE_FILTER)
                .unwrap_or(defaults.distance_filter),
        }
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Receives fixes from a backend, on the backend's worker context
#[cfg_attr(test, mockall::automock)]
pub trait LocationUpdateListener: Send + Sync {
    fn on_location_updated(&self, fix: Option<LocationFix>);
}

/// One location backend subscription
#[cfg_attr(test, mockall::automock)]
pub trait LocationProvider: Send {
    fn request_location_updates(&mut self, request: &LocationRequest) -> Result<(), PlatformError>;

    /// Cancel the subscription; a no-op when none is active
    fn remove_location_updates(&mut self);
}

/// Constructs the two backends
#[cfg_attr(test, mockall::automock)]
pub trait LocationBackends: Send + Sync {
    fn platform(&self, listener: Arc<dyn LocationUpdateListener>) -> Box<dyn LocationProvider>;
    fn third_party(&self, listener: Arc<dyn LocationUpdateListener>)
        -> Box<dyn LocationProvider>;
}

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// Open while a subscription may still forward fixes
#[derive(Debug, Clone)]
pub struct SubscriptionGate(Arc<AtomicBool>);

impl SubscriptionGate {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for SubscriptionGate {
    fn default() -> Self {
        Self::new()
    }
}

struct GatedListener {
    gate: SubscriptionGate,
    inner: Arc<dyn LocationUpdateListener>,
}

impl LocationUpdateListener for GatedListener {
    fn on_location_updated(&self, fix: Option<LocationFix>) {
        if !self.gate.is_open() {
            tracing::debug!("Dropping fix from cancelled subscription");
            return;
        }
        self.inner.on_location_updated(fix);
    }
}

/// The backend serving the current run
pub struct ActiveProvider {
    client: LocationClient,
    backend: Box<dyn LocationProvider>,
    gate: SubscriptionGate,
    subscribed: bool,
}

impl ActiveProvider {
    /// Construct the backend selected by `client`; fixes go to `listener`
    /// while `gate` is open
    pub fn open(
        client: LocationClient,
        backends: &dyn LocationBackends,
        gate: SubscriptionGate,
        listener: Arc<dyn LocationUpdateListener>,
    ) -> Self {
        let gated: Arc<dyn LocationUpdateListener> = Arc::new(GatedListener {
            gate: gate.clone(),
            inner: listener,
        });

        let backend = match client {
            LocationClient::Platform => backends.platform(gated),
            LocationClient::ThirdParty => backends.third_party(gated),
        };

        Self {
            client,
            backend,
            gate,
            subscribed: false,
        }
    }

    pub fn client(&self) -> LocationClient {
        self.client
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn request_updates(&mut self, request: &LocationRequest) -> Result<(), PlatformError> {
        self.backend.request_location_updates(request)?;
        self.subscribed = true;
        Ok(())
    }

    /// Close the gate, then cancel the backend subscription
    pub fn remove_updates(&mut self) {
        self.gate.close();
        self.backend.remove_location_updates();
        self.subscribed = false;
    }
}

impl Drop for ActiveProvider {
    fn drop(&mut self) {
        if self.subscribed {
            self.remove_updates();
        }
    }
}
