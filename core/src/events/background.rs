//! Location delivery to the background isolate
//!
//! The background channel only exists while the application layer has a
//! background engine running. Whoever hosts that engine attaches its channel
//! to the shared `BackgroundEngine` slot; without one, fixes are dropped.

use super::main_loop::MainHandle;
use crate::keys;
use crate::provider::{LocationFix, SubscriptionGate};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Method channel into the background isolate
#[cfg_attr(test, mockall::automock)]
pub trait BackgroundChannel: Send + Sync {
    fn invoke_method(&self, method: &str, arguments: Value);
}

/// Record sent for every delivered fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEvent {
    /// Callback handle registered by the application layer
    pub callback: i64,
    pub location: LocationFix,
}

impl LocationEvent {
    pub fn to_arguments(&self) -> Value {
        let mut args = serde_json::Map::new();
        args.insert(keys::ARG_CALLBACK.to_string(), Value::from(self.callback));
        args.insert(
            keys::ARG_LOCATION.to_string(),
            Value::Object(self.location.0.clone()),
        );
        Value::Object(args)
    }
}

/// Replaceable handle to the background engine's channel
#[derive(Clone, Default)]
pub struct BackgroundEngine {
    channel: Arc<RwLock<Option<Arc<dyn BackgroundChannel>>>>,
}

impl BackgroundEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, channel: Arc<dyn BackgroundChannel>) {
        *self.channel.write() = Some(channel);
    }

    pub fn detach(&self) {
        self.channel.write().take();
    }

    pub fn is_attached(&self) -> bool {
        self.channel.read().is_some()
    }

    fn channel(&self) -> Option<Arc<dyn BackgroundChannel>> {
        self.channel.read().clone()
    }
}

/// Forwards fixes onto the main context and into the background channel
#[derive(Clone)]
pub struct LocationDispatcher {
    engine: BackgroundEngine,
    main: MainHandle,
}

impl LocationDispatcher {
    pub fn new(engine: BackgroundEngine, main: MainHandle) -> Self {
        Self { engine, main }
    }

    /// Queue one delivery; returns false when it was dropped up front
    ///
    /// The gate and the channel are checked again on the main context, so a
    /// subscription cancelled in between never reaches the channel.
    pub fn deliver(&self, event: LocationEvent, gate: &SubscriptionGate) -> bool {
        if !self.engine.is_attached() {
            tracing::debug!("No background engine, dropping location");
            return false;
        }

        let engine = self.engine.clone();
        let gate = gate.clone();
        self.main.post(move || {
            if !gate.is_open() {
                tracing::debug!("Subscription closed, dropping queued location");
                return;
            }
            let Some(channel) = engine.channel() else {
                tracing::debug!("Background engine detached, dropping location");
                return;
            };
            tracing::debug!(callback = event.callback, "sendLocationEvent");
            channel.invoke_method(keys::BCM_SEND_LOCATION, event.to_arguments());
        })
    }
}
