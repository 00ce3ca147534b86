//! Diagnostic event sink
//!
//! A single replaceable listener slot. `listen` replaces whoever was attached,
//! `cancel` clears the slot, and records logged while nobody listens are gone
//! for good. The slot is read on the main context when the record is
//! delivered, so the latest listener at delivery time wins.

use super::main_loop::MainHandle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Diagnostic `{key, value}` tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub key: String,
    pub value: String,
}

impl EventRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Consumer of diagnostic records, called on the main context
#[cfg_attr(test, mockall::automock)]
pub trait EventListener: Send + Sync {
    fn on_event(&self, record: EventRecord);
}

type Slot = Arc<Mutex<Option<Arc<dyn EventListener>>>>;

#[derive(Clone)]
pub struct EventSink {
    slot: Slot,
    main: MainHandle,
}

impl EventSink {
    pub fn new(main: MainHandle) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            main,
        }
    }

    /// Attach `listener`, dropping any previous one
    pub fn listen(&self, listener: Arc<dyn EventListener>) {
        *self.slot.lock() = Some(listener);
    }

    /// Detach the current listener, if any
    pub fn cancel(&self) {
        self.slot.lock().take();
    }

    /// Best-effort delivery of a diagnostic record
    pub fn log(&self, key: &str, message: &str) {
        tracing::debug!(key, "{}", message);

        let record = EventRecord::new(key, message);
        let slot = self.slot.clone();
        self.main.post(move || {
            let listener = slot.lock().clone();
            if let Some(listener) = listener {
                listener.on_event(record);
            }
        });
    }
}
