//! Notification and wake-lock configuration of the running service
//!
//! START replaces the whole `ServiceConfig`; UPDATE_NOTIFICATION carries a
//! sparse `NotificationUpdate` that only touches the fields it names.

use crate::keys;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Property bag attached to a command
pub type PropertyBag = Map<String, Value>;

pub const DEFAULT_WAKE_LOCK_MINUTES: u64 = 60;

const DEFAULT_CHANNEL_NAME: &str = "Flutter Locator Plugin";
const DEFAULT_TITLE: &str = "Start Location Tracking";
const DEFAULT_MESSAGE: &str = "Track location in background";
const DEFAULT_BIG_MESSAGE: &str = "Background location is on to keep the app up-to-date with your location. This is required for main features to work properly when the app is not running.";
const DEFAULT_BUTTON_LABEL: &str = "Button1";

pub(crate) fn bag_string(bag: &PropertyBag, key: &str) -> Option<String> {
    match bag.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub(crate) fn bag_bool(bag: &PropertyBag, key: &str) -> Option<bool> {
    bag.get(key)?.as_bool()
}

pub(crate) fn bag_i64(bag: &PropertyBag, key: &str) -> Option<i64> {
    let value = bag.get(key)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

pub(crate) fn bag_f64(bag: &PropertyBag, key: &str) -> Option<f64> {
    bag.get(key)?.as_f64()
}

/// Current configuration of the foreground notification and wake-lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// User-visible name of the notification channel
    pub channel_name: String,
    pub title: String,
    /// Collapsed notification text
    pub message: String,
    /// Expanded (big text) notification body
    pub big_message: String,
    /// Label of the single action button
    pub button_label: String,
    pub has_buttons: bool,
    /// Drawable resource name, resolved by the host
    pub icon_name: String,
    /// ARGB accent color
    pub icon_color: u32,
    /// Wake-lock timeout in milliseconds
    pub wake_lock_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            title: DEFAULT_TITLE.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            big_message: DEFAULT_BIG_MESSAGE.to_string(),
            button_label: DEFAULT_BUTTON_LABEL.to_string(),
            has_buttons: true,
            icon_name: keys::DEFAULT_ICON_NAME.to_string(),
            icon_color: 0,
            wake_lock_ms: DEFAULT_WAKE_LOCK_MINUTES * 60 * 1000,
        }
    }
}

impl ServiceConfig {
    /// Build the full configuration carried by a START command
    ///
    /// Missing text fields become empty, a missing button flag is `false`,
    /// an empty icon name falls back to the default drawable.
    pub fn from_start_extras(extras: &PropertyBag) -> Self {
        let text = |key: &str| bag_string(extras, key).unwrap_or_default();

        let icon_name = bag_string(extras, keys::SETTINGS_ANDROID_NOTIFICATION_ICON)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| keys::DEFAULT_ICON_NAME.to_string());

        // 64-bit input, only the low 32 bits carry ARGB
        let icon_color =
            bag_i64(extras, keys::SETTINGS_ANDROID_NOTIFICATION_ICON_COLOR).unwrap_or(0) as u32;

        let wake_lock_minutes = bag_i64(extras, keys::SETTINGS_ANDROID_WAKE_LOCK_TIME)
            .map(|m| m.max(0) as u64)
            .unwrap_or(DEFAULT_WAKE_LOCK_MINUTES);

        Self {
            channel_name: text(keys::SETTINGS_ANDROID_NOTIFICATION_CHANNEL_NAME),
            title: text(keys::SETTINGS_ANDROID_NOTIFICATION_TITLE),
            message: text(keys::SETTINGS_ANDROID_NOTIFICATION_MSG),
            big_message: text(keys::SETTINGS_ANDROID_NOTIFICATION_BIG_MSG),
            button_label: text(keys::SETTINGS_ANDROID_NOTIFICATION_BUTTON_MSG),
            has_buttons: bag_bool(extras, keys::SETTINGS_ANDROID_HAS_NOTIFICATION_BUTTONS)
                .unwrap_or(false),
            icon_name,
            icon_color,
            wake_lock_ms: wake_lock_minutes.saturating_mul(60 * 1000),
        }
    }

    pub fn wake_lock_duration(&self) -> Duration {
        Duration::from_millis(self.wake_lock_ms)
    }

    /// Merge a sparse update; fields the update does not carry are kept
    pub fn apply(&mut self, update: &NotificationUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(message) = &update.message {
            self.message = message.clone();
        }
        if let Some(big_message) = &update.big_message {
            self.big_message = big_message.clone();
        }
        if let Some(button_label) = &update.button_label {
            self.button_label = button_label.clone();
        }
        if let Some(has_buttons) = update.has_buttons {
            self.has_buttons = has_buttons;
        }
    }
}

/// Sparse notification change carried by UPDATE_NOTIFICATION
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
    pub big_message: Option<String>,
    pub button_label: Option<String>,
    pub has_buttons: Option<bool>,
}

impl NotificationUpdate {
    pub fn from_extras(extras: &PropertyBag) -> Self {
        Self {
            title: bag_string(extras, keys::SETTINGS_ANDROID_NOTIFICATION_TITLE),
            message: bag_string(extras, keys::SETTINGS_ANDROID_NOTIFICATION_MSG),
            big_message: bag_string(extras, keys::SETTINGS_ANDROID_NOTIFICATION_BIG_MSG),
            button_label: bag_string(extras, keys::SETTINGS_ANDROID_NOTIFICATION_BUTTON_MSG),
            has_buttons: bag_bool(extras, keys::SETTINGS_ANDROID_HAS_NOTIFICATION_BUTTONS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.message.is_none()
            && self.big_message.is_none()
            && self.button_label.is_none()
            && self.has_buttons.is_none()
    }
}
