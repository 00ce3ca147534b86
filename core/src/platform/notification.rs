//! Foreground notification model and the host notification capability
//!
//! The core only builds a description of the notification; drawing it,
//! creating the channel and keeping the process in the foreground are the
//! host's job behind `NotificationManager`.

use super::config::ServiceConfig;
use super::host::PlatformError;
use crate::keys;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelImportance {
    /// Silent channel; the ongoing notification never makes a sound
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationPriority {
    High,
}

/// Notification channel the foreground notification is posted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
}

/// Action button attached to the notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    /// Action delivered to the launch activity when tapped
    pub intent_action: String,
}

/// Fully built foreground notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub title: String,
    pub text: String,
    pub big_text: String,
    pub small_icon: String,
    pub color: u32,
    pub priority: NotificationPriority,
    /// Action delivered when the notification body is tapped
    pub content_action: String,
    pub only_alert_once: bool,
    pub ongoing: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the foreground notification for a configuration
    pub fn from_config(config: &ServiceConfig) -> Self {
        let actions = if config.has_buttons {
            vec![NotificationAction {
                label: config.button_label.clone(),
                intent_action: keys::NOTIFICATION_ACTION_BUTTON_1.to_string(),
            }]
        } else {
            Vec::new()
        };

        Self {
            channel: NotificationChannel {
                id: keys::CHANNEL_ID.to_string(),
                name: config.channel_name.clone(),
                importance: ChannelImportance::Low,
            },
            title: config.title.clone(),
            text: config.message.clone(),
            big_text: config.big_message.clone(),
            small_icon: config.icon_name.clone(),
            color: config.icon_color,
            priority: NotificationPriority::High,
            content_action: keys::NOTIFICATION_ACTION.to_string(),
            // updates must not make sound again
            only_alert_once: true,
            ongoing: true,
            actions,
        }
    }
}

/// Host notification and foreground-process capability
#[cfg_attr(test, mockall::automock)]
pub trait NotificationManager: Send + Sync {
    /// Create or refresh a notification channel
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError>;

    /// Promote the process to foreground with `notification` under `id`
    fn start_foreground(&self, id: u32, notification: &Notification) -> Result<(), PlatformError>;

    /// Replace the notification shown under `id`
    fn notify(&self, id: u32, notification: &Notification) -> Result<(), PlatformError>;

    /// Leave the foreground, optionally removing the notification
    fn stop_foreground(&self, remove_notification: bool) -> Result<(), PlatformError>;
}
