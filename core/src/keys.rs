//! Wire-level names shared with the host application layer
//!
//! Command tags, property-bag keys, channel names and preference keys. The host
//! side must use the same strings, so these never change between releases.

// ============================================================================
// COMMANDS
// ============================================================================

pub const ACTION_START: &str = "START";
pub const ACTION_SHUTDOWN: &str = "SHUTDOWN";
pub const ACTION_UPDATE_NOTIFICATION: &str = "UPDATE_NOTIFICATION";

/// Method call sent by the background isolate once its dispatcher is ready
pub const METHOD_SERVICE_INITIALIZED: &str = "LocatorService.initialized";

// ============================================================================
// CHANNELS
// ============================================================================

/// Channel carrying location deliveries to the background isolate
pub const BACKGROUND_CHANNEL_ID: &str = "background_locator/locator_plugin_background";
/// Method invoked on the background channel for every delivered fix
pub const BCM_SEND_LOCATION: &str = "BCM_SEND_LOCATION";

/// Diagnostic event stream name
pub const EVENT_CHANNEL_ID: &str = "background_locator/service_events";

pub const ARG_CALLBACK: &str = "callback";
pub const ARG_LOCATION: &str = "location";

// ============================================================================
// NOTIFICATION
// ============================================================================

pub const CHANNEL_ID: &str = "background_locator/locator_plugin";
pub const NOTIFICATION_ID: u32 = 1;
pub const NOTIFICATION_ACTION: &str = "background_locator.notification";
pub const NOTIFICATION_ACTION_BUTTON_1: &str = "background_locator.notification.button_1";
pub const DEFAULT_ICON_NAME: &str = "ic_stat_name";

pub const WAKELOCK_TAG: &str = "LocatorService::WAKE_LOCK";

// ============================================================================
// START / UPDATE PROPERTY BAG
// ============================================================================

pub const SETTINGS_ANDROID_NOTIFICATION_CHANNEL_NAME: &str =
    "settings_android_notificationChannelName";
pub const SETTINGS_ANDROID_NOTIFICATION_TITLE: &str = "settings_android_notificationTitle";
pub const SETTINGS_ANDROID_NOTIFICATION_MSG: &str = "settings_android_notificationMsg";
pub const SETTINGS_ANDROID_NOTIFICATION_BIG_MSG: &str = "settings_android_notificationBigMsg";
pub const SETTINGS_ANDROID_NOTIFICATION_BUTTON_MSG: &str = "settings_android_notificationButtonMsg";
pub const SETTINGS_ANDROID_HAS_NOTIFICATION_BUTTONS: &str =
    "settings_android_hasNotificationButtons";
pub const SETTINGS_ANDROID_NOTIFICATION_ICON: &str = "settings_android_notificationIcon";
pub const SETTINGS_ANDROID_NOTIFICATION_ICON_COLOR: &str = "settings_android_notificationIconColor";
pub const SETTINGS_ANDROID_WAKE_LOCK_TIME: &str = "settings_android_wakeLockTime";

pub const SETTINGS_INTERVAL: &str = "settings_interval";
pub const SETTINGS_ACCURACY: &str = "settings_accuracy";
pub const SETTINGS_DISTANCE_FILTER: &str = "settings_distanceFilter";

// ============================================================================
// PREFERENCES
// ============================================================================

pub const PREF_SERVICE_RUNNING: &str = "is_service_running";
pub const PREF_LOCATION_CLIENT: &str = "location_client";
pub const CALLBACK_HANDLE_KEY: &str = "CALLBACK_HANDLE_KEY";
