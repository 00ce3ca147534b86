//! Platform integration layer for the background location service
//!
//! This module provides:
//! - The service lifecycle (`LocatorService`) driven by host commands
//! - Command decoding and the restart contract returned to the supervisor
//! - Notification and wake-lock configuration, and the notification model
//! - Host capability traits and persisted preferences

pub mod command;
pub mod config;
pub mod host;
pub mod notification;
pub mod service;
pub mod settings;

pub use command::{
    Command, CommandError, MethodCall, MethodResult, ServiceIntent, StartRequest, StartResult,
};
pub use config::{NotificationUpdate, PropertyBag, ServiceConfig};
pub use host::{PlatformError, ServiceHost, WakeLock};
pub use notification::{
    ChannelImportance, Notification, NotificationAction, NotificationChannel, NotificationManager,
    NotificationPriority,
};
pub use service::{LocatorService, ServiceCollaborators, ServiceState, LOG_KEY};
pub use settings::{
    LocationClient, MemoryPreferences, PreferenceStore, SettingsError, SledPreferences,
};
