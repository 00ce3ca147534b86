//! External command surface of the service
//!
//! Commands arrive as a string tag plus a property bag (`ServiceIntent`) and
//! are decoded into exactly one of three `Command`s. The inbound method-call
//! surface is separate and only knows "service initialized".

use super::config::{NotificationUpdate, PropertyBag, ServiceConfig};
use crate::keys;
use crate::provider::LocationRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command carries no action")]
    MissingAction,

    #[error("Unknown command action: {0}")]
    UnknownAction(String),
}

/// Raw command as delivered by the host transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceIntent {
    pub action: Option<String>,
    #[serde(default)]
    pub extras: PropertyBag,
}

impl ServiceIntent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            extras: PropertyBag::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn start() -> Self {
        Self::new(keys::ACTION_START)
    }

    pub fn shutdown() -> Self {
        Self::new(keys::ACTION_SHUTDOWN)
    }

    pub fn update_notification() -> Self {
        Self::new(keys::ACTION_UPDATE_NOTIFICATION)
    }
}

/// Everything a START command carries
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub config: ServiceConfig,
    pub location_request: LocationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(StartRequest),
    Shutdown,
    UpdateNotification(NotificationUpdate),
}

impl Command {
    pub fn parse(intent: &ServiceIntent) -> Result<Self, CommandError> {
        let action = intent.action.as_deref().ok_or(CommandError::MissingAction)?;

        match action {
            keys::ACTION_START => Ok(Self::Start(StartRequest {
                config: ServiceConfig::from_start_extras(&intent.extras),
                location_request: LocationRequest::from_extras(&intent.extras),
            })),
            keys::ACTION_SHUTDOWN => Ok(Self::Shutdown),
            keys::ACTION_UPDATE_NOTIFICATION => Ok(Self::UpdateNotification(
                NotificationUpdate::from_extras(&intent.extras),
            )),
            other => Err(CommandError::UnknownAction(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => keys::ACTION_START,
            Self::Shutdown => keys::ACTION_SHUTDOWN,
            Self::UpdateNotification(_) => keys::ACTION_UPDATE_NOTIFICATION,
        }
    }
}

/// What the supervisor should do with the process after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartResult {
    /// Keep running; restart with the last command if killed
    ContinueRunning,
    /// Do not restart
    StopRunning,
}

/// Inbound method call from the application layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MethodResult {
    Success(Value),
    NotImplemented,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let intent = ServiceIntent::start()
            .with_extra(keys::SETTINGS_ANDROID_NOTIFICATION_TITLE, "T1")
            .with_extra(keys::SETTINGS_INTERVAL, 1000);

        match Command::parse(&intent).unwrap() {
            Command::Start(request) => {
                assert_eq!(request.config.title, "T1");
                assert_eq!(request.location_request.interval_ms, 1000);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_shutdown_and_update() {
        assert_eq!(
            Command::parse(&ServiceIntent::shutdown()).unwrap(),
            Command::Shutdown
        );

        let intent = ServiceIntent::update_notification()
            .with_extra(keys::SETTINGS_ANDROID_NOTIFICATION_MSG, "M2");
        match Command::parse(&intent).unwrap() {
            Command::UpdateNotification(update) => {
                assert_eq!(update.message.as_deref(), Some("M2"));
                assert!(update.title.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_missing() {
        assert_eq!(
            Command::parse(&ServiceIntent::new("RESTART")),
            Err(CommandError::UnknownAction("RESTART".to_string()))
        );
        assert_eq!(
            Command::parse(&ServiceIntent::default()),
            Err(CommandError::MissingAction)
        );
    }

    #[test]
    fn test_intent_from_json() {
        let intent: ServiceIntent = serde_json::from_str(r#"{"action":"SHUTDOWN"}"#).unwrap();
        assert_eq!(intent.action.as_deref(), Some(keys::ACTION_SHUTDOWN));
        assert!(intent.extras.is_empty());
    }
}
