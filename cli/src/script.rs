// Script lines accepted by `run`
//
// One JSON object per line:
//   {"action": "START", "extras": {...}}   command intent
//   {"method": "LocatorService.initialized"} method call
//   {"sleep_ms": 3000}                      let the simulator run

use anyhow::{Context, Result};
use background_locator_core::keys;
use background_locator_core::{MethodCall, ServiceIntent};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptLine {
    Method(MethodCall),
    Sleep { sleep_ms: u64 },
    Intent(ServiceIntent),
}

impl ScriptLine {
    /// Parse one line; blank lines and `#` comments yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let parsed: Self = serde_json::from_str(line)
            .with_context(|| format!("Invalid script line: {}", line))?;
        Ok(Some(parsed))
    }
}

/// Fill in a START interval when the script leaves it out
pub fn with_default_interval(mut intent: ServiceIntent, interval_ms: u64) -> ServiceIntent {
    if intent.action.as_deref() == Some(keys::ACTION_START) {
        intent
            .extras
            .entry(keys::SETTINGS_INTERVAL)
            .or_insert_with(|| Value::from(interval_ms));
    }
    intent
}
