// JSON-line output for everything the service sends outward
//
// Location deliveries and diagnostic events share one writer so their lines
// never interleave mid-record.

use background_locator_core::keys;
use background_locator_core::{BackgroundChannel, EventListener, EventRecord};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io::Write;

pub struct JsonLines<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLines<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, line: &Value) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write output line: {}", e);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> BackgroundChannel for JsonLines<W> {
    fn invoke_method(&self, method: &str, arguments: Value) {
        self.emit(&json!({
            "channel": keys::BACKGROUND_CHANNEL_ID,
            "method": method,
            "arguments": arguments,
        }));
    }
}

impl<W: Write + Send> EventListener for JsonLines<W> {
    fn on_event(&self, record: EventRecord) {
        self.emit(&json!({
            "channel": keys::EVENT_CHANNEL_ID,
            "key": record.key,
            "value": record.value,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_json() {
        let lines = JsonLines::new(Vec::new());
        lines.invoke_method(keys::BCM_SEND_LOCATION, json!({"callback": 1}));
        lines.on_event(EventRecord::new("locatorService", "start"));

        let text = String::from_utf8(lines.into_inner()).unwrap();
        let parsed: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["method"], json!(keys::BCM_SEND_LOCATION));
        assert_eq!(parsed[0]["arguments"]["callback"], json!(1));
        assert_eq!(parsed[1]["channel"], json!(keys::EVENT_CHANNEL_ID));
        assert_eq!(parsed[1]["value"], json!("start"));
    }
}
