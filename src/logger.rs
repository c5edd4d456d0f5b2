use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

pub enum MessageLogMode {
    /// Log request and response bodies.
    Full,
    /// Log method, path and status only.
    StatusOnly,
}

/// Append-only NDJSON record of API traffic and auth lifecycle events.
/// Token material never reaches the file; auth entries carry lengths only.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { mode, file })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = match self.mode {
            MessageLogMode::Full => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "req",
                "method": method,
                "path": path,
                "body": body,
            }),
            MessageLogMode::StatusOnly => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "req",
                "method": method,
                "path": path,
            }),
        };
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, status: u16, body: &str) {
        let entry = match self.mode {
            MessageLogMode::Full => {
                let body_json: Value =
                    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "resp",
                    "status": status,
                    "body": body_json,
                })
            }
            MessageLogMode::StatusOnly => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "status": status,
            }),
        };
        self.write_line(&entry);
    }

    pub fn log_auth(&mut self, event: &str, token_len: usize) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "auth",
            "event": event,
            "token_len": token_len,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        let mut contents = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn log_request_writes_ndjson() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request(
            "POST",
            "/nodes/heating/node-1",
            Some(&json!({"schedule": {}})),
        );

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "POST");
        assert_eq!(lines[0]["path"], "/nodes/heating/node-1");
        assert!(lines[0]["body"].is_object());
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn status_only_mode_omits_bodies() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::StatusOnly, path).unwrap();
        logger.log_request("POST", "/nodes/heating/node-1", Some(&json!({"x": 1})));
        logger.log_response(200, r#"{"schedule": {}}"#);

        let lines = read_lines(path);
        assert!(lines[0].get("body").is_none());
        assert_eq!(lines[1]["status"], 200);
        assert!(lines[1].get("body").is_none());
    }

    #[test]
    fn full_mode_keeps_unparseable_body_as_string() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_response(502, "Bad Gateway");

        let lines = read_lines(path);
        assert_eq!(lines[0]["status"], 502);
        assert_eq!(lines[0]["body"], "Bad Gateway");
    }

    #[test]
    fn auth_entries_carry_length_not_token() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_auth("refresh", 842);

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "auth");
        assert_eq!(lines[0]["event"], "refresh");
        assert_eq!(lines[0]["token_len"], 842);
    }
}
