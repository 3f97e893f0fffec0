//! Access log line rendering
//!
//! `combined` and `common` follow the Apache/Nginx layouts, `json` emits one
//! object per line, and anything else is treated as a `$variable` pattern.

use chrono::{DateTime, Local};
use std::time::Duration;

/// One served request, captured at arrival and completed after the handler ran
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    /// Arrival time
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Without the leading `?`
    pub query: Option<String>,
    /// `1.0`, `1.1`, `2`
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Handler latency in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 0,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Fill in the response side of the entry once the handler has finished
    #[must_use]
    pub fn with_response(mut self, status: u16, body_bytes: usize, elapsed: Duration) -> Self {
        self.status = status;
        self.body_bytes = body_bytes;
        self.request_time_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Render with a named format or a custom `$variable` pattern
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                dash_if_none(self.referer.as_deref()),
                dash_if_none(self.user_agent.as_deref()),
            ),
            "common" => self.common_line(),
            "json" => self.json_line(),
            pattern => self.expand(pattern),
        }
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn json_line(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Substitute `$remote_addr`, `$time_local`, `$time_iso8601`, `$request`,
    /// `$request_method`, `$request_uri`, `$request_time` (seconds),
    /// `$status`, `$body_bytes_sent`, `$http_referer` and `$http_user_agent`.
    fn expand(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.request_time_us as f64 / 1_000_000.0;

        // `$request` is a prefix of the other request variables, so it goes last
        let variables: [(&str, String); 11] = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time_local()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{seconds:.3}")),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.request_uri()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            ("$http_referer", dash_if_none(self.referer.as_deref()).to_string()),
            ("$http_user_agent", dash_if_none(self.user_agent.as_deref()).to_string()),
        ];

        variables
            .iter()
            .fold(pattern.to_string(), |line, (name, value)| line.replace(name, value))
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    fn request_uri(&self) -> String {
        self.query.as_ref().map_or_else(
            || self.path.clone(),
            |query| format!("{}?{query}", self.path),
        )
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_uri(), self.http_version)
    }
}

fn dash_if_none(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "POST".to_string(),
            "/upload".to_string(),
        );
        entry.user_agent = Some("curl/8.5.0".to_string());
        entry.with_response(400, 37, Duration::from_micros(2_600))
    }

    fn fetch_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "GET".to_string(),
            "/uploads/cat.png".to_string(),
        );
        entry.query = Some("v=2".to_string());
        entry.referer = Some("http://localhost:3000/".to_string());
        entry.with_response(200, 1234, Duration::from_micros(800))
    }

    #[test]
    fn test_common_has_no_client_headers() {
        let line = fetch_entry().format("common");
        assert!(line.starts_with("10.0.0.7 - - ["));
        assert!(line.ends_with("\"GET /uploads/cat.png?v=2 HTTP/1.1\" 200 1234"));
        assert!(!line.contains("localhost"));
    }

    #[test]
    fn test_combined_dashes_missing_headers() {
        let line = upload_entry().format("combined");
        assert!(line.contains("\"POST /upload HTTP/1.1\" 400 37"));
        assert!(line.ends_with("\"-\" \"curl/8.5.0\""));

        let line = fetch_entry().format("combined");
        assert!(line.ends_with("\"http://localhost:3000/\" \"-\""));
    }

    #[test]
    fn test_json_line() {
        let value: serde_json::Value =
            serde_json::from_str(&upload_entry().format("json")).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 400);
        assert_eq!(value["request_time_us"], 2600);
        assert!(value["query"].is_null());
        assert!(value["referer"].is_null());
    }

    #[test]
    fn test_custom_pattern() {
        assert_eq!(
            upload_entry().format("$status $request_time $http_referer"),
            "400 0.003 -"
        );
        assert_eq!(
            fetch_entry().format("$request_method $request_uri | $request"),
            "GET /uploads/cat.png?v=2 | GET /uploads/cat.png?v=2 HTTP/1.1"
        );
    }
}
