//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (JSON structured logging)
//! - Custom patterns with variables
//!
//! The query string is never part of an entry: it carries the download token.

use chrono::Local;

/// Access log entry for one download request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    pub method: String,
    /// Request path, without query
    pub path: String,
    /// HTTP version (1.0, 1.1)
    pub http_version: String,
    /// Response status code
    pub status: u16,
    /// Declared response length, 0 when unknown
    pub content_length: u64,
    /// Range header as sent by the client
    pub range: Option<String>,
    pub user_agent: Option<String>,
    /// Time to produce the response head, in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            http_version: "1.1".to_string(),
            status: 200,
            content_length: 0,
            range: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => self.format_combined(),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.path, self.http_version)
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    /// `$remote_addr - - [$time_local] "$request" $status $content_length "$http_range" "$http_user_agent"`
    fn format_combined(&self) -> String {
        format!(
            "{} \"{}\" \"{}\"",
            self.format_common(),
            self.range.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $content_length`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.request_line(),
            self.status,
            self.content_length,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "http_version": self.http_version,
            "status": self.status,
            "content_length": self.content_length,
            "range": self.range,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables:
    /// - `$remote_addr` - Client IP address
    /// - `$time_local` - Local time in Common Log Format
    /// - `$time_iso8601` - ISO 8601 timestamp
    /// - `$request` - Request line ("METHOD /path HTTP/version")
    /// - `$request_method` - HTTP method
    /// - `$request_uri` - Request path
    /// - `$status` - Response status code
    /// - `$content_length` - Declared response length
    /// - `$http_range` - Range header
    /// - `$http_user_agent` - User-Agent header
    /// - `$request_time` - Request processing time in seconds (3 decimal places)
    ///
    /// The pattern is scanned once, so values taken from the request are
    /// written out verbatim even when they contain `$` variables themselves.
    fn format_custom(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            // Longest name wins so `$request_time` is not read as `$request`
            let variable = CUSTOM_VARIABLES
                .iter()
                .filter(|name| tail.starts_with(**name))
                .max_by_key(|name| name.len());

            if let Some(name) = variable {
                out.push_str(&self.variable(name));
                rest = &tail[name.len()..];
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> String {
        match name {
            "$remote_addr" => self.remote_addr.clone(),
            "$time_local" => self.time_local(),
            "$time_iso8601" => self.time.to_rfc3339(),
            "$request_time" => {
                #[allow(clippy::cast_precision_loss)]
                let seconds = self.request_time_us as f64 / 1_000_000.0;
                format!("{seconds:.3}")
            }
            "$request_method" => self.method.clone(),
            "$request_uri" => self.path.clone(),
            "$request" => self.request_line(),
            "$status" => self.status.to_string(),
            "$content_length" => self.content_length.to_string(),
            "$http_range" => self.range.clone().unwrap_or_else(|| "-".to_string()),
            "$http_user_agent" => self.user_agent.clone().unwrap_or_else(|| "-".to_string()),
            other => other.to_string(),
        }
    }
}

const CUSTOM_VARIABLES: &[&str] = &[
    "$remote_addr",
    "$time_local",
    "$time_iso8601",
    "$request_time",
    "$request_method",
    "$request_uri",
    "$request",
    "$status",
    "$content_length",
    "$http_range",
    "$http_user_agent",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/download/file".to_string(),
        );
        entry.status = 206;
        entry.content_length = 100;
        entry.range = Some("bytes=0-99".to_string());
        entry.user_agent = Some("curl/8.5.0".to_string());
        entry.request_time_us = 1600;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.contains("\"GET /download/file HTTP/1.1\" 206 100"));
        assert!(log.ends_with("\"bytes=0-99\" \"curl/8.5.0\""));
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("\"GET /download/file HTTP/1.1\" 206 100"));
        assert!(!log.contains("curl"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["status"], 206);
        assert_eq!(value["content_length"], 100);
        assert_eq!(value["range"], "bytes=0-99");
        assert!(value.get("query").is_none());
    }

    #[test]
    fn test_format_custom() {
        let log = create_test_entry().format("$request_method $request_uri $status $http_range $request_time");
        // 1600us rounds to 0.002s
        assert_eq!(log, "GET /download/file 206 bytes=0-99 0.002");
    }

    #[test]
    fn test_client_values_are_not_expanded() {
        let mut entry = create_test_entry();
        entry.range = Some("bytes=$http_user_agent".to_string());
        entry.user_agent = Some("$remote_addr $status".to_string());
        entry.path = "/download/$request".to_string();

        let log = entry.format("$request_uri|$http_range|$http_user_agent");
        assert_eq!(log, "/download/$request|bytes=$http_user_agent|$remote_addr $status");
    }

    #[test]
    fn test_unknown_variables_and_lone_dollars_pass_through() {
        let log = create_test_entry().format("$ $unknown $status$");
        assert_eq!(log, "$ $unknown 206$");
    }

    #[test]
    fn test_request_line_variable() {
        let log = create_test_entry().format("[$request] $request_time");
        assert_eq!(log, "[GET /download/file HTTP/1.1] 0.002");
    }

    #[test]
    fn test_missing_headers_render_as_dash() {
        let entry = AccessLogEntry::new(
            "10.0.0.1".to_string(),
            "HEAD".to_string(),
            "/download/backup".to_string(),
        );
        assert!(entry.format("combined").ends_with("\"-\" \"-\""));
    }
}
