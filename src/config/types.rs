// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Filesystem roots
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Public asset directory served by the catch-all route
    pub public_dir: String,
    /// Directory holding uploaded files
    pub upload_dir: String,
    /// In-flight upload bodies; must share a filesystem with `upload_dir`
    pub staging_dir: String,
    /// Index documents tried for `/` and directory requests
    pub index_files: Vec<String>,
}

/// Upload validation
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Upper bound on the request body, in bytes
    pub max_size: u64,
    /// Accepted declared MIME types (essence only, no parameters)
    pub allowed_types: Vec<String>,
}

impl UploadConfig {
    pub fn is_allowed(&self, mime_essence: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_essence))
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
}
