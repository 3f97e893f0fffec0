// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, UploadConfig};

/// Default upload body limit: 5 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// Environment variable selecting the listening port
const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config" (any supported format) when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let port = port_override(std::env::var(PORT_ENV).ok().as_deref())?;
        Self::build(config_path, port)
    }

    fn build(config_path: &str, port_override: Option<u16>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.public_dir", "public")?
            .set_default("storage.upload_dir", "uploads")?
            .set_default("storage.staging_dir", ".upload-staging")?
            .set_default("storage.index_files", vec!["index.html"])?
            .set_default("upload.max_size", DEFAULT_MAX_UPLOAD_SIZE)?
            .set_default(
                "upload.allowed_types",
                vec!["image/png", "image/jpeg", "image/gif", "text/plain"],
            )?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "upload-server")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("UPLOAD_SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", port_override.map(i64::from))?
            .build()?;

        settings.try_deserialize()
    }

    /// Built-in defaults plus environment, no config file
    #[cfg(test)]
    pub fn defaults() -> Self {
        Self::build("does-not-exist/config", None).expect("default configuration is valid")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// An unset, empty or blank `PORT` leaves `server.port` alone
fn port_override(value: Option<&str>) -> Result<Option<u16>, config::ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_port(value).map(Some),
    }
}

fn parse_port(value: &str) -> Result<u16, config::ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| config::ConfigError::Message(format!("Invalid {PORT_ENV} '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_FILE: &str = "does-not-exist/config";

    #[test]
    fn test_defaults() {
        let cfg = Config::build(MISSING_FILE, None).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.storage.public_dir, "public");
        assert_eq!(cfg.storage.upload_dir, "uploads");
        assert_eq!(cfg.storage.index_files, vec!["index.html".to_string()]);
        assert_eq!(cfg.upload.max_size, 5 * 1024 * 1024);
        assert_eq!(cfg.upload.allowed_types.len(), 4);
        assert!(cfg.logging.access_log);
        assert_eq!(cfg.performance.max_connections, None);
    }

    #[test]
    fn test_port_override() {
        let cfg = Config::build(MISSING_FILE, Some(8081)).unwrap();
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.socket_addr().unwrap().port(), 8081);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("4000").unwrap(), 4000);
        assert_eq!(parse_port(" 80 ").unwrap(), 80);
        assert!(parse_port("70000").is_err());
        assert!(parse_port("http").is_err());
    }

    #[test]
    fn test_port_override_ignores_blank_values() {
        assert_eq!(port_override(None).unwrap(), None);
        assert_eq!(port_override(Some("")).unwrap(), None);
        assert_eq!(port_override(Some("  ")).unwrap(), None);
        assert_eq!(port_override(Some("8080")).unwrap(), Some(8080));
        assert!(port_override(Some("eighty")).is_err());
    }

    // The only test that touches PORT, so it cannot race another reader
    #[test]
    fn test_load_from_reads_environment() {
        std::env::set_var("UPLOAD_SERVER_PERFORMANCE__WRITE_TIMEOUT", "45");

        std::env::set_var(PORT_ENV, "");
        let cfg = Config::load_from(MISSING_FILE).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.performance.write_timeout, 45);

        std::env::set_var(PORT_ENV, "4100");
        assert_eq!(Config::load_from(MISSING_FILE).unwrap().server.port, 4100);

        std::env::set_var(PORT_ENV, "not-a-port");
        assert!(Config::load_from(MISSING_FILE).is_err());

        std::env::remove_var(PORT_ENV);
        std::env::remove_var("UPLOAD_SERVER_PERFORMANCE__WRITE_TIMEOUT");
    }

    #[test]
    fn test_allow_list_ignores_case() {
        let cfg = Config::build(MISSING_FILE, None).unwrap();
        assert!(cfg.upload.is_allowed("image/png"));
        assert!(cfg.upload.is_allowed("TEXT/PLAIN"));
        assert!(!cfg.upload.is_allowed("application/pdf"));
        assert!(!cfg.upload.is_allowed("image/svg+xml"));
    }
}
