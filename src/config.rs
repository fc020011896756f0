//! Configuration loading and constants.
//!
//! Loads application configuration from TOML files and defines constants for
//! port scanning, the self-signed TLS identity, HTTP cache TTLs, logging
//! format and default paths. `AppConfig` is the root configuration struct.

use const_format::formatcp;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Port Scanning
// =============================================================================

/// Number of ports tried after the requested one (11 candidates in total)
pub const PORT_SCAN_SPAN: u16 = 10;

// =============================================================================
// Self-Signed TLS Identity
// =============================================================================

/// Directory (relative to the install dir) holding the generated identity
pub const IDENTITY_DIR: &str = "https";

/// PEM-encoded X.509 certificate file name
pub const CERTIFICATE_FILE: &str = "certificate.crt";

/// PEM-encoded private key file name
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// Common name written into the generated certificate
pub const CERTIFICATE_COMMON_NAME: &str = "8i.com";

/// Validity window of a generated certificate, counted from generation time
pub const CERTIFICATE_VALIDITY_DAYS: i64 = 365;

/// Serial number of a generated certificate
pub const CERTIFICATE_SERIAL: u8 = 1;

// =============================================================================
// HTTP Surface
// =============================================================================

/// Prefix of the status route body, followed by the external URL
pub const STATUS_PREFIX: &str = "running#";

/// Entry page served at the application route
pub const APP_ENTRY_PAGE: &str = "index.html";

/// Web-app assets - short cache, the viewer is updated in place
pub const HTTP_CACHE_APP_MAX_AGE: u32 = 300;

pub const CACHE_CONTROL_APP: &str = formatcp!("public, max-age={}", HTTP_CACHE_APP_MAX_AGE);

pub const CACHE_CONTROL_STATUS: &str = "no-store";

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "dualport=debug,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Default bind address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default base port for the plaintext scan
pub const DEFAULT_PORT: u16 = 8189;

/// Default web-app directory
pub const DEFAULT_WEB_DIR: &str = "webApp";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Listener configuration
    pub http: HttpServerConfig,
    /// TLS identity configuration
    #[serde(default)]
    pub tls: TlsConfig,
    /// Served application assets
    #[serde(default)]
    pub app: WebAppConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    /// Bind address; "" and "0.0.0.0" mean all interfaces
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    /// First port tried for the plaintext listener
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Print the "go to" banner once both listeners are up
    #[serde(default = "HttpServerConfig::default_verbose")]
    pub verbose: bool,
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_PORT
    }

    fn default_verbose() -> bool {
        true
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            verbose: Self::default_verbose(),
        }
    }
}

/// TLS identity configuration.
///
/// When both `cert_path` and `key_path` are set and loadable, the operator's
/// pair is used. Otherwise a self-signed identity is provisioned under
/// `<install_dir>/https/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Directory the self-signed identity directory lives in
    #[serde(default = "TlsConfig::default_install_dir")]
    pub install_dir: PathBuf,
    /// Operator-supplied certificate (PEM)
    pub cert_path: Option<PathBuf>,
    /// Operator-supplied private key (PEM)
    pub key_path: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            install_dir: Self::default_install_dir(),
            cert_path: None,
            key_path: None,
        }
    }
}

impl TlsConfig {
    fn default_install_dir() -> PathBuf {
        PathBuf::from(".")
    }

    /// Directory holding the generated certificate and key
    pub fn identity_dir(&self) -> PathBuf {
        self.install_dir.join(IDENTITY_DIR)
    }

    /// Operator override, only when both halves are configured
    pub fn operator_pair(&self) -> Option<(&Path, &Path)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebAppConfig {
    /// Directory holding `index.html` and the viewer's static assets
    #[serde(default = "WebAppConfig::default_web_dir")]
    pub web_dir: PathBuf,
}

impl WebAppConfig {
    fn default_web_dir() -> PathBuf {
        PathBuf::from(DEFAULT_WEB_DIR)
    }

    /// Path of the entry page
    pub fn entry_page(&self) -> PathBuf {
        self.web_dir.join(APP_ENTRY_PAGE)
    }
}

impl Default for WebAppConfig {
    fn default() -> Self {
        Self {
            web_dir: Self::default_web_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tls.cert_path.is_some() != self.tls.key_path.is_some() {
            return Err(ConfigError::Validation(
                "tls.cert_path and tls.key_path must be set together".to_string(),
            ));
        }

        match self.logging.format.to_ascii_lowercase().as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "Unknown logging.format '{}', expected \"text\" or \"json\"",
                other
            ))),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpServerConfig::default(),
            tls: TlsConfig::default(),
            app: WebAppConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml("[http]\n").unwrap();
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8189);
        assert!(config.http.verbose);
        assert!(config.tls.operator_pair().is_none());
        assert_eq!(config.tls.identity_dir(), PathBuf::from("./https"));
        assert_eq!(config.app.entry_page(), PathBuf::from("webApp/index.html"));
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_operator_pair_requires_both_paths() {
        let err = AppConfig::from_toml(
            r#"
            [http]
            [tls]
            cert_path = "/etc/dualport/cert.pem"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let config = AppConfig::from_toml(
            r#"
            [http]
            host = ""
            port = 9000
            [tls]
            cert_path = "/etc/dualport/cert.pem"
            key_path = "/etc/dualport/key.pem"
            "#,
        )
        .unwrap();
        let (cert, key) = config.tls.operator_pair().unwrap();
        assert_eq!(cert, Path::new("/etc/dualport/cert.pem"));
        assert_eq!(key, Path::new("/etc/dualport/key.pem"));
        assert_eq!(config.http.host, "");
        assert_eq!(config.http.port, 9000);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = AppConfig::from_toml("[http]\n[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::load("/nonexistent/dualport.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
