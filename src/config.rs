//! # Configuration Management
//!
//! Centralized configuration for endpoint resolution and security mechanisms.
//!
//! [`TransportConfig`] is the read-only *parent* policy every
//! [`Address`](crate::transport::Address) borrows while resolving, and
//! [`SecurityConfig`] carries the options a mechanism is constructed from.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Security Considerations
//! - GSSAPI encryption is on by default; `plaintext = true` only keeps authentication
//! - PLAIN credentials travel in clear text and should only be used on trusted links

use crate::error::{ProtocolError, Result};
use crate::protocol::mechanism::{MechanismName, SocketType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Object identifier of the Kerberos V5 GSSAPI mechanism
pub const KRB5_MECHANISM_OID: &str = "1.2.840.113554.1.2.2";

/// Longest value a PLAIN username or password may have (one length byte on the wire)
pub const MAX_PLAIN_CREDENTIAL_LEN: usize = u8::MAX as usize;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConnectConfig {
    /// Address resolution policy
    #[serde(default)]
    pub transport: TransportConfig,

    /// Security mechanism options
    #[serde(default)]
    pub security: SecurityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConnectConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(ipv6) = std::env::var("ZMTP_CONNECT_IPV6") {
            config.transport.ipv6 = parse_env_bool("ZMTP_CONNECT_IPV6", &ipv6)?;
        }

        if let Ok(cid) = std::env::var("ZMTP_CONNECT_VMCI_LOCAL_CID") {
            let cid = cid.parse::<u32>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid ZMTP_CONNECT_VMCI_LOCAL_CID: {cid}"))
            })?;
            config.transport.vmci_local_cid = Some(cid);
        }

        if let Ok(mechanism) = std::env::var("ZMTP_CONNECT_MECHANISM") {
            config.security.mechanism = mechanism.parse()?;
        }

        if let Ok(service) = std::env::var("ZMTP_CONNECT_GSSAPI_SERVICE_PRINCIPAL") {
            config.security.gssapi.service_principal = service;
        }

        if let Ok(plaintext) = std::env::var("ZMTP_CONNECT_GSSAPI_PLAINTEXT") {
            config.security.gssapi.plaintext =
                parse_env_bool("ZMTP_CONNECT_GSSAPI_PLAINTEXT", &plaintext)?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.transport.validate());
        errors.extend(self.security.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProtocolError::ConfigError(format!(
            "Invalid boolean for {name}: {value}"
        ))),
    }
}

/// Resolution policy shared by every address of a context
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Accept IPv6 results and resolve `*` to the IPv6 wildcard
    #[serde(default)]
    pub ipv6: bool,

    /// Context ID substituted for `@` in VMCI addresses
    #[serde(default)]
    pub vmci_local_cid: Option<u32>,
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.vmci_local_cid == Some(u32::MAX) {
            errors.push("VMCI local CID cannot be the wildcard CID (4294967295)".to_string());
        }

        errors
    }
}

/// How the security library should interpret a principal name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameType {
    /// `service@host` form
    #[default]
    HostBased,
    /// Local user name
    UserName,
    /// Full Kerberos principal, `primary/instance@REALM`
    KerberosPrincipal,
}

impl NameType {
    /// Map the numeric socket option value onto a name type
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::HostBased),
            1 => Some(Self::UserName),
            2 => Some(Self::KerberosPrincipal),
            _ => None,
        }
    }
}

/// Security mechanism options, the per-socket options a mechanism reads
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Mechanism announced in the greeting
    pub mechanism: MechanismName,

    /// Local socket type, sent as the `Socket-Type` property
    pub socket_type: SocketType,

    /// Routing id sent as the `Identity` property by REQ, DEALER and ROUTER sockets
    #[serde(default)]
    pub routing_id: Option<String>,

    /// Application metadata; every name must start with `X-`
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// PLAIN credentials
    #[serde(default)]
    pub plain: PlainConfig,

    /// GSSAPI options
    #[serde(default)]
    pub gssapi: GssapiConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            mechanism: MechanismName::Null,
            socket_type: SocketType::Dealer,
            routing_id: None,
            metadata: BTreeMap::new(),
            plain: PlainConfig::default(),
            gssapi: GssapiConfig::default(),
        }
    }
}

impl SecurityConfig {
    /// Validate security configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for name in self.metadata.keys() {
            if !name.starts_with("X-") {
                errors.push(format!(
                    "Metadata property '{name}' must start with 'X-'"
                ));
            } else if name.len() > u8::MAX as usize {
                errors.push(format!("Metadata property name too long: {}", name.len()));
            }
        }

        if let Some(ref id) = self.routing_id {
            if id.is_empty() || id.len() > u8::MAX as usize {
                errors.push("Routing id must be 1-255 bytes".to_string());
            }
        }

        match self.mechanism {
            MechanismName::Null => {}
            MechanismName::Plain => errors.extend(self.plain.validate()),
            MechanismName::Gssapi => {
                if !cfg!(feature = "gssapi") {
                    errors.push("GSSAPI mechanism is not compiled into this build".to_string());
                }
                errors.extend(self.gssapi.validate());
            }
        }

        errors
    }
}

/// PLAIN mechanism credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlainConfig {
    pub username: String,
    pub password: String,
}

impl PlainConfig {
    /// Validate PLAIN credentials
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.username.len() > MAX_PLAIN_CREDENTIAL_LEN {
            errors.push(format!(
                "PLAIN username too long: {} bytes (maximum: 255)",
                self.username.len()
            ));
        }

        if self.password.len() > MAX_PLAIN_CREDENTIAL_LEN {
            errors.push(format!(
                "PLAIN password too long: {} bytes (maximum: 255)",
                self.password.len()
            ));
        }

        errors
    }
}

/// GSSAPI mechanism options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GssapiConfig {
    /// Client principal used to acquire credentials; default credentials when unset
    #[serde(default)]
    pub principal: Option<String>,

    /// Interpretation of `principal`
    #[serde(default)]
    pub principal_name_type: NameType,

    /// Principal of the service being connected to, e.g. `zmq@server.example.com`
    #[serde(default)]
    pub service_principal: String,

    /// Interpretation of `service_principal`
    #[serde(default)]
    pub service_principal_name_type: NameType,

    /// Authenticate only, do not wrap messages
    #[serde(default)]
    pub plaintext: bool,

    /// Acceptable mechanism OIDs in preference order
    #[serde(default = "default_gssapi_mechanisms")]
    pub mechanisms: Vec<String>,
}

fn default_gssapi_mechanisms() -> Vec<String> {
    vec![KRB5_MECHANISM_OID.to_string()]
}

impl Default for GssapiConfig {
    fn default() -> Self {
        Self {
            principal: None,
            principal_name_type: NameType::HostBased,
            service_principal: String::new(),
            service_principal_name_type: NameType::HostBased,
            plaintext: false,
            mechanisms: default_gssapi_mechanisms(),
        }
    }
}

impl GssapiConfig {
    /// Validate GSSAPI options
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.service_principal.is_empty() {
            errors.push("GSSAPI service principal cannot be empty".to_string());
        }

        if matches!(self.principal.as_deref(), Some("")) {
            errors.push("GSSAPI principal cannot be empty when set".to_string());
        }

        if self.mechanisms.is_empty() {
            errors.push("At least one GSSAPI mechanism OID must be configured".to_string());
        }

        for oid in &self.mechanisms {
            let valid = !oid.is_empty()
                && oid
                    .split('.')
                    .all(|arc| !arc.is_empty() && arc.bytes().all(|b| b.is_ascii_digit()));
            if !valid {
                errors.push(format!("Invalid mechanism OID: '{oid}'"));
            }
        }

        if self.plaintext {
            errors.push(
                "WARNING: GSSAPI plaintext mode is enabled - messages are not encrypted"
                    .to_string(),
            );
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("zmtp-connect"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
