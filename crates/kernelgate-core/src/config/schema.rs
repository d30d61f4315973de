//! Configuration schema definitions.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Main kernelgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Kernel manager settings.
    #[serde(default)]
    pub kernels: KernelsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind mode.
    #[serde(default)]
    pub bind: BindMode,

    /// Port number.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix of every API route.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: BindMode::default(),
            port: default_port(),
            base_path: default_base_path(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    8888
}

fn default_base_path() -> String {
    "/api".to_string()
}

/// Bind mode for the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Bind to loopback only (127.0.0.1).
    #[default]
    Loopback,

    /// Bind to all interfaces.
    Lan,
}

/// API authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token every API request must present. `None` disables authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<SecretString>,
}

/// CORS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` allows any.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,

    /// Preflight cache lifetime in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
            max_age_secs: default_max_age(),
        }
    }
}

fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

/// Settings for the in-process kernel manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelsConfig {
    /// Maximum concurrently running kernels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_kernels: Option<usize>,

    /// Kernel spec names that may be started; empty allows any.
    #[serde(default)]
    pub allowed_specs: Vec<String>,

    /// Time before a new kernel accepts channel connections.
    #[serde(default)]
    pub startup_delay_ms: u64,

    /// Remove a kernel when its last channel connection closes.
    #[serde(default)]
    pub cull_on_last_disconnect: bool,

    /// Frames buffered per direction on a channel connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
}

impl Default for KernelsConfig {
    fn default() -> Self {
        Self {
            max_kernels: None,
            allowed_specs: Vec::new(),
            startup_delay_ms: 0,
            cull_on_last_disconnect: false,
            channel_buffer: default_channel_buffer(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,

    /// One JSON object per event.
    Json,
}
