//! Configuration loading and persistence.

use super::{Config, KernelsConfig};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use std::fs;
use std::path::Path;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` if given, else the default path.
    ///
    /// A missing file yields defaults; any other failure is returned.
    /// Environment overrides are applied either way.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        };

        let mut config = match loaded {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `KERNELGATE_PORT` and `KERNELGATE_AUTH_TOKEN`.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env::get_u16(env::vars::KERNELGATE_PORT) {
            self.gateway.port = port;
        }
        if let Some(token) = env::get_var(env::vars::KERNELGATE_AUTH_TOKEN) {
            if !token.is_empty() {
                self.gateway.auth.token = Some(SecretString::new(token));
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.gateway.port == 0 {
            errors.push("Gateway port cannot be 0".to_string());
        }

        let base = &self.gateway.base_path;
        if !base.starts_with('/') {
            errors.push(format!("Gateway base_path '{}' must start with '/'", base));
        } else if base.len() > 1 && base.ends_with('/') {
            errors.push(format!(
                "Gateway base_path '{}' must not end with '/'",
                base
            ));
        }

        if let Some(token) = &self.gateway.auth.token {
            if token.is_empty() {
                errors.push("Gateway auth token must not be empty when set".to_string());
            }
        }

        if self.gateway.cors.allow_origins.iter().any(|o| o.trim().is_empty()) {
            errors.push("CORS allow_origins must not contain empty entries".to_string());
        }

        errors.extend(self.kernels.validation_errors());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

impl KernelsConfig {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_kernels == Some(0) {
            errors.push("Kernel max_kernels must be greater than 0".to_string());
        }
        if self.channel_buffer == 0 {
            errors.push("Kernel channel_buffer must be greater than 0".to_string());
        }
        for (i, spec) in self.allowed_specs.iter().enumerate() {
            if spec.trim().is_empty() {
                errors.push(format!("Kernel allowed_specs [{}] must not be empty", i));
            }
        }

        errors
    }
}
