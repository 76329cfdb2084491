use crate::error::{FrameworkError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

fn default_enabled() -> bool {
    true
}

/// Per-service configuration.
///
/// Treated as a value object: constructed once (from a file section, the
/// environment, or code) and handed to `Service::configure`, never mutated
/// in place. Service-specific settings ride along in the flattened `extra`
/// map and are decoded by the owning manager via [`Self::parse_extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for ServiceConfiguration {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            autostart: false,
            metadata: HashMap::new(),
            extra: HashMap::new(),
        }
    }
}

impl ServiceConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Decode the service-specific extra fields into a typed settings struct.
    pub fn parse_extra<T: DeserializeOwned>(&self) -> Result<T> {
        let object = Value::Object(self.extra.clone().into_iter().collect());
        serde_json::from_value(object).map_err(FrameworkError::Serialization)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfiguration {
    /// Application title reported over HTTP
    pub title: String,

    /// Version string for the status endpoint
    pub version: String,

    /// Server bind host
    pub host: String,

    /// Server bind port
    pub port: u16,

    /// Debug mode (verbose request logging)
    pub debug: bool,

    /// Environment name (development, staging, production)
    pub environment: String,

    /// Per-service configuration sections keyed by service name
    pub services: HashMap<String, ServiceConfiguration>,
}

impl Default for ApplicationConfiguration {
    fn default() -> Self {
        Self {
            title: "prochost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            environment: "development".to_string(),
            services: HashMap::new(),
        }
    }
}

impl ApplicationConfiguration {
    /// Load configuration from an optional file plus the process environment.
    ///
    /// Precedence, lowest first: built-in defaults, the config file, then
    /// `PROCHOST_`-prefixed environment variables (`__` separates nesting,
    /// e.g. `PROCHOST_SERVICES__MONITORING__ENABLED=true`).
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PROCHOST")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|raw| raw.try_deserialize())
            .map_err(|e| FrameworkError::InvalidConfiguration(e.to_string()))
    }

    /// Write a sample configuration file with the built-in services.
    pub fn write_sample(path: &Path) -> Result<()> {
        let mut sample = Self::default();
        sample.services.insert(
            "monitoring".to_string(),
            ServiceConfiguration::new()
                .with_autostart(true)
                .with_extra("interval", Value::from(10.0)),
        );
        sample.services.insert(
            "clock".to_string(),
            ServiceConfiguration::new()
                .with_enabled(false)
                .with_extra("tick_size", Value::from(1.0)),
        );

        let body = toml::to_string_pretty(&sample)
            .map_err(|e| FrameworkError::InvalidConfiguration(e.to_string()))?;
        std::fs::write(path, body)?;
        Ok(())
    }
}
