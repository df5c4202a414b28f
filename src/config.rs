//! Session configuration.
//!
//! One immutable value object, loaded (or built by the operator layer) and
//! validated once before a session starts. Nothing in the pipeline re-reads
//! settings mid-flight.

use crate::error::ConfigError;
use crate::model::Category;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which metric categories a session collects. Disabled categories are never
/// even looked up during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryToggles {
    pub position: bool,
    pub device_metrics: bool,
    pub environment: bool,
    pub air_quality: bool,
    pub power: bool,
    pub pax_counter: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            position: true,
            device_metrics: true,
            environment: true,
            air_quality: false,
            power: false,
            pax_counter: false,
        }
    }
}

impl CategoryToggles {
    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::Position => self.position,
            Category::DeviceMetrics => self.device_metrics,
            Category::Environment => self.environment,
            Category::AirQuality => self.air_quality,
            Category::Power => self.power,
            Category::PaxCounter => self.pax_counter,
        }
    }

    pub fn all() -> Self {
        Self {
            position: true,
            device_metrics: true,
            environment: true,
            air_quality: true,
            power: true,
            pax_counter: true,
        }
    }

    pub fn none() -> Self {
        Self {
            position: false,
            device_metrics: false,
            environment: false,
            air_quality: false,
            power: false,
            pax_counter: false,
        }
    }

    /// Enables exactly one category, for table-driven tests.
    pub fn only(category: Category) -> Self {
        let mut toggles = Self::none();
        match category {
            Category::Position => toggles.position = true,
            Category::DeviceMetrics => toggles.device_metrics = true,
            Category::Environment => toggles.environment = true,
            Category::AirQuality => toggles.air_quality = true,
            Category::Power => toggles.power = true,
            Category::PaxCounter => toggles.pax_counter = true,
        }
        toggles
    }
}

/// Immutable per-session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub api_key: String,
    pub endpoint_url: String,
    pub device_port: String,
    pub collection_interval_secs: u64,
    pub inter_request_delay_secs: f64,
    pub categories: CategoryToggles,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint_url: String::new(),
            device_port: String::new(),
            collection_interval_secs: 900,
            inter_request_delay_secs: 1.0,
            categories: CategoryToggles::default(),
        }
    }
}

impl SessionConfig {
    /// Checks the start preconditions: key/endpoint/port present, interval
    /// at least one second, delay non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.device_port.trim().is_empty() {
            return Err(ConfigError::MissingDevicePort);
        }
        if self.collection_interval_secs < 1 {
            return Err(ConfigError::IntervalTooShort(self.collection_interval_secs));
        }
        if !self.inter_request_delay_secs.is_finite() || self.inter_request_delay_secs < 0.0 {
            return Err(ConfigError::InvalidDelay(self.inter_request_delay_secs));
        }
        Ok(())
    }

    /// Pause between two point deliveries.
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_request_delay_secs.max(0.0))
    }

    /// Loads and validates a config file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: SessionConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config file location: first CLI argument, then `MESH_HARBOR_CONFIG`,
    /// then `harbor.toml` in the working directory.
    pub fn config_path() -> PathBuf {
        std::env::args()
            .nth(1)
            .or_else(|| std::env::var("MESH_HARBOR_CONFIG").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("harbor.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> SessionConfig {
        SessionConfig {
            api_key: "key".into(),
            endpoint_url: "https://harbor.example/api/ingest".into(),
            device_port: "/dev/ttyUSB0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_matches_operator_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.collection_interval_secs, 900);
        assert_eq!(config.inter_request_delay_secs, 1.0);
        assert!(config.categories.position);
        assert!(config.categories.device_metrics);
        assert!(!config.categories.air_quality);
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let mut config = valid_config();
        config.api_key = "  ".into();
        assert_eq!(config.validate(), Err(ConfigError::MissingApiKey));

        let mut config = valid_config();
        config.endpoint_url.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingEndpoint));

        let mut config = valid_config();
        config.device_port.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingDevicePort));
    }

    #[test]
    fn validate_rejects_bad_timing() {
        let mut config = valid_config();
        config.collection_interval_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::IntervalTooShort(0)));

        let mut config = valid_config();
        config.inter_request_delay_secs = -0.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDelay(-0.5)));

        let mut config = valid_config();
        config.inter_request_delay_secs = f64::NAN;
        assert!(config.validate().is_err());

        // Zero delay is allowed.
        let mut config = valid_config();
        config.inter_request_delay_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn load_reads_and_validates_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_key = "key"
endpoint_url = "https://harbor.example/api/ingest"
device_port = "/dev/ttyUSB0"
collection_interval_secs = 60
inter_request_delay_secs = 0.5

[categories]
air_quality = true
"#
        )
        .unwrap();

        let config = SessionConfig::load(file.path()).await.unwrap();
        assert_eq!(config.collection_interval_secs, 60);
        assert!(config.categories.air_quality);
        // Unspecified toggles fall back to the defaults.
        assert!(config.categories.position);
        assert!(!config.categories.power);
    }

    #[tokio::test]
    async fn load_rejects_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"\"\nendpoint_url = \"\"\ndevice_port = \"\"").unwrap();
        assert!(SessionConfig::load(file.path()).await.is_err());
    }
}
