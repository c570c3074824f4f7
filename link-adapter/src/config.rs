use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use adaptive_bitrate::{ProfileConfig, ProfileError, ProfileLadder};
use ffmpeg_encoder::{DeviceConfig, EncoderConfig};
use link_telemetry::DEFAULT_INTERFACE;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Config file not found at {0}")]
    NotFound(String),

    #[error("Invalid profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Router exposing the Wi-Fi statistics
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Host or host:port of the router
    pub address: String,
    /// Interface entry to read
    #[serde(default = "default_interface")]
    pub interface: String,
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seconds between signal polls (default: 5)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_interval_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            log_file: None,
        }
    }
}

impl Settings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionCheckConfig {
    pub ping_ip: String,
    #[serde(default)]
    pub http_url: Option<String>,
}

/// Top-level adapter configuration, loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    pub router: RouterConfig,
    #[serde(default)]
    pub settings: Settings,
    pub profile: ProfileConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    /// Capture devices, in the order they are restarted
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub connection_check: Option<ConnectionCheckConfig>,
}

impl AdapterConfig {
    /// Load and validate config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the adapter cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile.ladder()?;

        if self.router.address.trim().is_empty() {
            return Err(ConfigError::Invalid("router.address is empty".to_string()));
        }
        if self.settings.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "settings.interval_secs must be at least 1".to_string(),
            ));
        }
        if let Some(check) = &self.connection_check {
            check.ping_ip.trim().parse::<IpAddr>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "connection_check.ping_ip is not an IP address: {}",
                    check.ping_ip
                ))
            })?;
        }
        for device in &self.devices {
            if device.name.trim().is_empty() || device.output.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "device entries need a name and an output: {:?}",
                    device
                )));
            }
        }
        Ok(())
    }

    pub fn ladder(&self) -> Result<ProfileLadder, ConfigError> {
        Ok(self.profile.ladder()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL: &str = r#"
        [router]
        address = "192.168.1.1"

        [settings]
        interval_secs = 2
        log_file = "logs/link-adapter.log"

        [profile]
        resolution = "1920x1080"
        bitrate = "2000k"
        fps = 30
        degradation_steps = 4

        [encoder]
        stop_timeout_secs = 3

        [[devices]]
        name = "/dev/video0"
        output = "udp://10.0.0.2:5000"

        [[devices]]
        name = "/dev/video1"
        output = "udp://10.0.0.2:5001"

        [connection_check]
        ping_ip = "8.8.8.8"
        http_url = "https://example.com"
    "#;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("link-adapter.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_config() {
        let (_dir, path) = write(FULL);
        let config = AdapterConfig::load_from(&path).unwrap();

        assert_eq!(config.router.interface, DEFAULT_INTERFACE);
        assert_eq!(config.settings.interval(), Duration::from_secs(2));
        assert_eq!(config.encoder.stop_timeout_secs, 3);
        assert_eq!(config.encoder.program, "ffmpeg");
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].name, "/dev/video1");
        assert_eq!(config.ladder().unwrap().steps(), 4);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let (_dir, path) = write(
            r#"
            [router]
            address = "192.168.1.1"

            [profile]
            resolution = "1280x720"
            bitrate = "1500k"
            fps = 25
            "#,
        );
        let config = AdapterConfig::load_from(&path).unwrap();

        assert_eq!(config.settings.interval_secs, 5);
        assert!(config.settings.log_file.is_none());
        assert!(config.devices.is_empty());
        assert!(config.connection_check.is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = AdapterConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_zero_steps_is_fatal() {
        let (_dir, path) = write(&FULL.replace("degradation_steps = 4", "degradation_steps = 0"));
        let err = AdapterConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Profile(ProfileError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_bad_ping_ip_is_fatal() {
        let (_dir, path) = write(&FULL.replace("8.8.8.8", "dns.google"));
        assert!(matches!(
            AdapterConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
