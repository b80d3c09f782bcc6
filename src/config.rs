// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration module.
//!
//! Handles loading and saving bridge settings.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bluetooth::{ConnectionSettings, DEFAULT_READ_BUFFER_SIZE, DEFAULT_READ_TIMEOUT};

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth settings.
    pub bluetooth: BluetoothConfig,

    /// Serial channel settings.
    pub serial: SerialConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Adapter name such as "hci0". The default adapter when unset.
    pub adapter: Option<String>,

    /// Fixed RFCOMM channel. When unset the channel is looked up by SPP UUID.
    pub channel: Option<u8>,

    /// Connect handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            channel: None,
            connect_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Maximum bytes returned by one read.
    pub read_buffer_size: usize,

    /// Read timeout in milliseconds. 0 waits until data or EOF, blocking
    /// every other request meanwhile.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spp-bridge")
            .join("config.toml")
    }

    /// Load configuration from the default location or create it.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            let config = Self::default();
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, toml::to_string_pretty(&config)?)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.serial.read_buffer_size == 0 {
            bail!("serial.read_buffer_size must be greater than zero");
        }
        if self.bluetooth.connect_timeout_ms == 0 {
            bail!("bluetooth.connect_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            read_buffer_size: self.serial.read_buffer_size,
            connect_timeout: Duration::from_millis(self.bluetooth.connect_timeout_ms),
            read_timeout: match self.serial.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_default_read_is_bounded() {
        let settings = Config::default().connection_settings();
        assert_eq!(settings.read_timeout, Some(Duration::from_millis(200)));
        assert_eq!(settings.read_buffer_size, 1024);
    }

    #[test]
    fn test_zero_read_timeout_waits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[serial]\nread_timeout_ms = 0\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.connection_settings().read_timeout, None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bluetooth]\nchannel = 1\n\n[serial]\nread_timeout_ms = 250\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bluetooth.channel, Some(1));
        assert_eq!(config.bluetooth.connect_timeout_ms, 15_000);
        assert_eq!(config.serial.read_buffer_size, 1024);

        let settings = config.connection_settings();
        assert_eq!(settings.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(settings.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[serial]\nread_buffer_size = 0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.bluetooth.adapter = Some("hci1".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
