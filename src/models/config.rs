// dhcpcd-tray - Application Configuration
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Application configuration model.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::CONFIG_DIR_NAME;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delay before reopening a failed or lost connection, in milliseconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,

    /// Interval between rescan requests on wireless interfaces, in seconds.
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_secs: u32,

    /// Show desktop notifications.
    #[serde(default = "default_true")]
    pub notifications: bool,

    /// How long a notification stays on screen, in milliseconds.
    #[serde(default = "default_notification_timeout")]
    pub notification_timeout_ms: i32,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Privileged dhcpcd control socket.
    #[serde(default = "default_dhcpcd_socket")]
    pub dhcpcd_socket: PathBuf,

    /// Unprivileged dhcpcd control socket.
    #[serde(default = "default_dhcpcd_unpriv_socket")]
    pub dhcpcd_unpriv_socket: PathBuf,

    /// Directory holding the wpa_supplicant control sockets.
    #[serde(default = "default_wpa_ctrl_dir")]
    pub wpa_ctrl_dir: PathBuf,

    /// Read timeout for synchronous control commands, in milliseconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

fn default_retry_interval() -> u64 {
    1000
}

fn default_rescan_interval() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

fn default_notification_timeout() -> i32 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dhcpcd_socket() -> PathBuf {
    PathBuf::from("/var/run/dhcpcd.sock")
}

fn default_dhcpcd_unpriv_socket() -> PathBuf {
    PathBuf::from("/var/run/dhcpcd.unpriv.sock")
}

fn default_wpa_ctrl_dir() -> PathBuf {
    PathBuf::from("/var/run/wpa_supplicant")
}

fn default_command_timeout() -> u64 {
    2000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval(),
            rescan_interval_secs: default_rescan_interval(),
            notifications: true,
            notification_timeout_ms: default_notification_timeout(),
            log_level: default_log_level(),
            dhcpcd_socket: default_dhcpcd_socket(),
            dhcpcd_unpriv_socket: default_dhcpcd_unpriv_socket(),
            wpa_ctrl_dir: default_wpa_ctrl_dir(),
            command_timeout_ms: default_command_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, super::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| super::Error::ConfigReadFailed(format!("{}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("config.toml"))
    }

    /// Load the user configuration.
    ///
    /// A missing file yields the defaults; a broken one is an error the
    /// caller reports before falling back to the defaults.
    pub fn try_load() -> Result<Self, super::Error> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    /// Fixed reconnect delay.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Periodic rescan interval.
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.rescan_interval_secs))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.retry_interval(), Duration::from_secs(1));
        assert_eq!(config.rescan_interval(), Duration::from_secs(60));
        assert!(config.notifications);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str("retry_interval_ms = 250\nnotifications = false\n").unwrap();
        assert_eq!(config.retry_interval_ms, 250);
        assert!(!config.notifications);
        assert_eq!(config.wpa_ctrl_dir, PathBuf::from("/var/run/wpa_supplicant"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = toml::from_str::<AppConfig>("retry_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(super::super::Error::from(err), super::super::Error::ConfigParseFailed(_)));
    }
}
