// dhcpcd-tray - Status Model
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Daemon connection status and the aggregate network classification.

use std::fmt;

/// Connection status as reported by a control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Down,
    Opened,
    Disconnected,
    Connecting,
    Connected,
}

impl DaemonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Opened => "opened",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall network state shown by the tray icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Offline,
    /// Link signal present but nothing configured yet.
    CarrierOnly,
    Online,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::CarrierOnly => "carrier",
            Self::Online => "online",
        }
    }
}
