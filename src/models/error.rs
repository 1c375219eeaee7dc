// dhcpcd-tray - Error Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared error types for the tray client.

use std::io;
use thiserror::Error;

/// Result type alias for tray client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tray client operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================
    // Connection Errors
    // ========================================
    #[error("Not connected")]
    NotConnected,

    #[error("Failed to watch descriptor {0}")]
    WatchFailed(i32),

    // ========================================
    // Protocol Errors
    // ========================================
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    // ========================================
    // Configuration Errors
    // ========================================
    #[error("Failed to read configuration: {0}")]
    ConfigReadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParseFailed(String),

    // ========================================
    // D-Bus Errors
    // ========================================
    #[error("D-Bus error: {0}")]
    Dbus(String),

    // ========================================
    // System Errors
    // ========================================
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a new unexpected reply error.
    pub fn unexpected_reply(command: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            command: command.into(),
            reply: reply.into(),
        }
    }

    /// OS error code behind this error, if any.
    ///
    /// Non-IO errors map to `EIO` so they still take part in the
    /// once-per-code log suppression.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Io(e) => e.raw_os_error().unwrap_or(EIO),
            Self::NotConnected => ENOTCONN,
            _ => EIO,
        }
    }

    /// Check if this error only means that no data is pending.
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted))
    }

    /// Check if this error is a permission failure (EACCES/EPERM).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::PermissionDenied)
    }
}

const EIO: i32 = 5;
const ENOTCONN: i32 = 107;

// Convert from zbus errors
impl From<zbus::Error> for Error {
    fn from(err: zbus::Error) -> Self {
        Error::Dbus(err.to_string())
    }
}

// Convert from toml parse errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParseFailed(err.to_string())
    }
}
