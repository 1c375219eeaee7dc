// dhcpcd-tray - Shared Models
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # Shared Models
//!
//! Plain data types shared by the engine, the control clients and the
//! desktop collaborators:
//!
//! - **Interface**: per-interface records reported by dhcpcd
//! - **Scan**: wireless access points reported by wpa_supplicant
//! - **Status**: daemon status and aggregate classification
//! - **Config**: user configuration
//! - **Error**: shared error types

pub mod config;
pub mod error;
pub mod interface;
pub mod scan;
pub mod status;

// Re-export main types for convenience
pub use config::AppConfig;
pub use error::{Error, Result};
pub use interface::{Interface, InterfaceKind};
pub use scan::ScanRecord;
pub use status::{Classification, DaemonStatus};

/// D-Bus well-known name for the tray service.
pub const DBUS_SERVICE_NAME: &str = "com.chrisdaggas.DhcpcdTray";

/// D-Bus object path for the tray status interface.
pub const DBUS_OBJECT_PATH: &str = "/com/chrisdaggas/DhcpcdTray";

/// Configuration directory name (under XDG_CONFIG_HOME).
pub const CONFIG_DIR_NAME: &str = "dhcpcd-tray";
