// dhcpcd-tray - Desktop Services
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Desktop-side helpers driven by the tray:
//! - Animation: status icon frame sequencing
//! - Notifications: freedesktop notification client

pub mod animation;
pub mod notifications;

pub use animation::IconAnimation;
pub use notifications::DesktopNotifier;
