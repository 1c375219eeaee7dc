// dhcpcd-tray - Presentation Interface
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! What the engine tells the desktop side.

use super::aggregator::StatusUpdate;
use crate::models::ScanRecord;

/// Icon shown next to a desktop notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationIcon {
    Online,
    Offline,
    Wireless,
}

impl NotificationIcon {
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Online => "network-transmit-receive",
            Self::Offline => "network-offline",
            Self::Wireless => "network-wireless",
        }
    }
}

/// A desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: NotificationIcon,
}

/// Receiver of everything user-visible the engine produces.
///
/// All calls happen on the main loop thread.
pub trait Presenter {
    /// The aggregate status or its tooltip changed.
    fn status_changed(&mut self, update: &StatusUpdate);

    /// New processed scan results for `interface`; empty when they were dropped.
    fn scan_updated(&mut self, interface: &str, scans: &[ScanRecord]);

    /// The daemon went away; menus and dialogs built from its data are stale.
    fn connection_lost(&mut self);

    /// The daemon is reachable again.
    fn connection_restored(&mut self);

    fn show_notification(&mut self, notification: &Notification);

    /// Close the notification currently on screen, if any.
    fn close_notification(&mut self);
}
