// dhcpcd-tray - Tray Icon Animation
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Frame sequencing for the status icon.
//!
//! Going online flashes the icon a few times before it settles; having
//! only a carrier keeps it cycling until the state changes.

use std::time::Duration;

use crate::models::Classification;

pub const ICON_OFFLINE: &str = "network-offline";
pub const ICON_IDLE: &str = "network-idle";
pub const ICON_TRANSMIT: &str = "network-transmit";
pub const ICON_RECEIVE: &str = "network-receive";
pub const ICON_TRANSMIT_RECEIVE: &str = "network-transmit-receive";

const ONLINE_PERIOD: Duration = Duration::from_millis(300);
const CARRIER_PERIOD: Duration = Duration::from_millis(500);
const ONLINE_FRAMES: u32 = 7;

/// Current animation and the icon it shows.
#[derive(Debug, Clone)]
pub struct IconAnimation {
    mode: Classification,
    counter: u32,
    icon: &'static str,
}

impl Default for IconAnimation {
    fn default() -> Self {
        Self {
            mode: Classification::Offline,
            counter: 0,
            icon: ICON_OFFLINE,
        }
    }
}

impl IconAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn icon(&self) -> &'static str {
        self.icon
    }

    /// Restart for `mode` and show its first frame.
    ///
    /// Returns the frame period, or `None` when the icon is steady.
    pub fn start(&mut self, mode: Classification) -> Option<Duration> {
        self.mode = mode;
        self.counter = 0;
        match mode {
            Classification::Offline => {
                self.icon = ICON_OFFLINE;
                None
            }
            Classification::Online => {
                self.tick();
                Some(ONLINE_PERIOD)
            }
            Classification::CarrierOnly => {
                self.tick();
                Some(CARRIER_PERIOD)
            }
        }
    }

    /// Advance one frame. Returns false once the animation is over and the
    /// current icon is final.
    pub fn tick(&mut self) -> bool {
        match self.mode {
            Classification::Offline => false,
            Classification::Online => {
                if self.counter >= ONLINE_FRAMES {
                    return false;
                }
                self.counter += 1;
                self.icon = if self.counter % 2 == 0 {
                    ICON_IDLE
                } else {
                    ICON_TRANSMIT_RECEIVE
                };
                true
            }
            Classification::CarrierOnly => {
                let (icon, next) = match self.counter {
                    0 => (ICON_TRANSMIT, 1),
                    1 => (ICON_RECEIVE, 2),
                    _ => (ICON_IDLE, 0),
                };
                self.icon = icon;
                self.counter = next;
                true
            }
        }
    }
}
