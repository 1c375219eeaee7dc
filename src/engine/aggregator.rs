// dhcpcd-tray - Status Aggregation
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Folds every interface record into one online/carrier/offline state.

use std::collections::HashMap;

use crate::models::{Classification, Interface, InterfaceKind};

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub classification: Classification,
    /// Newline-joined interface messages; empty when there are none.
    pub tooltip: String,
    /// The classification differs from the previous pass.
    pub changed: bool,
}

/// Aggregate status derived from the current interface set.
#[derive(Debug, Default)]
pub struct StatusAggregator {
    online: bool,
    carrier: bool,
    last_messages: HashMap<(String, InterfaceKind), String>,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn classification(&self) -> Classification {
        classify(self.online, self.carrier)
    }

    /// Recompute from the full interface set.
    pub fn update(&mut self, interfaces: &[Interface]) -> StatusUpdate {
        let mut online = false;
        let mut carrier = false;
        let mut messages = Vec::new();

        for iface in interfaces {
            if iface.is_link() {
                carrier |= iface.up;
            } else {
                online |= iface.up;
            }
            if let Some(msg) = iface.message() {
                messages.push(msg);
            }
        }

        let changed = online != self.online || carrier != self.carrier;
        self.online = online;
        self.carrier = carrier;

        StatusUpdate {
            classification: classify(online, carrier),
            tooltip: messages.join("\n"),
            changed,
        }
    }

    /// Force the offline state, as when the daemon goes away.
    ///
    /// Returns an update carrying `message` as the tooltip.
    pub fn reset(&mut self, message: &str) -> StatusUpdate {
        let changed = self.online || self.carrier;
        self.online = false;
        self.carrier = false;
        self.last_messages.clear();
        StatusUpdate {
            classification: Classification::Offline,
            tooltip: message.to_string(),
            changed,
        }
    }

    /// Record the latest message for an interface record.
    ///
    /// Returns true when it differs from the previous one.
    pub fn record_message(&mut self, iface: &Interface, message: &str) -> bool {
        let key = (iface.name.clone(), iface.kind);
        match self.last_messages.get(&key) {
            Some(last) if last == message => false,
            _ => {
                self.last_messages.insert(key, message.to_string());
                true
            }
        }
    }

    /// Forget everything known about an interface.
    pub fn forget(&mut self, name: &str) {
        self.last_messages.retain(|(iface, _), _| iface != name);
    }
}

fn classify(online: bool, carrier: bool) -> Classification {
    if online {
        Classification::Online
    } else if carrier {
        Classification::CarrierOnly
    } else {
        Classification::Offline
    }
}
