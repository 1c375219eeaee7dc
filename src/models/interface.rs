// dhcpcd-tray - Interface Model
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Per-interface state as reported by dhcpcd.
//!
//! dhcpcd reports one record per interface and configuration protocol,
//! so a single physical interface can appear several times: once for
//! its link state and once for each address family being configured.

use std::net::IpAddr;

use crate::i18n;

/// Which layer of configuration an interface record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    /// Link layer (carrier) state.
    Link,
    /// DHCP/IPv4LL/static IPv4.
    Ipv4,
    /// DHCPv6.
    Dhcp6,
    /// IPv6 router advertisement.
    Ra,
}

impl InterfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Ipv4 => "ipv4",
            Self::Dhcp6 => "dhcp6",
            Self::Ra => "ra",
        }
    }

    /// Parse dhcpcd's `protocol` value.
    pub fn from_protocol(protocol: &str) -> Option<Self> {
        match protocol {
            "link" => Some(Self::Link),
            "dhcp" | "ipv4" | "ipv4ll" | "static" | "inform" => Some(Self::Ipv4),
            "dhcp6" => Some(Self::Dhcp6),
            "ra" => Some(Self::Ra),
            _ => None,
        }
    }

    /// Derive the record kind from the event reason when no protocol is given.
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "PREINIT" | "CARRIER" | "NOCARRIER" | "DEPARTED" | "UNKNOWN" => Self::Link,
            "ROUTERADVERT" => Self::Ra,
            r if r.ends_with('6') => Self::Dhcp6,
            _ => Self::Ipv4,
        }
    }
}

/// Reasons for which an address-layer record counts as configured.
const UP_REASONS: &[&str] = &[
    "BOUND", "RENEW", "REBIND", "REBOOT", "IPV4LL", "INFORM", "STATIC", "3RDPARTY",
    "ROUTERADVERT", "BOUND6", "RENEW6", "REBIND6", "REBOOT6", "INFORM6", "DELEGATED6",
];

/// Reasons that never warrant a desktop notification.
const QUIET_REASONS: &[&str] = &["RENEW", "STOP", "STOPPED"];

/// One interface record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Interface name (e.g. "wlan0").
    pub name: String,
    /// Record kind.
    pub kind: InterfaceKind,
    /// Last reason dhcpcd gave for this record.
    pub reason: String,
    /// Whether the record is up (carrier for links, configured otherwise).
    pub up: bool,
    /// Whether the interface is wireless.
    pub wireless: bool,
    /// SSID the interface is associated with, if wireless.
    pub ssid: Option<String>,
    /// Configured address, if any.
    pub address: Option<IpAddr>,
    /// Prefix length of `address`.
    pub prefix_len: Option<u8>,
    /// Router advertisement asked for managed (DHCPv6) configuration.
    pub ra_managed: bool,
}

impl Interface {
    /// Create a record with no address information.
    pub fn new(name: impl Into<String>, kind: InterfaceKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            name: name.into(),
            kind,
            up: kind != InterfaceKind::Link && UP_REASONS.contains(&reason.as_str()),
            reason,
            wireless: false,
            ssid: None,
            address: None,
            prefix_len: None,
            ra_managed: false,
        }
    }

    pub fn is_link(&self) -> bool {
        self.kind == InterfaceKind::Link
    }

    /// The interface has left the system or dhcpcd stopped managing it.
    pub fn has_departed(&self) -> bool {
        matches!(self.reason.as_str(), "DEPARTED" | "STOPPED")
    }

    /// Whether a change to this record is worth telling the user about.
    pub fn is_notable(&self) -> bool {
        !QUIET_REASONS.contains(&self.reason.as_str())
    }

    /// Human readable one-line description, if the record has one.
    pub fn message(&self) -> Option<String> {
        if self.kind == InterfaceKind::Ra && self.up && self.ra_managed {
            return None;
        }

        let ssid = self.ssid.as_deref().filter(|s| !s.is_empty());
        let mut show_ssid = false;
        let reason = match self.reason.as_str() {
            "EXPIRE" => Some(i18n!("Expired")),
            "CARRIER" if self.wireless => {
                show_ssid = true;
                Some(i18n!("Associated with"))
            }
            "CARRIER" => Some(i18n!("Cable plugged in")),
            "NOCARRIER" if self.wireless && ssid.is_some() => {
                show_ssid = true;
                Some(i18n!("Disassociated from"))
            }
            "NOCARRIER" if self.wireless => Some(i18n!("Not associated")),
            "NOCARRIER" => Some(i18n!("Cable unplugged")),
            "DEPARTED" => Some(i18n!("Departed")),
            "UNKNOWN" => Some(i18n!("Unknown link state")),
            "FAIL" => Some(i18n!("Automatic configuration not possible")),
            "3RDPARTY" => Some(i18n!("Waiting for 3rd Party configuration")),
            _ => None,
        };
        let reason = match reason {
            Some(r) => r,
            None if self.up => i18n!("Configured"),
            None if self.kind == InterfaceKind::Ra => i18n!("Expired RA"),
            None => self.reason.clone(),
        };

        let message = match (show_ssid, ssid, self.address) {
            (true, Some(ssid), _) => format!("{}: {} {}", self.name, reason, ssid),
            (false, _, Some(addr)) if self.up => match self.prefix_len {
                Some(len) => format!("{}: {} {}/{}", self.name, reason, addr, len),
                None => format!("{}: {} {}", self.name, reason, addr),
            },
            _ => format!("{}: {}", self.name, reason),
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_reason() {
        assert_eq!(InterfaceKind::from_reason("CARRIER"), InterfaceKind::Link);
        assert_eq!(InterfaceKind::from_reason("ROUTERADVERT"), InterfaceKind::Ra);
        assert_eq!(InterfaceKind::from_reason("BOUND6"), InterfaceKind::Dhcp6);
        assert_eq!(InterfaceKind::from_reason("BOUND"), InterfaceKind::Ipv4);
    }

    #[test]
    fn test_up_derived_from_reason() {
        assert!(Interface::new("eth0", InterfaceKind::Ipv4, "BOUND").up);
        assert!(!Interface::new("eth0", InterfaceKind::Ipv4, "EXPIRE").up);
        assert!(!Interface::new("eth0", InterfaceKind::Link, "BOUND").up);
    }

    #[test]
    fn test_configured_message() {
        let mut iface = Interface::new("eth0", InterfaceKind::Ipv4, "BOUND");
        iface.address = Some("192.168.1.20".parse().unwrap());
        iface.prefix_len = Some(24);
        assert_eq!(iface.message().unwrap(), "eth0: Configured 192.168.1.20/24");
    }

    #[test]
    fn test_wireless_carrier_message() {
        let mut iface = Interface::new("wlan0", InterfaceKind::Link, "CARRIER");
        iface.wireless = true;
        iface.ssid = Some("Home".into());
        assert_eq!(iface.message().unwrap(), "wlan0: Associated with Home");

        iface.reason = "NOCARRIER".into();
        iface.ssid = None;
        assert_eq!(iface.message().unwrap(), "wlan0: Not associated");
    }

    #[test]
    fn test_wired_carrier_message() {
        let iface = Interface::new("eth0", InterfaceKind::Link, "NOCARRIER");
        assert_eq!(iface.message().unwrap(), "eth0: Cable unplugged");
    }

    #[test]
    fn test_managed_ra_has_no_message() {
        let mut iface = Interface::new("eth0", InterfaceKind::Ra, "ROUTERADVERT");
        iface.ra_managed = true;
        assert!(iface.message().is_none());
    }

    #[test]
    fn test_unknown_reason_passes_through() {
        let iface = Interface::new("eth0", InterfaceKind::Ipv4, "TIMEOUT");
        assert_eq!(iface.message().unwrap(), "eth0: TIMEOUT");
    }

    #[test]
    fn test_quiet_reasons() {
        assert!(!Interface::new("eth0", InterfaceKind::Ipv4, "RENEW").is_notable());
        assert!(Interface::new("eth0", InterfaceKind::Ipv4, "BOUND").is_notable());
        assert!(Interface::new("eth0", InterfaceKind::Link, "DEPARTED").has_departed());
    }
}
