// dhcpcd-tray - Scan Record Model
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Wireless scan results.

/// One access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Network name; may be empty for hidden networks.
    pub ssid: String,
    /// Hardware address of the access point.
    pub bssid: String,
    /// Signal level in dBm; larger is stronger.
    pub strength: i32,
    /// Channel frequency in MHz.
    pub frequency: u32,
    /// Capability flags as reported by the supplicant, e.g. `[WPA2-PSK-CCMP][ESS]`.
    pub flags: String,
}

impl ScanRecord {
    pub fn new(ssid: impl Into<String>, bssid: impl Into<String>, strength: i32) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: bssid.into(),
            strength,
            frequency: 0,
            flags: String::new(),
        }
    }

    /// Whether the network requires authentication.
    pub fn is_secure(&self) -> bool {
        ["WPA", "WEP", "RSN", "SAE"].iter().any(|f| self.flags.contains(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_flags() {
        let mut record = ScanRecord::new("Cafe", "00:11:22:33:44:55", -60);
        assert!(!record.is_secure());
        record.flags = "[WPA2-PSK-CCMP][ESS]".into();
        assert!(record.is_secure());
    }
}
