// dhcpcd-tray - Scan Sets and Notifications
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Per-interface scan storage, new access point detection and
//! notification de-duplication.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::presenter::{Notification, NotificationIcon, Presenter};
use crate::models::ScanRecord;
use crate::{i18n, ni18n};

/// Latest processed scan results of one wireless interface.
#[derive(Debug, Clone, Default)]
pub struct ScanSet {
    pub interface: String,
    pub scans: Vec<ScanRecord>,
}

/// Records in `current` whose BSSID does not appear in `previous`, in order.
pub fn new_access_points<'a>(previous: &[ScanRecord], current: &'a [ScanRecord]) -> Vec<&'a ScanRecord> {
    let known: HashSet<&str> = previous.iter().map(|r| r.bssid.as_str()).collect();
    current.iter().filter(|r| !known.contains(r.bssid.as_str())).collect()
}

/// Notification announcing `fresh` access points, if there are any.
pub fn access_point_notification(fresh: &[&ScanRecord]) -> Option<Notification> {
    if fresh.is_empty() {
        return None;
    }
    let body = fresh.iter().map(|r| r.ssid.as_str()).collect::<Vec<_>>().join("\n");
    Some(Notification {
        title: ni18n!("New Access Point", "New Access Points", fresh.len()),
        body,
        icon: NotificationIcon::Wireless,
    })
}

/// Scan sets of all monitored wireless interfaces.
#[derive(Debug, Default)]
pub struct ScanSets {
    sets: BTreeMap<String, ScanSet>,
}

impl ScanSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `scans` for `interface`.
    ///
    /// The first results for an interface only create its set. Later ones
    /// are compared with the stored list by BSSID and replace it; the
    /// returned notification names the access points that are new.
    pub fn update(&mut self, interface: &str, scans: Vec<ScanRecord>) -> Option<Notification> {
        match self.sets.entry(interface.to_string()) {
            Entry::Vacant(slot) => {
                debug!("{}: first scan results ({} networks)", interface, scans.len());
                slot.insert(ScanSet {
                    interface: interface.to_string(),
                    scans,
                });
                None
            }
            Entry::Occupied(mut slot) => {
                let set = slot.get_mut();
                let notification = access_point_notification(&new_access_points(&set.scans, &scans));
                set.scans = scans;
                notification
            }
        }
    }

    pub fn get(&self, interface: &str) -> Option<&ScanSet> {
        self.sets.get(interface)
    }

    /// Drop the set of `interface`. Returns whether there was one.
    pub fn remove(&mut self, interface: &str) -> bool {
        self.sets.remove(interface).is_some()
    }

    /// Drop every set, returning the interfaces that had one.
    pub fn clear(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sets).into_keys().collect()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Shows notifications, never the same text twice in a row.
#[derive(Debug)]
pub struct Notifier {
    enabled: bool,
    last_text: Option<String>,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_text: None,
        }
    }

    /// Show `notification` unless its text repeats the last one shown.
    ///
    /// The previous notification is closed first. Returns whether anything
    /// was shown.
    pub fn notify<P: Presenter>(&mut self, presenter: &mut P, notification: Notification) -> bool {
        if !self.enabled {
            return false;
        }
        if self.last_text.as_deref() == Some(notification.body.as_str()) {
            debug!("Suppressing repeated notification: {}", notification.body);
            return false;
        }
        self.last_text = Some(notification.body.clone());
        presenter.close_notification();
        presenter.show_notification(&notification);
        true
    }
}

/// Notification for a changed interface.
pub fn network_event(message: String, up: bool) -> Notification {
    Notification {
        title: i18n!("Network event"),
        body: message,
        icon: if up {
            NotificationIcon::Online
        } else {
            NotificationIcon::Offline
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::presenter::testing::RecordingPresenter;

    fn rec(ssid: &str, bssid: &str) -> ScanRecord {
        ScanRecord::new(ssid, bssid, -50)
    }

    #[test]
    fn test_one_new_bssid() {
        let mut sets = ScanSets::new();
        assert!(sets.update("wlan0", vec![rec("Home", "b1"), rec("Work", "b2")]).is_none());

        let note = sets
            .update("wlan0", vec![rec("Work", "b2"), rec("Cafe", "b3")])
            .unwrap();
        assert_eq!(note.title, "New Access Point");
        assert_eq!(note.body, "Cafe");
        assert_eq!(note.icon, NotificationIcon::Wireless);
        assert_eq!(sets.get("wlan0").unwrap().scans.len(), 2);
    }

    #[test]
    fn test_several_new_bssids_plural() {
        let previous = vec![rec("Home", "b1")];
        let current = vec![rec("Cafe", "b3"), rec("Home", "b1"), rec("Library", "b4")];
        let fresh = new_access_points(&previous, &current);
        let note = access_point_notification(&fresh).unwrap();
        assert_eq!(note.title, "New Access Points");
        assert_eq!(note.body, "Cafe\nLibrary");
    }

    #[test]
    fn test_no_new_bssids() {
        let mut sets = ScanSets::new();
        sets.update("wlan0", vec![rec("Home", "b1")]);
        assert!(sets.update("wlan0", vec![rec("Home", "b1")]).is_none());
        assert!(sets.update("wlan0", Vec::new()).is_none());
        assert!(sets.get("wlan0").unwrap().scans.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut sets = ScanSets::new();
        sets.update("wlan0", vec![rec("Home", "b1")]);
        sets.update("wlan1", Vec::new());
        assert!(sets.remove("wlan0"));
        assert!(!sets.remove("wlan0"));
        assert_eq!(sets.clear(), vec!["wlan1".to_string()]);
        assert!(sets.is_empty());
    }

    #[test]
    fn test_repeated_text_suppressed() {
        let presenter = RecordingPresenter::default();
        let mut sink = presenter.clone();
        let mut notifier = Notifier::new(true);

        assert!(notifier.notify(&mut sink, network_event("eth0: Configured".into(), true)));
        assert!(!notifier.notify(&mut sink, network_event("eth0: Configured".into(), true)));
        assert!(notifier.notify(&mut sink, network_event("eth0: Cable unplugged".into(), false)));

        let seen = presenter.0.borrow();
        assert_eq!(seen.shown.len(), 2);
        assert_eq!(seen.closed, 2);
        assert_eq!(seen.shown[1].icon, NotificationIcon::Offline);
    }

    #[test]
    fn test_disabled_notifier_shows_nothing() {
        let presenter = RecordingPresenter::default();
        let mut sink = presenter.clone();
        let mut notifier = Notifier::new(false);
        assert!(!notifier.notify(&mut sink, network_event("eth0: Configured".into(), true)));
        assert!(presenter.0.borrow().shown.is_empty());
    }
}
