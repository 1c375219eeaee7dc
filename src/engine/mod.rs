// dhcpcd-tray - Connection Engine
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Connection and event multiplexing engine.
//!
//! The [`Engine`] owns the dhcpcd connection, one supplicant connection per
//! wireless interface, their descriptor watches and retry timers, the scan
//! sets and the aggregate status. Everything runs on the main loop thread:
//! the loop reports readiness and timer expiry through [`Engine::handle_event`]
//! and the engine reports user-visible changes to its [`Presenter`].

pub mod aggregator;
pub mod lifecycle;
pub mod multiplexer;
pub mod notifier;
pub mod presenter;
pub mod scan;
pub mod watch;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::control::{DaemonClient, DaemonEvent, WirelessEvent, WirelessLink};
use crate::i18n;
use crate::models::{AppConfig, DaemonStatus, Error, Interface};

pub use aggregator::{StatusAggregator, StatusUpdate};
pub use lifecycle::{ConnectionState, Phase};
pub use multiplexer::{GlibMultiplexer, LoopEvent, Multiplexer, TimerHandle, TimerKind};
pub use notifier::{Notifier, ScanSets};
pub use presenter::{Notification, NotificationIcon, Presenter};
pub use watch::{WatchKey, WatchRegistry};

/// Owner of a descriptor watch or retry timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionId {
    /// The dhcpcd connection.
    Daemon,
    /// The supplicant connection of a wireless interface.
    Wireless(String),
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daemon => f.write_str("dhcpcd"),
            Self::Wireless(name) => write!(f, "{} (wpa_supplicant)", name),
        }
    }
}

struct WirelessSlot<L> {
    link: L,
    state: ConnectionState,
}

/// The connection engine.
pub struct Engine<M: Multiplexer, D: DaemonClient, P: Presenter> {
    mux: M,
    registry: WatchRegistry,
    daemon: D,
    daemon_state: ConnectionState,
    last_status: Option<DaemonStatus>,
    links: BTreeMap<String, WirelessSlot<D::Link>>,
    scans: ScanSets,
    notifier: Notifier,
    aggregator: StatusAggregator,
    presenter: P,
    retry_interval: Duration,
    rescan_interval: Duration,
    rescan_timer: Option<TimerHandle>,
}

impl<M: Multiplexer, D: DaemonClient, P: Presenter> Engine<M, D, P> {
    pub fn new(mux: M, daemon: D, presenter: P, config: &AppConfig) -> Self {
        Self {
            mux,
            registry: WatchRegistry::new(),
            daemon,
            daemon_state: ConnectionState::new(ConnectionId::Daemon.to_string()),
            last_status: None,
            links: BTreeMap::new(),
            scans: ScanSets::new(),
            notifier: Notifier::new(config.notifications),
            aggregator: StatusAggregator::new(),
            presenter,
            retry_interval: config.retry_interval(),
            rescan_interval: config.rescan_interval(),
            rescan_timer: None,
        }
    }

    /// Show the initial state, arm the rescan trigger and connect.
    pub fn start(&mut self) {
        info!("Connecting ...");
        let update = self.aggregator.reset(&i18n!("Connecting to dhcpcd ..."));
        self.presenter.status_changed(&update);

        if self.rescan_timer.is_none() && !self.rescan_interval.is_zero() {
            self.rescan_timer = Some(self.mux.add_interval(self.rescan_interval, TimerKind::Rescan));
        }
        self.try_open_daemon();
    }

    /// Handle one event reported by the loop.
    pub fn handle_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Ready(ConnectionId::Daemon) => self.on_daemon_ready(),
            LoopEvent::Ready(ConnectionId::Wireless(name)) => self.on_wireless_ready(&name),
            LoopEvent::Timer(TimerKind::Retry(ConnectionId::Daemon)) => self.try_open_daemon(),
            LoopEvent::Timer(TimerKind::Retry(ConnectionId::Wireless(name))) => {
                self.try_open_wireless(&name)
            }
            LoopEvent::Timer(TimerKind::Rescan) => self.rescan(),
        }
    }

    /// Close every connection and cancel every timer.
    pub fn shutdown(&mut self) {
        debug!("Shutting down engine");
        if let Some(timer) = self.rescan_timer.take() {
            self.mux.cancel_timer(timer);
        }
        let names: Vec<String> = self.links.keys().cloned().collect();
        for name in names {
            self.drop_wireless(&name);
        }
        self.registry.unwatch(&mut self.mux, WatchKey::Owner(ConnectionId::Daemon));
        if let Some(timer) = self.daemon_state.take_retry() {
            self.mux.cancel_timer(timer);
        }
        self.daemon.close();
        self.daemon_state.closed();
    }

    #[cfg(test)]
    pub fn classification(&self) -> crate::models::Classification {
        self.aggregator.classification()
    }

    #[cfg(test)]
    pub fn daemon_phase(&self) -> Phase {
        self.daemon_state.phase()
    }

    /// Phase of the supplicant connection for `interface`, if one exists.
    #[cfg(test)]
    pub fn wireless_phase(&self, interface: &str) -> Option<Phase> {
        self.links.get(interface).map(|slot| slot.state.phase())
    }

    #[cfg(test)]
    pub fn scans(&self) -> &ScanSets {
        &self.scans
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    // ----- dhcpcd connection -----

    fn try_open_daemon(&mut self) {
        if self.daemon_state.is_watching() {
            return;
        }
        self.daemon_state.begin_open();

        let result = match self.daemon.open(true) {
            Err(e) if e.is_permission_denied() => {
                info!("No access to the privileged dhcpcd socket, connecting unprivileged");
                self.daemon.open(false)
            }
            other => other,
        };
        let fd = match result {
            Ok(fd) => fd,
            Err(e) => {
                self.daemon_failed(&e);
                return;
            }
        };
        if let Err(e) = self.registry.watch(&mut self.mux, fd, ConnectionId::Daemon) {
            self.daemon.close();
            self.daemon_failed(&e);
            return;
        }
        self.daemon_state.opened(fd);

        self.dispatch_daemon();
        if self.daemon_state.is_watching() {
            self.start_wireless();
        }
    }

    fn daemon_failed(&mut self, e: &Error) {
        if self.daemon_state.failed(e.errno()) {
            error!("Failed to connect to dhcpcd: {}", e);
        }
        self.schedule_retry(ConnectionId::Daemon);
    }

    /// Close the connection's state and arm its single retry timer.
    fn schedule_retry(&mut self, id: ConnectionId) {
        let state = match &id {
            ConnectionId::Daemon => &mut self.daemon_state,
            ConnectionId::Wireless(name) => match self.links.get_mut(name) {
                Some(slot) => &mut slot.state,
                None => return,
            },
        };
        state.closed();
        if let Some(old) = state.take_retry() {
            self.mux.cancel_timer(old);
        }
        let handle = self.mux.add_timeout(self.retry_interval, TimerKind::Retry(id));
        state.arm_retry(handle);
    }

    fn on_daemon_ready(&mut self) {
        if self.daemon.descriptor().is_none() {
            warn!("dhcpcd connection lost");
            self.on_daemon_status(DaemonStatus::Down);
            return;
        }
        self.dispatch_daemon();
    }

    /// Route everything pending on the dhcpcd connection.
    fn dispatch_daemon(&mut self) {
        let events = match self.daemon.dispatch() {
            Ok(events) => events,
            Err(e) if e.is_would_block() => return,
            Err(e) => {
                warn!("dhcpcd connection error: {}", e);
                self.daemon.close();
                vec![DaemonEvent::Status(DaemonStatus::Down)]
            }
        };
        for event in events {
            match event {
                DaemonEvent::Status(status) => self.on_daemon_status(status),
                DaemonEvent::Interface(iface) => self.on_interface(&iface),
            }
            if !self.daemon_state.is_watching() {
                break;
            }
        }
    }

    fn on_daemon_status(&mut self, status: DaemonStatus) {
        info!("Status changed to {}", status);
        if status == DaemonStatus::Down {
            self.daemon_down();
        } else {
            let refresh = match self.last_status {
                None | Some(DaemonStatus::Down) => {
                    info!("Connected to dhcpcd-{}", self.daemon.version().unwrap_or("unknown"));
                    self.presenter.connection_restored();
                    true
                }
                Some(last) => last == DaemonStatus::Opened,
            };
            self.update_online(refresh);
        }
        self.last_status = Some(status);
    }

    fn daemon_down(&mut self) {
        let message = if self.last_status.is_some() {
            i18n!("Connection to dhcpcd lost")
        } else {
            i18n!("dhcpcd not running")
        };
        let update = self.aggregator.reset(&message);
        self.presenter.status_changed(&update);
        self.presenter.connection_lost();

        let names: Vec<String> = self.links.keys().cloned().collect();
        for name in names {
            self.drop_wireless(&name);
        }
        for name in self.scans.clear() {
            self.presenter.scan_updated(&name, &[]);
        }

        self.registry.unwatch(&mut self.mux, WatchKey::Owner(ConnectionId::Daemon));
        self.daemon.close();
        self.schedule_retry(ConnectionId::Daemon);
    }

    /// Recompute the aggregate status; `refresh` also logs every message.
    fn update_online(&mut self, refresh: bool) {
        let interfaces = self.daemon.interfaces();
        if refresh {
            for iface in interfaces {
                if let Some(message) = iface.message() {
                    info!("{}", message);
                    self.aggregator.record_message(iface, &message);
                }
            }
        }
        let update = self.aggregator.update(interfaces);
        if update.changed {
            debug!("Now {}", update.classification.as_str());
        }
        self.presenter.status_changed(&update);
    }

    fn on_interface(&mut self, iface: &Interface) {
        if iface.is_notable() {
            if let Some(message) = iface.message() {
                if self.aggregator.record_message(iface, &message) {
                    info!("{}", message);
                    let notification = notifier::network_event(message, iface.up);
                    self.notifier.notify(&mut self.presenter, notification);
                } else {
                    debug!("{}", message);
                }
            }
        }

        if iface.has_departed() {
            self.aggregator.forget(&iface.name);
            self.drop_wireless(&iface.name);
        } else if iface.wireless && self.daemon_state.is_watching() {
            self.start_wireless_link(&iface.name);
        }
        self.update_online(false);
    }

    // ----- wpa_supplicant connections -----

    fn start_wireless(&mut self) {
        let names: BTreeSet<String> = self
            .daemon
            .interfaces()
            .iter()
            .filter(|i| i.wireless && !i.has_departed())
            .map(|i| i.name.clone())
            .collect();
        for name in names {
            self.start_wireless_link(&name);
        }
    }

    fn start_wireless_link(&mut self, name: &str) {
        if self.links.contains_key(name) {
            return;
        }
        debug!("{}: starting supplicant connection", name);
        let link = self.daemon.wireless_link(name);
        self.links.insert(
            name.to_string(),
            WirelessSlot {
                link,
                state: ConnectionState::new(name),
            },
        );
        self.try_open_wireless(name);
    }

    fn try_open_wireless(&mut self, name: &str) {
        let id = ConnectionId::Wireless(name.to_string());
        let Some(slot) = self.links.get_mut(name) else {
            return;
        };
        if slot.state.is_watching() {
            return;
        }
        slot.state.begin_open();
        let fd = match slot.link.open() {
            Ok(fd) => fd,
            Err(e) => {
                if slot.state.failed(e.errno()) {
                    error!("{}: failed to connect to wpa_supplicant: {}", name, e);
                }
                self.schedule_retry(id);
                return;
            }
        };

        let watched = self.registry.watch(&mut self.mux, fd, id.clone());
        let Some(slot) = self.links.get_mut(name) else {
            return;
        };
        match watched {
            Ok(()) => {
                slot.state.opened(fd);
                info!("{}: connected to wpa_supplicant", slot.link.interface().unwrap_or(name));
                if let Err(e) = slot.link.rescan() {
                    warn!("{}: scan request failed: {}", name, e);
                }
            }
            Err(e) => {
                slot.link.close();
                if slot.state.failed(e.errno()) {
                    error!("{}: {}", name, e);
                }
                self.schedule_retry(id);
            }
        }
    }

    fn on_wireless_ready(&mut self, name: &str) {
        let Some(slot) = self.links.get_mut(name) else {
            let owner = ConnectionId::Wireless(name.to_string());
            self.registry.unwatch(&mut self.mux, WatchKey::Owner(owner));
            return;
        };
        if slot.link.descriptor().is_none() {
            self.wireless_lost(name);
            return;
        }
        let events = match slot.link.dispatch() {
            Ok(events) => events,
            Err(e) if e.is_would_block() => return,
            Err(e) => {
                warn!("{}: supplicant connection error: {}", name, e);
                slot.link.close();
                self.wireless_lost(name);
                return;
            }
        };

        for event in events {
            match event {
                WirelessEvent::ScanResults => self.on_scan_results(name),
                WirelessEvent::Status(status) => self.on_wireless_status(name, status),
            }
            if !self.links.get(name).is_some_and(|slot| slot.state.is_watching()) {
                break;
            }
        }
    }

    fn on_wireless_status(&mut self, name: &str, status: DaemonStatus) {
        info!("{}: WPA status {}", name, status);
        if status == DaemonStatus::Down {
            self.wireless_lost(name);
        }
    }

    /// The supplicant connection of `name` went away.
    ///
    /// It is retried only while dhcpcd still reports the interface.
    fn wireless_lost(&mut self, name: &str) {
        let id = ConnectionId::Wireless(name.to_string());
        self.registry.unwatch(&mut self.mux, WatchKey::Owner(id.clone()));
        if self.scans.remove(name) {
            self.presenter.scan_updated(name, &[]);
        }
        if !self.links.contains_key(name) {
            return;
        }

        let present = self
            .daemon
            .interfaces()
            .iter()
            .any(|i| i.name == name && !i.has_departed());
        if present {
            warn!("{}: wpa_supplicant connection lost", name);
            if let Some(slot) = self.links.get_mut(name) {
                slot.link.close();
            }
            self.schedule_retry(id);
        } else {
            self.drop_wireless(name);
        }
    }

    /// Forget the supplicant connection and scan set of `name`.
    fn drop_wireless(&mut self, name: &str) {
        if let Some(mut slot) = self.links.remove(name) {
            debug!("{}: dropping supplicant connection", name);
            let owner = ConnectionId::Wireless(name.to_string());
            self.registry.unwatch(&mut self.mux, WatchKey::Owner(owner));
            if let Some(timer) = slot.state.take_retry() {
                self.mux.cancel_timer(timer);
            }
            slot.link.close();
        }
        if self.scans.remove(name) {
            self.presenter.scan_updated(name, &[]);
        }
    }

    fn on_scan_results(&mut self, name: &str) {
        let Some(slot) = self.links.get_mut(name) else {
            return;
        };
        let Some(fd) = slot.link.descriptor() else {
            return;
        };
        let raw = slot.link.scan_results();

        let owner = ConnectionId::Wireless(name.to_string());
        if let Err(e) = self.registry.watch(&mut self.mux, fd, owner) {
            warn!("{}: {}", name, e);
            self.wireless_lost(name);
            return;
        }

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: failed to fetch scan results: {}", name, e);
                return;
            }
        };
        let found = raw.len();
        let scans = scan::process_scans(raw);
        debug!("{}: {} scan results, {} networks", name, found, scans.len());

        if let Some(notification) = self.scans.update(name, scans) {
            self.notifier.notify(&mut self.presenter, notification);
        }
        if let Some(set) = self.scans.get(name) {
            self.presenter.scan_updated(&set.interface, &set.scans);
        }
    }

    /// Ask every watched wireless interface for a fresh scan.
    pub fn rescan(&mut self) {
        let interfaces = self.daemon.interfaces();
        let wireless: Vec<String> = self
            .scans
            .interfaces()
            .filter(|name| interfaces.iter().any(|i| i.name == *name && i.wireless))
            .map(str::to_string)
            .collect();
        for name in wireless {
            if let Some(slot) = self.links.get_mut(&name) {
                if slot.state.is_watching() {
                    if let Err(e) = slot.link.rescan() {
                        warn!("{}: scan request failed: {}", name, e);
                    }
                }
            }
        }
    }
}
