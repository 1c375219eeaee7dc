// dhcpcd-tray - Daemon Control Clients
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Clients for the daemons' local control sockets.
//!
//! The engine only sees the [`DaemonClient`] and [`WirelessLink`] traits.
//! Both hand out a pollable descriptor and decode whatever is pending on
//! it when asked, without blocking.

pub mod dhcpcd;
pub mod wpa;

use std::os::unix::io::RawFd;

use crate::models::{DaemonStatus, Interface, Result, ScanRecord};

pub use dhcpcd::DhcpcdClient;
pub use wpa::WpaLink;

/// Decoded event from the dhcpcd connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    Status(DaemonStatus),
    Interface(Interface),
}

/// Decoded event from a wpa_supplicant connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirelessEvent {
    /// Fresh scan results can be fetched.
    ScanResults,
    Status(DaemonStatus),
}

/// Connection to the network configuration daemon.
pub trait DaemonClient {
    type Link: WirelessLink;

    /// Open the connection and return the descriptor to watch.
    ///
    /// `privileged` selects the control socket that allows changes; a
    /// permission error means the caller may retry unprivileged.
    fn open(&mut self, privileged: bool) -> Result<RawFd>;

    /// Close the connection. Closing a closed connection does nothing.
    fn close(&mut self);

    /// Decode everything currently pending.
    ///
    /// An error that is not [`would block`](crate::models::Error::is_would_block)
    /// means the connection is gone.
    fn dispatch(&mut self) -> Result<Vec<DaemonEvent>>;

    /// Current interface records.
    fn interfaces(&self) -> &[Interface];

    /// The watched descriptor, `None` once the connection is closed.
    fn descriptor(&self) -> Option<RawFd>;

    /// Daemon version, known once opened.
    fn version(&self) -> Option<&str>;

    /// Create the supplicant connection for a wireless interface.
    fn wireless_link(&self, interface: &str) -> Self::Link;
}

/// Connection to the wireless supplicant of one interface.
pub trait WirelessLink {
    fn open(&mut self) -> Result<RawFd>;

    fn close(&mut self);

    fn dispatch(&mut self) -> Result<Vec<WirelessEvent>>;

    fn descriptor(&self) -> Option<RawFd>;

    /// Fetch the raw results of the last scan.
    fn scan_results(&mut self) -> Result<Vec<ScanRecord>>;

    /// Interface this link is bound to.
    fn interface(&self) -> Option<&str>;

    /// Ask the supplicant to scan again.
    fn rescan(&mut self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable clients for engine tests.

    use super::*;
    use crate::models::Error;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::io;
    use std::rc::Rc;

    pub fn os_error(errno: i32) -> Error {
        Error::Io(io::Error::from_raw_os_error(errno))
    }

    #[derive(Debug, Default)]
    pub struct LinkScript {
        pub open_results: VecDeque<Result<RawFd>>,
        pub fd: Option<RawFd>,
        pub events: VecDeque<Result<Vec<WirelessEvent>>>,
        pub scans: Vec<ScanRecord>,
        /// Make the next `scan_results` calls fail.
        pub scan_failures: usize,
        pub opens: usize,
        pub closes: usize,
        pub rescans: usize,
    }

    #[derive(Clone)]
    pub struct FakeLink {
        pub name: String,
        pub script: Rc<RefCell<LinkScript>>,
    }

    impl WirelessLink for FakeLink {
        fn open(&mut self) -> Result<RawFd> {
            let mut s = self.script.borrow_mut();
            s.opens += 1;
            let result = s.open_results.pop_front().unwrap_or(Err(os_error(2)));
            if let Ok(fd) = result {
                s.fd = Some(fd);
            }
            result
        }

        fn close(&mut self) {
            let mut s = self.script.borrow_mut();
            s.closes += 1;
            s.fd = None;
        }

        fn dispatch(&mut self) -> Result<Vec<WirelessEvent>> {
            let mut s = self.script.borrow_mut();
            s.events
                .pop_front()
                .unwrap_or_else(|| Err(Error::Io(io::ErrorKind::WouldBlock.into())))
        }

        fn descriptor(&self) -> Option<RawFd> {
            self.script.borrow().fd
        }

        fn scan_results(&mut self) -> Result<Vec<ScanRecord>> {
            let mut s = self.script.borrow_mut();
            if s.scan_failures > 0 {
                s.scan_failures -= 1;
                return Err(os_error(110));
            }
            Ok(s.scans.clone())
        }

        fn interface(&self) -> Option<&str> {
            Some(&self.name)
        }

        fn rescan(&mut self) -> Result<()> {
            self.script.borrow_mut().rescans += 1;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct DaemonScript {
        /// Results for successive `open` calls, with the privileged flag recorded.
        pub open_results: VecDeque<Result<RawFd>>,
        pub open_calls: Vec<bool>,
        pub closes: usize,
        pub fd: Option<RawFd>,
        pub events: VecDeque<Result<Vec<DaemonEvent>>>,
        pub links: HashMap<String, Rc<RefCell<LinkScript>>>,
    }

    #[derive(Clone, Default)]
    pub struct FakeDaemon {
        pub script: Rc<RefCell<DaemonScript>>,
        interfaces: Vec<Interface>,
    }

    impl FakeDaemon {
        pub fn link(&self, name: &str) -> Rc<RefCell<LinkScript>> {
            Rc::clone(self.script.borrow_mut().links.entry(name.to_string()).or_default())
        }
    }

    impl DaemonClient for FakeDaemon {
        type Link = FakeLink;

        fn open(&mut self, privileged: bool) -> Result<RawFd> {
            let mut s = self.script.borrow_mut();
            s.open_calls.push(privileged);
            let result = s.open_results.pop_front().unwrap_or(Err(os_error(111)));
            if let Ok(fd) = result {
                s.fd = Some(fd);
            }
            result
        }

        fn close(&mut self) {
            let mut s = self.script.borrow_mut();
            s.closes += 1;
            s.fd = None;
        }

        fn dispatch(&mut self) -> Result<Vec<DaemonEvent>> {
            let next = self.script.borrow_mut().events.pop_front();
            let events = next.unwrap_or_else(|| Err(Error::Io(io::ErrorKind::WouldBlock.into())))?;
            // Mirror the real client: the table is updated before events are routed
            for event in &events {
                match event {
                    DaemonEvent::Interface(iface) => {
                        match self
                            .interfaces
                            .iter_mut()
                            .find(|i| i.name == iface.name && i.kind == iface.kind)
                        {
                            Some(slot) => *slot = iface.clone(),
                            None => self.interfaces.push(iface.clone()),
                        }
                    }
                    DaemonEvent::Status(DaemonStatus::Down) => {
                        self.interfaces.clear();
                        self.script.borrow_mut().fd = None;
                    }
                    DaemonEvent::Status(_) => {}
                }
            }
            Ok(events)
        }

        fn interfaces(&self) -> &[Interface] {
            &self.interfaces
        }

        fn descriptor(&self) -> Option<RawFd> {
            self.script.borrow().fd
        }

        fn version(&self) -> Option<&str> {
            Some("10.0.6")
        }

        fn wireless_link(&self, interface: &str) -> FakeLink {
            FakeLink {
                name: interface.to_string(),
                script: self.link(interface),
            }
        }
    }
}
