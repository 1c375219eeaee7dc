// dhcpcd-tray - dhcpcd Control Socket Client
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Client for the dhcpcd control socket.
//!
//! Commands are sent as NUL separated argument vectors. Replies and
//! events are framed by a native-endian `usize` length followed by the
//! payload; interface payloads are `key=value` pairs separated by NULs.
//!
//! Two streams are used: one for synchronous commands while opening and
//! one put into listen mode, whose descriptor is handed to the loop.

use std::io::{self, Read, Write};
use std::mem::size_of;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{DaemonClient, DaemonEvent, WpaLink};
use crate::models::{AppConfig, DaemonStatus, Error, Interface, InterfaceKind, Result};

/// Name sent as argv[0] with every command.
const PROGNAME: &str = "dhcpcd-tray";

/// Frames larger than this are treated as a broken stream.
const MAX_FRAME: usize = 1 << 20;

const LENGTH_PREFIX: usize = size_of::<usize>();

/// Connection to dhcpcd.
pub struct DhcpcdClient {
    socket: PathBuf,
    unpriv_socket: PathBuf,
    wpa_ctrl_dir: PathBuf,
    timeout: Duration,
    command: Option<UnixStream>,
    listen: Option<UnixStream>,
    version: Option<String>,
    interfaces: Vec<Interface>,
    status: Option<DaemonStatus>,
    pending: Vec<u8>,
    queued: Vec<DaemonEvent>,
}

impl DhcpcdClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            socket: config.dhcpcd_socket.clone(),
            unpriv_socket: config.dhcpcd_unpriv_socket.clone(),
            wpa_ctrl_dir: config.wpa_ctrl_dir.clone(),
            timeout: config.command_timeout(),
            command: None,
            listen: None,
            version: None,
            interfaces: Vec::new(),
            status: None,
            pending: Vec::new(),
            queued: Vec::new(),
        }
    }

    /// Record an interface event in the table.
    fn apply(&mut self, iface: &Interface) {
        if iface.reason == "DEPARTED" {
            self.interfaces.retain(|i| i.name != iface.name);
            return;
        }
        match self
            .interfaces
            .iter_mut()
            .find(|i| i.name == iface.name && i.kind == iface.kind)
        {
            Some(slot) => *slot = iface.clone(),
            None => self.interfaces.push(iface.clone()),
        }
    }

    /// Queue a status event if the derived status moved.
    fn refresh_status(&mut self) {
        let status = derive_status(&self.interfaces);
        if self.status != Some(status) {
            self.status = Some(status);
            self.queued.push(DaemonEvent::Status(status));
        }
    }

    /// Split complete frames off the receive buffer.
    fn drain_frames(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut frames = Vec::new();
        loop {
            if self.pending.len() < LENGTH_PREFIX {
                break;
            }
            let mut prefix = [0u8; LENGTH_PREFIX];
            prefix.copy_from_slice(&self.pending[..LENGTH_PREFIX]);
            let len = usize::from_ne_bytes(prefix);
            if len > MAX_FRAME {
                return Err(Error::Protocol(format!("frame of {} bytes", len)));
            }
            if self.pending.len() < LENGTH_PREFIX + len {
                break;
            }
            let frame = self.pending[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec();
            self.pending.drain(..LENGTH_PREFIX + len);
            frames.push(frame);
        }
        Ok(frames)
    }

    #[cfg(test)]
    fn with_listen_stream(stream: UnixStream) -> Self {
        let mut client = Self::new(&AppConfig::default());
        client.listen = Some(stream);
        client
    }
}

impl DaemonClient for DhcpcdClient {
    type Link = WpaLink;

    fn open(&mut self, privileged: bool) -> Result<RawFd> {
        self.close();
        let path = if privileged { &self.socket } else { &self.unpriv_socket };
        debug!("Opening {}", path.display());

        let mut command = UnixStream::connect(path)?;
        command.set_read_timeout(Some(self.timeout))?;

        send_command(&mut command, "--version")?;
        let version = frame_to_string(&read_frame(&mut command)?);

        send_command(&mut command, "--getinterfaces")?;
        let count = read_usize(&mut command)?;
        let mut interfaces = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            if let Some(iface) = parse_interface(&read_frame(&mut command)?) {
                interfaces.push(iface);
            }
        }

        let mut listen = UnixStream::connect(path)?;
        send_command(&mut listen, "--listen")?;
        listen.set_nonblocking(true)?;
        let fd = listen.as_raw_fd();

        info!(
            "Opened {} dhcpcd connection ({} interfaces)",
            if privileged { "privileged" } else { "unprivileged" },
            interfaces.len()
        );
        self.command = Some(command);
        self.listen = Some(listen);
        self.version = Some(version);
        self.queued.push(DaemonEvent::Status(DaemonStatus::Opened));
        for iface in interfaces {
            self.apply(&iface);
        }
        self.refresh_status();
        Ok(fd)
    }

    fn close(&mut self) {
        if self.listen.take().is_some() {
            debug!("Closing dhcpcd connection");
        }
        self.command = None;
        self.interfaces.clear();
        self.status = None;
        self.pending.clear();
        self.queued.clear();
    }

    fn dispatch(&mut self) -> Result<Vec<DaemonEvent>> {
        let mut events = std::mem::take(&mut self.queued);
        let Some(listen) = self.listen.as_mut() else {
            return if events.is_empty() { Err(Error::NotConnected) } else { Ok(events) };
        };

        let mut eof = false;
        let mut buf = [0u8; 4096];
        loop {
            match listen.read(&mut buf) {
                Ok(0) => {
                    eof = true;
                    break;
                }
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        for frame in self.drain_frames()? {
            match parse_interface(&frame) {
                Some(iface) => {
                    self.apply(&iface);
                    events.push(DaemonEvent::Interface(iface));
                }
                None => warn!("Ignoring malformed dhcpcd message ({} bytes)", frame.len()),
            }
        }
        self.refresh_status();
        events.append(&mut self.queued);

        if eof {
            self.close();
            events.push(DaemonEvent::Status(DaemonStatus::Down));
        }
        Ok(events)
    }

    fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    fn descriptor(&self) -> Option<RawFd> {
        self.listen.as_ref().map(|s| s.as_raw_fd())
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn wireless_link(&self, interface: &str) -> WpaLink {
        WpaLink::new(&self.wpa_ctrl_dir, interface, self.timeout)
    }
}

fn send_command(stream: &mut UnixStream, command: &str) -> Result<()> {
    let mut buf = Vec::with_capacity(PROGNAME.len() + command.len() + 2);
    buf.extend_from_slice(PROGNAME.as_bytes());
    buf.push(0);
    for arg in command.split(' ') {
        buf.extend_from_slice(arg.as_bytes());
        buf.push(0);
    }
    stream.write_all(&buf)?;
    Ok(())
}

fn read_usize(reader: &mut impl Read) -> Result<usize> {
    let mut prefix = [0u8; LENGTH_PREFIX];
    reader.read_exact(&mut prefix)?;
    Ok(usize::from_ne_bytes(prefix))
}

fn read_frame(reader: &mut impl Read) -> Result<Vec<u8>> {
    let len = read_usize(reader)?;
    if len > MAX_FRAME {
        return Err(Error::Protocol(format!("frame of {} bytes", len)));
    }
    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame)?;
    Ok(frame)
}

fn frame_to_string(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).trim_end_matches('\0').to_string()
}

/// Decode one interface message.
///
/// Returns `None` unless both `interface` and `reason` are present.
pub fn parse_interface(payload: &[u8]) -> Option<Interface> {
    let mut name = None;
    let mut reason = None;
    let mut protocol = None;
    let mut carrier = None;
    let mut wireless = false;
    let mut ssid = None;
    let mut address = None;
    let mut prefix_len = None;
    let mut ra_managed = false;

    for field in payload.split(|b| *b == 0).filter(|f| !f.is_empty()) {
        let field = String::from_utf8_lossy(field);
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "interface" => name = Some(value.to_string()),
            "reason" => reason = Some(value.to_string()),
            "protocol" => protocol = InterfaceKind::from_protocol(value),
            "ifcarrier" => carrier = Some(value == "up"),
            "ifwireless" => wireless = value == "1",
            "ifssid" => ssid = Some(value.to_string()),
            "new_ip_address" => address = value.parse().ok(),
            "new_subnet_cidr" => prefix_len = value.parse().ok(),
            "ra_managed" => ra_managed = value == "1",
            _ => {}
        }
    }

    let reason = reason?;
    let kind = protocol.unwrap_or_else(|| InterfaceKind::from_reason(&reason));
    let mut iface = Interface::new(name?, kind, reason);
    if kind == InterfaceKind::Link {
        iface.up = carrier.unwrap_or(iface.reason == "CARRIER");
    }
    iface.wireless = wireless;
    iface.ssid = ssid;
    iface.address = address;
    iface.prefix_len = prefix_len;
    iface.ra_managed = ra_managed;
    Some(iface)
}

/// Overall daemon status implied by the interface table.
fn derive_status(interfaces: &[Interface]) -> DaemonStatus {
    if interfaces.iter().any(|i| !i.is_link() && i.up) {
        DaemonStatus::Connected
    } else if interfaces.iter().any(|i| i.is_link() && i.up) {
        DaemonStatus::Connecting
    } else {
        DaemonStatus::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(fields: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for f in fields {
            out.extend_from_slice(f.as_bytes());
            out.push(0);
        }
        out
    }

    fn framed(fields: &[&str]) -> Vec<u8> {
        let body = payload(fields);
        let mut out = body.len().to_ne_bytes().to_vec();
        out.extend(body);
        out
    }

    #[test]
    fn test_parse_bound_interface() {
        let iface = parse_interface(&payload(&[
            "interface=eth0",
            "reason=BOUND",
            "protocol=dhcp",
            "new_ip_address=10.0.0.5",
            "new_subnet_cidr=24",
        ]))
        .unwrap();
        assert_eq!(iface.name, "eth0");
        assert_eq!(iface.kind, InterfaceKind::Ipv4);
        assert!(iface.up);
        assert_eq!(iface.message().unwrap(), "eth0: Configured 10.0.0.5/24");
    }

    #[test]
    fn test_parse_wireless_carrier() {
        let iface = parse_interface(&payload(&[
            "interface=wlan0",
            "reason=CARRIER",
            "ifcarrier=up",
            "ifwireless=1",
            "ifssid=Home",
        ]))
        .unwrap();
        assert_eq!(iface.kind, InterfaceKind::Link);
        assert!(iface.up && iface.wireless);
        assert_eq!(iface.ssid.as_deref(), Some("Home"));
    }

    #[test]
    fn test_parse_requires_name_and_reason() {
        assert!(parse_interface(&payload(&["reason=BOUND"])).is_none());
        assert!(parse_interface(&payload(&["interface=eth0"])).is_none());
        assert!(parse_interface(b"garbage").is_none());
    }

    #[test]
    fn test_derive_status() {
        let mut link = Interface::new("eth0", InterfaceKind::Link, "CARRIER");
        link.up = true;
        assert_eq!(derive_status(&[]), DaemonStatus::Disconnected);
        assert_eq!(derive_status(&[link.clone()]), DaemonStatus::Connecting);
        let bound = Interface::new("eth0", InterfaceKind::Ipv4, "BOUND");
        assert_eq!(derive_status(&[link, bound]), DaemonStatus::Connected);
    }

    #[test]
    fn test_dispatch_reads_frames_across_writes() {
        let (mut daemon, ours) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        let mut client = DhcpcdClient::with_listen_stream(ours);

        let bytes = framed(&["interface=eth0", "reason=CARRIER", "ifcarrier=up"]);
        let (head, tail) = bytes.split_at(5);
        daemon.write_all(head).unwrap();
        assert_eq!(client.dispatch().unwrap(), vec![DaemonEvent::Status(DaemonStatus::Disconnected)]);

        daemon.write_all(tail).unwrap();
        let events = client.dispatch().unwrap();
        assert!(matches!(&events[0], DaemonEvent::Interface(i) if i.name == "eth0" && i.up));
        assert_eq!(events[1], DaemonEvent::Status(DaemonStatus::Connecting));
        assert_eq!(client.interfaces().len(), 1);

        // Nothing pending is not an error
        assert!(client.dispatch().unwrap().is_empty());
    }

    #[test]
    fn test_departed_interface_leaves_table() {
        let (mut daemon, ours) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        let mut client = DhcpcdClient::with_listen_stream(ours);

        daemon.write_all(&framed(&["interface=eth0", "reason=BOUND"])).unwrap();
        daemon.write_all(&framed(&["interface=eth0", "reason=CARRIER", "ifcarrier=up"])).unwrap();
        client.dispatch().unwrap();
        assert_eq!(client.interfaces().len(), 2);

        daemon.write_all(&framed(&["interface=eth0", "reason=DEPARTED"])).unwrap();
        client.dispatch().unwrap();
        assert!(client.interfaces().is_empty());
    }

    #[test]
    fn test_eof_reports_down_and_closes() {
        let (daemon, ours) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        let mut client = DhcpcdClient::with_listen_stream(ours);
        drop(daemon);

        let events = client.dispatch().unwrap();
        assert_eq!(events.last(), Some(&DaemonEvent::Status(DaemonStatus::Down)));
        assert!(client.descriptor().is_none());
        assert!(matches!(client.dispatch(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_oversized_frame_is_protocol_error() {
        let (mut daemon, ours) = UnixStream::pair().unwrap();
        ours.set_nonblocking(true).unwrap();
        let mut client = DhcpcdClient::with_listen_stream(ours);
        daemon.write_all(&(MAX_FRAME + 1).to_ne_bytes()).unwrap();
        assert!(matches!(client.dispatch(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_command_encoding() {
        let (mut ours, mut theirs) = UnixStream::pair().unwrap();
        send_command(&mut ours, "--listen").unwrap();
        let mut buf = [0u8; 64];
        let n = theirs.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"dhcpcd-tray\0--listen\0");
    }

    #[test]
    fn test_read_frame() {
        let bytes = framed(&["9.4.1"]);
        let frame = read_frame(&mut bytes.as_slice()).unwrap();
        assert_eq!(frame_to_string(&frame), "9.4.1");
    }
}
