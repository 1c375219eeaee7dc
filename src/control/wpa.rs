// dhcpcd-tray - wpa_supplicant Control Interface Client
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Client for the wpa_supplicant control interface of one interface.
//!
//! The supplicant answers datagrams on `<ctrl_dir>/<ifname>`. Replies are
//! sent back to the sender's address, so each client socket is bound to
//! a private path. One socket carries synchronous commands; a second one
//! is attached for unsolicited events and is the one the loop watches.

use std::fs;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{WirelessEvent, WirelessLink};
use crate::models::{DaemonStatus, Error, Result, ScanRecord};

/// Scan result tables can be large; the supplicant sends them in one datagram.
const REPLY_BUFFER: usize = 64 * 1024;

static SOCKET_SEQ: AtomicU32 = AtomicU32::new(0);

/// A datagram socket bound to a private path, unlinked on drop.
struct CtrlSocket {
    socket: UnixDatagram,
    local: Option<PathBuf>,
}

impl CtrlSocket {
    fn connect(remote: &Path, interface: &str, timeout: Duration) -> Result<Self> {
        let local = std::env::temp_dir().join(format!(
            "dhcpcd-tray-{}-{}-{}",
            std::process::id(),
            interface,
            SOCKET_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = fs::remove_file(&local);
        let socket = UnixDatagram::bind(&local)?;
        let ctrl = Self {
            socket,
            local: Some(local),
        };
        ctrl.socket.connect(remote)?;
        ctrl.socket.set_read_timeout(Some(timeout))?;
        Ok(ctrl)
    }

    /// Send `command` and wait for its reply, skipping unsolicited events.
    fn request(&self, command: &str) -> Result<String> {
        self.socket.send(command.as_bytes())?;
        let mut buf = vec![0u8; REPLY_BUFFER];
        loop {
            let n = self.socket.recv(&mut buf)?;
            let reply = String::from_utf8_lossy(&buf[..n]);
            if !reply.starts_with('<') {
                return Ok(reply.into_owned());
            }
        }
    }

    fn command_ok(&self, command: &str, accepted: &[&str]) -> Result<()> {
        let reply = self.request(command)?;
        if accepted.contains(&reply.trim_end()) {
            Ok(())
        } else {
            Err(Error::unexpected_reply(command, reply.trim_end()))
        }
    }
}

impl Drop for CtrlSocket {
    fn drop(&mut self) {
        if let Some(local) = self.local.take() {
            let _ = fs::remove_file(local);
        }
    }
}

/// Connection to wpa_supplicant for one wireless interface.
pub struct WpaLink {
    interface: String,
    remote: PathBuf,
    timeout: Duration,
    command: Option<CtrlSocket>,
    monitor: Option<CtrlSocket>,
}

impl WpaLink {
    pub fn new(ctrl_dir: &Path, interface: &str, timeout: Duration) -> Self {
        Self {
            interface: interface.to_string(),
            remote: ctrl_dir.join(interface),
            timeout,
            command: None,
            monitor: None,
        }
    }

    fn command(&self) -> Result<&CtrlSocket> {
        self.command.as_ref().ok_or(Error::NotConnected)
    }

    #[cfg(test)]
    fn with_sockets(interface: &str, command: UnixDatagram, monitor: UnixDatagram) -> Self {
        let mut link = Self::new(Path::new("/nonexistent"), interface, Duration::from_millis(200));
        let _ = command.set_read_timeout(Some(link.timeout));
        link.command = Some(CtrlSocket {
            socket: command,
            local: None,
        });
        link.monitor = Some(CtrlSocket {
            socket: monitor,
            local: None,
        });
        link
    }
}

impl WirelessLink for WpaLink {
    fn open(&mut self) -> Result<RawFd> {
        self.close();
        debug!("{}: opening {}", self.interface, self.remote.display());

        let command = CtrlSocket::connect(&self.remote, &self.interface, self.timeout)?;
        command.command_ok("PING", &["PONG"])?;

        let monitor = CtrlSocket::connect(&self.remote, &self.interface, self.timeout)?;
        monitor.command_ok("ATTACH", &["OK"])?;
        monitor.socket.set_nonblocking(true)?;
        let fd = monitor.socket.as_raw_fd();

        self.command = Some(command);
        self.monitor = Some(monitor);
        Ok(fd)
    }

    fn close(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            // Best effort; the supplicant drops dead monitors on its own.
            let _ = monitor.socket.send(b"DETACH");
            debug!("{}: closed supplicant connection", self.interface);
        }
        self.command = None;
    }

    fn dispatch(&mut self) -> Result<Vec<WirelessEvent>> {
        let monitor = self.monitor.as_ref().ok_or(Error::NotConnected)?;
        let mut events = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match monitor.socket.recv(&mut buf) {
                Ok(n) => {
                    let message = String::from_utf8_lossy(&buf[..n]);
                    if let Some(event) = parse_event(&message) {
                        if events.last() != Some(&event) {
                            events.push(event);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if events.contains(&WirelessEvent::Status(DaemonStatus::Down)) {
            self.close();
        }
        Ok(events)
    }

    fn descriptor(&self) -> Option<RawFd> {
        self.monitor.as_ref().map(|m| m.socket.as_raw_fd())
    }

    fn scan_results(&mut self) -> Result<Vec<ScanRecord>> {
        let reply = self.command()?.request("SCAN_RESULTS")?;
        Ok(parse_scan_results(&reply))
    }

    fn interface(&self) -> Option<&str> {
        Some(&self.interface)
    }

    fn rescan(&mut self) -> Result<()> {
        debug!("{}: requesting scan", self.interface);
        self.command()?.command_ok("SCAN", &["OK", "FAIL-BUSY"])
    }
}

/// Decode an unsolicited monitor message such as `<3>CTRL-EVENT-SCAN-RESULTS`.
pub fn parse_event(message: &str) -> Option<WirelessEvent> {
    let body = match message.strip_prefix('<') {
        Some(rest) => rest.split_once('>').map_or(rest, |(_, body)| body),
        None => message,
    };
    let name = body.split_whitespace().next()?;
    match name {
        "CTRL-EVENT-SCAN-RESULTS" => Some(WirelessEvent::ScanResults),
        "CTRL-EVENT-CONNECTED" => Some(WirelessEvent::Status(DaemonStatus::Connected)),
        "CTRL-EVENT-DISCONNECTED" => Some(WirelessEvent::Status(DaemonStatus::Disconnected)),
        "CTRL-EVENT-TERMINATING" => Some(WirelessEvent::Status(DaemonStatus::Down)),
        _ => None,
    }
}

/// Parse a `SCAN_RESULTS` table.
///
/// Rows are `bssid\tfrequency\tsignal\tflags\tssid`; the header row and
/// rows without a usable signal level are skipped.
pub fn parse_scan_results(reply: &str) -> Vec<ScanRecord> {
    let mut records = Vec::new();
    for line in reply.lines() {
        if line.is_empty() || line.starts_with("bssid") {
            continue;
        }
        let mut cols = line.splitn(5, '\t');
        let (Some(bssid), Some(freq), Some(signal)) = (cols.next(), cols.next(), cols.next()) else {
            warn!("Ignoring malformed scan row: {}", line);
            continue;
        };
        let Ok(strength) = signal.trim().parse::<i32>() else {
            warn!("Ignoring scan row with bad signal: {}", line);
            continue;
        };
        let flags = cols.next().unwrap_or_default();
        let ssid = cols.next().map(decode_ssid).unwrap_or_default();
        records.push(ScanRecord {
            ssid,
            bssid: bssid.to_string(),
            strength,
            frequency: freq.trim().parse().unwrap_or(0),
            flags: flags.to_string(),
        });
    }
    records
}

/// Undo the supplicant's escaping of SSID bytes (`\\`, `\"`, `\e`, `\n`,
/// `\r`, `\t`, `\xNN`).
pub fn decode_ssid(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'e' => out.push(0x1b),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'x' if i + 3 < bytes.len() => {
                match std::str::from_utf8(&bytes[i + 2..i + 4])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        i += 4;
                        continue;
                    }
                    None => out.extend_from_slice(&bytes[i..i + 2]),
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}
