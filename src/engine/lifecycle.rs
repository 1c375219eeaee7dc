// dhcpcd-tray - Connection Lifecycle State
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Per-connection lifecycle bookkeeping.
//!
//! A connection is `Closed` until an open attempt starts, `Opening` while
//! the attempt runs and `Watching` once its descriptor is registered with
//! the loop. Any failure or loss goes back to `Closed` with a retry timer.

use std::fmt;
use std::os::unix::io::RawFd;
use tracing::debug;

use super::multiplexer::TimerHandle;

/// Where a connection is in its open/watch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Closed,
    Opening,
    Watching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Opening => "opening",
            Self::Watching => "watching",
        })
    }
}

/// Lifecycle state owned by one connection.
#[derive(Debug, Default)]
pub struct ConnectionState {
    name: String,
    phase: Phase,
    last_errno: Option<i32>,
    retry: Option<TimerHandle>,
}

impl ConnectionState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_watching(&self) -> bool {
        self.phase == Phase::Watching
    }

    #[cfg(test)]
    pub fn retry_pending(&self) -> bool {
        self.retry.is_some()
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("{}: {} -> {}", self.name, self.phase, phase);
            self.phase = phase;
        }
    }

    /// An open attempt starts. Any retry timer that led here has fired.
    pub fn begin_open(&mut self) {
        self.retry = None;
        self.set_phase(Phase::Opening);
    }

    /// The descriptor is open and watched.
    pub fn opened(&mut self, fd: RawFd) {
        debug!("{}: watching fd {}", self.name, fd);
        self.last_errno = None;
        self.set_phase(Phase::Watching);
    }

    /// The open attempt failed with `errno`.
    ///
    /// Returns whether the failure should be logged: only the first of a
    /// run of identical error codes is.
    pub fn failed(&mut self, errno: i32) -> bool {
        self.set_phase(Phase::Closed);
        let first = self.last_errno != Some(errno);
        self.last_errno = Some(errno);
        first
    }

    /// The connection was closed or lost.
    pub fn closed(&mut self) {
        self.set_phase(Phase::Closed);
    }

    /// Remember the pending retry timer.
    pub fn arm_retry(&mut self, handle: TimerHandle) {
        self.retry = Some(handle);
    }

    /// Forget and return the pending retry timer.
    pub fn take_retry(&mut self) -> Option<TimerHandle> {
        self.retry.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_then_success_sequence() {
        let mut state = ConnectionState::new("dhcpcd");
        let mut seen = vec![state.phase()];

        state.begin_open();
        seen.push(state.phase());
        assert!(state.failed(2));
        seen.push(state.phase());
        state.arm_retry(TimerHandle(1));
        assert!(state.retry_pending());

        state.begin_open();
        assert!(!state.retry_pending());
        seen.push(state.phase());
        state.opened(9);
        seen.push(state.phase());

        assert_eq!(
            seen,
            vec![Phase::Closed, Phase::Opening, Phase::Closed, Phase::Opening, Phase::Watching]
        );
        assert!(state.is_watching());
    }

    #[test]
    fn test_repeated_errno_logged_once() {
        let mut state = ConnectionState::new("dhcpcd");
        assert!(state.failed(111));
        assert!(!state.failed(111));
        assert!(!state.failed(111));
        assert!(state.failed(2));
        assert!(state.failed(111));
    }

    #[test]
    fn test_success_resets_error_latch() {
        let mut state = ConnectionState::new("wlan0");
        assert!(state.failed(111));
        state.opened(4);
        state.closed();
        assert_eq!(state.phase(), Phase::Closed);
        assert!(state.failed(111));
    }
}
