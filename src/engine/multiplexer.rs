// dhcpcd-tray - Event Loop Backend
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Descriptor and timer sources.
//!
//! The engine never touches the main loop directly. It asks a
//! [`Multiplexer`] for descriptor watches and timers, and the loop hands
//! readiness back as [`LoopEvent`]s, one at a time, in the order it
//! observed them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

use glib::{ControlFlow, IOCondition, SourceId};
use tracing::debug;

use super::ConnectionId;
use crate::models::{Error, Result};

/// Identifies a descriptor watch inside the loop backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

/// Identifies a scheduled timer inside the loop backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// What a timer is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Reopen a closed connection.
    Retry(ConnectionId),
    /// Ask wireless interfaces for fresh scan results.
    Rescan,
}

/// Something the loop wants the engine to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// The descriptor owned by this connection is readable or has hung up.
    Ready(ConnectionId),
    /// A timer expired.
    Timer(TimerKind),
}

/// Event loop operations the engine relies on.
pub trait Multiplexer {
    /// Watch `fd` for input, error and hangup on behalf of `owner`.
    fn add_watch(&mut self, fd: RawFd, owner: ConnectionId) -> Result<SourceHandle>;

    /// Stop watching. Unknown handles are ignored.
    fn remove_watch(&mut self, handle: SourceHandle);

    /// Fire `timer` once after `delay`.
    fn add_timeout(&mut self, delay: Duration, timer: TimerKind) -> TimerHandle;

    /// Fire `timer` every `period` until cancelled.
    fn add_interval(&mut self, period: Duration, timer: TimerKind) -> TimerHandle;

    /// Cancel a pending timer. Expired or unknown handles are ignored.
    fn cancel_timer(&mut self, handle: TimerHandle);
}

type Sink = Rc<dyn Fn(LoopEvent)>;

/// [`Multiplexer`] backed by the GLib main context of the calling thread.
pub struct GlibMultiplexer {
    sink: Sink,
    next_id: u64,
    watches: HashMap<u64, SourceId>,
    // Shared with one-shot closures so they can forget themselves on expiry.
    timers: Rc<RefCell<HashMap<u64, SourceId>>>,
}

impl GlibMultiplexer {
    /// Create a backend that delivers events to `sink`.
    pub fn new(sink: impl Fn(LoopEvent) + 'static) -> Self {
        Self {
            sink: Rc::new(sink),
            next_id: 0,
            watches: HashMap::new(),
            timers: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Multiplexer for GlibMultiplexer {
    fn add_watch(&mut self, fd: RawFd, owner: ConnectionId) -> Result<SourceHandle> {
        if fd < 0 {
            return Err(Error::WatchFailed(fd));
        }
        let sink = Rc::clone(&self.sink);
        let condition = IOCondition::IN | IOCondition::ERR | IOCondition::HUP;
        // Removal goes through remove_watch, so the closure never returns Break.
        let source = glib::unix_fd_add_local(fd, condition, move |_, _| {
            sink(LoopEvent::Ready(owner.clone()));
            ControlFlow::Continue
        });
        let id = self.next_id();
        self.watches.insert(id, source);
        debug!("Watching fd {} as source {}", fd, id);
        Ok(SourceHandle(id))
    }

    fn remove_watch(&mut self, handle: SourceHandle) {
        if let Some(source) = self.watches.remove(&handle.0) {
            source.remove();
        }
    }

    fn add_timeout(&mut self, delay: Duration, timer: TimerKind) -> TimerHandle {
        let id = self.next_id();
        let sink = Rc::clone(&self.sink);
        let timers = Rc::clone(&self.timers);
        let source = glib::timeout_add_local_once(delay, move || {
            timers.borrow_mut().remove(&id);
            sink(LoopEvent::Timer(timer));
        });
        self.timers.borrow_mut().insert(id, source);
        TimerHandle(id)
    }

    fn add_interval(&mut self, period: Duration, timer: TimerKind) -> TimerHandle {
        let id = self.next_id();
        let sink = Rc::clone(&self.sink);
        let source = glib::timeout_add_local(period, move || {
            sink(LoopEvent::Timer(timer.clone()));
            ControlFlow::Continue
        });
        self.timers.borrow_mut().insert(id, source);
        TimerHandle(id)
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        let source = self.timers.borrow_mut().remove(&handle.0);
        if let Some(source) = source {
            source.remove();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording backend for engine tests.

    use super::*;

    /// Multiplexer that records requests instead of touching a main loop.
    #[derive(Default)]
    pub struct FakeMultiplexer {
        pub(crate) next_id: u64,
        pub watches: HashMap<u64, (RawFd, ConnectionId)>,
        pub timeouts: Vec<(TimerHandle, Duration, TimerKind)>,
        pub intervals: Vec<(TimerHandle, Duration, TimerKind)>,
        pub cancelled: Vec<TimerHandle>,
        pub removed: Vec<SourceHandle>,
        /// Make the next `add_watch` calls fail.
        pub fail_watches: usize,
        /// Descriptors whose watches are always refused.
        pub refused: Vec<RawFd>,
    }

    impl FakeMultiplexer {
        /// Pending one-shot timers for `kind`.
        pub fn pending(&self, kind: &TimerKind) -> usize {
            self.timeouts.iter().filter(|(_, _, k)| k == kind).count()
        }

        /// Expire the oldest one-shot timer of `kind`, as the loop would.
        pub fn expire(&mut self, kind: &TimerKind) -> Option<LoopEvent> {
            let pos = self.timeouts.iter().position(|(_, _, k)| k == kind)?;
            let (_, _, kind) = self.timeouts.remove(pos);
            Some(LoopEvent::Timer(kind))
        }

        pub fn watched_fds(&self) -> Vec<RawFd> {
            let mut fds: Vec<_> = self.watches.values().map(|(fd, _)| *fd).collect();
            fds.sort_unstable();
            fds
        }
    }

    impl Multiplexer for FakeMultiplexer {
        fn add_watch(&mut self, fd: RawFd, owner: ConnectionId) -> Result<SourceHandle> {
            if self.fail_watches > 0 {
                self.fail_watches -= 1;
                return Err(Error::WatchFailed(fd));
            }
            if self.refused.contains(&fd) {
                return Err(Error::WatchFailed(fd));
            }
            self.next_id += 1;
            self.watches.insert(self.next_id, (fd, owner));
            Ok(SourceHandle(self.next_id))
        }

        fn remove_watch(&mut self, handle: SourceHandle) {
            self.watches.remove(&handle.0);
            self.removed.push(handle);
        }

        fn add_timeout(&mut self, delay: Duration, timer: TimerKind) -> TimerHandle {
            self.next_id += 1;
            let handle = TimerHandle(self.next_id);
            self.timeouts.push((handle, delay, timer));
            handle
        }

        fn add_interval(&mut self, period: Duration, timer: TimerKind) -> TimerHandle {
            self.next_id += 1;
            let handle = TimerHandle(self.next_id);
            self.intervals.push((handle, period, timer));
            handle
        }

        fn cancel_timer(&mut self, handle: TimerHandle) {
            self.timeouts.retain(|(h, _, _)| *h != handle);
            self.cancelled.push(handle);
        }
    }
}
