// dhcpcd-tray - Watch Registry
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Registry of live descriptor watches.
//!
//! Each watch ties a descriptor to the connection that owns it. There is
//! at most one watch per descriptor and at most one per owner; watches are
//! looked up by either key.

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use tracing::{debug, warn};

use super::multiplexer::{Multiplexer, SourceHandle};
use super::ConnectionId;
use crate::models::Result;

/// A live registration of `fd` on behalf of `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub owner: ConnectionId,
    pub fd: RawFd,
    pub handle: SourceHandle,
}

/// Lookup key for [`WatchRegistry::unwatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchKey {
    Fd(RawFd),
    Owner(ConnectionId),
}

/// Descriptor watches, indexed by descriptor with a secondary owner index.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    by_fd: HashMap<RawFd, Watch>,
    by_owner: HashMap<ConnectionId, RawFd>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `fd` for `owner`.
    ///
    /// Re-registering a descriptor that is already watched succeeds without
    /// doing anything. If `owner` already watches a different descriptor,
    /// that watch is released first. Fails only when the loop refuses the
    /// new source.
    pub fn watch<M: Multiplexer>(&mut self, mux: &mut M, fd: RawFd, owner: ConnectionId) -> Result<()> {
        if self.by_fd.contains_key(&fd) {
            return Ok(());
        }
        if let Some(old_fd) = self.by_owner.get(&owner).copied() {
            debug!("{:?} moved from fd {} to fd {}", owner, old_fd, fd);
            self.release_fd(mux, old_fd);
        }

        let handle = mux.add_watch(fd, owner.clone()).map_err(|e| {
            warn!("Error creating watch for fd {}: {}", fd, e);
            e
        })?;
        self.by_owner.insert(owner.clone(), fd);
        self.by_fd.insert(fd, Watch { owner, fd, handle });
        Ok(())
    }

    /// Remove and release the matching watch, if any.
    ///
    /// The entry is detached before the source is released, so this is safe
    /// to call while handling readiness for that very watch.
    pub fn unwatch<M: Multiplexer>(&mut self, mux: &mut M, key: WatchKey) {
        let fd = match key {
            WatchKey::Fd(fd) => Some(fd),
            WatchKey::Owner(owner) => self.by_owner.get(&owner).copied(),
        };
        if let Some(fd) = fd {
            self.release_fd(mux, fd);
        }
    }

    fn release_fd<M: Multiplexer>(&mut self, mux: &mut M, fd: RawFd) {
        if let Some(watch) = self.by_fd.remove(&fd) {
            debug!("Releasing watch on fd {} for {}", watch.fd, watch.owner);
            self.by_owner.remove(&watch.owner);
            mux.remove_watch(watch.handle);
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &WatchKey) -> Option<&Watch> {
        match key {
            WatchKey::Fd(fd) => self.by_fd.get(fd),
            WatchKey::Owner(owner) => self.by_owner.get(owner).and_then(|fd| self.by_fd.get(fd)),
        }
    }

    #[cfg(test)]
    pub fn is_watched(&self, owner: &ConnectionId) -> bool {
        self.by_owner.contains_key(owner)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_fd.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_fd.is_empty()
    }
}
