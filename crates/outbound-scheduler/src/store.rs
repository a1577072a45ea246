//! Versioned snapshot store shared by every collection.
//!
//! Readers pull `Arc` snapshots or subscribe to a `watch` channel. Writers
//! go through two doors:
//!
//! - [`SnapshotStore::write_local`] for optimistic edits after a backend ack
//! - [`SnapshotStore::apply_fetch`] for authoritative lists
//!
//! Both draw from one sequence counter. A fetch applies only when its
//! ticket was issued after the latest local write, so a slow refresh that
//! started before an optimistic edit cannot overwrite it.
//!
//! [`SnapshotStore::settle`] wraps `apply_fetch` for fetches that may fail:
//! an explicit load degrades the collection to empty, a background re-fetch
//! keeps what is shown.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct Versions {
    issued: u64,
    last_local_write: u64,
}

/// How a failed fetch treats the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Requested load. A failure empties the collection.
    Load,
    /// Re-fetch after a mutation or a live tick. A failure keeps the
    /// snapshot as it is.
    Background,
}

/// Outcome of [`SnapshotStore::settle`].
#[derive(Debug)]
pub struct Settled<E> {
    /// No local write happened after the fetch began.
    pub current: bool,
    pub error: Option<E>,
}

impl<E> Settled<E> {
    pub fn into_result(self) -> Result<(), E> {
        self.error.map_or(Ok(()), Err)
    }
}

/// Ticket taken when a fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Single-writer, multi-reader snapshot of one collection.
pub struct SnapshotStore<S> {
    label: &'static str,
    tx: watch::Sender<Arc<S>>,
    versions: Mutex<Versions>,
}

impl<S: Clone + Default> SnapshotStore<S> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            tx: watch::Sender::new(Arc::new(S::default())),
            versions: Mutex::default(),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<S> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<S>> {
        self.tx.subscribe()
    }

    /// Start a fetch.
    pub fn begin_fetch(&self) -> FetchTicket {
        let mut versions = self.versions();
        versions.issued += 1;
        FetchTicket(versions.issued)
    }

    /// Publish the result of a fetch started with `ticket`.
    ///
    /// Returns `false` when a local write happened after the fetch began; the
    /// snapshot is left untouched in that case.
    pub fn apply_fetch(&self, ticket: FetchTicket, update: impl FnOnce(&mut S)) -> bool {
        let versions = self.versions();
        if ticket.0 < versions.last_local_write {
            debug!(
                "Discarding stale {} fetch (ticket {}, last write {})",
                self.label, ticket.0, versions.last_local_write
            );
            return false;
        }
        self.publish(update);
        true
    }

    /// Publish the outcome of a fetch started with `ticket`.
    ///
    /// A success goes through `update`. A failure goes through `update` with
    /// an empty value under [`FetchMode::Load`] and publishes nothing under
    /// [`FetchMode::Background`].
    pub fn settle<T: Default, E>(
        &self,
        ticket: FetchTicket,
        mode: FetchMode,
        result: Result<T, E>,
        update: impl FnOnce(&mut S, T),
    ) -> Settled<E> {
        match result {
            Ok(value) => Settled {
                current: self.apply_fetch(ticket, |state| update(state, value)),
                error: None,
            },
            Err(error) => {
                let current = match mode {
                    FetchMode::Load => {
                        self.apply_fetch(ticket, |state| update(state, T::default()))
                    }
                    FetchMode::Background => self.is_current(ticket),
                };
                Settled {
                    current,
                    error: Some(error),
                }
            }
        }
    }

    /// Whether no local write happened since `ticket` was issued.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 >= self.versions().last_local_write
    }

    /// Apply an optimistic local edit and publish it.
    pub fn write_local(&self, update: impl FnOnce(&mut S)) {
        let mut versions = self.versions();
        versions.issued += 1;
        versions.last_local_write = versions.issued;
        self.publish(update);
    }

    fn publish(&self, update: impl FnOnce(&mut S)) {
        self.tx.send_modify(|current| {
            let mut next = (**current).clone();
            update(&mut next);
            *current = Arc::new(next);
        });
    }

    fn versions(&self) -> MutexGuard<'_, Versions> {
        self.versions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
