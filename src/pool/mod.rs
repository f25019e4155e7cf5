//! Thread-safe resource pool with idle eviction.
//!
//! Entries are found by predicate rather than by key, so callers decide what
//! "matches" means (a `TypeId`, a configuration tuple, anything). Entries
//! that stay unused past the pool's expiry are evicted by [`ResourcePool::sweep`],
//! usually driven by a [`PoolSweeper`] thread.
//!
//! # Examples
//!
//! ```
//! use proxy_di::pool::{Poolable, ResourcePool};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Greeting(&'static str);
//! impl Poolable for Greeting {}
//!
//! let pool: ResourcePool<Arc<Greeting>> = ResourcePool::new("greetings", Duration::from_secs(60));
//!
//! let hello = pool
//!     .get_or_add(|g| g.0 == "hello", || Ok(Arc::new(Greeting("hello"))))
//!     .unwrap()
//!     .unwrap();
//! let again = pool
//!     .get_or_add(|g| g.0 == "hello", || unreachable!())
//!     .unwrap()
//!     .unwrap();
//!
//! assert!(Arc::ptr_eq(&hello, &again));
//! assert_eq!(pool.len(), 1);
//! ```

mod sweeper;

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::{DiError, DiResult};

pub use sweeper::{PoolSweeper, Sweep};

/// A value that can live in a [`ResourcePool`].
///
/// Both hooks have no-op defaults; plain shared values need nothing more
/// than `impl Poolable for MyType {}`.
pub trait Poolable: Send + Sync + 'static {
    /// Busy entries are never evicted, however long they sat idle.
    fn is_busy(&self) -> bool {
        false
    }

    /// Called once when the entry is evicted or the pool is cleared.
    fn release(&self) {}
}

impl<T: Poolable + ?Sized> Poolable for Arc<T> {
    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn release(&self) {
        (**self).release()
    }
}

#[derive(Debug)]
struct EntryState {
    checkouts: usize,
    idle_since: Option<Instant>,
}

struct PoolEntry<T> {
    value: T,
    state: Mutex<EntryState>,
}

impl<T: Poolable> PoolEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            state: Mutex::new(EntryState { checkouts: 0, idle_since: None }),
        }
    }

    fn check_out(&self) {
        let mut state = self.state.lock();
        state.checkouts += 1;
        state.idle_since = None;
    }

    fn check_in(&self) {
        let mut state = self.state.lock();
        state.checkouts = state.checkouts.saturating_sub(1);
        if state.checkouts == 0 {
            state.idle_since = Some(Instant::now());
        }
    }

    fn is_expired(&self, now: Instant, expiry: Duration) -> bool {
        let state = self.state.lock();
        let idle_long_enough = match state.idle_since {
            Some(since) => now.saturating_duration_since(since) >= expiry,
            None => false,
        };
        state.checkouts == 0 && idle_long_enough && !self.value.is_busy()
    }
}

/// An entry checked out of a pool.
///
/// The entry cannot be evicted while any lease on it is alive. Dropping the
/// lease (or calling [`release`](PoolLease::release)) checks it back in and
/// starts its idle clock once the last lease is gone.
pub struct PoolLease<T: Poolable> {
    entry: Arc<PoolEntry<T>>,
}

impl<T: Poolable> PoolLease<T> {
    fn check_out(entry: Arc<PoolEntry<T>>) -> Self {
        entry.check_out();
        Self { entry }
    }

    /// Marks the entry idle again.
    pub fn release(self) {}
}

impl<T: Poolable> Deref for PoolLease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry.value
    }
}

impl<T: Poolable> Drop for PoolLease<T> {
    fn drop(&mut self) {
        self.entry.check_in();
    }
}

/// Collection of reusable values with predicate lookup and idle eviction.
///
/// Lookups take a shared read lock; additions are serialized by a separate
/// lock so that two callers racing for the same missing entry invoke the
/// factory exactly once.
pub struct ResourcePool<T: Poolable + Clone> {
    name: &'static str,
    expiry: Duration,
    entries: RwLock<Vec<Arc<PoolEntry<T>>>>,
    add_lock: Mutex<()>,
}

impl<T: Poolable + Clone> ResourcePool<T> {
    /// Creates an empty pool whose idle entries expire after `expiry`.
    pub fn new(name: &'static str, expiry: Duration) -> Self {
        Self {
            name,
            expiry,
            entries: RwLock::new(Vec::new()),
            add_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Returns the first entry matching `matches`, or adds one built by `factory`.
    ///
    /// The entry is checked back in before returning, so its idle clock
    /// starts right away. A factory failing with `DiError::PoolExhausted`
    /// yields `Ok(None)`; any other factory error is returned as is.
    ///
    /// `factory` runs under the pool's add lock and must not add to the
    /// same pool.
    pub fn get_or_add<P, F>(&self, matches: P, factory: F) -> DiResult<Option<T>>
    where
        P: Fn(&T) -> bool,
        F: FnOnce() -> DiResult<T>,
    {
        Ok(self.lease_or_add(matches, factory)?.map(|lease| (*lease).clone()))
    }

    /// Like [`get_or_add`](Self::get_or_add), but keeps the entry checked out
    /// until the returned lease is dropped.
    pub fn lease_or_add<P, F>(&self, matches: P, factory: F) -> DiResult<Option<PoolLease<T>>>
    where
        P: Fn(&T) -> bool,
        F: FnOnce() -> DiResult<T>,
    {
        if let Some(lease) = self.find(&matches) {
            return Ok(Some(lease));
        }

        let _adding = self.add_lock.lock();
        if let Some(lease) = self.find(&matches) {
            return Ok(Some(lease));
        }

        let value = match factory() {
            Ok(value) => value,
            Err(DiError::PoolExhausted(reason)) => {
                debug!(target: "proxy_di", pool = self.name, %reason, "pool factory declined to add an entry");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let entry = Arc::new(PoolEntry::new(value));
        let lease = PoolLease::check_out(entry.clone());
        let size = {
            let mut entries = self.entries.write();
            entries.push(entry);
            entries.len()
        };
        trace!(target: "proxy_di", pool = self.name, size, "added pool entry");
        Ok(Some(lease))
    }

    fn find<P: Fn(&T) -> bool>(&self, matches: &P) -> Option<PoolLease<T>> {
        let entries = self.entries.read();
        entries
            .iter()
            .find(|entry| matches(&entry.value))
            .map(|entry| PoolLease::check_out(entry.clone()))
    }

    /// Evicts entries idle for at least the pool's expiry.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Evicts entries idle for at least the pool's expiry as of `now`.
    ///
    /// Entries that are checked out or report busy are kept. Evicted values
    /// are released after the pool lock is dropped.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let evicted: Vec<Arc<PoolEntry<T>>> = {
            let mut entries = self.entries.write();
            let mut evicted = Vec::new();
            entries.retain(|entry| {
                if entry.is_expired(now, self.expiry) {
                    evicted.push(entry.clone());
                    false
                } else {
                    true
                }
            });
            evicted
        };

        for entry in &evicted {
            entry.value.release();
        }
        if !evicted.is_empty() {
            debug!(target: "proxy_di", pool = self.name, evicted = evicted.len(), "evicted idle pool entries");
        }
        evicted.len()
    }

    /// Removes and releases every entry.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.write().drain(..).collect();
        for entry in &drained {
            entry.value.release();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Pools nest: a non-empty sub-pool is busy, and releasing it clears it.
impl<T: Poolable + Clone> Poolable for ResourcePool<T> {
    fn is_busy(&self) -> bool {
        !self.is_empty()
    }

    fn release(&self) {
        self.clear();
    }
}

impl<T: Poolable + Clone> Sweep for ResourcePool<T> {
    fn sweep(&self) -> usize {
        ResourcePool::sweep(self)
    }
}

impl<T: Poolable + Clone> std::fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.name)
            .field("expiry", &self.expiry)
            .field("len", &self.len())
            .finish()
    }
}
