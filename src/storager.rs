//! Lifetime storagers: per-descriptor instance guards.
//!
//! Every visible descriptor gets one storager per level. Singleton and
//! scoped storagers cache their instance once built; the transient one
//! never does. Building happens between [`Storager::acquire`] and
//! [`BuildTicket::save`]: the ticket holds the storager's gate for the whole
//! build, so racing callers wait for the first build instead of starting
//! their own.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};
use tracing::trace;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::AnyArc;

/// Result of [`Storager::acquire`].
pub enum Acquired<'a> {
    /// A cached instance; no build needed
    Ready(AnyArc),
    /// The caller must build an instance and hand it to the ticket
    Vacant(BuildTicket<'a>),
}

impl fmt::Debug for Acquired<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acquired::Ready(_) => f.write_str("Ready"),
            Acquired::Vacant(_) => f.write_str("Vacant"),
        }
    }
}

enum TicketGuard<'a> {
    Exclusive {
        slot: &'a CachedSlot,
        guard: RwLockUpgradableReadGuard<'a, ()>,
    },
    Shared(RwLockReadGuard<'a, ()>),
}

/// Permission to build one instance.
///
/// Dropping the ticket without saving releases the gate and caches nothing,
/// so a failed build leaves the storager empty.
pub struct BuildTicket<'a> {
    guard: TicketGuard<'a>,
}

impl BuildTicket<'_> {
    /// Stores `value` (cached lifetimes) and returns the instance to hand out.
    pub fn save(self, value: AnyArc) -> DiResult<AnyArc> {
        match self.guard {
            TicketGuard::Exclusive { slot, guard } => {
                let _write = RwLockUpgradableReadGuard::upgrade(guard);
                slot.store(value)
            }
            TicketGuard::Shared(_read) => Ok(value),
        }
    }
}

/// Instance guard for one descriptor at one level.
pub trait Storager: Send + Sync {
    fn lifetime(&self) -> Lifetime;

    /// The cached instance, without taking any lock.
    fn peek(&self) -> Option<AnyArc>;

    /// Returns the cached instance or a ticket to build one.
    ///
    /// Blocks while another thread holds a ticket for the same cached slot.
    fn acquire(&self) -> Acquired<'_>;

    /// The storager a child scope should use, or `None` for a fresh one.
    fn inherit(self: Arc<Self>) -> Option<Arc<dyn Storager>>;
}

/// Creates the storager matching `lifetime`.
pub fn storager_for(lifetime: Lifetime, key: &Key) -> Arc<dyn Storager> {
    match lifetime {
        Lifetime::Singleton => Arc::new(SingletonStorager::new(key)),
        Lifetime::Scoped => Arc::new(ScopedStorager::new(key)),
        Lifetime::Transient => Arc::new(TransientStorager::new()),
    }
}

struct CachedSlot {
    name: String,
    gate: RwLock<()>,
    value: OnceCell<AnyArc>,
}

impl CachedSlot {
    fn new(key: &Key) -> Self {
        Self {
            name: key.to_string(),
            gate: RwLock::new(()),
            value: OnceCell::new(),
        }
    }

    fn acquire(&self) -> Acquired<'_> {
        if let Some(value) = self.value.get() {
            return Acquired::Ready(value.clone());
        }

        let guard = self.gate.upgradable_read();
        if let Some(value) = self.value.get() {
            return Acquired::Ready(value.clone());
        }
        Acquired::Vacant(BuildTicket {
            guard: TicketGuard::Exclusive { slot: self, guard },
        })
    }

    fn store(&self, value: AnyArc) -> DiResult<AnyArc> {
        self.value
            .set(value.clone())
            .map_err(|_| DiError::DoubleSave(self.name.clone()))?;
        trace!(target: "proxy_di", service = %self.name, "instance saved");
        Ok(value)
    }
}

/// Builds once, then shares its instance with every child scope.
pub struct SingletonStorager {
    slot: CachedSlot,
}

impl SingletonStorager {
    pub fn new(key: &Key) -> Self {
        Self { slot: CachedSlot::new(key) }
    }
}

impl Storager for SingletonStorager {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Singleton
    }

    fn peek(&self) -> Option<AnyArc> {
        self.slot.value.get().cloned()
    }

    fn acquire(&self) -> Acquired<'_> {
        self.slot.acquire()
    }

    fn inherit(self: Arc<Self>) -> Option<Arc<dyn Storager>> {
        Some(self)
    }
}

/// Builds once per scope; child scopes start empty.
pub struct ScopedStorager {
    slot: CachedSlot,
}

impl ScopedStorager {
    pub fn new(key: &Key) -> Self {
        Self { slot: CachedSlot::new(key) }
    }
}

impl Storager for ScopedStorager {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Scoped
    }

    fn peek(&self) -> Option<AnyArc> {
        self.slot.value.get().cloned()
    }

    fn acquire(&self) -> Acquired<'_> {
        self.slot.acquire()
    }

    fn inherit(self: Arc<Self>) -> Option<Arc<dyn Storager>> {
        None
    }
}

/// Never caches; every acquisition asks for a fresh build.
#[derive(Default)]
pub struct TransientStorager {
    gate: RwLock<()>,
}

impl TransientStorager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storager for TransientStorager {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Transient
    }

    fn peek(&self) -> Option<AnyArc> {
        None
    }

    fn acquire(&self) -> Acquired<'_> {
        Acquired::Vacant(BuildTicket {
            guard: TicketGuard::Shared(self.gate.read()),
        })
    }

    fn inherit(self: Arc<Self>) -> Option<Arc<dyn Storager>> {
        None
    }
}
