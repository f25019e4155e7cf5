//! Descriptor registry and type-erased instance storage.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptors::Descriptor;
use crate::error::{DiError, DiResult};
use crate::key::Key;

#[cfg(feature = "config")]
use serde::Deserialize;

/// Type-erased instance as stored by storagers.
///
/// Every instance of contract `T` (sized or `dyn Trait`) is stored as an
/// `Arc<T>` boxed inside this `Arc<dyn Any>`, so trait objects and concrete
/// types share one representation.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Erases an `Arc<T>` into the storage representation.
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Recovers an `Arc<T>` from the storage representation.
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

/// What happens when a (key, contract) pair is registered twice at the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum DuplicatePolicy {
    /// Keep the first registration, ignore later ones
    #[default]
    FirstWins,
    /// Later registrations replace earlier ones
    Replace,
    /// Later registrations fail with `DiError::RegistrationConflict`
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_wins" | "first" => Ok(DuplicatePolicy::FirstWins),
            "replace" | "last_wins" => Ok(DuplicatePolicy::Replace),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(DiError::Config(format!("unknown duplicate policy '{}'", other))),
        }
    }
}

/// Outcome of a registry insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inserted {
    Added,
    Replaced,
    Ignored,
}

/// Descriptor registry for one resolution level.
///
/// Read-mostly: lookups happen on every resolution, inserts only during
/// registration. Registration order is preserved for diagnostics.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Arc<Descriptor>>,
    order: Vec<Key>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, descriptor: Arc<Descriptor>, policy: DuplicatePolicy) -> DiResult<Inserted> {
        let key = descriptor.key().clone();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
            self.entries.insert(key, descriptor);
            return Ok(Inserted::Added);
        }

        match policy {
            DuplicatePolicy::FirstWins => Ok(Inserted::Ignored),
            DuplicatePolicy::Replace => {
                self.entries.insert(key, descriptor);
                Ok(Inserted::Replaced)
            }
            DuplicatePolicy::Reject => Err(DiError::RegistrationConflict(key.to_string())),
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Arc<Descriptor>> {
        self.entries.get(key)
    }

    /// Descriptors in registration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.order.iter().filter_map(move |k| self.entries.get(k))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
