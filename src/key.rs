//! Service key types for the descriptor registry.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Key for descriptor storage and lookup.
///
/// A key is the contract type callers request plus an optional
/// disambiguation name. Contracts may be concrete types or trait objects
/// (`dyn Trait`); both are identified by their `TypeId`, so a single key type
/// covers every registration.
///
/// Equality and hashing consider only the `TypeId` and the name; the type
/// name is carried for diagnostics.
///
/// # Examples
///
/// ```rust
/// use proxy_di::Key;
///
/// trait Logger: Send + Sync {}
///
/// let plain = Key::of::<u32>();
/// let named = Key::named::<u32>("port");
/// let contract = Key::of::<dyn Logger>();
///
/// assert_ne!(plain, named);
/// assert_eq!(named.name(), Some("port"));
/// assert_eq!(plain.to_string(), "u32");
/// assert_eq!(named.to_string(), "u32[port]");
/// assert!(contract.type_name().contains("Logger"));
/// ```
#[derive(Clone)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<Arc<str>>,
}

impl Key {
    /// Creates a key from its raw parts.
    pub fn new(type_id: TypeId, type_name: &'static str, name: Option<Arc<str>>) -> Self {
        Self { type_id, type_name, name }
    }

    /// Unnamed key for contract `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>(), None)
    }

    /// Named key for contract `T`.
    pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
        Self::new(TypeId::of::<T>(), std::any::type_name::<T>(), Some(name.into()))
    }

    /// Replaces the disambiguation name.
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(Arc::from);
        self
    }

    /// The contract's `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The contract's type name (`std::any::type_name`).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The disambiguation name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns true if the key carries a disambiguation name.
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.type_name, name),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

/// Helper to create an unnamed key for a type or trait object.
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_type_name_but_not_name() {
        let a = Key::new(TypeId::of::<u8>(), "first", None);
        let b = Key::new(TypeId::of::<u8>(), "second", None);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_name(Some("x")));
    }

    #[test]
    fn keys_hash_consistently() {
        let mut set = HashSet::new();
        set.insert(Key::of::<String>());
        set.insert(Key::named::<String>("primary"));
        set.insert(Key::of::<String>());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn trait_object_contracts_have_distinct_keys() {
        trait A: Send + Sync {}
        trait B: Send + Sync {}
        assert_ne!(Key::of::<dyn A>(), Key::of::<dyn B>());
    }
}
