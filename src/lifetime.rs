//! Service lifetimes.

/// Which storager guards a descriptor, and so how long its instances live.
///
/// | Lifetime  | Cached per          | Visible to child scopes |
/// |-----------|---------------------|-------------------------|
/// | Singleton | registering level   | yes, same instance      |
/// | Scoped    | resolving scope     | no, each builds its own |
/// | Transient | never               | n/a                     |
///
/// # Examples
///
/// ```rust
/// use proxy_di::{Lifetime, Resolver, ServiceCollection};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
///
/// struct Settings { region: &'static str }
/// struct Session { id: u64 }
/// struct Trace { span: u64 }
///
/// static NEXT: AtomicU64 = AtomicU64::new(1);
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Settings { region: "eu-west" });
/// services.add_scoped_factory::<Session, _>(|_| Ok(Session { id: NEXT.fetch_add(1, Ordering::SeqCst) }));
/// services.add_transient_factory::<Trace, _>(|_| Ok(Trace { span: NEXT.fetch_add(1, Ordering::SeqCst) }));
///
/// let provider = services.build();
/// let (left, right) = (provider.create_scope(), provider.create_scope());
///
/// assert!(Arc::ptr_eq(&left.get_required::<Settings>(), &right.get_required::<Settings>()));
/// assert_eq!(left.get_required::<Session>().id, left.get_required::<Session>().id);
/// assert_ne!(left.get_required::<Session>().id, right.get_required::<Session>().id);
/// assert_ne!(left.get_required::<Trace>().span, left.get_required::<Trace>().span);
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Built once by the level that registered it and shared below it
    Singleton,
    /// Built once per scope; the root provider is a scope of its own
    Scoped,
    /// Built on every resolution
    Transient,
}

impl Lifetime {
    /// Returns true if the storager keeps the instance after the first build.
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::storager::{storager_for, Acquired};

    #[test]
    fn caching_matches_storager_behaviour() {
        for lifetime in [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient] {
            let storager = storager_for(lifetime, &Key::of::<u8>());
            let Acquired::Vacant(ticket) = storager.acquire() else {
                panic!("fresh storager must be vacant");
            };
            ticket.save(crate::registration::erase(std::sync::Arc::new(1u8))).unwrap();

            let cached = matches!(storager.acquire(), Acquired::Ready(_));
            assert_eq!(cached, lifetime.is_cached(), "{:?}", lifetime);
        }
    }
}
