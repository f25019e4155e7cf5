//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::BuildGuard;
pub(crate) use dispose_bag::{AsyncHook, BoxFutureUnit, DisposeBag, SyncHook};
