//! Re-entrancy detection for in-flight builds.
//!
//! Each thread keeps the stack of descriptors it is currently building. A
//! descriptor that shows up twice on the same stack would otherwise wait on
//! its own storager lock forever, so it is reported as a cycle before any
//! lock is taken.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::Key;

thread_local! {
    static BUILD_STACK: RefCell<Vec<(u64, Key)>> = const { RefCell::new(Vec::new()) };
}

/// Marks one descriptor as "being built" on this thread until dropped.
pub(crate) struct BuildGuard {
    id: u64,
}

impl BuildGuard {
    /// Pushes `id` onto the build stack.
    ///
    /// Fails with `DiError::Circular` when `id` is already being built on
    /// this thread and with `DiError::DepthExceeded` past `max_depth`.
    pub(crate) fn enter(id: u64, key: &Key, max_depth: usize) -> DiResult<Self> {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(start) = stack.iter().position(|(entry, _)| *entry == id) {
                let mut path: Vec<String> = stack[start..].iter().map(|(_, k)| k.to_string()).collect();
                path.push(key.to_string());
                return Err(DiError::Circular(path));
            }

            if stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(max_depth));
            }

            stack.push((id, key.clone()));
            Ok(Self { id })
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILD_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(entry, _)| *entry == self.id) {
                stack.truncate(pos);
            }
        });
    }
}

/// Number of builds in flight on the current thread.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    BUILD_STACK.with(|stack| stack.borrow().len())
}
