//! Per-level disposal hooks.

use std::future::Future;
use std::pin::Pin;

use tracing::trace;

pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

pub(crate) type SyncHook = Box<dyn FnOnce() + Send>;
pub(crate) type AsyncHook = Box<dyn FnOnce() -> BoxFutureUnit + Send>;

/// Hooks registered by the services one level built, tagged with the
/// service type for logging.
#[derive(Default)]
pub(crate) struct DisposeBag {
    sync: Vec<(&'static str, SyncHook)>,
    asyncs: Vec<(&'static str, AsyncHook)>,
}

impl DisposeBag {
    pub(crate) fn push_sync(&mut self, service: &'static str, hook: SyncHook) {
        self.sync.push((service, hook));
    }

    pub(crate) fn push_async(&mut self, service: &'static str, hook: AsyncHook) {
        self.asyncs.push((service, hook));
    }

    /// Async hooks first, then sync ones; newest first within each group.
    pub(crate) async fn run_all(mut self) {
        while let Some((service, hook)) = self.asyncs.pop() {
            trace!(target: "proxy_di", service, "async dispose");
            hook().await;
        }
        while let Some((service, hook)) = self.sync.pop() {
            trace!(target: "proxy_di", service, "dispose");
            hook();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sync.len() + self.asyncs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn async_group_runs_before_sync_group() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for name in ["s1", "s2"] {
            let order = order.clone();
            bag.push_sync(name, Box::new(move || order.lock().unwrap().push(name)));
        }
        let async_order = order.clone();
        bag.push_async(
            "a1",
            Box::new(move || -> BoxFutureUnit { Box::pin(async move { async_order.lock().unwrap().push("a1") }) }),
        );
        assert_eq!(bag.len(), 3);

        bag.run_all().await;
        assert_eq!(*order.lock().unwrap(), ["a1", "s2", "s1"]);
    }
}
