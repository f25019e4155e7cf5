//! Background thread that periodically sweeps registered pools.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{DiError, DiResult};

/// Something a [`PoolSweeper`] can sweep.
pub trait Sweep: Send + Sync {
    /// Evicts what has expired and returns how many entries went.
    fn sweep(&self) -> usize;
}

struct SweeperShared {
    targets: Mutex<Vec<Weak<dyn Sweep>>>,
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl SweeperShared {
    fn sweep_all(&self) -> usize {
        let mut targets = self.targets.lock();
        let mut evicted = 0;
        targets.retain(|weak| match weak.upgrade() {
            Some(target) => {
                evicted += target.sweep();
                true
            }
            None => false,
        });
        evicted
    }
}

/// Periodic sweeper for resource pools.
///
/// Holds its targets weakly: a pool that is dropped simply stops being
/// swept. The thread stops on [`shutdown`](Self::shutdown) or when the
/// sweeper is dropped.
pub struct PoolSweeper {
    shared: Arc<SweeperShared>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PoolSweeper {
    /// Spawns the sweeper thread.
    pub fn start(interval: Duration) -> DiResult<Self> {
        let shared = Arc::new(SweeperShared {
            targets: Mutex::new(Vec::new()),
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });

        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name("proxy-di-sweeper".to_string())
            .spawn(move || run(worker, interval))
            .map_err(|e| DiError::Background(e.to_string()))?;

        debug!(target: "proxy_di", interval_ms = interval.as_millis() as u64, "pool sweeper started");
        Ok(Self { shared, interval, handle: Some(handle) })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Adds a pool to the sweep list.
    pub fn attach<S: Sweep + 'static>(&self, target: &Arc<S>) {
        let weak: Weak<S> = Arc::downgrade(target);
        let weak: Weak<dyn Sweep> = weak;
        self.shared.targets.lock().push(weak);
    }

    /// Sweeps every attached pool on the calling thread.
    pub fn run_once(&self) -> usize {
        self.shared.sweep_all()
    }

    /// Stops the thread and waits for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        *self.shared.stopped.lock() = true;
        self.shared.wake.notify_all();

        if handle.join().is_err() {
            warn!(target: "proxy_di", "pool sweeper thread panicked");
        } else {
            debug!(target: "proxy_di", "pool sweeper stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for PoolSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<SweeperShared>, interval: Duration) {
    let mut stopped = shared.stopped.lock();
    while !*stopped {
        let timed_out = shared.wake.wait_for(&mut stopped, interval).timed_out();
        if *stopped {
            break;
        }
        if timed_out {
            MutexGuard::unlocked(&mut stopped, || {
                shared.sweep_all();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl Sweep for Counter {
        fn sweep(&self) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst);
            1
        }
    }

    #[test]
    fn run_once_skips_dropped_targets() {
        let mut sweeper = PoolSweeper::start(Duration::from_secs(3600)).unwrap();
        let kept = Arc::new(Counter(AtomicUsize::new(0)));
        let dropped = Arc::new(Counter(AtomicUsize::new(0)));
        sweeper.attach(&kept);
        sweeper.attach(&dropped);
        drop(dropped);

        assert_eq!(sweeper.run_once(), 1);
        assert_eq!(kept.0.load(Ordering::SeqCst), 1);
        sweeper.shutdown();
        assert!(!sweeper.is_running());
    }

    #[test]
    fn background_thread_sweeps_periodically() {
        let sweeper = PoolSweeper::start(Duration::from_millis(5)).unwrap();
        let target = Arc::new(Counter(AtomicUsize::new(0)));
        sweeper.attach(&target);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while target.0.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(target.0.load(Ordering::SeqCst) >= 2);
    }
}
