//! Container-owned pool registry and the background eviction task.

use crate::InstancePool;
use cradle_core::ComponentName;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Fixed interval between eviction sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Registry of every pool the reaper should sweep, keyed by component
/// identity. Owned by the container and passed by reference to whoever needs
/// it; registration and removal are explicit, tied to deploy/undeploy.
pub struct PoolRegistry {
    pools: Mutex<HashMap<ComponentName, Arc<InstancePool>>>,
}

impl PoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Join the eviction sweep.
    pub fn register(&self, pool: Arc<InstancePool>) {
        self.pools.lock().insert(pool.name().clone(), pool);
    }

    /// Leave the eviction sweep. Safe while a sweep is running: the sweep
    /// iterates a snapshot, never the live map.
    pub fn unregister(&self, name: &ComponentName) -> Option<Arc<InstancePool>> {
        self.pools.lock().remove(name)
    }

    /// Number of registered pools.
    pub fn len(&self) -> usize {
        self.pools.lock().len()
    }

    /// True when no pools are registered.
    pub fn is_empty(&self) -> bool {
        self.pools.lock().is_empty()
    }

    /// Evict over-age entries from every registered pool. Returns the total
    /// number of evicted instances. A failure in one pool's eviction must
    /// not stop the sweep of the others, so each pool runs isolated.
    pub fn sweep(&self) -> usize {
        let snapshot: Vec<Arc<InstancePool>> = self.pools.lock().values().cloned().collect();
        let now = Instant::now();
        let mut removed = 0;
        for pool in snapshot {
            match catch_unwind(AssertUnwindSafe(|| pool.evict_idle(now))) {
                Ok(count) => removed += count,
                Err(_) => {
                    tracing::error!(pool = %pool.name(), "eviction sweep panicked; continuing with remaining pools");
                }
            }
        }
        removed
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Single background task that sweeps all registered pools on a fixed
/// interval. One reaper serves every pool in the container; it runs for the
/// life of the container and stops with it.
pub struct PoolReaper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PoolReaper {
    /// Start the reaper thread over the given registry.
    pub fn spawn(registry: Arc<PoolRegistry>) -> Self {
        Self::spawn_with_interval(registry, SWEEP_INTERVAL)
    }

    /// Start the reaper with a custom sweep interval.
    pub fn spawn_with_interval(registry: Arc<PoolRegistry>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            tracing::debug!("instance pool reaper started");
            while !flag.load(Ordering::Relaxed) {
                // park_timeout may wake early; hold to the full interval so
                // sweeps stay on cadence.
                let deadline = Instant::now() + interval;
                loop {
                    let now = Instant::now();
                    if flag.load(Ordering::Relaxed) || now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                registry.sweep();
            }
            tracing::debug!("instance pool reaper stopped");
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Ask the reaper to stop and wake it if parked.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }
}

impl Drop for PoolReaper {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
