//! Per-component pool of idle shared-style instances.

use cradle_core::{share, CallError, ComponentName, InstanceFactory, SharedInstance};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One idle instance plus the moment it became idle.
struct PoolEntry {
    instance: SharedInstance,
    idle_since: Instant,
}

/// Pool of idle instances for one shared-style component.
///
/// Checkout and checkin are each atomic under the pool's own monitor; there
/// is no ordering across different components' pools. Exclusivity for a
/// checked-out instance comes from the pool itself: an instance is either
/// resident here or in the hands of exactly one caller.
pub struct InstancePool {
    name: ComponentName,
    max_idle: Duration,
    factory: Arc<dyn InstanceFactory>,
    entries: Mutex<Vec<PoolEntry>>,
}

impl InstancePool {
    /// Create a pool for the named component.
    pub fn new(
        name: ComponentName,
        max_idle: Duration,
        factory: Arc<dyn InstanceFactory>,
    ) -> Self {
        Self {
            name,
            max_idle,
            factory,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// The component this pool belongs to.
    pub fn name(&self) -> &ComponentName {
        &self.name
    }

    /// Take an instance out of the pool. Never blocks: reuses the most
    /// recently returned instance, or asks the factory when the pool is
    /// empty. Factory failures propagate to the caller.
    pub fn checkout(&self) -> Result<SharedInstance, CallError> {
        if let Some(entry) = self.entries.lock().pop() {
            return Ok(entry.instance);
        }

        // Empty pool; the factory runs outside the entry lock so a slow
        // build cannot block concurrent checkins.
        match self.factory.build() {
            Ok(instance) => Ok(share(instance)),
            Err(source) => Err(CallError::Construction {
                component: self.name.clone(),
                source,
            }),
        }
    }

    /// Return an instance to the pool, stamping it idle as of now. Never
    /// rejects an instance, never deduplicates.
    pub fn checkin(&self, instance: SharedInstance) {
        self.entries.lock().push(PoolEntry {
            instance,
            idle_since: Instant::now(),
        });
    }

    /// Remove every entry idle longer than the configured maximum as of
    /// `now`. Returns the number of evicted instances; zero is not an error.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| now.duration_since(e.idle_since) <= self.max_idle);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(pool = %self.name, removed, "evicted idle pooled instances");
        }
        removed
    }

    /// Number of idle instances currently resident.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no idle instances are resident.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
