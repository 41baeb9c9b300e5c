//! Per-proxy admission gate: at most one in-flight call per per-client
//! instance.

use cradle_core::{CallError, MethodSig};
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on one condvar wait. Keeps the wait loop polling so a missed
/// wakeup can never stretch a caller past its deadline.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Admission gate serializing calls into one per-client instance.
///
/// State machine: `Free -> Held(method) -> Free`. The holder slot records
/// which method currently owns the instance so a timed-out waiter can name
/// it. Acquire and release are atomic under the gate's own monitor; fairness
/// across waiters is not guaranteed.
pub struct CallGate {
    holder: Mutex<Option<MethodSig>>,
    freed: Condvar,
    wait_timeout: Duration,
    release_jitter: Duration,
}

impl CallGate {
    /// Create a gate with the given wait bound and release jitter.
    /// A zero jitter (the default configuration) disables it.
    pub fn new(wait_timeout: Duration, release_jitter: Duration) -> Self {
        Self {
            holder: Mutex::new(None),
            freed: Condvar::new(),
            wait_timeout,
            release_jitter,
        }
    }

    /// Acquire the gate for `method`, blocking while another call holds it.
    ///
    /// Fails with [`CallError::ConcurrencyTimeout`] naming the holding
    /// method once the configured wait bound elapses. The returned guard
    /// releases the gate when dropped, so an erroring wrapped call can never
    /// leave the gate held.
    pub fn acquire(&self, method: &MethodSig) -> Result<GateGuard<'_>, CallError> {
        let start = Instant::now();
        let mut holder = self.holder.lock();
        while let Some(holding) = holder.clone() {
            let waited = start.elapsed();
            if waited >= self.wait_timeout {
                return Err(CallError::ConcurrencyTimeout {
                    holder: holding,
                    waited_ms: waited.as_millis() as u64,
                });
            }
            tracing::debug!(method = %method, holder = %holding, "waiting for per-client instance");
            let remaining = self.wait_timeout - waited;
            self.freed
                .wait_for(&mut holder, remaining.min(POLL_INTERVAL));
        }
        *holder = Some(method.clone());
        Ok(GateGuard { gate: self })
    }

    /// The method currently holding the gate, if any.
    pub fn current_holder(&self) -> Option<MethodSig> {
        self.holder.lock().clone()
    }

    fn release(&self) {
        self.inject_release_jitter();
        *self.holder.lock() = None;
        self.freed.notify_all();
    }

    /// Test-only load shaping: sleep a uniform random delay after the call
    /// completed, before the holder clears. Never runs when the configured
    /// jitter is zero.
    fn inject_release_jitter(&self) {
        let bound = self.release_jitter.as_millis() as u64;
        if bound == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(0..bound);
        tracing::debug!(delay_ms = delay, "injecting post-call release delay");
        thread::sleep(Duration::from_millis(delay));
    }
}

/// Holds the gate for the duration of one call; releases on drop.
pub struct GateGuard<'a> {
    gate: &'a CallGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
