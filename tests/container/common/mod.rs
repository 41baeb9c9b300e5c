//! Shared test harness: an in-process transaction coordinator that records
//! every operation, plus a handful of instrumented test components.

#![allow(dead_code)]

use cradle::{
    BusinessFault, CallArgs, CallValue, CompletionHook, ComponentDescriptor, Container,
    ContainerConfig, CoordinatorError, Fault, InstanceFactory, LifecycleStyle, ManagedInstance,
    MethodFault, MethodSig, SessionSynchronization, TransactionCoordinator, TxHandle, TxManagement,
    TxStatus,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
});

/// Install the test tracing subscriber once per binary.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Every coordinator operation the container drove, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxEvent {
    Begin,
    Commit,
    Rollback,
    Suspend,
    Resume,
    RollbackOnly,
}

struct TxState {
    status: TxStatus,
    hooks: Vec<Box<dyn CompletionHook>>,
}

thread_local! {
    static CURRENT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// In-process coordinator with thread-affine current-transaction tracking.
/// Commit and rollback fire registered completion hooks around the status
/// change and detach the finished transaction from the thread.
pub struct MockCoordinator {
    events: Mutex<Vec<TxEvent>>,
    transactions: Mutex<HashMap<u64, Arc<Mutex<TxState>>>>,
    next_id: AtomicUsize,
}

impl MockCoordinator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            transactions: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        })
    }

    /// Snapshot of the recorded event log.
    pub fn events(&self) -> Vec<TxEvent> {
        self.events.lock().clone()
    }

    /// Drop recorded events, keeping transaction state. Lets a test set up
    /// an ambient transaction and then assert only on what the call did.
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// True when a transaction is associated with the calling thread.
    pub fn in_transaction(&self) -> bool {
        CURRENT.with(|c| c.get()).is_some()
    }

    /// Start an ambient transaction on the calling thread, as client code
    /// outside the container would.
    pub fn begin_ambient(&self) {
        TransactionCoordinator::begin(self).unwrap();
    }

    /// Roll the ambient transaction back.
    pub fn rollback_ambient(&self) {
        TransactionCoordinator::rollback(self).unwrap();
    }

    /// Mark the ambient transaction rollback-only.
    pub fn poison_ambient(&self) {
        TransactionCoordinator::set_rollback_only(self).unwrap();
    }

    fn record(&self, event: TxEvent) {
        self.events.lock().push(event);
    }

    fn current_state(&self) -> Option<Arc<Mutex<TxState>>> {
        let id = CURRENT.with(|c| c.get())?;
        self.transactions.lock().get(&id).cloned()
    }

    fn require_current(&self) -> Result<Arc<Mutex<TxState>>, CoordinatorError> {
        self.current_state()
            .ok_or_else(|| CoordinatorError::new("no transaction on calling thread"))
    }

    fn complete(&self, committed: bool) -> Result<(), CoordinatorError> {
        let tx = self.require_current()?;
        let mut hooks = {
            let mut state = tx.lock();
            let completable =
                state.status == TxStatus::Active || state.status == TxStatus::MarkedRollback;
            if !completable {
                return Err(CoordinatorError::new(format!(
                    "transaction is not completable: {:?}",
                    state.status
                )));
            }
            std::mem::take(&mut state.hooks)
        };

        for hook in hooks.iter_mut() {
            hook.before_completion()
                .map_err(|fault| CoordinatorError::new(format!("before_completion: {fault}")))?;
        }

        if committed {
            tx.lock().status = TxStatus::Committed;
            self.record(TxEvent::Commit);
        } else {
            tx.lock().status = TxStatus::RolledBack;
            self.record(TxEvent::Rollback);
        }

        for hook in hooks.iter_mut() {
            hook.after_completion(committed)
                .map_err(|fault| CoordinatorError::new(format!("after_completion: {fault}")))?;
        }

        CURRENT.with(|c| c.set(None));
        Ok(())
    }
}

impl TransactionCoordinator for MockCoordinator {
    fn begin(&self) -> Result<(), CoordinatorError> {
        if self.in_transaction() {
            return Err(CoordinatorError::new(
                "a transaction is already associated with this thread",
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        self.transactions.lock().insert(
            id,
            Arc::new(Mutex::new(TxState {
                status: TxStatus::Active,
                hooks: Vec::new(),
            })),
        );
        CURRENT.with(|c| c.set(Some(id)));
        self.record(TxEvent::Begin);
        Ok(())
    }

    fn commit(&self) -> Result<(), CoordinatorError> {
        self.complete(true)
    }

    fn rollback(&self) -> Result<(), CoordinatorError> {
        self.complete(false)
    }

    fn suspend(&self) -> Result<Option<TxHandle>, CoordinatorError> {
        match CURRENT.with(|c| c.take()) {
            Some(id) => {
                self.record(TxEvent::Suspend);
                Ok(Some(TxHandle::new(id)))
            }
            None => Ok(None),
        }
    }

    fn resume(&self, tx: TxHandle) -> Result<(), CoordinatorError> {
        if !self.transactions.lock().contains_key(&tx.raw()) {
            return Err(CoordinatorError::new("unknown transaction handle"));
        }
        CURRENT.with(|c| c.set(Some(tx.raw())));
        self.record(TxEvent::Resume);
        Ok(())
    }

    fn current(&self) -> Result<Option<TxHandle>, CoordinatorError> {
        Ok(CURRENT.with(|c| c.get()).map(TxHandle::new))
    }

    fn status(&self) -> Result<TxStatus, CoordinatorError> {
        match self.current_state() {
            Some(tx) => Ok(tx.lock().status),
            None => Ok(TxStatus::NoTransaction),
        }
    }

    fn set_rollback_only(&self) -> Result<(), CoordinatorError> {
        let tx = self.require_current()?;
        let mut state = tx.lock();
        match state.status {
            TxStatus::MarkedRollback => Ok(()),
            TxStatus::Active => {
                state.status = TxStatus::MarkedRollback;
                drop(state);
                self.record(TxEvent::RollbackOnly);
                Ok(())
            }
            other => Err(CoordinatorError::new(format!(
                "cannot mark a {other:?} transaction rollback-only"
            ))),
        }
    }

    fn register_completion_hook(
        &self,
        hook: Box<dyn CompletionHook>,
    ) -> Result<(), CoordinatorError> {
        let tx = self.require_current()?;
        tx.lock().hooks.push(hook);
        Ok(())
    }
}

/// The error out of a container operation expected to fail. The success
/// side of call results is an untyped value, so `unwrap_err` does not apply.
pub fn failure<T>(outcome: cradle::Result<T>) -> cradle::CallError {
    match outcome {
        Ok(_) => panic!("expected the operation to fail"),
        Err(err) => err,
    }
}

/// Container wired to the given mock coordinator with default configuration.
pub fn test_container(coordinator: &Arc<MockCoordinator>) -> Arc<Container> {
    init_tracing();
    Container::new(
        Arc::clone(coordinator) as Arc<dyn TransactionCoordinator>,
        ContainerConfig::default(),
    )
}

/// Container wired to the given mock coordinator with explicit configuration.
pub fn test_container_with(
    coordinator: &Arc<MockCoordinator>,
    config: ContainerConfig,
) -> Arc<Container> {
    init_tracing();
    Container::new(
        Arc::clone(coordinator) as Arc<dyn TransactionCoordinator>,
        config,
    )
}

/// Shorthand descriptor builders.
pub fn shared_descriptor(name: &str) -> ComponentDescriptor {
    ComponentDescriptor::new(name, LifecycleStyle::Shared, TxManagement::Container)
}

pub fn per_client_descriptor(name: &str) -> ComponentDescriptor {
    ComponentDescriptor::new(name, LifecycleStyle::PerClient, TxManagement::Container)
}

/// Instrumented component. Behavior is selected by method signature:
///
/// - `ok()` succeeds;
/// - `declared()` fails with a declared business error;
/// - `boom()` fails with an unchecked failure;
/// - `mark_rollback()` marks the current transaction rollback-only and
///   returns successfully.
///
/// Every invocation records the transaction status the body observed.
pub struct Probe {
    coordinator: Arc<MockCoordinator>,
    invocations: Arc<AtomicUsize>,
    observed: Arc<Mutex<Vec<TxStatus>>>,
}

impl ManagedInstance for Probe {
    fn call(&mut self, method: &MethodSig, _args: CallArgs) -> Result<CallValue, MethodFault> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let status = self
            .coordinator
            .status()
            .unwrap_or(TxStatus::NoTransaction);
        self.observed.lock().push(status);
        match method.as_str() {
            "ok()" => Ok(Box::new(())),
            "declared()" => Err(MethodFault::Business(BusinessFault::new("declared failure"))),
            "boom()" => Err(MethodFault::Unchecked(Fault::new("boom"))),
            "mark_rollback()" => {
                self.coordinator
                    .set_rollback_only()
                    .map_err(|err| MethodFault::Unchecked(Fault::new(err.to_string())))?;
                Ok(Box::new(()))
            }
            other => Err(MethodFault::Unchecked(Fault::new(format!(
                "no handler for '{other}'"
            )))),
        }
    }
}

/// Factory for [`Probe`] instances. The counters are shared across every
/// instance it builds, so tests can observe behavior through pooling.
pub struct ProbeFactory {
    coordinator: Arc<MockCoordinator>,
    pub invocations: Arc<AtomicUsize>,
    pub observed: Arc<Mutex<Vec<TxStatus>>>,
    pub builds: Arc<AtomicUsize>,
    pub fail_builds: Arc<AtomicBool>,
}

impl ProbeFactory {
    pub fn new(coordinator: &Arc<MockCoordinator>) -> Arc<Self> {
        Arc::new(Self {
            coordinator: Arc::clone(coordinator),
            invocations: Arc::new(AtomicUsize::new(0)),
            observed: Arc::new(Mutex::new(Vec::new())),
            builds: Arc::new(AtomicUsize::new(0)),
            fail_builds: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn observed_statuses(&self) -> Vec<TxStatus> {
        self.observed.lock().clone()
    }
}

impl InstanceFactory for ProbeFactory {
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(Fault::new("datasource unavailable"));
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Probe {
            coordinator: Arc::clone(&self.coordinator),
            invocations: Arc::clone(&self.invocations),
            observed: Arc::clone(&self.observed),
        }))
    }
}

/// Order-sensitive record of lifecycle callbacks on a [`SyncProbe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    AfterBegin,
    Invoked,
    BeforeCompletion,
    AfterCompletion(bool),
}

/// Per-client component that declares lifecycle synchronization and records
/// the order its callbacks fire in. `boom()` fails unchecked; any other
/// method succeeds.
pub struct SyncProbe {
    pub log: Arc<Mutex<Vec<SyncEvent>>>,
}

impl SessionSynchronization for SyncProbe {
    fn after_begin(&mut self) -> Result<(), Fault> {
        self.log.lock().push(SyncEvent::AfterBegin);
        Ok(())
    }

    fn before_completion(&mut self) -> Result<(), Fault> {
        self.log.lock().push(SyncEvent::BeforeCompletion);
        Ok(())
    }

    fn after_completion(&mut self, committed: bool) -> Result<(), Fault> {
        self.log.lock().push(SyncEvent::AfterCompletion(committed));
        Ok(())
    }
}

impl ManagedInstance for SyncProbe {
    fn call(&mut self, method: &MethodSig, _args: CallArgs) -> Result<CallValue, MethodFault> {
        self.log.lock().push(SyncEvent::Invoked);
        match method.as_str() {
            "boom()" => Err(MethodFault::Unchecked(Fault::new("boom"))),
            _ => Ok(Box::new(())),
        }
    }

    fn synchronization(&mut self) -> Option<&mut dyn SessionSynchronization> {
        Some(self)
    }
}

pub struct SyncProbeFactory {
    pub log: Arc<Mutex<Vec<SyncEvent>>>,
}

impl SyncProbeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn log_entries(&self) -> Vec<SyncEvent> {
        self.log.lock().clone()
    }
}

impl InstanceFactory for SyncProbeFactory {
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        Ok(Box::new(SyncProbe {
            log: Arc::clone(&self.log),
        }))
    }
}

/// Component that holds its instance for a fixed duration, tracking the peak
/// number of concurrently executing bodies.
pub struct Slow {
    active: Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
    hold: Duration,
}

impl ManagedInstance for Slow {
    fn call(&mut self, _method: &MethodSig, _args: CallArgs) -> Result<CallValue, MethodFault> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now_active, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Box::new(()))
    }
}

pub struct SlowFactory {
    pub active: Arc<AtomicUsize>,
    pub max_seen: Arc<AtomicUsize>,
    pub hold: Duration,
}

impl SlowFactory {
    pub fn new(hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            active: Arc::new(AtomicUsize::new(0)),
            max_seen: Arc::new(AtomicUsize::new(0)),
            hold,
        })
    }

    pub fn peak_concurrency(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

impl InstanceFactory for SlowFactory {
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        Ok(Box::new(Slow {
            active: Arc::clone(&self.active),
            max_seen: Arc::clone(&self.max_seen),
            hold: self.hold,
        }))
    }
}

/// Component whose every call blocks on a shared barrier, forcing the test's
/// calls to overlap in time.
pub struct Rendezvous {
    barrier: Arc<Barrier>,
}

pub struct RendezvousFactory {
    pub barrier: Arc<Barrier>,
    pub builds: Arc<AtomicUsize>,
}

impl RendezvousFactory {
    pub fn new(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            barrier: Arc::new(Barrier::new(parties)),
            builds: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl ManagedInstance for Rendezvous {
    fn call(&mut self, _method: &MethodSig, _args: CallArgs) -> Result<CallValue, MethodFault> {
        self.barrier.wait();
        Ok(Box::new(()))
    }
}

impl InstanceFactory for RendezvousFactory {
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Rendezvous {
            barrier: Arc::clone(&self.barrier),
        }))
    }
}
