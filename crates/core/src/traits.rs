//! Collaborator interfaces the container consumes but does not implement.
//!
//! The container is handed a transaction coordinator, per-component instance
//! factories, and live business instances; everything it needs from them is
//! narrowed to the traits below.

use crate::descriptor::MethodSig;
use crate::error::{CoordinatorError, Fault, MethodFault};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Untyped arguments forwarded through the interception chain.
pub type CallArgs = Box<dyn Any + Send>;

/// Untyped value returned through the interception chain.
pub type CallValue = Box<dyn Any + Send>;

/// Opaque token for a transaction minted by the coordinator. The container
/// only ever hands it back to `resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle(u64);

impl TxHandle {
    /// Wrap a raw coordinator-assigned id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Status of the transaction currently associated with the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Running and able to commit.
    Active,
    /// Marked rollback-only; completion must roll back.
    MarkedRollback,
    /// Already committed.
    Committed,
    /// Already rolled back.
    RolledBack,
    /// No transaction is associated with the thread.
    NoTransaction,
}

/// Hook the container registers with the coordinator so component lifecycle
/// callbacks run around the coordinator's own commit/rollback.
pub trait CompletionHook: Send {
    /// Runs before the coordinator completes the transaction.
    fn before_completion(&mut self) -> std::result::Result<(), Fault>;

    /// Runs after the coordinator completed the transaction.
    fn after_completion(&mut self, committed: bool) -> std::result::Result<(), Fault>;
}

/// Narrow interface over the externally supplied transaction manager.
///
/// All operations act on the transaction associated with the calling thread.
/// Every operation may fail; failures are fatal to the call in progress and
/// are never retried by the container.
pub trait TransactionCoordinator: Send + Sync {
    /// Begin a new transaction and associate it with the calling thread.
    fn begin(&self) -> std::result::Result<(), CoordinatorError>;

    /// Commit the current transaction.
    fn commit(&self) -> std::result::Result<(), CoordinatorError>;

    /// Roll back the current transaction.
    fn rollback(&self) -> std::result::Result<(), CoordinatorError>;

    /// Detach the current transaction from the thread, returning a handle to
    /// resume it later. `None` when no transaction was associated.
    fn suspend(&self) -> std::result::Result<Option<TxHandle>, CoordinatorError>;

    /// Re-associate a previously suspended transaction with the thread.
    fn resume(&self, tx: TxHandle) -> std::result::Result<(), CoordinatorError>;

    /// Handle of the transaction currently associated with the thread.
    fn current(&self) -> std::result::Result<Option<TxHandle>, CoordinatorError>;

    /// Status of the current transaction (`NoTransaction` when absent).
    fn status(&self) -> std::result::Result<TxStatus, CoordinatorError>;

    /// Mark the current transaction so completion rolls back.
    fn set_rollback_only(&self) -> std::result::Result<(), CoordinatorError>;

    /// Register a completion hook on the current transaction.
    fn register_completion_hook(
        &self,
        hook: Box<dyn CompletionHook>,
    ) -> std::result::Result<(), CoordinatorError>;
}

/// Lifecycle callbacks a per-client component may declare to observe the
/// transactions the container starts on its behalf.
pub trait SessionSynchronization {
    /// Runs immediately after the container begins a new transaction.
    fn after_begin(&mut self) -> std::result::Result<(), Fault>;

    /// Runs before the transaction completes.
    fn before_completion(&mut self) -> std::result::Result<(), Fault>;

    /// Runs after the transaction completed.
    fn after_completion(&mut self, committed: bool) -> std::result::Result<(), Fault>;
}

/// A live business instance the terminal handler dispatches into.
pub trait ManagedInstance: Send {
    /// Invoke the named business method.
    fn call(
        &mut self,
        method: &MethodSig,
        args: CallArgs,
    ) -> std::result::Result<CallValue, MethodFault>;

    /// The instance's lifecycle synchronization callbacks, when it declares
    /// support for them. Only valid for per-client components.
    fn synchronization(&mut self) -> Option<&mut dyn SessionSynchronization> {
        None
    }

    /// Teardown callback invoked when a per-client session is removed.
    /// Runs outside any transaction context.
    fn on_remove(&mut self) {}
}

/// A live instance shared between the chain and coordinator hooks.
pub type SharedInstance = Arc<Mutex<Box<dyn ManagedInstance>>>;

/// Wrap a freshly built instance for use in the chain.
pub fn share(instance: Box<dyn ManagedInstance>) -> SharedInstance {
    Arc::new(Mutex::new(instance))
}

/// Builds instances for a pool (or a per-client session) on demand.
pub trait InstanceFactory: Send + Sync {
    /// Construct a fresh instance. Failures propagate to the caller that
    /// triggered construction.
    fn build(&self) -> std::result::Result<Box<dyn ManagedInstance>, Fault>;
}
