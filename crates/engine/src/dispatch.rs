//! Deployment-time dispatch tables.
//!
//! Instead of runtime reflection, a component registers one typed handler
//! per method signature when it is deployed. The terminal chain handler
//! resolves methods through this table; an unknown signature is an unchecked
//! failure, the same category as calling a method that does not exist.

use cradle_core::{
    CallArgs, CallValue, Fault, InstanceFactory, ManagedInstance, MethodFault, MethodSig,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A typed method handler: borrows the component state, consumes the call
/// arguments.
pub type DispatchFn<T> =
    Box<dyn Fn(&mut T, CallArgs) -> Result<CallValue, MethodFault> + Send + Sync>;

/// Mapping from method signature to typed handler for component state `T`.
/// Built once at deployment time, shared by every instance of the component.
pub struct DispatchTable<T> {
    handlers: HashMap<MethodSig, DispatchFn<T>>,
}

impl<T> DispatchTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for one method signature.
    pub fn with_handler(
        mut self,
        sig: impl Into<MethodSig>,
        handler: impl Fn(&mut T, CallArgs) -> Result<CallValue, MethodFault> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(sig.into(), Box::new(handler));
        self
    }

    /// True when the table has a handler for `sig`.
    pub fn contains(&self, sig: &MethodSig) -> bool {
        self.handlers.contains_key(sig)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for DispatchTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Component state plus its dispatch table, adapted to the
/// [`ManagedInstance`] boundary the chain dispatches into.
pub struct TableComponent<T> {
    state: T,
    table: Arc<DispatchTable<T>>,
}

impl<T> TableComponent<T> {
    /// Pair fresh state with its component's table.
    pub fn new(state: T, table: Arc<DispatchTable<T>>) -> Self {
        Self { state, table }
    }
}

impl<T: Send + 'static> ManagedInstance for TableComponent<T> {
    fn call(&mut self, method: &MethodSig, args: CallArgs) -> Result<CallValue, MethodFault> {
        match self.table.handlers.get(method) {
            Some(handler) => handler(&mut self.state, args),
            None => Err(MethodFault::Unchecked(Fault::new(format!(
                "no handler for method '{method}'"
            )))),
        }
    }
}

/// Instance factory producing [`TableComponent`]s from an init closure.
/// Convenient for pools: the table is built once, instances on demand.
pub struct TableFactory<T, F> {
    table: Arc<DispatchTable<T>>,
    init: F,
}

impl<T, F> TableFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
    T: Send + 'static,
{
    /// Create a factory over the given table and state initializer.
    pub fn new(table: Arc<DispatchTable<T>>, init: F) -> Self {
        Self { table, init }
    }
}

impl<T, F> InstanceFactory for TableFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
    T: Send + 'static,
{
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        Ok(Box::new(TableComponent::new(
            (self.init)(),
            Arc::clone(&self.table),
        )))
    }
}
