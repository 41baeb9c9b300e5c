//! Convenience re-exports for the common case.
//!
//! ```ignore
//! use cradle::prelude::*;
//! ```

pub use crate::{
    CallArgs, CallError, CallPath, CallValue, ComponentDescriptor, ComponentName, ComponentProxy,
    Container, ContainerConfig, DispatchTable, InstanceFactory, LifecycleStyle, ManagedInstance,
    MethodSig, Propagation, Result, TableFactory, TransactionCoordinator, TxManagement,
};
