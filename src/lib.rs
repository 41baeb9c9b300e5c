//! # Cradle
//!
//! Lightweight managed-component container runtime.
//!
//! Cradle hosts server-side business components with two lifecycle styles,
//! shared/pooled and per-client/stateful, and intercepts every business
//! call through a composable chain that enforces transaction propagation
//! policy and concurrency-safety guarantees the component code itself does
//! not implement.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cradle::prelude::*;
//! use std::sync::Arc;
//!
//! // The coordinator is an external collaborator; bring your own.
//! let container = Container::new(coordinator, ContainerConfig::default());
//!
//! // Describe and deploy a shared-style component.
//! let descriptor = ComponentDescriptor::new(
//!     "invoice",
//!     LifecycleStyle::Shared,
//!     TxManagement::Container,
//! );
//! let table = Arc::new(DispatchTable::new().with_handler(
//!     "total()",
//!     |state: &mut Invoice, _args| Ok(Box::new(state.total) as CallValue),
//! ));
//! container.deploy(descriptor, Arc::new(TableFactory::new(table, Invoice::default)))?;
//!
//! // Every call runs through the interception chain.
//! let proxy = container.proxy(&"invoice".into(), CallPath::Remote)?;
//! let total = proxy.invoke("total()", Box::new(()))?;
//!
//! container.shutdown();
//! ```
//!
//! ## Lifecycle styles
//!
//! - **Shared**: no conversational state; instances live in a pool, are
//!   reused most-recently-idle first, and idle out under a background sweep.
//! - **Per-client**: conversational state private to one session; one
//!   instance per [`ComponentProxy`], calls serialized by a bounded-wait
//!   admission gate.

#![warn(missing_docs)]

pub mod prelude;

pub use cradle_core::{
    share, BusinessFault, CallArgs, CallError, CallPath, CallValue, CompletionHook,
    ComponentDescriptor, ComponentName, ConfigError, ContainerConfig, CoordinatorError, Fault,
    InstanceFactory, LifecycleStyle, ManagedInstance, MethodFault, MethodSig, Propagation, Result,
    SessionSynchronization, SharedInstance, TransactionCoordinator, TxHandle, TxManagement,
    TxStatus, WILDCARD_METHOD,
};

pub use cradle_concurrency::{CallGate, GateGuard};
pub use cradle_engine::{
    CallContext, CallHandler, ComponentProxy, Container, ContainerStatus, DispatchFn,
    DispatchTable, TableComponent, TableFactory,
};
pub use cradle_pool::{InstancePool, PoolReaper, PoolRegistry, SWEEP_INTERVAL};
