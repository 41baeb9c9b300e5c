//! Core types for the cradle component container.
//!
//! This crate carries everything the rest of the container agrees on:
//! - Component metadata ([`ComponentDescriptor`] and friends)
//! - The error taxonomy ([`CallError`])
//! - Container configuration ([`ContainerConfig`])
//! - Collaborator traits the container consumes but does not implement
//!   ([`TransactionCoordinator`], [`InstanceFactory`], [`ManagedInstance`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod traits;

pub use config::{ConfigError, ContainerConfig};
pub use descriptor::{
    CallPath, ComponentDescriptor, ComponentName, LifecycleStyle, MethodSig, Propagation,
    TxManagement, WILDCARD_METHOD,
};
pub use error::{BusinessFault, CallError, CoordinatorError, Fault, MethodFault, Result};
pub use traits::{
    share, CallArgs, CallValue, CompletionHook, InstanceFactory, ManagedInstance,
    SessionSynchronization, SharedInstance, TransactionCoordinator, TxHandle, TxStatus,
};
