//! Instance pooling for shared-style components.
//!
//! Each shared-style component gets an [`InstancePool`] of idle instances.
//! Checkout never blocks: it reuses the most recently returned instance or
//! asks the factory for a fresh one. A single background [`PoolReaper`]
//! thread sweeps every pool in the container-owned [`PoolRegistry`] and
//! evicts instances idle longer than the component's configured maximum.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod pool;
mod registry;

pub use pool::InstancePool;
pub use registry::{PoolRegistry, PoolReaper, SWEEP_INTERVAL};
