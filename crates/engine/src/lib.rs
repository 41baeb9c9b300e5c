//! Container engine: interception chain, dispatch tables, and proxies.
//!
//! Every business call runs through a composable chain of call handlers.
//! For a per-client component the order is transaction handler ->
//! concurrency serializer -> terminal dispatch; shared-style components skip
//! the serializer because pool checkout already guarantees exclusive use of
//! the instance.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod container;
pub mod dispatch;
pub mod proxy;

pub use chain::{CallContext, CallHandler};
pub use container::{Container, ContainerStatus};
pub use dispatch::{DispatchFn, DispatchTable, TableComponent, TableFactory};
pub use proxy::ComponentProxy;
