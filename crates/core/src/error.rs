//! Error taxonomy for container calls.
//!
//! The container distinguishes five failure categories, and each propagates
//! differently:
//!
//! | Category | Behavior |
//! |----------|----------|
//! | Declared business error | passed through unchanged, never forces rollback |
//! | Unchecked business failure | wrapped on the remote path, plain on the local path; forces rollback-only on an owning new transaction |
//! | Propagation violation | "transaction required" / "transaction not allowed", distinguished by call path |
//! | Concurrency timeout | names the method holding the gate |
//! | Fatal/configuration | coordinator failure, shutdown, construction failure; surfaces immediately, never retried |

use crate::descriptor::{CallPath, ComponentName, MethodSig};
use thiserror::Error;

/// Result type for container call operations.
pub type Result<T> = std::result::Result<T, CallError>;

/// An unchecked failure raised by component code (the analog of a runtime
/// exception). Carries only a message; the container never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    /// Create a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An error type a business method declares as part of its contract.
///
/// Declared errors are expected outcomes: they pass through the chain
/// unmodified and never force a container-started transaction to roll back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessFault {
    message: String,
}

impl BusinessFault {
    /// Create a declared business error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What a business method produced when it failed, before the chain applied
/// call-path translation.
#[derive(Debug, Error)]
pub enum MethodFault {
    /// Failure the method's contract declares.
    #[error(transparent)]
    Business(#[from] BusinessFault),
    /// Any other failure.
    #[error(transparent)]
    Unchecked(#[from] Fault),
}

/// Failure of a transaction coordinator operation. Always fatal to the call
/// in progress; never retried.
#[derive(Debug, Clone, Error)]
#[error("transaction coordinator failure: {0}")]
pub struct CoordinatorError(String);

impl CoordinatorError {
    /// Create a coordinator error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Everything a container call can fail with.
#[derive(Debug, Error)]
pub enum CallError {
    /// Declared business error; an expected outcome, passed through unchanged.
    #[error(transparent)]
    Business(BusinessFault),

    /// Unchecked component failure on the local call path (not re-wrapped).
    #[error(transparent)]
    Unchecked(Fault),

    /// Unchecked component failure crossing the remote boundary, re-wrapped
    /// into a container-level error carrying the original as cause.
    #[error("component failure: {cause}")]
    Wrapped {
        /// The original failure.
        #[source]
        cause: Fault,
    },

    /// `Mandatory` method invoked with no ambient transaction.
    #[error("transaction required for {path} method '{method}'")]
    TransactionRequired {
        /// The method that required a transaction.
        method: MethodSig,
        /// Which front-end the call arrived through.
        path: CallPath,
    },

    /// `Never` method invoked with an ambient transaction present.
    #[error("transaction not allowed for {path} method '{method}'")]
    TransactionNotAllowed {
        /// The method that forbids a transaction.
        method: MethodSig,
        /// Which front-end the call arrived through.
        path: CallPath,
    },

    /// Waiting caller exceeded the configured bound on a per-client gate.
    #[error("timed out after {waited_ms}ms waiting for per-client instance held by '{holder}'")]
    ConcurrencyTimeout {
        /// The method currently holding the gate.
        holder: MethodSig,
        /// How long the caller waited before giving up.
        waited_ms: u64,
    },

    /// The instance factory failed while the pool was empty.
    #[error("failed to construct instance of '{component}': {source}")]
    Construction {
        /// The component being constructed.
        component: ComponentName,
        /// The factory failure.
        #[source]
        source: Fault,
    },

    /// The container has shut down; the call was rejected before any side
    /// effect.
    #[error("container for component '{component}' has shut down")]
    ContainerShutDown {
        /// The component the rejected call addressed.
        component: ComponentName,
    },

    /// A coordinator operation failed mid-call.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    /// Container state or specification violation (unknown component,
    /// duplicate deploy, inactive ambient transaction, shared-style
    /// component with lifecycle synchronization, ...).
    #[error("{0}")]
    Fatal(String),
}

impl CallError {
    /// True for declared business errors, which never force a
    /// container-started transaction to roll back.
    pub fn is_business(&self) -> bool {
        matches!(self, CallError::Business(_))
    }

    /// True when the failure came out of the business method itself
    /// (declared or unchecked) rather than from the container.
    pub fn is_component_failure(&self) -> bool {
        matches!(
            self,
            CallError::Business(_) | CallError::Unchecked(_) | CallError::Wrapped { .. }
        )
    }
}
