//! Call-interception chain.
//!
//! Handlers compose strictly: the transaction handler is always outermost,
//! the serializer sits in the middle for per-client components only, and the
//! terminal invoker performs the actual dispatch. Each handler receives the
//! live instance, a call context, and the untyped arguments, and forwards to
//! its successor.

mod invoker;
mod serializer;
mod transaction;

use cradle_concurrency::CallGate;
use cradle_core::{
    CallArgs, CallPath, CallValue, ComponentDescriptor, MethodSig, Result, SharedInstance,
    TransactionCoordinator,
};
use std::sync::Arc;

pub(crate) use invoker::MethodInvoker;
pub(crate) use serializer::SerializerHandler;
pub(crate) use transaction::TransactionHandler;

/// Everything a handler needs to know about the call being intercepted.
pub struct CallContext<'a> {
    /// Metadata of the component being called.
    pub descriptor: &'a ComponentDescriptor,
    /// The business method signature.
    pub method: &'a MethodSig,
    /// Which front-end the call arrived through.
    pub path: CallPath,
}

/// One link of the interception chain.
pub trait CallHandler: Send + Sync {
    /// Run this handler's policy around the rest of the chain.
    fn call(
        &self,
        instance: &SharedInstance,
        ctx: &CallContext<'_>,
        args: CallArgs,
    ) -> Result<CallValue>;
}

/// Compose the chain for one call. `gate` is present for per-client
/// components only.
pub(crate) fn build_chain(
    coordinator: Arc<dyn TransactionCoordinator>,
    gate: Option<Arc<CallGate>>,
) -> Box<dyn CallHandler> {
    let mut chain: Box<dyn CallHandler> = Box::new(MethodInvoker);
    if let Some(gate) = gate {
        chain = Box::new(SerializerHandler::new(gate, chain));
    }
    Box::new(TransactionHandler::new(coordinator, chain))
}
