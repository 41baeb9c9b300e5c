//! Concurrency handler: admission gate for per-client components.

use super::{CallContext, CallHandler};
use cradle_concurrency::CallGate;
use cradle_core::{CallArgs, CallValue, Result, SharedInstance};
use std::sync::Arc;

/// Middle chain link, present for per-client components only. Holds the
/// proxy's gate across the inner call; the guard releases on every exit
/// path, including failures from further down the chain.
pub(crate) struct SerializerHandler {
    gate: Arc<CallGate>,
    next: Box<dyn CallHandler>,
}

impl SerializerHandler {
    pub(crate) fn new(gate: Arc<CallGate>, next: Box<dyn CallHandler>) -> Self {
        Self { gate, next }
    }
}

impl CallHandler for SerializerHandler {
    fn call(
        &self,
        instance: &SharedInstance,
        ctx: &CallContext<'_>,
        args: CallArgs,
    ) -> Result<CallValue> {
        let _held = self.gate.acquire(ctx.method)?;
        self.next.call(instance, ctx, args)
    }
}
