//! Terminal handler: dispatch into the live instance.

use super::{CallContext, CallHandler};
use cradle_core::{CallArgs, CallError, CallPath, CallValue, MethodFault, Result, SharedInstance};

/// Innermost chain link. Invokes the business method and translates raw
/// failures into the container's error categories: declared business errors
/// pass through unchanged; any other failure is re-wrapped on the remote
/// call path so implementation-only failure types cannot leak across the
/// proxy boundary, and passes through plain on the local path.
pub(crate) struct MethodInvoker;

impl CallHandler for MethodInvoker {
    fn call(
        &self,
        instance: &SharedInstance,
        ctx: &CallContext<'_>,
        args: CallArgs,
    ) -> Result<CallValue> {
        let mut guard = instance.lock();
        match guard.call(ctx.method, args) {
            Ok(value) => Ok(value),
            Err(MethodFault::Business(fault)) => Err(CallError::Business(fault)),
            Err(MethodFault::Unchecked(fault)) => Err(match ctx.path {
                CallPath::Local => CallError::Unchecked(fault),
                CallPath::Remote => CallError::Wrapped { cause: fault },
            }),
        }
    }
}
