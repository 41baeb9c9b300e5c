//! Transaction handler: propagation policy around every call.

use super::{CallContext, CallHandler};
use cradle_core::{
    CallArgs, CallError, CallValue, CompletionHook, Fault, LifecycleStyle, Propagation, Result,
    SharedInstance, TransactionCoordinator, TxHandle, TxManagement, TxStatus,
};
use std::sync::Arc;

/// Outermost chain link. Applies the component's propagation mode before the
/// call and settles any container-started transaction afterwards:
///
/// - a transaction begun here commits on success and on declared business
///   errors, and rolls back when marked rollback-only (explicitly by the
///   component, or implicitly by any other failure);
/// - a transaction suspended here is resumed on every exit path;
/// - lifecycle synchronization callbacks run for per-client components that
///   declare them;
/// - coordinator failures during completion or resume are fatal and take
///   precedence over the call's own outcome.
///
/// Self-managed components bypass the policy entirely; the component drives
/// the coordinator itself.
pub(crate) struct TransactionHandler {
    coordinator: Arc<dyn TransactionCoordinator>,
    next: Box<dyn CallHandler>,
}

impl TransactionHandler {
    pub(crate) fn new(
        coordinator: Arc<dyn TransactionCoordinator>,
        next: Box<dyn CallHandler>,
    ) -> Self {
        Self { coordinator, next }
    }

    /// Apply the pre-call side of the propagation table.
    fn enter(
        &self,
        mode: Propagation,
        ctx: &CallContext<'_>,
        began_new: &mut bool,
        suspended: &mut Option<TxHandle>,
    ) -> Result<()> {
        match mode {
            Propagation::Required => {
                if self.coordinator.current()?.is_none() {
                    self.coordinator.begin()?;
                    *began_new = true;
                } else if self.coordinator.status()? != TxStatus::Active {
                    return Err(CallError::Fatal(format!(
                        "a transaction is associated with this thread but is not active: '{}'",
                        ctx.method
                    )));
                }
            }
            Propagation::RequiresNew => {
                *suspended = self.coordinator.suspend()?;
                self.coordinator.begin()?;
                *began_new = true;
            }
            Propagation::Mandatory => {
                if self.coordinator.current()?.is_none() {
                    return Err(CallError::TransactionRequired {
                        method: ctx.method.clone(),
                        path: ctx.path,
                    });
                }
            }
            Propagation::NotSupported => {
                *suspended = self.coordinator.suspend()?;
            }
            Propagation::Supports => {}
            Propagation::Never => {
                if self.coordinator.current()?.is_some() {
                    return Err(CallError::TransactionNotAllowed {
                        method: ctx.method.clone(),
                        path: ctx.path,
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the component's `after_begin` callback and register its
    /// completion hook with the coordinator, when the instance declares
    /// synchronization support. Shared-style components must not: their
    /// instances are interchangeable and cannot track a transaction.
    fn enlist_synchronization(
        &self,
        instance: &SharedInstance,
        ctx: &CallContext<'_>,
    ) -> Result<()> {
        let supports = {
            let mut guard = instance.lock();
            match guard.synchronization() {
                None => false,
                Some(sync) => {
                    if ctx.descriptor.lifecycle() == LifecycleStyle::Shared {
                        return Err(CallError::Fatal(format!(
                            "shared-style component '{}' must not declare lifecycle synchronization",
                            ctx.descriptor.name()
                        )));
                    }
                    sync.after_begin().map_err(|fault| {
                        CallError::Fatal(format!(
                            "after_begin failed for '{}': {fault}",
                            ctx.descriptor.name()
                        ))
                    })?;
                    true
                }
            }
        };
        if supports {
            self.coordinator
                .register_completion_hook(Box::new(SynchronizationHook {
                    instance: Arc::clone(instance),
                }))?;
        }
        Ok(())
    }

    /// Mark the current transaction rollback-only unless it already is.
    fn mark_rollback_only(&self) -> Result<()> {
        if self.coordinator.status()? != TxStatus::MarkedRollback {
            tracing::info!("system failure under a container-started transaction; marking rollback-only");
            self.coordinator.set_rollback_only()?;
        }
        Ok(())
    }

    /// Settle the transaction this handler began: roll back when marked,
    /// commit otherwise, then detach the finished transaction from the
    /// thread.
    fn complete(&self) -> Result<()> {
        if self.coordinator.status()? == TxStatus::MarkedRollback {
            self.coordinator.rollback()?;
        } else {
            self.coordinator.commit()?;
        }
        let _ = self.coordinator.suspend()?;
        Ok(())
    }
}

impl CallHandler for TransactionHandler {
    fn call(
        &self,
        instance: &SharedInstance,
        ctx: &CallContext<'_>,
        args: CallArgs,
    ) -> Result<CallValue> {
        if ctx.descriptor.tx_management() == TxManagement::SelfManaged {
            return self.next.call(instance, ctx, args);
        }

        let mode = ctx.descriptor.propagation_for(ctx.path, ctx.method);
        let mut began_new = false;
        let mut suspended: Option<TxHandle> = None;

        let setup = self
            .enter(mode, ctx, &mut began_new, &mut suspended)
            .and_then(|()| {
                if began_new {
                    self.enlist_synchronization(instance, ctx)
                } else {
                    Ok(())
                }
            });

        let mut outcome = match setup {
            Ok(()) => self.next.call(instance, ctx, args),
            Err(err) => Err(err),
        };

        if began_new {
            if let Err(err) = &outcome {
                // Declared business errors are expected outcomes; anything
                // else forces the transaction onto the rollback path.
                if !err.is_business() {
                    if let Err(mark_err) = self.mark_rollback_only() {
                        tracing::error!(error = %mark_err, "failed to mark transaction rollback-only");
                    }
                }
            }
            if let Err(err) = self.complete() {
                if let Err(displaced) = &outcome {
                    tracing::error!(error = %displaced, "call error displaced by transaction completion failure");
                }
                outcome = Err(err);
            }
        }

        if let Some(handle) = suspended {
            if let Err(err) = self.coordinator.resume(handle) {
                if let Err(displaced) = &outcome {
                    tracing::error!(error = %displaced, "call error displaced by transaction resume failure");
                }
                outcome = Err(CallError::from(err));
            }
        }

        outcome
    }
}

/// Forwards coordinator completion callbacks to the instance's lifecycle
/// synchronization, around the coordinator's own commit/rollback.
struct SynchronizationHook {
    instance: SharedInstance,
}

impl CompletionHook for SynchronizationHook {
    fn before_completion(&mut self) -> std::result::Result<(), Fault> {
        let mut guard = self.instance.lock();
        match guard.synchronization() {
            Some(sync) => sync.before_completion(),
            None => Ok(()),
        }
    }

    fn after_completion(&mut self, committed: bool) -> std::result::Result<(), Fault> {
        let mut guard = self.instance.lock();
        match guard.synchronization() {
            Some(sync) => sync.after_completion(committed),
            None => Ok(()),
        }
    }
}
