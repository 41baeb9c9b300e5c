//! Component front-ends.
//!
//! A proxy is what client code calls instead of the business instance. It
//! rejects calls once the container shut down, then forwards
//! `(instance, method, args)` into the interception chain. Shared-style
//! proxies borrow an instance from the pool per call; per-client proxies own
//! one instance and one gate for the life of the session.

use crate::chain::{build_chain, CallContext};
use crate::container::{Container, Deployment};
use cradle_concurrency::CallGate;
use cradle_core::{
    CallArgs, CallError, CallPath, CallValue, ComponentName, MethodSig, Result, SharedInstance,
};
use std::sync::Arc;

struct Session {
    instance: SharedInstance,
    gate: Arc<CallGate>,
}

/// Callable front-end for one deployed component.
pub struct ComponentProxy {
    container: Arc<Container>,
    deployment: Arc<Deployment>,
    path: CallPath,
    session: Option<Session>,
}

impl ComponentProxy {
    pub(crate) fn pooled(
        container: Arc<Container>,
        deployment: Arc<Deployment>,
        path: CallPath,
    ) -> Self {
        Self {
            container,
            deployment,
            path,
            session: None,
        }
    }

    pub(crate) fn per_client(
        container: Arc<Container>,
        deployment: Arc<Deployment>,
        path: CallPath,
        instance: SharedInstance,
        gate: Arc<CallGate>,
    ) -> Self {
        Self {
            container,
            deployment,
            path,
            session: Some(Session { instance, gate }),
        }
    }

    /// The component this proxy fronts.
    pub fn component(&self) -> &ComponentName {
        self.deployment.descriptor.name()
    }

    /// Which call path this proxy represents.
    pub fn path(&self) -> CallPath {
        self.path
    }

    /// Invoke a business method through the interception chain.
    pub fn invoke(&self, method: impl Into<MethodSig>, args: CallArgs) -> Result<CallValue> {
        let method = method.into();
        if self.container.is_shut_down() {
            return Err(CallError::ContainerShutDown {
                component: self.component().clone(),
            });
        }

        let ctx = CallContext {
            descriptor: &self.deployment.descriptor,
            method: &method,
            path: self.path,
        };

        match &self.session {
            Some(session) => {
                let chain = build_chain(
                    Arc::clone(self.container.coordinator()),
                    Some(Arc::clone(&session.gate)),
                );
                chain.call(&session.instance, &ctx, args)
            }
            None => {
                // Shared style: exclusivity comes from the pool, not a gate.
                // The instance goes back on every exit path.
                let pool = self.deployment.pool.as_ref().ok_or_else(|| {
                    CallError::Fatal(format!(
                        "shared-style component '{}' has no pool",
                        self.component()
                    ))
                })?;
                let instance = pool.checkout()?;
                let chain = build_chain(Arc::clone(self.container.coordinator()), None);
                let outcome = chain.call(&instance, &ctx, args);
                pool.checkin(instance);
                outcome
            }
        }
    }

    /// Tear the front-end down. For a per-client session this runs the
    /// instance's teardown callback, outside any transaction context; for a
    /// shared-style proxy it is a no-op.
    pub fn remove(self) -> Result<()> {
        let Self {
            deployment, session, ..
        } = self;
        match session {
            Some(session) => {
                session.instance.lock().on_remove();
                Ok(())
            }
            None => {
                tracing::debug!(component = %deployment.descriptor.name(), "ignoring remove() on shared-style proxy");
                Ok(())
            }
        }
    }
}
