//! The container: deployment registry, shutdown state, and front-end
//! construction.

use crate::proxy::ComponentProxy;
use cradle_concurrency::CallGate;
use cradle_core::{
    share, CallError, CallPath, ComponentDescriptor, ComponentName, ContainerConfig,
    InstanceFactory, LifecycleStyle, Result, TransactionCoordinator,
};
use cradle_pool::{InstancePool, PoolReaper, PoolRegistry};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether the container still accepts calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    /// Accepting deployments and calls.
    Active,
    /// Shut down; incoming calls fail immediately, in-flight calls finish.
    ShutDown,
}

/// One deployed component: its metadata, its factory, and (for shared style)
/// its pool.
pub(crate) struct Deployment {
    pub(crate) descriptor: Arc<ComponentDescriptor>,
    pub(crate) factory: Arc<dyn InstanceFactory>,
    pub(crate) pool: Option<Arc<InstancePool>>,
}

/// Hosts managed components. Owns every registry the runtime needs (the
/// deployed-component map, the pool registry, and the eviction reaper), so
/// nothing here is process-global; two containers in one process do not
/// share state.
pub struct Container {
    coordinator: Arc<dyn TransactionCoordinator>,
    config: ContainerConfig,
    components: DashMap<ComponentName, Arc<Deployment>>,
    pools: Arc<PoolRegistry>,
    reaper: PoolReaper,
    shut_down: AtomicBool,
}

impl Container {
    /// Create a container around the externally supplied coordinator.
    /// Spawns the pool reaper; it runs until [`Container::shutdown`].
    pub fn new(coordinator: Arc<dyn TransactionCoordinator>, config: ContainerConfig) -> Arc<Self> {
        let pools = Arc::new(PoolRegistry::new());
        let reaper = PoolReaper::spawn(Arc::clone(&pools));
        Arc::new(Self {
            coordinator,
            config,
            components: DashMap::new(),
            pools,
            reaper,
            shut_down: AtomicBool::new(false),
        })
    }

    /// The transaction coordinator this container was given.
    pub fn coordinator(&self) -> &Arc<dyn TransactionCoordinator> {
        &self.coordinator
    }

    /// The configuration this container was built with.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Current status.
    pub fn status(&self) -> ContainerStatus {
        if self.is_shut_down() {
            ContainerStatus::ShutDown
        } else {
            ContainerStatus::Active
        }
    }

    /// True once [`Container::shutdown`] has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Deploy a component. Shared-style components get an instance pool
    /// registered with the eviction sweep. Duplicate names are rejected.
    pub fn deploy(
        &self,
        descriptor: ComponentDescriptor,
        factory: Arc<dyn InstanceFactory>,
    ) -> Result<()> {
        let name = descriptor.name().clone();
        if self.is_shut_down() {
            return Err(CallError::ContainerShutDown { component: name });
        }
        if self.components.contains_key(&name) {
            return Err(CallError::Fatal(format!(
                "component '{name}' is already deployed"
            )));
        }

        let descriptor = Arc::new(descriptor);
        let pool = match descriptor.lifecycle() {
            LifecycleStyle::Shared => {
                let pool = Arc::new(InstancePool::new(
                    name.clone(),
                    self.config.pooled_max_idle(),
                    Arc::clone(&factory),
                ));
                self.pools.register(Arc::clone(&pool));
                Some(pool)
            }
            LifecycleStyle::PerClient => None,
        };

        self.components.insert(
            name.clone(),
            Arc::new(Deployment {
                descriptor,
                factory,
                pool,
            }),
        );
        tracing::info!(component = %name, "component deployed");
        Ok(())
    }

    /// Remove a component and take its pool out of the eviction sweep.
    pub fn undeploy(&self, name: &ComponentName) -> Result<()> {
        match self.components.remove(name) {
            Some((_, deployment)) => {
                if deployment.pool.is_some() {
                    self.pools.unregister(name);
                }
                tracing::info!(component = %name, "component undeployed");
                Ok(())
            }
            None => Err(CallError::Fatal(format!(
                "component '{name}' is not deployed"
            ))),
        }
    }

    /// Build a front-end for a shared-style component. Each call checks an
    /// instance out of the pool and returns it afterwards.
    pub fn proxy(self: &Arc<Self>, name: &ComponentName, path: CallPath) -> Result<ComponentProxy> {
        let deployment = self.deployment(name)?;
        if deployment.descriptor.lifecycle() == LifecycleStyle::PerClient {
            return Err(CallError::Fatal(format!(
                "component '{name}' is per-client; use create_session"
            )));
        }
        Ok(ComponentProxy::pooled(Arc::clone(self), deployment, path))
    }

    /// Build a per-client session: one dedicated instance, one gate, calls
    /// serialized.
    pub fn create_session(
        self: &Arc<Self>,
        name: &ComponentName,
        path: CallPath,
    ) -> Result<ComponentProxy> {
        let deployment = self.deployment(name)?;
        if deployment.descriptor.lifecycle() == LifecycleStyle::Shared {
            return Err(CallError::Fatal(format!(
                "component '{name}' is shared-style; use proxy"
            )));
        }
        let instance = deployment
            .factory
            .build()
            .map_err(|source| CallError::Construction {
                component: name.clone(),
                source,
            })?;
        let gate = Arc::new(CallGate::new(
            self.config.gate_wait_timeout(),
            self.config.gate_release_jitter(),
        ));
        Ok(ComponentProxy::per_client(
            Arc::clone(self),
            deployment,
            path,
            share(instance),
            gate,
        ))
    }

    /// Stop accepting calls. Pools leave the eviction sweep and the reaper
    /// stops; in-flight calls run to completion.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("container shutting down");
        for entry in self.components.iter() {
            if entry.value().pool.is_some() {
                self.pools.unregister(entry.key());
            }
        }
        self.reaper.stop();
    }

    fn deployment(&self, name: &ComponentName) -> Result<Arc<Deployment>> {
        if self.is_shut_down() {
            return Err(CallError::ContainerShutDown {
                component: name.clone(),
            });
        }
        self.components
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CallError::Fatal(format!("no component '{name}' deployed")))
    }
}
