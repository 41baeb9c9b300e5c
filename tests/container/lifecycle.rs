//! Deployment, session teardown, and shutdown behavior.

use crate::common::{
    failure, per_client_descriptor, shared_descriptor, test_container, MockCoordinator,
    ProbeFactory,
};
use cradle::{
    CallArgs, CallError, CallPath, CallValue, Fault, InstanceFactory, ManagedInstance, MethodFault,
    MethodSig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-client component that records whether its teardown callback ran.
struct Removable {
    removed: Arc<AtomicBool>,
}

impl ManagedInstance for Removable {
    fn call(&mut self, _method: &MethodSig, _args: CallArgs) -> Result<CallValue, MethodFault> {
        Ok(Box::new(()))
    }

    fn on_remove(&mut self) {
        self.removed.store(true, Ordering::SeqCst);
    }
}

struct RemovableFactory {
    removed: Arc<AtomicBool>,
}

impl InstanceFactory for RemovableFactory {
    fn build(&self) -> Result<Box<dyn ManagedInstance>, Fault> {
        Ok(Box::new(Removable {
            removed: Arc::clone(&self.removed),
        }))
    }
}

#[test]
fn duplicate_deployment_is_rejected() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();

    let err = container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap_err();
    assert!(matches!(err, CallError::Fatal(_)));
    container.shutdown();
}

#[test]
fn unknown_component_cannot_be_proxied() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);

    let err = failure(container.proxy(&"missing".into(), CallPath::Remote));
    assert!(matches!(err, CallError::Fatal(_)));
    container.shutdown();
}

#[test]
fn undeployed_component_stops_accepting_proxies() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();

    container.undeploy(&"ledger".into()).unwrap();
    let err = failure(container.proxy(&"ledger".into(), CallPath::Remote));
    assert!(matches!(err, CallError::Fatal(_)));
    container.shutdown();
}

#[test]
fn front_end_kind_must_match_lifecycle_style() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let shared = ProbeFactory::new(&coordinator);
    let per_client = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), shared)
        .unwrap();
    container
        .deploy(per_client_descriptor("cart"), per_client)
        .unwrap();

    let err = failure(container.create_session(&"ledger".into(), CallPath::Remote));
    assert!(matches!(err, CallError::Fatal(_)));

    let err = failure(container.proxy(&"cart".into(), CallPath::Remote));
    assert!(matches!(err, CallError::Fatal(_)));
    container.shutdown();
}

#[test]
fn front_end_reports_component_and_path() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();

    let proxy = container.proxy(&"ledger".into(), CallPath::Remote).unwrap();
    assert_eq!(proxy.component().as_str(), "ledger");
    assert_eq!(proxy.path(), CallPath::Remote);
    assert_eq!(container.config().gate_wait_timeout_ms, 30_000);
    container.shutdown();
}

#[test]
fn removing_a_session_runs_teardown() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let removed = Arc::new(AtomicBool::new(false));
    container
        .deploy(
            per_client_descriptor("cart"),
            Arc::new(RemovableFactory {
                removed: Arc::clone(&removed),
            }),
        )
        .unwrap();

    let session = container
        .create_session(&"cart".into(), CallPath::Remote)
        .unwrap();
    session.invoke("add()", Box::new(())).unwrap();
    session.remove().unwrap();

    assert!(removed.load(Ordering::SeqCst));
    container.shutdown();
}

#[test]
fn removing_a_shared_proxy_is_a_no_op() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();

    let proxy = container.proxy(&"ledger".into(), CallPath::Remote).unwrap();
    proxy.remove().unwrap();
    container.shutdown();
}

#[test]
fn shutdown_rejects_new_calls_immediately() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();
    let proxy = container.proxy(&"ledger".into(), CallPath::Remote).unwrap();

    container.shutdown();

    let err = failure(proxy.invoke("ok()", Box::new(())));
    match err {
        CallError::ContainerShutDown { component } => assert_eq!(component.as_str(), "ledger"),
        other => panic!("expected ContainerShutDown, got {other:?}"),
    }
    assert_eq!(factory.invocation_count(), 0);
    assert_eq!(coordinator.events(), vec![]);
}

#[test]
fn shutdown_rejects_new_front_ends_and_deployments() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    let factory = ProbeFactory::new(&coordinator);
    container
        .deploy(shared_descriptor("ledger"), factory.clone())
        .unwrap();

    container.shutdown();

    assert!(matches!(
        container.proxy(&"ledger".into(), CallPath::Remote),
        Err(CallError::ContainerShutDown { .. })
    ));
    assert!(matches!(
        container.deploy(shared_descriptor("other"), factory.clone()),
        Err(CallError::ContainerShutDown { .. })
    ));
}

#[test]
fn shutdown_is_idempotent() {
    let coordinator = MockCoordinator::new();
    let container = test_container(&coordinator);
    container.shutdown();
    container.shutdown();
    assert_eq!(container.status(), cradle::ContainerStatus::ShutDown);
}
