// tests/orchestrator.rs

//! Workflow scenarios run against the in-memory registry and the scripted
//! driver interface.

use std::path::PathBuf;

use lddrv::cli::{Invocation, Operation};
use lddrv::error::{LddrvError, NativeCall, ServiceOp, Stage};
use lddrv::native::{DriverServiceIdentity, NativeDriverInterface, ScriptedNativeDriver};
use lddrv::orchestrator::{DriverOrchestrator, DriverState};
use lddrv::registry::{
    DEFAULT_DISPLAY_NAME, ErrorControl, InMemoryRegistry, RegistryCall, ServiceConfig, ServiceKind,
    StartType,
};

const TESTDRV_PATH: &str = r"\Registry\Machine\SYSTEM\CurrentControlSet\Services\testdrv";
const STATUS_OBJECT_NAME_NOT_FOUND: i32 = 0xC000_0034_u32 as i32;
const STATUS_PRIVILEGE_NOT_HELD: i32 = 0xC000_0061_u32 as i32;

fn testdrv() -> DriverServiceIdentity {
    DriverServiceIdentity::new("testdrv").unwrap()
}

fn bin_path() -> PathBuf {
    PathBuf::from(r"C:\drivers\testdrv.sys")
}

/// Initialised scripted driver.
fn ready(mut native: ScriptedNativeDriver) -> ScriptedNativeDriver {
    native.initialise().unwrap();
    native
}

fn config_of(kind: ServiceKind) -> ServiceConfig {
    ServiceConfig {
        service_type: kind,
        start_type: StartType::Manual,
        error_control: ErrorControl::Normal,
        binary_path: bin_path(),
        display_name: DEFAULT_DISPLAY_NAME.into(),
    }
}

#[test]
fn create_registers_and_loads_through_the_services_key() {
    let registry = InMemoryRegistry::new();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let args = ["-operation", "create", "-svcname", "testdrv", "-binpath", r"C:\drivers\testdrv.sys"];
    let invocation = Invocation::parse(&args).unwrap();
    let report = orchestrator.run(&invocation).unwrap();

    assert_eq!(report.operation, Operation::Create);
    assert_eq!(report.state, DriverState::Loaded);
    assert!(report.is_clean());

    let config = registry.config("testdrv").expect("service registered");
    assert_eq!(config.service_type, ServiceKind::KernelDriver);
    assert_eq!(config.start_type, StartType::Manual);
    assert_eq!(config.error_control, ErrorControl::Normal);
    assert_eq!(config.binary_path, bin_path());
    assert_eq!(config.display_name, "Driver Display Name");

    let calls = native.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call, NativeCall::Load);
    assert_eq!(calls[0].path, TESTDRV_PATH);
    assert_eq!(calls[0].length as usize, TESTDRV_PATH.len() * 2);
    assert_eq!(calls[0].maximum_length, calls[0].length + 2);
}

#[test]
fn failed_load_leaves_service_registered() {
    let registry = InMemoryRegistry::new();
    let native = ready(ScriptedNativeDriver::succeeding().with_load_status(STATUS_OBJECT_NAME_NOT_FOUND));
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let report = orchestrator.create(&testdrv(), &bin_path()).unwrap();

    assert_eq!(report.state, DriverState::Registered);
    assert!(registry.contains("testdrv"));
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        LddrvError::NativeCall { call, path, status } => {
            assert_eq!(*call, NativeCall::Load);
            assert_eq!(path, TESTDRV_PATH);
            assert_eq!(status.0, STATUS_OBJECT_NAME_NOT_FOUND);
        }
        other => panic!("expected a native call error, got {other:?}"),
    }
    assert_eq!(report.failures[0].stage(), Stage::NativeCall);
}

#[test]
fn failed_create_never_reaches_the_native_layer() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::KernelDriver));
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let err = orchestrator.create(&testdrv(), &bin_path()).unwrap_err();

    assert!(matches!(err, LddrvError::Service { op: ServiceOp::Create, .. }));
    assert_eq!(err.stage(), Stage::ServiceRegistry);
    assert!(native.calls().is_empty());
}

#[test]
fn invalid_handle_after_create_aborts_before_load() {
    let registry = InMemoryRegistry::new().invalid_handles();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let err = orchestrator.create(&testdrv(), &bin_path()).unwrap_err();

    assert!(matches!(err, LddrvError::Service { op: ServiceOp::Create, .. }));
    assert!(native.calls().is_empty());
}

#[test]
fn create_then_delete_returns_to_nonexistent() {
    let registry = InMemoryRegistry::new();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let created = orchestrator.create(&testdrv(), &bin_path()).unwrap();
    assert_eq!(created.state, DriverState::Loaded);

    let deleted = orchestrator.delete(&testdrv()).unwrap();
    assert_eq!(deleted.state, DriverState::Deleted);
    assert!(deleted.is_clean());
    assert!(!registry.contains("testdrv"));

    let calls: Vec<NativeCall> = native.calls().into_iter().map(|c| c.call).collect();
    assert_eq!(calls, vec![NativeCall::Load, NativeCall::Unload]);
}

#[test]
fn delete_refuses_non_driver_services() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::OwnProcess));
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let args = ["-operation", "delete", "-svcname", "testdrv", "-binpath", "ignored"];
    let err = orchestrator.run(&Invocation::parse(&args).unwrap()).unwrap_err();

    match err {
        LddrvError::ServiceTypeMismatch { ref name, found } => {
            assert_eq!(name, "testdrv");
            assert_eq!(found, 0x10);
        }
        ref other => panic!("expected a type mismatch, got {other:?}"),
    }
    assert_eq!(native.calls_to(NativeCall::Unload), 0);
    assert!(registry.contains("testdrv"));
    assert!(!registry.calls().contains(&RegistryCall::Delete("testdrv".into())));
}

#[test]
fn delete_refuses_file_system_drivers_too() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::FileSystemDriver));
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    assert!(matches!(
        orchestrator.delete(&testdrv()),
        Err(LddrvError::ServiceTypeMismatch { found: 0x2, .. })
    ));
    assert!(native.calls().is_empty());
}

#[test]
fn delete_with_invalid_handle_issues_no_native_call() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::KernelDriver))
        .invalid_handles();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let err = orchestrator.delete(&testdrv()).unwrap_err();

    assert_eq!(err.stage(), Stage::ServiceRegistry);
    assert!(native.calls().is_empty());
    assert!(registry.contains("testdrv"));
}

#[test]
fn unload_failure_does_not_block_removal() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::KernelDriver));
    let native = ready(ScriptedNativeDriver::succeeding().with_unload_status(STATUS_PRIVILEGE_NOT_HELD));
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let report = orchestrator.delete(&testdrv()).unwrap();

    assert_eq!(report.state, DriverState::Deleted);
    assert!(!registry.contains("testdrv"));
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        LddrvError::NativeCall { call: NativeCall::Unload, .. }
    ));
}

#[test]
fn delete_of_missing_service_is_a_registry_error() {
    let registry = InMemoryRegistry::new();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let err = orchestrator.delete(&testdrv()).unwrap_err();

    assert!(matches!(err, LddrvError::Service { op: ServiceOp::Open, .. }));
    assert!(native.calls().is_empty());
}

#[test]
fn unreadable_config_aborts_delete() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::KernelDriver))
        .failing_query("testdrv");
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let err = orchestrator.delete(&testdrv()).unwrap_err();

    assert!(matches!(err, LddrvError::Service { op: ServiceOp::QueryConfig, .. }));
    assert!(native.calls().is_empty());
    assert!(registry.contains("testdrv"));
}

#[test]
fn failed_removal_is_reported_with_last_reached_state() {
    let registry = InMemoryRegistry::new()
        .with_service("testdrv", config_of(ServiceKind::KernelDriver))
        .failing_deletes();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, DEFAULT_DISPLAY_NAME);

    let report = orchestrator.delete(&testdrv()).unwrap();

    assert_eq!(report.state, DriverState::Unloaded);
    assert!(matches!(
        report.failures.as_slice(),
        [LddrvError::Service { op: ServiceOp::Delete, .. }]
    ));
    assert!(registry.contains("testdrv"));
}

#[test]
fn custom_display_name_is_used_for_new_entries() {
    let registry = InMemoryRegistry::new();
    let native = ready(ScriptedNativeDriver::succeeding());
    let orchestrator = DriverOrchestrator::new(&registry, &native, "Test Driver");

    orchestrator.create(&testdrv(), &bin_path()).unwrap();

    assert_eq!(registry.config("testdrv").unwrap().display_name, "Test Driver");
}
