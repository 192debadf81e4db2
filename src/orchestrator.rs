//! Create-and-load / unload-and-delete workflows.
//!
//! Each workflow walks a service through a short state machine:
//!
//!   create: NonExistent → Registered → Loaded
//!   delete: Registered (maybe loaded) → Unloaded → Deleted
//!
//! A failure before any service state changed aborts with `Err`. Once the
//! registry has been touched the workflow always returns a
//! [`WorkflowReport`] carrying the state it ended in and every failure seen
//! on the way, so partial results are reported, never swallowed.

use std::path::Path;

use log::Level;

use crate::cli::{Invocation, Operation};
use crate::error::{LddrvError, ServiceOp};
use crate::native::{DriverServiceIdentity, NativeDriverInterface};
use crate::registry::{RegistryError, ServiceHandle, ServiceKind, ServiceRegistry, ServiceSpec};

/// Where a driver service stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    NonExistent,
    Registered,
    Loaded,
    Unloaded,
    /// Entry removed; equivalent to `NonExistent` for the next run.
    Deleted,
}

/// Outcome of a workflow that got past its first registry call.
#[derive(Debug)]
pub struct WorkflowReport {
    pub operation: Operation,
    pub state: DriverState,
    pub failures: Vec<LddrvError>,
}

impl WorkflowReport {
    fn new(operation: Operation, state: DriverState) -> Self {
        Self { operation, state, failures: Vec::new() }
    }

    /// Every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequences registry operations with native driver calls.
pub struct DriverOrchestrator<'a, R, N> {
    registry: &'a R,
    native: &'a N,
    display_name: String,
}

impl<'a, R, N> DriverOrchestrator<'a, R, N>
where
    R: ServiceRegistry,
    N: NativeDriverInterface,
{
    pub fn new(registry: &'a R, native: &'a N, display_name: impl Into<String>) -> Self {
        Self { registry, native, display_name: display_name.into() }
    }

    /// Run the workflow the command line asked for.
    pub fn run(&self, invocation: &Invocation) -> Result<WorkflowReport, LddrvError> {
        match invocation.operation {
            Operation::Create => self.create(&invocation.identity, &invocation.bin_path),
            Operation::Delete => self.delete(&invocation.identity),
        }
    }

    /// Register `identity` as a kernel driver pointing at `bin_path`, then
    /// load it. A failed load leaves the entry registered.
    pub fn create(
        &self,
        identity: &DriverServiceIdentity,
        bin_path: &Path,
    ) -> Result<WorkflowReport, LddrvError> {
        let name = identity.name();
        lddrv_log!(Level::Info, "orchestrator", "Creating driver service '{}' for {}...", name, bin_path.display());

        let spec = ServiceSpec::kernel_driver(name, &self.display_name, bin_path.to_path_buf());
        let handle = self
            .registry
            .create_service(&spec)
            .map_err(|e| LddrvError::service(ServiceOp::Create, name, e))?;
        if !handle.is_valid() {
            return Err(LddrvError::service(ServiceOp::Create, name, RegistryError::InvalidHandle));
        }
        lddrv_log!(Level::Info, "orchestrator", "Driver service was created successfully!");

        let mut report = WorkflowReport::new(Operation::Create, DriverState::Registered);

        lddrv_log!(Level::Info, "orchestrator", "Attempting to load driver...");
        match self.native.load_driver(identity) {
            Ok(()) => {
                report.state = DriverState::Loaded;
                lddrv_log!(Level::Info, "orchestrator", "Driver was loaded successfully!");
            }
            Err(e) => {
                lddrv_log!(Level::Error, "orchestrator", "Failed to load driver: {}", e);
                lddrv_log!(
                    Level::Warn,
                    "orchestrator",
                    "service '{}' stays registered but is not loaded; remove it with -operation delete",
                    name
                );
                report.failures.push(e);
            }
        }
        Ok(report)
    }

    /// Unload and remove a kernel-driver service. Services of any other type
    /// are left untouched. The entry is removed even when the unload fails.
    pub fn delete(&self, identity: &DriverServiceIdentity) -> Result<WorkflowReport, LddrvError> {
        let name = identity.name();

        let handle = self
            .registry
            .open_service(name)
            .map_err(|e| LddrvError::service(ServiceOp::Open, name, e))?;
        let config = handle.query_config().map_err(|e| {
            lddrv_log!(Level::Error, "orchestrator", "Unable to retrieve critical service information...");
            LddrvError::service(ServiceOp::QueryConfig, name, e)
        })?;

        if !handle.is_valid() {
            return Err(LddrvError::service(ServiceOp::Open, name, RegistryError::InvalidHandle));
        }
        if config.service_type != ServiceKind::KernelDriver {
            lddrv_log!(Level::Error, "orchestrator", "Unable to remove the driver service.");
            return Err(LddrvError::ServiceTypeMismatch {
                name: name.into(),
                found: config.service_type.bits(),
            });
        }

        let mut report = WorkflowReport::new(Operation::Delete, DriverState::Registered);

        lddrv_log!(Level::Info, "orchestrator", "Unloading driver...");
        match self.native.unload_driver(identity) {
            Ok(()) => {
                report.state = DriverState::Unloaded;
                lddrv_log!(Level::Info, "orchestrator", "Driver was unloaded successfully!");
            }
            Err(e) => {
                lddrv_log!(Level::Warn, "orchestrator", "Failed to unload driver, removing the service anyway: {}", e);
                report.failures.push(e);
            }
        }

        lddrv_log!(Level::Info, "orchestrator", "Removing driver service...");
        match self.registry.delete_service(handle) {
            Ok(()) => {
                report.state = DriverState::Deleted;
                lddrv_log!(Level::Info, "orchestrator", "Driver service was removed successfully!");
            }
            Err(e) => {
                lddrv_log!(Level::Error, "orchestrator", "Unable to remove the driver service: {}", e);
                report.failures.push(LddrvError::service(ServiceOp::Delete, name, e));
            }
        }
        Ok(report)
    }
}
