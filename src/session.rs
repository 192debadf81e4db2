//! One run of the tool, start to finish.
//!
//! 1. Enable the driver-load privilege (nothing else happens without it)
//! 2. Connect to the service registry
//! 3. Resolve the native entry points
//! 4. Run the requested workflow
//! 5. Clear the entry points, whatever happened in 3 or 4

use log::Level;

use crate::cli::Invocation;
use crate::config::ServiceSettings;
use crate::error::LddrvError;
use crate::native::{NativeDriverInterface, NativeSession};
use crate::orchestrator::{DriverOrchestrator, WorkflowReport};
use crate::privilege::PrivilegeElevator;
use crate::registry::ServiceRegistry;

/// Execute `invocation` with the given collaborators. `connect` is only
/// called once the privilege is held.
pub fn execute<P, N, R, C>(
    invocation: &Invocation,
    settings: &ServiceSettings,
    elevator: &mut P,
    native: &mut N,
    connect: C,
) -> Result<WorkflowReport, LddrvError>
where
    P: PrivilegeElevator,
    N: NativeDriverInterface,
    R: ServiceRegistry,
    C: FnOnce() -> Result<R, LddrvError>,
{
    lddrv_log!(Level::Info, "session", "Obtaining required privileges...");
    if let Err(e) = elevator.acquire_load_driver_privilege() {
        lddrv_log!(Level::Error, "session", "Unable to gain required privileges: {}", e);
        return Err(e);
    }
    lddrv_log!(Level::Info, "session", "Successfully obtained the privileges!");

    let registry = connect()?;

    lddrv_log!(Level::Info, "session", "Initialising driver interface...");
    let session = NativeSession::open(native).inspect_err(|e| {
        lddrv_log!(Level::Error, "session", "Unable to initialise the driver interface: {}", e);
    })?;
    lddrv_log!(Level::Debug, "session", "driver interface ready");

    let orchestrator = DriverOrchestrator::new(&registry, &*session, settings.display_name.as_str());
    orchestrator.run(invocation)
}
