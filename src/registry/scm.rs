//! Service control manager backend built on `windows-service`.

use std::{ffi::OsString, io};

use log::Level;
use windows_service::{
    service::{
        Service, ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType, ServiceType,
    },
    service_manager::{ServiceManager, ServiceManagerAccess},
};

use super::{
    ErrorControl, RegistryError, ServiceConfig, ServiceHandle, ServiceKind, ServiceRegistry,
    ServiceSpec, StartType,
};
use crate::error::{LddrvError, ServiceOp};

const ERROR_ACCESS_DENIED: i32 = 5;
const ERROR_SERVICE_MARKED_FOR_DELETE: i32 = 1072;
const ERROR_SERVICE_EXISTS: i32 = 1073;
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

impl From<windows_service::Error> for RegistryError {
    fn from(e: windows_service::Error) -> Self {
        match e {
            windows_service::Error::Winapi(io) => RegistryError::from(io),
            other => RegistryError::Backend(Box::new(other)),
        }
    }
}

impl From<io::Error> for RegistryError {
    fn from(e: io::Error) -> Self {
        match e.raw_os_error() {
            Some(ERROR_SERVICE_DOES_NOT_EXIST) => RegistryError::NotFound,
            Some(ERROR_SERVICE_EXISTS) => RegistryError::AlreadyExists,
            Some(ERROR_SERVICE_MARKED_FOR_DELETE) => RegistryError::MarkedForDelete,
            Some(ERROR_ACCESS_DENIED) => RegistryError::AccessDenied,
            _ => RegistryError::Os(e),
        }
    }
}

fn to_start_type(start: StartType) -> ServiceStartType {
    match start {
        StartType::Boot => ServiceStartType::BootStart,
        StartType::System => ServiceStartType::SystemStart,
        StartType::Auto => ServiceStartType::AutoStart,
        StartType::Manual => ServiceStartType::OnDemand,
        StartType::Disabled => ServiceStartType::Disabled,
    }
}

fn from_start_type(start: ServiceStartType) -> StartType {
    match start {
        ServiceStartType::BootStart => StartType::Boot,
        ServiceStartType::SystemStart => StartType::System,
        ServiceStartType::AutoStart => StartType::Auto,
        ServiceStartType::OnDemand => StartType::Manual,
        ServiceStartType::Disabled => StartType::Disabled,
    }
}

fn to_error_control(control: ErrorControl) -> ServiceErrorControl {
    match control {
        ErrorControl::Ignore => ServiceErrorControl::Ignore,
        ErrorControl::Normal => ServiceErrorControl::Normal,
        ErrorControl::Severe => ServiceErrorControl::Severe,
        ErrorControl::Critical => ServiceErrorControl::Critical,
    }
}

fn from_error_control(control: ServiceErrorControl) -> ErrorControl {
    match control {
        ServiceErrorControl::Ignore => ErrorControl::Ignore,
        ServiceErrorControl::Normal => ErrorControl::Normal,
        ServiceErrorControl::Severe => ErrorControl::Severe,
        ServiceErrorControl::Critical => ErrorControl::Critical,
    }
}

/// Connection to the local service control manager.
pub struct ScmRegistry {
    manager: ServiceManager,
}

impl ScmRegistry {
    /// Connect with the rights needed to create services.
    pub fn connect() -> Result<Self, LddrvError> {
        let access = ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE;
        let manager = ServiceManager::local_computer(None::<&str>, access)
            .map_err(|e| LddrvError::service(ServiceOp::Connect, "ServicesActive", e.into()))?;
        lddrv_log!(Level::Debug, "registry", "connected to the service control manager");
        Ok(Self { manager })
    }
}

pub struct ScmServiceHandle {
    name: String,
    service: Service,
}

impl ServiceHandle for ScmServiceHandle {
    fn name(&self) -> &str {
        &self.name
    }

    /// `windows-service` only hands out handles that opened successfully and
    /// closes them on drop.
    fn is_valid(&self) -> bool {
        true
    }

    fn query_config(&self) -> Result<ServiceConfig, RegistryError> {
        let config = self.service.query_config()?;
        Ok(ServiceConfig {
            service_type: ServiceKind::from_bits(config.service_type.bits()),
            start_type: from_start_type(config.start_type),
            error_control: from_error_control(config.error_control),
            binary_path: config.executable_path,
            display_name: config.display_name.to_string_lossy().into_owned(),
        })
    }
}

impl ServiceRegistry for ScmRegistry {
    type Handle = ScmServiceHandle;

    fn create_service(&self, spec: &ServiceSpec) -> Result<Self::Handle, RegistryError> {
        let info = ServiceInfo {
            name: OsString::from(&spec.name),
            display_name: OsString::from(&spec.display_name),
            service_type: ServiceType::from_bits_truncate(spec.service_type.bits()),
            start_type: to_start_type(spec.start_type),
            error_control: to_error_control(spec.error_control),
            executable_path: spec.binary_path.clone(),
            launch_arguments: vec![],
            dependencies: vec![],
            account_name: None,
            account_password: None,
        };
        let service = self.manager.create_service(&info, ServiceAccess::all())?;
        Ok(ScmServiceHandle { name: spec.name.clone(), service })
    }

    fn open_service(&self, name: &str) -> Result<Self::Handle, RegistryError> {
        let service = self.manager.open_service(name, ServiceAccess::all())?;
        Ok(ScmServiceHandle { name: name.into(), service })
    }

    fn delete_service(&self, handle: Self::Handle) -> Result<(), RegistryError> {
        handle.service.delete()?;
        Ok(())
    }
}
