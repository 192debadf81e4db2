//! Service-registry collaborator: create, open, query and delete service
//! entries.
//!
//! The orchestrator only talks to [`ServiceRegistry`]; the Windows SCM
//! backend lives in [`scm`], and [`memory`] keeps entries in process for
//! tests.

pub mod memory;
#[cfg(windows)]
pub mod scm;

use std::{error::Error as StdError, io, path::PathBuf};
use thiserror::Error;

pub use memory::{InMemoryRegistry, RegistryCall};
#[cfg(windows)]
pub use scm::ScmRegistry;

/// Display name used when the configuration does not provide one.
pub const DEFAULT_DISPLAY_NAME: &str = "Driver Display Name";

/// `dwServiceType` of a service entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    KernelDriver,
    FileSystemDriver,
    OwnProcess,
    ShareProcess,
    Other(u32),
}

impl ServiceKind {
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            0x1 => ServiceKind::KernelDriver,
            0x2 => ServiceKind::FileSystemDriver,
            0x10 => ServiceKind::OwnProcess,
            0x20 => ServiceKind::ShareProcess,
            other => ServiceKind::Other(other),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            ServiceKind::KernelDriver => 0x1,
            ServiceKind::FileSystemDriver => 0x2,
            ServiceKind::OwnProcess => 0x10,
            ServiceKind::ShareProcess => 0x20,
            ServiceKind::Other(bits) => bits,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    Boot,
    System,
    Auto,
    Manual,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorControl {
    Ignore,
    Normal,
    Severe,
    Critical,
}

/// What the registry reports about an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service_type: ServiceKind,
    pub start_type: StartType,
    pub error_control: ErrorControl,
    pub binary_path: PathBuf,
    pub display_name: String,
}

/// A request to register a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub display_name: String,
    pub service_type: ServiceKind,
    pub start_type: StartType,
    pub error_control: ErrorControl,
    pub binary_path: PathBuf,
}

impl ServiceSpec {
    /// Kernel driver, started on demand, normal error control.
    pub fn kernel_driver(name: &str, display_name: &str, binary_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            service_type: ServiceKind::KernelDriver,
            start_type: StartType::Manual,
            error_control: ErrorControl::Normal,
            binary_path,
        }
    }

    pub fn to_config(&self) -> ServiceConfig {
        ServiceConfig {
            service_type: self.service_type,
            start_type: self.start_type,
            error_control: self.error_control,
            binary_path: self.binary_path.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("the service does not exist")]
    NotFound,

    #[error("the service already exists")]
    AlreadyExists,

    #[error("the service is marked for deletion")]
    MarkedForDelete,

    #[error("access denied")]
    AccessDenied,

    #[error("the service handle is not valid")]
    InvalidHandle,

    #[error("{0}")]
    Os(#[source] io::Error),

    #[error("{0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

/// An open service entry.
pub trait ServiceHandle {
    fn name(&self) -> &str;

    /// Whether the handle can still be used.
    fn is_valid(&self) -> bool;

    fn query_config(&self) -> Result<ServiceConfig, RegistryError>;
}

pub trait ServiceRegistry {
    type Handle: ServiceHandle;

    fn create_service(&self, spec: &ServiceSpec) -> Result<Self::Handle, RegistryError>;

    /// Open with full access.
    fn open_service(&self, name: &str) -> Result<Self::Handle, RegistryError>;

    /// Delete the entry and release the handle.
    fn delete_service(&self, handle: Self::Handle) -> Result<(), RegistryError>;
}
