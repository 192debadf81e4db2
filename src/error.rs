//! Error taxonomy shared by every stage of a run.
//!
//! Each variant of [`LddrvError`] belongs to exactly one [`Stage`], which is
//! what the operator sees when something fails and what decides the exit
//! code of the process.

use std::{fmt, io};
use thiserror::Error;

use crate::cli::ArgumentError;
use crate::config::ConfigError;
use crate::native::{CountedStringError, NativeStatus};
use crate::registry::RegistryError;

/// `ERROR_SUCCESS`
pub const EXIT_SUCCESS: i32 = 0;
/// `ERROR_INVALID_PARAMETER`
pub const EXIT_INVALID_PARAMETER: i32 = 87;
/// `E_FAIL`
pub const EXIT_FAILURE: i32 = 0x8000_4005_u32 as i32;

/// Which part of a run produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Arguments,
    Configuration,
    Privilege,
    Resolution,
    ServiceRegistry,
    NativeCall,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Arguments => "arguments",
            Stage::Configuration => "configuration",
            Stage::Privilege => "privilege",
            Stage::Resolution => "native resolution",
            Stage::ServiceRegistry => "service registry",
            Stage::NativeCall => "native call",
        })
    }
}

/// Why the driver-load privilege could not be enabled.
#[derive(Debug, Error)]
pub enum PrivilegeFailure {
    #[error("cannot open process token: {0}")]
    OpenToken(#[source] io::Error),

    #[error("cannot resolve privilege name: {0}")]
    Lookup(#[source] io::Error),

    #[error("cannot apply privileges to the process access token: {0}")]
    Adjust(#[source] io::Error),

    #[error("the token does not hold the privilege, nothing was adjusted")]
    NotAssigned,

    #[error("privilege refused")]
    Refused,
}

/// Why a native entry point is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("module `{0}` is not mapped into the process")]
    ModuleMissing(&'static str),

    #[error("symbol not exported")]
    SymbolMissing,

    #[error("driver interface used before initialisation")]
    NotInitialised,
}

/// Which service-registry call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOp {
    Connect,
    Create,
    Open,
    QueryConfig,
    Delete,
}

impl fmt::Display for ServiceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceOp::Connect => "connect to",
            ServiceOp::Create => "create",
            ServiceOp::Open => "open",
            ServiceOp::QueryConfig => "query the configuration of",
            ServiceOp::Delete => "delete",
        })
    }
}

/// Which native entry point returned a failure status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCall {
    Load,
    Unload,
}

impl NativeCall {
    pub fn symbol(self) -> &'static str {
        match self {
            NativeCall::Load => "NtLoadDriver",
            NativeCall::Unload => "NtUnloadDriver",
        }
    }
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// All the ways a run can go wrong.
#[derive(Debug, Error)]
pub enum LddrvError {
    #[error("unable to enable {privilege}: {reason}")]
    Privilege {
        privilege: &'static str,
        #[source]
        reason: PrivilegeFailure,
    },

    #[error("unable to resolve `{symbol}`: {reason}")]
    Resolution {
        symbol: &'static str,
        #[source]
        reason: ResolutionFailure,
    },

    #[error("unable to {op} service '{name}': {source}")]
    Service {
        op: ServiceOp,
        name: String,
        #[source]
        source: RegistryError,
    },

    #[error("service '{name}' is not a kernel driver (type {found:#x}), refusing to unload or delete it")]
    ServiceTypeMismatch { name: String, found: u32 },

    #[error("{call} failed for '{path}' with status {status}")]
    NativeCall {
        call: NativeCall,
        path: String,
        status: NativeStatus,
    },

    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LddrvError {
    pub fn stage(&self) -> Stage {
        match self {
            LddrvError::Privilege { .. } => Stage::Privilege,
            LddrvError::Resolution { .. } => Stage::Resolution,
            LddrvError::Service { .. } | LddrvError::ServiceTypeMismatch { .. } => {
                Stage::ServiceRegistry
            }
            LddrvError::NativeCall { .. } => Stage::NativeCall,
            LddrvError::Argument(_) => Stage::Arguments,
            LddrvError::Config(_) => Stage::Configuration,
        }
    }

    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Stage::Arguments => EXIT_INVALID_PARAMETER,
            _ => EXIT_FAILURE,
        }
    }

    pub(crate) fn service(op: ServiceOp, name: &str, source: RegistryError) -> Self {
        LddrvError::Service { op, name: name.to_owned(), source }
    }
}

impl From<CountedStringError> for LddrvError {
    fn from(e: CountedStringError) -> Self {
        match e {
            CountedStringError::TooLong(units) => {
                LddrvError::Argument(ArgumentError::ServiceNameTooLong(units))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_errors_exit_with_invalid_parameter() {
        let err = LddrvError::from(ArgumentError::Missing("-svcname"));
        assert_eq!(err.stage(), Stage::Arguments);
        assert_eq!(err.exit_code(), 87);
    }

    #[test]
    fn everything_else_exits_with_e_fail() {
        let err = LddrvError::NativeCall {
            call: NativeCall::Load,
            path: r"\Registry\Machine\SYSTEM\CurrentControlSet\Services\x".into(),
            status: NativeStatus(0xC000_0022_u32 as i32),
        };
        assert_eq!(err.stage(), Stage::NativeCall);
        assert_eq!(err.exit_code() as u32, 0x8000_4005);
        assert!(err.to_string().contains("NtLoadDriver"));
        assert!(err.to_string().contains("0xc0000022"));
    }
}
