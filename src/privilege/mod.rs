//! Enabling the driver-load privilege on the process token.

#[cfg(windows)]
mod token;

use std::cell::Cell;

use crate::error::{LddrvError, PrivilegeFailure};

#[cfg(windows)]
pub use token::TokenPrivilegeElevator;

/// OS name of the privilege needed by `NtLoadDriver`/`NtUnloadDriver`.
pub const LOAD_DRIVER_PRIVILEGE: &str = "SeLoadDriverPrivilege";

/// Acquires the one privilege this tool needs.
pub trait PrivilegeElevator {
    /// Enable [`LOAD_DRIVER_PRIVILEGE`] for the current process. A request
    /// the OS accepts without actually enabling the privilege is an error.
    fn acquire_load_driver_privilege(&mut self) -> Result<(), LddrvError>;
}

pub(crate) fn privilege_error(reason: PrivilegeFailure) -> LddrvError {
    LddrvError::Privilege { privilege: LOAD_DRIVER_PRIVILEGE, reason }
}

/// Elevator double: grants or refuses, and counts how often it was asked.
#[derive(Debug)]
pub struct ScriptedElevator {
    grant: bool,
    attempts: Cell<usize>,
}

impl ScriptedElevator {
    pub fn granting() -> Self {
        Self { grant: true, attempts: Cell::new(0) }
    }

    pub fn refusing() -> Self {
        Self { grant: false, attempts: Cell::new(0) }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl PrivilegeElevator for ScriptedElevator {
    fn acquire_load_driver_privilege(&mut self) -> Result<(), LddrvError> {
        self.attempts.set(self.attempts.get() + 1);
        if self.grant {
            Ok(())
        } else {
            Err(privilege_error(PrivilegeFailure::Refused))
        }
    }
}
