use std::{ffi::OsStr, io, os::windows::prelude::OsStrExt, ptr};

use log::Level;
use windows_sys::Win32::{
    Foundation::{CloseHandle, ERROR_NOT_ALL_ASSIGNED, GetLastError, HANDLE, LUID},
    Security::{
        AdjustTokenPrivileges, LUID_AND_ATTRIBUTES, LookupPrivilegeValueW, SE_PRIVILEGE_ENABLED,
        TOKEN_ALL_ACCESS, TOKEN_PRIVILEGES,
    },
    System::Threading::{GetCurrentProcess, OpenProcessToken},
};

use super::{LOAD_DRIVER_PRIVILEGE, PrivilegeElevator, privilege_error};
use crate::error::{LddrvError, PrivilegeFailure};

/// Access token of the current process, closed on drop.
struct TokenHandle(HANDLE);

impl TokenHandle {
    fn open_current_process() -> io::Result<Self> {
        let mut handle: HANDLE = ptr::null_mut();
        // The pseudo-handle from GetCurrentProcess needs no closing.
        let ok = unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_ALL_ACCESS, &mut handle) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(handle))
    }
}

impl Drop for TokenHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

/// Locally-unique identifier of a privilege on this machine.
fn lookup_privilege(name: &str) -> io::Result<LUID> {
    let wide: Vec<u16> = OsStr::new(name).encode_wide().chain(Some(0)).collect();
    let mut luid = LUID { LowPart: 0, HighPart: 0 };
    let ok = unsafe { LookupPrivilegeValueW(ptr::null(), wide.as_ptr(), &mut luid) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(luid)
}

/// Enables the privilege through `AdjustTokenPrivileges`.
#[derive(Debug, Default)]
pub struct TokenPrivilegeElevator;

impl TokenPrivilegeElevator {
    pub fn new() -> Self {
        Self
    }
}

impl PrivilegeElevator for TokenPrivilegeElevator {
    fn acquire_load_driver_privilege(&mut self) -> Result<(), LddrvError> {
        let token = TokenHandle::open_current_process()
            .map_err(|e| privilege_error(PrivilegeFailure::OpenToken(e)))?;

        let luid = lookup_privilege(LOAD_DRIVER_PRIVILEGE)
            .map_err(|e| privilege_error(PrivilegeFailure::Lookup(e)))?;
        lddrv_log!(
            Level::Debug,
            "privilege",
            "{} = {:#x}:{:#x}",
            LOAD_DRIVER_PRIVILEGE,
            luid.HighPart,
            luid.LowPart
        );

        let request = TOKEN_PRIVILEGES {
            PrivilegeCount: 1,
            Privileges: [LUID_AND_ATTRIBUTES { Luid: luid, Attributes: SE_PRIVILEGE_ENABLED }],
        };

        let ok = unsafe {
            AdjustTokenPrivileges(token.0, 0, &request, 0, ptr::null_mut(), ptr::null_mut())
        };
        if ok == 0 {
            return Err(privilege_error(PrivilegeFailure::Adjust(io::Error::last_os_error())));
        }
        // Success with ERROR_NOT_ALL_ASSIGNED means the token never held it.
        if unsafe { GetLastError() } == ERROR_NOT_ALL_ASSIGNED {
            return Err(privilege_error(PrivilegeFailure::NotAssigned));
        }
        Ok(())
    }
}
