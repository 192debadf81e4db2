//! `NtLoadDriver` / `NtUnloadDriver` resolved from ntdll at runtime.
//!
//! Neither routine is part of a documented import library, so both are
//! looked up by name in the already-mapped `ntdll.dll`.

use std::{ffi::OsStr, mem, os::windows::prelude::OsStrExt};

use log::Level;
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

use crate::error::{LddrvError, NativeCall, ResolutionFailure};
use crate::native::{
    DriverServiceIdentity, NativeDriverInterface, NativeStatus, RawCountedString, check_status,
};

const NTDLL: &str = "ntdll.dll";

/// `NTSTATUS NTAPI NtLoadDriver(PUNICODE_STRING DriverServiceName)`, and the
/// same shape for `NtUnloadDriver`.
type DriverRoutine = unsafe extern "system" fn(*mut RawCountedString) -> i32;

#[derive(Debug, Default)]
pub struct NtdllDriverInterface {
    load: Option<DriverRoutine>,
    unload: Option<DriverRoutine>,
}

impl NtdllDriverInterface {
    pub fn new() -> Self {
        Self::default()
    }

    fn routine(&self, call: NativeCall) -> Result<DriverRoutine, LddrvError> {
        let slot = match call {
            NativeCall::Load => self.load,
            NativeCall::Unload => self.unload,
        };
        slot.ok_or(LddrvError::Resolution {
            symbol: call.symbol(),
            reason: ResolutionFailure::NotInitialised,
        })
    }

    fn invoke(&self, call: NativeCall, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        let routine = self.routine(call)?;
        let mut path = identity.counted_registry_path()?;
        lddrv_log!(Level::Debug, "native", "{} ({} bytes): {}", call, path.byte_len(), path);

        // SAFETY: `routine` was exported by ntdll under this name and takes a
        // single counted string; `path` outlives the call.
        let status = NativeStatus(unsafe { routine(path.as_mut_ptr()) });
        check_status(call, &path, status)
    }
}

/// Look up `symbol` in `module` and reinterpret it as a driver routine.
fn resolve(
    module: windows_sys::Win32::Foundation::HMODULE,
    call: NativeCall,
) -> Result<DriverRoutine, LddrvError> {
    let name: Vec<u8> = call.symbol().bytes().chain(Some(0)).collect();

    // SAFETY: `module` is a live module handle and `name` is NUL-terminated.
    let proc = unsafe { GetProcAddress(module, name.as_ptr()) };
    match proc {
        // SAFETY: both exports have the `DriverRoutine` signature.
        Some(proc) => Ok(unsafe { mem::transmute::<_, DriverRoutine>(proc) }),
        None => Err(LddrvError::Resolution {
            symbol: call.symbol(),
            reason: ResolutionFailure::SymbolMissing,
        }),
    }
}

impl NativeDriverInterface for NtdllDriverInterface {
    fn initialise(&mut self) -> Result<(), LddrvError> {
        let wide: Vec<u16> = OsStr::new(NTDLL).encode_wide().chain(Some(0)).collect();

        // ntdll is mapped into every process, no reference count is taken.
        let module = unsafe { GetModuleHandleW(wide.as_ptr()) };
        if module.is_null() {
            return Err(LddrvError::Resolution {
                symbol: NativeCall::Load.symbol(),
                reason: ResolutionFailure::ModuleMissing(NTDLL),
            });
        }

        self.load = Some(resolve(module, NativeCall::Load)?);
        self.unload = Some(resolve(module, NativeCall::Unload)?);
        lddrv_log!(Level::Debug, "native", "resolved NtLoadDriver and NtUnloadDriver from {}", NTDLL);
        Ok(())
    }

    fn load_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        self.invoke(NativeCall::Load, identity)
    }

    fn unload_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        self.invoke(NativeCall::Unload, identity)
    }

    fn shutdown(&mut self) {
        self.load = None;
        self.unload = None;
    }
}
