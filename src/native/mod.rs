//! Native driver load/unload interface.
//!
//! The kernel only understands a driver by the registry path of its service
//! entry, handed over as a counted string. [`NativeDriverInterface`] hides how
//! the two entry points are obtained; [`NativeSession`] ties their lifetime
//! to a scope so they are cleared on every exit path.

pub mod counted;
#[cfg(windows)]
pub mod ntdll;
pub mod scripted;

use std::{fmt, ops::Deref};

use crate::cli::{ArgumentError, MAX_SERVICE_NAME_UNITS};
use crate::error::{LddrvError, NativeCall};

pub use counted::{CountedString, CountedStringError, RawCountedString};
#[cfg(windows)]
pub use ntdll::NtdllDriverInterface;
pub use scripted::ScriptedNativeDriver;

/// Prefix every driver service path must carry.
pub const REGISTRY_SERVICES_PREFIX: &str = r"\Registry\Machine\SYSTEM\CurrentControlSet\Services\";

/// Status returned by a native routine: zero is success, anything else is a
/// failure that is reported verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    pub const SUCCESS: NativeStatus = NativeStatus(0);

    #[inline]
    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

/// Logical name of a driver service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverServiceIdentity {
    name: String,
}

impl DriverServiceIdentity {
    /// Validate a service name. Path separators are refused so the derived
    /// registry path can never leave the `Services` key.
    pub fn new(name: &str) -> Result<Self, ArgumentError> {
        if name.is_empty() || name.contains(['\\', '/']) {
            return Err(ArgumentError::InvalidServiceName(name.into()));
        }
        let units = name.encode_utf16().count();
        if units > MAX_SERVICE_NAME_UNITS {
            return Err(ArgumentError::ServiceNameTooLong(units));
        }
        Ok(Self { name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `\Registry\Machine\SYSTEM\CurrentControlSet\Services\<name>`
    pub fn registry_path(&self) -> String {
        format!("{REGISTRY_SERVICES_PREFIX}{}", self.name)
    }

    /// The registry path in the shape the native routines take.
    pub fn counted_registry_path(&self) -> Result<CountedString, CountedStringError> {
        CountedString::new(&self.registry_path())
    }
}

impl fmt::Display for DriverServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Loads and unloads drivers through the native entry points.
///
/// `load_driver`/`unload_driver` must only be called between a successful
/// `initialise` and the next `shutdown`; implementations report a call
/// outside that window as a resolution error.
pub trait NativeDriverInterface {
    /// Resolve both entry points.
    fn initialise(&mut self) -> Result<(), LddrvError>;

    fn load_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError>;

    fn unload_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError>;

    /// Forget both entry points. Idempotent.
    fn shutdown(&mut self);
}

/// Turns a routine's status into the crate's result shape.
pub(crate) fn check_status(
    call: NativeCall,
    path: &CountedString,
    status: NativeStatus,
) -> Result<(), LddrvError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(LddrvError::NativeCall { call, path: path.to_string(), status })
    }
}

/// An initialised driver interface, shut down when dropped.
pub struct NativeSession<'a, N: NativeDriverInterface> {
    inner: &'a mut N,
}

impl<'a, N: NativeDriverInterface> NativeSession<'a, N> {
    /// Initialise `native`; on failure it is shut down again before the
    /// error is returned.
    pub fn open(native: &'a mut N) -> Result<Self, LddrvError> {
        if let Err(e) = native.initialise() {
            native.shutdown();
            return Err(e);
        }
        Ok(Self { inner: native })
    }
}

impl<N: NativeDriverInterface> Deref for NativeSession<'_, N> {
    type Target = N;

    fn deref(&self) -> &N {
        self.inner
    }
}

impl<N: NativeDriverInterface> Drop for NativeSession<'_, N> {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}
