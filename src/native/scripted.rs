//! Driver interface double that returns scripted statuses.
//!
//! Builds the same counted string the real binding would pass, records it,
//! and answers with whatever status the test configured. Lets the workflows
//! run without a kernel underneath.

use std::cell::RefCell;

use crate::error::{LddrvError, NativeCall, ResolutionFailure};
use crate::native::{DriverServiceIdentity, NativeDriverInterface, NativeStatus, check_status};

/// One recorded call into the double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub call: NativeCall,
    pub path: String,
    pub length: u16,
    pub maximum_length: u16,
}

#[derive(Debug)]
pub struct ScriptedNativeDriver {
    resolvable: bool,
    initialised: bool,
    load_status: NativeStatus,
    unload_status: NativeStatus,
    initialise_attempts: usize,
    shutdowns: usize,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedNativeDriver {
    /// Resolves fine and every call returns success.
    pub fn succeeding() -> Self {
        Self {
            resolvable: true,
            initialised: false,
            load_status: NativeStatus::SUCCESS,
            unload_status: NativeStatus::SUCCESS,
            initialise_attempts: 0,
            shutdowns: 0,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// `initialise` fails as if the entry points were not exported.
    pub fn unresolvable() -> Self {
        Self { resolvable: false, ..Self::succeeding() }
    }

    pub fn with_load_status(mut self, status: i32) -> Self {
        self.load_status = NativeStatus(status);
        self
    }

    pub fn with_unload_status(mut self, status: i32) -> Self {
        self.unload_status = NativeStatus(status);
        self
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn initialise_attempts(&self) -> usize {
        self.initialise_attempts
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns
    }

    /// Every load/unload that reached the (pretend) kernel.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, call: NativeCall) -> usize {
        self.calls.borrow().iter().filter(|c| c.call == call).count()
    }

    fn invoke(&self, call: NativeCall, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        if !self.initialised {
            return Err(LddrvError::Resolution {
                symbol: call.symbol(),
                reason: ResolutionFailure::NotInitialised,
            });
        }
        let path = identity.counted_registry_path()?;
        self.calls.borrow_mut().push(RecordedCall {
            call,
            path: path.to_string(),
            length: path.byte_len(),
            maximum_length: path.max_byte_len(),
        });

        let status = match call {
            NativeCall::Load => self.load_status,
            NativeCall::Unload => self.unload_status,
        };
        check_status(call, &path, status)
    }
}

impl NativeDriverInterface for ScriptedNativeDriver {
    fn initialise(&mut self) -> Result<(), LddrvError> {
        self.initialise_attempts += 1;
        if !self.resolvable {
            return Err(LddrvError::Resolution {
                symbol: NativeCall::Load.symbol(),
                reason: ResolutionFailure::SymbolMissing,
            });
        }
        self.initialised = true;
        Ok(())
    }

    fn load_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        self.invoke(NativeCall::Load, identity)
    }

    fn unload_driver(&self, identity: &DriverServiceIdentity) -> Result<(), LddrvError> {
        self.invoke(NativeCall::Unload, identity)
    }

    fn shutdown(&mut self) {
        self.initialised = false;
        self.shutdowns += 1;
    }
}
