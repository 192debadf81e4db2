//! Command-line parsing.
//!
//! Accepts exactly `-svcname <name> -binpath <path> -operation <create|delete>`
//! in any order. Parsing is pure: nothing here touches the OS, so a rejected
//! command line never reaches the service registry or the native layer.

use std::{path::PathBuf, str::FromStr};
use thiserror::Error;

use crate::native::{DriverServiceIdentity, REGISTRY_SERVICES_PREFIX};

pub const FLAG_SVCNAME: &str = "-svcname";
pub const FLAG_BINPATH: &str = "-binpath";
pub const FLAG_OPERATION: &str = "-operation";

const KNOWN_FLAGS: [&str; 3] = [FLAG_SVCNAME, FLAG_BINPATH, FLAG_OPERATION];

/// Longest service name whose registry path still fits a counted string.
pub const MAX_SERVICE_NAME_UNITS: usize =
    (u16::MAX as usize / 2) - 1 - REGISTRY_SERVICES_PREFIX.len();

/// All the ways the command line can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("no arguments provided")]
    Empty,

    #[error("unrecognized argument '{0}'")]
    Unknown(String),

    #[error("'{0}' expects a value")]
    MissingValue(String),

    #[error("value '{value}' of '{flag}' looks like a flag")]
    ValueLooksLikeFlag { flag: String, value: String },

    #[error("'{0}' given more than once")]
    Duplicate(String),

    #[error("required argument '{0}' is missing")]
    Missing(&'static str),

    #[error("unknown operation '{0}', expected 'create' or 'delete'")]
    InvalidOperation(String),

    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("service name is {0} characters long, the limit is {max}", max = MAX_SERVICE_NAME_UNITS)]
    ServiceNameTooLong(usize),
}

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
}

impl FromStr for Operation {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            other => Err(ArgumentError::InvalidOperation(other.into())),
        }
    }
}

/// A fully validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub identity: DriverServiceIdentity,
    pub bin_path: PathBuf,
    pub operation: Operation,
}

impl Invocation {
    /// Parse the arguments that follow the program name.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, ArgumentError> {
        if args.is_empty() {
            return Err(ArgumentError::Empty);
        }

        let mut values: [Option<&str>; 3] = [None; 3];
        let mut iter = args.iter().map(<S as AsRef<str>>::as_ref);

        while let Some(flag) = iter.next() {
            let slot = KNOWN_FLAGS
                .iter()
                .position(|known| *known == flag)
                .ok_or_else(|| ArgumentError::Unknown(flag.into()))?;

            let value = iter
                .next()
                .ok_or_else(|| ArgumentError::MissingValue(flag.into()))?;
            if value.starts_with('-') {
                return Err(ArgumentError::ValueLooksLikeFlag {
                    flag: flag.into(),
                    value: value.into(),
                });
            }
            if values[slot].replace(value).is_some() {
                return Err(ArgumentError::Duplicate(flag.into()));
            }
        }

        let [svcname, binpath, operation] = values;
        let svcname = svcname.ok_or(ArgumentError::Missing(FLAG_SVCNAME))?;
        let binpath = binpath.ok_or(ArgumentError::Missing(FLAG_BINPATH))?;
        let operation = operation.ok_or(ArgumentError::Missing(FLAG_OPERATION))?;

        Ok(Invocation {
            identity: DriverServiceIdentity::new(svcname)?,
            bin_path: PathBuf::from(binpath),
            operation: operation.parse()?,
        })
    }
}

/// One-line usage hint printed on argument errors.
pub fn usage() -> String {
    format!("usage: lddrv {FLAG_SVCNAME} <name> {FLAG_BINPATH} <path> {FLAG_OPERATION} <create|delete>")
}
