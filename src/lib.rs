// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

#[macro_use]
pub mod macros;

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod native;
pub mod orchestrator;
pub mod privilege;
pub mod registry;
pub mod session;

pub use error::{LddrvError, Stage};
