// src/main.rs

//! lddrv entry-point.
//!
//! 1. Parse the command line (a malformed one stops everything here)
//! 2. Load `lddrv.toml` & set up structured logging
//! 3. Enable SeLoadDriverPrivilege, connect to the SCM, resolve ntdll
//! 4. Run the create or delete workflow
//! 5. Translate the outcome into an OS exit code

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::Context;
use chrono::Local;
use log::Level;
use std::{
    env,
    path::{Path, PathBuf},
    process,
};

// ───── local imports ────────────────────────────────────────────────────────
use lddrv::cli::{self, Invocation};
use lddrv::config::{self, CONFIG_FILE, Config};
use lddrv::error::{EXIT_FAILURE, EXIT_INVALID_PARAMETER, EXIT_SUCCESS, LddrvError};
use lddrv::orchestrator::WorkflowReport;
use lddrv::{lddrv_log, logging};

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process with `code`.
/// Only used before logging is configured.
macro_rules! fatal {
    ($code:expr, $ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit($code);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> anyhow::Result<PathBuf> {
    let exe = env::current_exe().context("cannot determine exe path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable must live in some directory")
}

/// Load `lddrv.toml` next to the executable and install the logger.
fn bootstrap() -> anyhow::Result<Config> {
    let exe_dir = exe_dir()?;
    let cfg_path = exe_dir.join(CONFIG_FILE);
    let cfg = config::load_or_default(&cfg_path)
        .with_context(|| format!("reading {}", cfg_path.display()))?;
    logging::setup(&exe_dir, &cfg.logging).context("logging setup failed")?;
    Ok(cfg)
}

#[cfg(windows)]
fn run(invocation: &Invocation, cfg: &Config) -> Result<WorkflowReport, LddrvError> {
    use lddrv::native::NtdllDriverInterface;
    use lddrv::privilege::TokenPrivilegeElevator;
    use lddrv::registry::ScmRegistry;

    let mut elevator = TokenPrivilegeElevator::new();
    let mut native = NtdllDriverInterface::new();
    lddrv::session::execute(invocation, &cfg.service, &mut elevator, &mut native, ScmRegistry::connect)
}

#[cfg(not(windows))]
fn run(_invocation: &Invocation, _cfg: &Config) -> Result<WorkflowReport, LddrvError> {
    use lddrv::error::{NativeCall, ResolutionFailure};

    Err(LddrvError::Resolution {
        symbol: NativeCall::Load.symbol(),
        reason: ResolutionFailure::ModuleMissing("ntdll.dll"),
    })
}

/// Log the outcome and pick the exit code.
fn conclude(outcome: Result<WorkflowReport, LddrvError>) -> i32 {
    match outcome {
        Ok(report) if report.is_clean() => {
            lddrv_log!(Level::Info, "main", "{:?} finished, driver service is {:?}", report.operation, report.state);
            EXIT_SUCCESS
        }
        Ok(report) => {
            for failure in &report.failures {
                lddrv_log!(Level::Error, "main", "[{}] {}", failure.stage(), failure);
            }
            lddrv_log!(
                Level::Warn,
                "main",
                "{:?} partially failed, driver service is {:?}",
                report.operation,
                report.state
            );
            EXIT_FAILURE
        }
        Err(e) => {
            lddrv_log!(Level::Error, "main", "[{}] {}", e.stage(), e);
            e.exit_code()
        }
    }
}

fn main() {
    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let invocation = Invocation::parse(&args)
        .unwrap_or_else(|e| fatal!(EXIT_INVALID_PARAMETER, "arguments", "{}\n{}", e, cli::usage()));

    let cfg = bootstrap().unwrap_or_else(|e| fatal!(EXIT_FAILURE, "bootstrap", "{:#}", e));

    lddrv_log!(
        Level::Info,
        "main",
        "lddrv - Load Driver command-line utility [Version {}] started at {}",
        env!("CARGO_PKG_VERSION"),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let code = conclude(run(&invocation, &cfg));
    log::logger().flush();
    process::exit(code);
}
