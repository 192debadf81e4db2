//! Global log dispatch: stdout always, a file next to the executable when
//! `[logging] enable = true`.

use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{path::Path, process, thread};

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "lddrv.log";

/// Map a configured level name to a filter; unknown names mean INFO.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Configure global logging as requested in `cfg`.
pub fn setup(exe_dir: &Path, cfg: &LoggingConfig) -> Result<(), fern::InitError> {
    let log_path = cfg
        .enable
        .then(|| exe_dir.join(cfg.file.as_deref().unwrap_or(DEFAULT_LOG_FILE)));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(parse_level(&cfg.level))
        .chain(std::io::stdout());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
