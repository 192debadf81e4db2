/// Logs a line tagged with the component that produced it.
///
/// The component becomes the `log` target, so the fern dispatch prints it in
/// the `[target]` slot next to the level, pid and tid.
/// Usage:
/// ```rust
/// use log::Level;
/// lddrv::lddrv_log!(Level::Info, "native", "Driver was loaded successfully!");
/// lddrv::lddrv_log!(Level::Error, "registry", "open failed: {}", "not found");
/// ```
/// Logs like:
/// [2026-10-19T16:32:10+02:00][INFO ][native][pid=4568][tid=ThreadId(1)] Driver was loaded successfully!
#[macro_export]
macro_rules! lddrv_log {
    ($level:expr, $component:expr, $($arg:tt)+) => {
        ::log::log!(target: $component, $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    /// A tiny in-memory logger that captures up to DEBUG.
    struct MemoryLogger {
        buffer: Mutex<String>,
    }

    impl MemoryLogger {
        const fn new() -> Self {
            MemoryLogger { buffer: Mutex::new(String::new()) }
        }

        fn take(&self) -> String {
            std::mem::take(&mut *self.buffer.lock().unwrap())
        }
    }

    static LOGGER: MemoryLogger = MemoryLogger::new();

    impl Log for MemoryLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Debug
        }
        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                let mut buf = self.buffer.lock().unwrap();
                buf.push_str(&format!("[{}][{}] {}\n", record.level(), record.target(), record.args()));
            }
        }
        fn flush(&self) {}
    }

    #[test]
    fn lddrv_log_tags_component_as_target() {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Debug);
        LOGGER.take();

        lddrv_log!(Level::Debug, "native", "status={:#x}", 0xC000_0034_u32);
        lddrv_log!(Level::Trace, "native", "dropped below DEBUG");

        let output = LOGGER.take();
        assert!(output.contains("[DEBUG][native]"), "missing level/component: {}", output);
        assert!(output.contains("status=0xc0000034"), "missing payload: {}", output);
        assert!(!output.contains("dropped"), "TRACE should be filtered: {}", output);
    }
}
