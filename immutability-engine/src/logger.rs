//! Custom `log::Log` backend rendering the literal wire format spec §6
//! requires: bare message to stdout for info, `WRN `/`ERR ` to stderr
//! for warnings and errors. Not `env_logger` — the format is
//! level-routed-by-stream, which a single-writer formatter can't
//! express without fighting the builder.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct LineLogger;

impl Log for LineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => {
                let mut stderr = std::io::stderr();
                let _ = writeln!(stderr, "ERR {}", record.args());
                let _ = stderr.flush();
            }
            Level::Warn => {
                let mut stderr = std::io::stderr();
                let _ = writeln!(stderr, "WRN {}", record.args());
                let _ = stderr.flush();
            }
            _ => {
                let mut stdout = std::io::stdout();
                let _ = writeln!(stdout, "{}", record.args());
                let _ = stdout.flush();
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Installs the logger as the global `log` backend. Must be called
/// exactly once, at the top of `main`.
pub fn install() {
    if log::set_boxed_logger(Box::new(LineLogger)).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}
