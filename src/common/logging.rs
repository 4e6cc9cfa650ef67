//! # Logging Init
//!
//! One shared `env_logger` setup for all five binaries, timestamped the way
//! a single-node deployment log should read: `[HH:MM:SS] [LEVEL] message`.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::str::FromStr;

/// Initialize the global logger at `level` (parsed from a CLI flag such as
/// `"info"`, `"debug"`, `"warn"`). Falls back to `Info` on an unrecognized
/// level rather than failing startup over a typo.
pub fn init_logger(level: &str) {
    let filter = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(filter)
        .init();
}

/// Like [`init_logger`] but also mirrors output to a file, used by the
/// client so each signed-up user gets a log named after their username
/// (the original opens a `logging.FileHandler` on successful signup; a
/// per-process global logger can't be re-initialized mid-run the way
/// Python's `logging.basicConfig` can, so the file is chosen up front from
/// a `--log-file` override).
pub fn init_logger_with_file(level: &str, log_file: &str) {
    let filter = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .ok();

    Builder::new()
        .format(move |buf, record| {
            let line = format!(
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            );
            if let Some(mut f) = file.as_ref().and_then(|f| f.try_clone().ok()) {
                let _ = writeln!(f, "{line}");
            }
            writeln!(buf, "{line}")
        })
        .filter_level(filter)
        .init();
}
