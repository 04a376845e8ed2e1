//! Four-level colored logger matching the probe's external interface:
//! Crucial (always shown), Info and Debug (shown only at `--log 0`), and
//! Error (always shown, fatal).

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};
use time::format_description;

const LEVEL_ALL: u8 = 0;
const LEVEL_CRUCIAL: u8 = 1;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LEVEL_CRUCIAL);

/// Set the global log level: `0` prints everything, `1` prints only
/// Crucial (and Error) lines. Mirrors the `--log` CLI flag.
pub fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

fn level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

fn timestamp() -> String {
    let format = format_description::parse("[year]/[month]/[day] [hour]:[minute]:[second]")
        .expect("static format description is valid");
    time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| String::from("0000/00/00 00:00:00"))
        .blue()
        .to_string()
}

#[doc(hidden)]
pub fn crucial_line(message: std::fmt::Arguments) {
    println!("{} {} {}", "[CRUCIAL]".green(), timestamp(), message);
}

#[doc(hidden)]
pub fn info_line(message: std::fmt::Arguments) {
    if level() <= LEVEL_ALL {
        println!("{} {} {}", "[INFO]".cyan(), timestamp(), message);
    }
}

#[doc(hidden)]
pub fn debug_line(message: std::fmt::Arguments) {
    if level() <= LEVEL_ALL {
        println!("{} {} {}", "[DEBUG]".purple(), timestamp(), message);
    }
}

/// Log an error line and terminate the process with a nonzero exit code.
/// There is no "recoverable error" path here — anything routed through
/// `Error` is always fatal.
#[doc(hidden)]
pub fn error_line(message: std::fmt::Arguments, file: &str, line: u32) {
    let location = format!("{file}:{line}").yellow();
    eprintln!("{} {} {}: {}", "[ERROR]".red(), timestamp(), location, message);
    std::process::exit(1);
}

/// Print a message without a timestamp, used for the `----- probe -----`
/// banner between probes in an `all` run.
pub fn print_banner(message: &str) {
    println!("{}", message.yellow());
}

#[macro_export]
macro_rules! crucial {
    ($($arg:tt)*) => { $crate::logging::crucial_line(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::logging::info_line(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::logging::debug_line(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::logging::error_line(format_args!($($arg)*), file!(), line!()) };
}
