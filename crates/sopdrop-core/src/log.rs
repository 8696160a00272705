//! Timestamped logging to ~/.sopdrop/logs.txt, echoed to stdout unless quiet.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;

use crate::paths;

fn is_quiet() -> bool {
    std::env::var("SOPDROP_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Append a timestamped line to the log file. File-only: nothing on stdout.
pub fn log_to_file(message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let line = format!("[{}] {}", timestamp, message);
    // Append-only: no read-back, no rotation.
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::log_file())
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Log to file and echo to stdout (suppressed by SOPDROP_QUIET).
pub fn log(message: &str) {
    if !is_quiet() {
        println!("{}", message);
    }
    log_to_file(message);
}

pub fn log_error(message: &str) {
    eprintln!("{}", message);
    log_to_file(message);
}
