use chrono::{DateTime, Local};

/// Seconds since the epoch as local wall-clock time.
pub fn unix_to_human_readable(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
        None => format!("{} (out of range)", secs),
    }
}

pub fn u64_to_human_readable(n: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    match n {
        0..KB => format!("{} B", n),
        KB..MB => format!("{:.2} KB", n as f64 / KB as f64),
        MB..GB => format!("{:.2} MB", n as f64 / MB as f64),
        GB..TB => format!("{:.2} GB", n as f64 / GB as f64),
        _ => format!("{:.2} TB", n as f64 / TB as f64),
    }
}
