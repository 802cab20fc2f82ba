//! Recording file naming.
//!
//! Output files live under `<root>/<platform>/<host>/` and are named
//! `<platform>_<host>_<YYYYMMDD_HHMM>.<ext>`. Every component is sanitized so
//! host names taken from a platform (Chinese, Japanese and Korean text
//! included) stay valid on Windows, Linux and macOS.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Characters that are invalid in Windows filenames
const WINDOWS_INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Windows reserved filenames (case-insensitive)
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes a platform or host name safe to use as a path component.
///
/// Control and Windows-invalid characters become `_` (runs collapse into
/// one), leading and trailing spaces and dots are trimmed, reserved Windows
/// device names get a `_` prefix, and an empty result becomes `unnamed`.
///
/// ```
/// use live_recorder::utils::filename::sanitize_filename;
///
/// assert_eq!(sanitize_filename("观看一只青蛙?"), "观看一只青蛙_");
/// assert_eq!(sanitize_filename("CON"), "_CON");
/// ```
pub fn sanitize_filename(input: &str) -> String {
    if input.is_empty() {
        return "unnamed".to_string();
    }

    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_control() || WINDOWS_INVALID_CHARS.contains(&c) {
            // Replace invalid char with underscore, but collapse consecutive
            if !last_was_replacement {
                result.push('_');
                last_was_replacement = true;
            }
        } else {
            result.push(c);
            last_was_replacement = false;
        }
    }

    // Trim leading/trailing spaces and dots (Windows restriction)
    let trimmed = result.trim_matches(|c| c == ' ' || c == '.');

    // Handle empty result after trimming
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    // Check for Windows reserved names
    let upper = trimmed.to_uppercase();
    for reserved in WINDOWS_RESERVED_NAMES {
        if upper == *reserved || upper.starts_with(&format!("{}.", reserved)) {
            return format!("_{}", trimmed);
        }
    }

    trimmed.to_string()
}

/// Minute-resolution timestamp used in recording names.
pub const RECORDING_TIME_FORMAT: &str = "%Y%m%d_%H%M";

/// Directory holding the recordings of one host.
pub fn recording_dir(root: &Path, platform: &str, host: &str) -> PathBuf {
    root.join(sanitize_filename(platform))
        .join(sanitize_filename(host))
}

/// File stem of a recording started at `started_at`, without extension.
pub fn recording_stem(platform: &str, host: &str, started_at: &DateTime<Local>) -> String {
    sanitize_filename(&format!(
        "{}_{}_{}",
        platform,
        host,
        started_at.format(RECORDING_TIME_FORMAT)
    ))
}

/// File name for the `index`-th recording sharing the same stem.
///
/// Index 0 is the plain name; later ones get a `_<index>` suffix before the
/// extension.
pub fn recording_file_name(stem: &str, index: u32, ext: &str) -> String {
    if index == 0 {
        format!("{stem}.{ext}")
    } else {
        format!("{stem}_{index}.{ext}")
    }
}
