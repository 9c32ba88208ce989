//! Utility functions for paths and text rendering.

use std::{path::PathBuf, time::Duration};

/// Joins a directory path with a file or subdirectory name.
///
/// Non UTF-8 components are replaced lossily.
///
/// # Examples
///
/// ```
/// let path = get_path("/var/lib/howl", "stats");
/// assert_eq!(path, "/var/lib/howl/stats");
/// ```
pub fn get_path(dir_path: &str, subdir_path: &str) -> String {
    let path_buf: PathBuf = [dir_path, subdir_path].iter().collect();
    path_buf.to_string_lossy().into_owned()
}

/// Renders a duration as the largest whole units, e.g. `1h 30m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    let parts: Vec<String> = [(hours, "h"), (minutes, "m"), (seconds, "s")]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();

    if parts.is_empty() {
        return "0s".to_owned();
    }
    parts.join(" ")
}

/// Renders user ids as a comma separated list of inline code spans.
pub fn format_users(users: &[String]) -> String {
    users
        .iter()
        .map(|user| format!("`{}`", user))
        .collect::<Vec<String>>()
        .join(", ")
}
