//! Utility functions for path construction.

use std::path::PathBuf;

/// Joins a directory path and an entry name into one path string, using the
/// platform's separator.
///
/// # Examples
///
/// ```no_run
/// # use maki::utils::get_path;
/// let path = get_path("/var/lib/maki", "commands.json");
/// assert_eq!(path, "/var/lib/maki/commands.json");
/// ```
pub fn get_path(dir_path: &str, entry: &str) -> String {
    let path: PathBuf = [dir_path, entry].iter().collect();
    path.to_str().unwrap_or(dir_path).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_path_joins_directory_and_file() {
        let path = get_path("/var/lib/maki", "commands.json");
        #[cfg(unix)]
        assert_eq!(path, "/var/lib/maki/commands.json");
        #[cfg(windows)]
        assert_eq!(path, "\\var\\lib\\maki\\commands.json");
    }

    #[test]
    fn test_get_path_relative_base() {
        let path = get_path(".", "session");
        #[cfg(unix)]
        assert_eq!(path, "./session");
        #[cfg(windows)]
        assert_eq!(path, ".\\session");
    }
}
