//! Per-user directory resolution for config and persisted state.

use std::path::PathBuf;

/// XDG/platform app name used to resolve config and state directories.
pub const APP_NAME: &str = "pair-review";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Directory holding `config.toml`.
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().to_path_buf())
}

/// Directory holding the store file and any other persisted state.
pub fn state_dir() -> Option<PathBuf> {
    project_dirs().map(|d| {
        d.state_dir()
            .unwrap_or_else(|| d.data_local_dir())
            .to_path_buf()
    })
}

/// Path to the single TOML config file.
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Path to the single-file relational store.
pub fn store_file_path() -> Option<PathBuf> {
    state_dir().map(|d| d.join("store.sqlite3"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_nonempty_and_distinct() {
        let config = config_dir().expect("config dir resolvable on this platform");
        let state = state_dir().expect("state dir resolvable on this platform");
        assert!(config.to_string_lossy().contains(APP_NAME));
        assert!(state.to_string_lossy().contains(APP_NAME));
    }

    #[test]
    fn test_store_file_path_has_expected_name() {
        let path = store_file_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "store.sqlite3");
    }
}
