//! Configuration loading and data-folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the SQLite database file inside the data folder
pub const DATABASE_FILE: &str = "hfa.db";

/// Default bind address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/hfa/config.toml first, then /etc/hfa/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("hfa").join("config.toml"));
        let system_config = PathBuf::from("/etc/hfa/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let config_path = dirs::config_dir()
        .map(|d| d.join("hfa").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {:?}",
            config_path
        )))
    }
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hfa"))
        .unwrap_or_else(|| PathBuf::from("./hfa_data"))
}

/// Create the data folder if missing and return the database file path
pub fn ensure_data_folder(data_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(data_folder)?;
    Ok(data_folder.join(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let folder = resolve_data_folder(Some("/tmp/hfa-cli"), "HFA_TEST_UNSET_VAR");
        assert_eq!(folder, PathBuf::from("/tmp/hfa-cli"));
    }

    #[test]
    fn test_env_var_used_when_no_cli_arg() {
        std::env::set_var("HFA_TEST_DATA_VAR", "/tmp/hfa-env");
        let folder = resolve_data_folder(None, "HFA_TEST_DATA_VAR");
        assert_eq!(folder, PathBuf::from("/tmp/hfa-env"));
        std::env::remove_var("HFA_TEST_DATA_VAR");
    }

    #[test]
    fn test_ensure_data_folder_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("nested").join("data");
        let db_path = ensure_data_folder(&folder).unwrap();
        assert!(folder.is_dir());
        assert!(db_path.ends_with(DATABASE_FILE));
    }
}
