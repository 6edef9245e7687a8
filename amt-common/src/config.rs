//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "amt.db";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data folder holding the database file
    pub data_folder: Option<PathBuf>,
}

/// Data folder resolution priority order:
/// 1. Explicit argument (highest priority)
/// 2. Environment variable `AMT_DATA_FOLDER`
/// 3. TOML config file (`data_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(explicit: Option<&str>) -> PathBuf {
    // Priority 1: Explicit argument
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("AMT_DATA_FOLDER") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(config) = load_toml_config(&config_path) {
            if let Some(folder) = config.data_folder {
                return folder;
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Database path inside a resolved data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE)
}

/// Load and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
}

/// Write a TOML configuration file
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Cannot serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/amt/config.toml first, then /etc/amt/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("amt").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/amt/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("amt").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("amt"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/amt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_explicit_argument_wins() {
        std::env::set_var("AMT_DATA_FOLDER", "/tmp/amt-env");
        let folder = resolve_data_folder(Some("/tmp/amt-explicit"));
        assert_eq!(folder, PathBuf::from("/tmp/amt-explicit"));
        std::env::remove_var("AMT_DATA_FOLDER");
    }

    #[test]
    #[serial]
    fn test_env_var_beats_default() {
        std::env::set_var("AMT_DATA_FOLDER", "/tmp/amt-env");
        let folder = resolve_data_folder(None);
        assert_eq!(folder, PathBuf::from("/tmp/amt-env"));
        std::env::remove_var("AMT_DATA_FOLDER");
    }

    #[test]
    #[serial]
    fn test_toml_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = TomlConfig {
            data_folder: Some(PathBuf::from("/srv/amt")),
        };
        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();
        assert_eq!(loaded.data_folder, Some(PathBuf::from("/srv/amt")));
    }

    #[test]
    fn test_database_path_appends_file_name() {
        assert_eq!(
            database_path(Path::new("/srv/amt")),
            PathBuf::from("/srv/amt/amt.db")
        );
    }
}
