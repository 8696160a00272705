//! Filesystem locations for config, token, cache, and logs.

use std::env;
use std::fs;
use std::path::PathBuf;

/// Root sopdrop directory. Uses SOPDROP_HOME if set; otherwise ~/.sopdrop.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = env::var("SOPDROP_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sopdrop")
}

/// Downloaded asset payloads live here, one file per (slug, version).
pub fn cache_dir() -> PathBuf {
    config_dir().join("cache")
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.json")
}

pub fn token_file() -> PathBuf {
    config_dir().join("token")
}

pub fn clipboard_file() -> PathBuf {
    config_dir().join("clipboard.json")
}

pub fn log_file() -> PathBuf {
    config_dir().join("logs.txt")
}

/// Create the config and cache directories if missing.
pub fn init_home() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())?;
    fs::create_dir_all(cache_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_file_names() {
        assert!(cache_dir().ends_with("cache"));
        assert!(config_file().ends_with("config.json"));
        assert!(token_file().ends_with("token"));
        assert!(clipboard_file().ends_with("clipboard.json"));
    }
}
