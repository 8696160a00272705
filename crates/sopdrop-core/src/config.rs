//! Configuration and credential storage under ~/.sopdrop/.

use std::env;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::package::Package;
use crate::paths;

pub const DEFAULT_SERVER_URL: &str = "https://sopdrop.com";
pub const DEFAULT_API_VERSION: &str = "v1";

/// Contents of config.json. Keys this client does not know about are kept
/// verbatim across a load/save round trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub api_version: String,
    pub cache_enabled: bool,
    pub cache_max_size_mb: u64,
    /// Context filter applied to searches when none is given on the call.
    pub default_context: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            cache_enabled: true,
            cache_max_size_mb: 500,
            default_context: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Parse config JSON, falling back to defaults on malformed input.
fn parse_config(s: &str) -> Config {
    serde_json::from_str(s).unwrap_or_default()
}

/// Load config.json; missing or invalid file means defaults.
pub fn load() -> Config {
    match fs::read_to_string(paths::config_file()) {
        Ok(s) => parse_config(&s),
        Err(_) => Config::default(),
    }
}

pub fn save(config: &Config) -> Result<()> {
    paths::init_home()?;
    let s = serde_json::to_string_pretty(config)?;
    fs::write(paths::config_file(), s)?;
    Ok(())
}

fn server_url_from(config: &Config, env_override: Option<String>) -> String {
    if let Some(url) = env_override {
        if !url.is_empty() {
            return url.trim_end_matches('/').to_string();
        }
    }
    config.server_url.trim_end_matches('/').to_string()
}

/// Server URL with precedence: SOPDROP_SERVER_URL env var, then config
/// file, then the built-in default.
pub fn effective_server_url(config: &Config) -> String {
    server_url_from(config, env::var("SOPDROP_SERVER_URL").ok())
}

/// Full API base, e.g. `https://sopdrop.com/api/v1`.
pub fn api_url(config: &Config) -> String {
    format!("{}/api/{}", effective_server_url(config), config.api_version)
}

/// Persist a new server URL and return the normalized value.
pub fn set_server_url(url: &str) -> Result<String> {
    let mut config = load();
    config.server_url = url.trim_end_matches('/').to_string();
    save(&config)?;
    Ok(config.server_url)
}

// === Token ===

/// Stored bearer token, if any. Whitespace is trimmed; an empty file counts
/// as no token.
pub fn token() -> Option<String> {
    fs::read_to_string(paths::token_file())
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Save the token with owner-only permissions on unix.
pub fn save_token(token: &str) -> Result<()> {
    paths::init_home()?;
    let file = paths::token_file();
    fs::write(&file, token)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&file)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&file, perms)?;
    }
    Ok(())
}

pub fn clear_token() -> Result<()> {
    let file = paths::token_file();
    if file.exists() {
        fs::remove_file(file)?;
    }
    Ok(())
}

// === Clipboard (quick-paste workflow) ===

/// A package staged for instant paste by host-side tooling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clipboard {
    pub slug: String,
    pub package: Package,
}

pub fn clipboard() -> Option<Clipboard> {
    let s = fs::read_to_string(paths::clipboard_file()).ok()?;
    serde_json::from_str(&s).ok()
}

pub fn set_clipboard(slug: &str, package: &Package) -> Result<()> {
    paths::init_home()?;
    let entry = Clipboard {
        slug: slug.to_string(),
        package: package.clone(),
    };
    // Compact JSON: the clipboard is read often and never hand-edited.
    fs::write(paths::clipboard_file(), serde_json::to_string(&entry)?)?;
    Ok(())
}

pub fn clear_clipboard() -> Result<()> {
    let file = paths::clipboard_file();
    if file.exists() {
        fs::remove_file(file)?;
    }
    Ok(())
}
