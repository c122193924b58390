//! Session snapshot – reads/writes `~/.responder/config.toml`.
//!
//! The file carries everything the console needs from outside: the endpoint
//! id, the capabilities that endpoint advertises, the operator's permission
//! flags and the feature switches for optional commands.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use responder_types::{CapabilitySet, CapabilityTag, FeatureFlags, PermissionSet};

/// Persisted console configuration stored in `~/.responder/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Endpoint the console acts on.
    #[serde(default = "default_endpoint_id")]
    pub endpoint_id: String,

    /// Capability tags the endpoint advertises.  Unknown tags are kept in the
    /// file but ignored when the snapshot is taken.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,

    /// Operator grants.  Missing flags are denied.
    #[serde(default)]
    pub permissions: PermissionSet,

    #[serde(default)]
    pub features: FeatureFlags,
}

fn default_endpoint_id() -> String {
    "local-endpoint".to_string()
}
fn default_capabilities() -> Vec<String> {
    CapabilityTag::ALL
        .iter()
        .map(|tag| tag.as_str().to_string())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_id: default_endpoint_id(),
            capabilities: default_capabilities(),
            permissions: PermissionSet::none(),
            features: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// The immutable inputs a console session is built from.
    pub fn snapshot(&self) -> (CapabilitySet, PermissionSet, FeatureFlags) {
        (
            CapabilitySet::from_strings(&self.capabilities),
            self.permissions,
            self.features,
        )
    }

    /// Configured capability names that are not known tags.
    pub fn unknown_capabilities(&self) -> Vec<&str> {
        self.capabilities
            .iter()
            .map(String::as_str)
            .filter(|name| name.parse::<CapabilityTag>().is_err())
            .collect()
    }
}

/// Return the path to `~/.responder/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".responder").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    Ok(load_from(&config_path())?.map(|mut cfg| {
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `RESPONDER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `RESPONDER_ENDPOINT_ID` | `endpoint_id` |
/// | `RESPONDER_CAPABILITIES` | `capabilities` (comma-separated) |
/// | `RESPONDER_SCAN_ENABLED` | `features.scan_enabled` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RESPONDER_ENDPOINT_ID") {
        cfg.endpoint_id = v;
    }
    if let Ok(v) = std::env::var("RESPONDER_CAPABILITIES") {
        cfg.capabilities = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Ok(v) = std::env::var("RESPONDER_SCAN_ENABLED")
        && let Ok(enabled) = v.parse::<bool>()
    {
        cfg.features.scan_enabled = enabled;
    }
}

/// Save the config to disk, creating `~/.responder/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only (rw-------) on Unix: the file describes who may do what.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
