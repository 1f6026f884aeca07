use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use docqa_client::poll::PollPolicy;
use docqa_core::endpoints::{ApiEndpoints, DEFAULT_API_URL, DEFAULT_EVENTS_URL, resolve_base};
use docqa_core::models::query::{DEFAULT_TOP_K, validate_top_k};
use docqa_history::store::DEFAULT_CAPACITY_BYTES;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.json";
const APP_DIR: &str = "docqa";

pub const API_URL_ENV: &str = "DOCQA_API_URL";
pub const EVENTS_URL_ENV: &str = "DOCQA_EVENTS_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocqaConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    pub config_version: u32,
    pub api_url: String,
    /// Event-run API for queued queries. Added in v1.
    pub events_url: String,
    pub top_k: u32,
    pub history_capacity_bytes: usize,
    pub request_timeout_secs: u64,
    pub poll: PollPolicy,
}

impl Default for DocqaConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            api_url: DEFAULT_API_URL.to_string(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
            top_k: DEFAULT_TOP_K,
            history_capacity_bytes: DEFAULT_CAPACITY_BYTES,
            request_timeout_secs: 120,
            poll: PollPolicy::default(),
        }
    }
}

/// Settings after applying overrides on top of the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoints: ApiEndpoints,
    pub top_k: u32,
    pub history_capacity_bytes: usize,
    pub request_timeout: Duration,
    pub poll: PollPolicy,
}

/// Base URL overrides from the command line and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub events_url: Option<String>,
}

impl Overrides {
    /// Read `DOCQA_API_URL` and `DOCQA_EVENTS_URL`.
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var(API_URL_ENV).ok(),
            events_url: std::env::var(EVENTS_URL_ENV).ok(),
        }
    }

    /// Prefer `self`, fall back to `other` for unset fields.
    pub fn or(self, other: Overrides) -> Self {
        Self {
            api_url: self.api_url.or(other.api_url),
            events_url: self.events_url.or(other.events_url),
        }
    }
}

impl DocqaConfig {
    /// Resolve final settings. Overrides beat the file, the file beats the
    /// built-in defaults; blank values count as unset.
    pub fn resolve(&self, overrides: &Overrides) -> eyre::Result<Settings> {
        let api = resolve_base(
            overrides.api_url.as_deref(),
            Some(self.api_url.as_str()),
            DEFAULT_API_URL,
        );
        let events = resolve_base(
            overrides.events_url.as_deref(),
            Some(self.events_url.as_str()),
            DEFAULT_EVENTS_URL,
        );
        let top_k = validate_top_k(self.top_k).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring configured top_k");
            DEFAULT_TOP_K
        });

        Ok(Settings {
            endpoints: ApiEndpoints::new(api, events)?,
            top_k,
            history_capacity_bytes: self.history_capacity_bytes,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            poll: self.poll,
        })
    }
}

pub fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join(APP_DIR))
}

/// Where chat history files live.
pub fn data_dir() -> eyre::Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre::eyre!("no data directory found"))?;
    Ok(base.join(APP_DIR))
}

/// Load the config in `dir`, or defaults when there is none yet.
pub fn load_config(dir: &Path) -> eyre::Result<DocqaConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(DocqaConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: DocqaConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update docqa."
        ));
    }

    // v0 → v1: add events_url for the queued query flow
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.entry("events_url")
            .or_insert(serde_json::Value::String(DEFAULT_EVENTS_URL.to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added events_url)");
    }

    Ok(json)
}

pub fn save_config(dir: &Path, config: &DocqaConfig) -> eyre::Result<()> {
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let path = dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = dir.join("config.json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
