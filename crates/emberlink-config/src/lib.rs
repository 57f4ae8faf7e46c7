//! Configuration for emberlink embedders.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to [`emberlink_core::ClientConfig`]. Embedding
//! applications load a named profile and hand the resulting config to
//! `GrillClient::new`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emberlink_core::ClientConfig;
use emberlink_core::config::{
    CognitoConfig, Credentials, DEFAULT_API_BASE, GMG_PRIME_CLIENT_ID, GMG_PRIME_REGION,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global polling defaults, overridable per profile.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_offline_threshold")]
    pub offline_threshold: u32,

    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            offline_threshold: default_offline_threshold(),
            refresh_margin_secs: default_refresh_margin(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    10
}
fn default_offline_threshold() -> u32 {
    3
}
fn default_refresh_margin() -> u64 {
    60
}

/// A named account profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Account email.
    pub email: String,

    /// Password (plaintext — prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Cloud API root override (defaults to production).
    pub api_base: Option<String>,

    /// Cognito app client override (defaults to the GMG Prime pool).
    pub cognito_region: Option<String>,
    pub cognito_client_id: Option<String>,

    /// Per-profile polling overrides.
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub offline_threshold: Option<u32>,
    pub refresh_margin_secs: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("rs", "emberlink", "emberlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("emberlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path (tests and embedders with custom layouts).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EMBERLINK_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a profile's password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var("EMBERLINK_PASSWORD") {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring::Entry::new("emberlink", &format!("{profile_name}/password")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref password) = profile.password {
        return Ok(SecretString::from(password.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── ClientConfig assembly ───────────────────────────────────────────

/// Build a [`ClientConfig`] from a profile, applying global defaults
/// where the profile doesn't override.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    if profile.email.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "email".into(),
            reason: "must not be empty".into(),
        });
    }

    let api_base_raw = profile.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    let api_base: url::Url = api_base_raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_base".into(),
        reason: format!("invalid URL: {api_base_raw}"),
    })?;

    let cognito = match (&profile.cognito_region, &profile.cognito_client_id) {
        (None, None) => CognitoConfig::gmg_prime(),
        (region, client_id) => CognitoConfig::for_region(
            region.as_deref().unwrap_or(GMG_PRIME_REGION),
            client_id
                .clone()
                .unwrap_or_else(|| GMG_PRIME_CLIENT_ID.to_owned()),
        ),
    };

    let password = resolve_password(profile, profile_name)?;
    let credentials = Credentials {
        email: profile.email.clone(),
        password,
    };

    Ok(ClientConfig {
        api_base,
        cognito,
        credentials,
        timeout: Duration::from_secs(profile.timeout_secs.unwrap_or(defaults.timeout_secs)),
        poll_interval: Duration::from_secs(
            profile
                .poll_interval_secs
                .unwrap_or(defaults.poll_interval_secs),
        ),
        offline_threshold: profile
            .offline_threshold
            .unwrap_or(defaults.offline_threshold),
        refresh_margin: Duration::from_secs(
            profile
                .refresh_margin_secs
                .unwrap_or(defaults.refresh_margin_secs),
        ),
    })
}

/// Load the named (or default) profile straight into a `ClientConfig`.
pub fn client_config_for(profile_name: Option<&str>) -> Result<ClientConfig, ConfigError> {
    let config = load_config()?;
    let name = profile_name
        .map(ToOwned::to_owned)
        .or(config.default_profile)
        .unwrap_or_else(|| "default".into());

    let profile = config
        .profiles
        .get(&name)
        .ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!("profile '{name}' not found"),
        })?;

    profile_to_client_config(profile, &name, &config.defaults)
}
