//! Configuration for voltsync hosts.
//!
//! TOML file + environment loading, credential resolution, translation
//! to `voltsync_core::EngineConfig`, and a file-backed token store so
//! sessions survive restarts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use voltsync_api::{AccountCredentials, TokenSet};
use voltsync_core::{
    CommandCategory, CommandGates, CoreError, EngineConfig, HomeLocation, TokenStore,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for account '{email}'")]
    NoCredentials { email: String },

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
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    pub account: Account,

    #[serde(default)]
    pub polling: Polling,

    #[serde(default)]
    pub commands: Commands,

    /// Optional home coordinate for the geofence field.
    pub home: Option<Home>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Account {
    pub email: String,

    /// Plaintext password. Prefer `password_env` or VOLTSYNC_PASSWORD.
    pub password: Option<String>,

    /// Environment variable name holding the password.
    pub password_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Polling {
    /// Short-poll cadence in seconds. The host's scheduler owns the
    /// timers; this is advisory for it.
    #[serde(default = "default_short_poll")]
    pub short_interval_secs: u64,

    /// Long-poll cadence in seconds. Also the wake safety timeout.
    #[serde(default = "default_long_poll")]
    pub long_interval_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            short_interval_secs: default_short_poll(),
            long_interval_secs: default_long_poll(),
        }
    }
}

fn default_short_poll() -> u64 {
    30
}
fn default_long_poll() -> u64 {
    300
}

/// Security-command gating. `enable = ["all"]` opens every category;
/// otherwise list categories by name: "lock", "sunroof", "windows",
/// "trunk", "frunk", "charge_port", "sentry", "software_update".
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Commands {
    #[serde(default)]
    pub enable: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Home {
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default = "default_radius")]
    pub radius_m: f64,
}

fn default_radius() -> f64 {
    50.0
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "voltsync", "voltsync").map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the data directory (token cache and friends).
pub fn data_path() -> PathBuf {
    ProjectDirs::from("com", "voltsync", "voltsync").map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn home_fallback(suffix: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(suffix);
    p.push("voltsync");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from an explicit path, still merging the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VOLTSYNC_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

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

// ── Translation to EngineConfig ─────────────────────────────────────

/// Resolve the account password from the credential chain.
pub fn resolve_password(account: &Account) -> Result<SecretString, ConfigError> {
    // 1. Named env var from the config
    if let Some(ref env_name) = account.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Conventional env var
    if let Ok(val) = std::env::var("VOLTSYNC_PASSWORD") {
        return Ok(SecretString::from(val));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = account.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        email: account.email.clone(),
    })
}

fn parse_gates(commands: &Commands) -> Result<CommandGates, ConfigError> {
    let mut gates = CommandGates::default();
    for name in &commands.enable {
        let category = match name.as_str() {
            "all" | "true" => {
                gates.allow_all = true;
                continue;
            }
            "lock" => CommandCategory::Lock,
            "sunroof" => CommandCategory::Sunroof,
            "windows" => CommandCategory::Windows,
            "trunk" => CommandCategory::Trunk,
            "frunk" => CommandCategory::Frunk,
            "charge_port" => CommandCategory::ChargePort,
            "sentry" => CommandCategory::Sentry,
            "software_update" => CommandCategory::SoftwareUpdate,
            other => {
                return Err(ConfigError::Validation {
                    field: "commands.enable".into(),
                    reason: format!("unknown command category '{other}'"),
                });
            }
        };
        if !gates.enabled.contains(&category) {
            gates.enabled.push(category);
        }
    }
    Ok(gates)
}

/// Build an `EngineConfig` from the loaded file config.
pub fn to_engine_config(cfg: &Config) -> Result<EngineConfig, ConfigError> {
    if cfg.account.email.is_empty() {
        return Err(ConfigError::Validation {
            field: "account.email".into(),
            reason: "must be set".into(),
        });
    }
    let password = resolve_password(&cfg.account)?;

    let mut engine = EngineConfig::new(AccountCredentials {
        email: cfg.account.email.clone(),
        password,
    });
    engine.long_poll_interval = Duration::from_secs(cfg.polling.long_interval_secs);
    engine.gates = parse_gates(&cfg.commands)?;
    engine.home = cfg.home.as_ref().map(|h| HomeLocation {
        latitude: h.latitude,
        longitude: h.longitude,
    });
    engine.geofence_radius_m = cfg.home.as_ref().map_or(default_radius(), |h| h.radius_m);
    Ok(engine)
}

// ── File-backed token store ─────────────────────────────────────────

/// Persists the session tokens as JSON under the data directory, so a
/// restart resumes with a refresh grant instead of a fresh password
/// login.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store at the default location (`data_path()/tokens.json`).
    pub fn new() -> Self {
        Self {
            path: data_path().join("tokens.json"),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenSet>, CoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CoreError::TokenStore {
                    message: format!("read {}: {err}", self.path.display()),
                });
            }
        };
        let tokens = serde_json::from_slice(&bytes).map_err(|err| CoreError::TokenStore {
            message: format!("parse {}: {err}", self.path.display()),
        })?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &TokenSet) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| CoreError::TokenStore {
                message: format!("create {}: {err}", parent.display()),
            })?;
        }
        let json = serde_json::to_vec_pretty(tokens).map_err(|err| CoreError::TokenStore {
            message: format!("serialize tokens: {err}"),
        })?;
        std::fs::write(&self.path, json).map_err(|err| CoreError::TokenStore {
            message: format!("write {}: {err}", self.path.display()),
        })
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CoreError::TokenStore {
                message: format!("remove {}: {err}", self.path.display()),
            }),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
                [account]
                email = "owner@example.com"
                password = "pw"
            "#,
        );

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.account.email, "owner@example.com");
        assert_eq!(cfg.polling.short_interval_secs, 30);
        assert_eq!(cfg.polling.long_interval_secs, 300);
        assert!(cfg.home.is_none());
    }

    #[test]
    fn test_engine_config_translation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
                [account]
                email = "owner@example.com"
                password = "pw"

                [polling]
                long_interval_secs = 600

                [commands]
                enable = ["lock", "charge_port"]

                [home]
                latitude = 40.0
                longitude = -105.0
            "#,
        );

        let cfg = load_config_from(&path).unwrap();
        let engine = to_engine_config(&cfg).unwrap();
        assert_eq!(engine.long_poll_interval, Duration::from_secs(600));
        assert!(engine.gates.permits(CommandCategory::Lock));
        assert!(!engine.gates.permits(CommandCategory::Trunk));
        assert_eq!(
            engine.home,
            Some(HomeLocation {
                latitude: 40.0,
                longitude: -105.0
            })
        );
        assert!((engine.geofence_radius_m - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_enable_all_opens_every_gate() {
        let gates = parse_gates(&Commands {
            enable: vec!["all".into()],
        })
        .unwrap();
        assert!(gates.permits(CommandCategory::Sentry));
    }

    #[test]
    fn test_unknown_gate_is_rejected() {
        let err = parse_gates(&Commands {
            enable: vec!["warp_drive".into()],
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_missing_password_is_an_error() {
        let cfg = Config {
            account: Account {
                email: "owner@example.com".into(),
                password: None,
                password_env: Some("VOLTSYNC_TEST_UNSET_VAR".into()),
            },
            ..Config::default()
        };
        // Only meaningful when the conventional env var is absent too.
        if std::env::var("VOLTSYNC_PASSWORD").is_err() {
            assert!(matches!(
                to_engine_config(&cfg),
                Err(ConfigError::NoCredentials { .. })
            ));
        }
    }

    #[test]
    fn test_token_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::at(dir.path().join("nested").join("tokens.json"));

        assert!(store.load().unwrap().is_none());

        let tokens = TokenSet {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            token_type: "bearer".into(),
            created_at: 1_700_000_000,
            expires_in: 3600,
        };
        store.save(&tokens).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "at");
        assert_eq!(loaded.refresh_token, "rt");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }
}
