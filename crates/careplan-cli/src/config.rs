//! Configuration file management for careplan.
//!
//! Provides a TOML-based config file at `~/.config/careplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use careplan_core::draft::generator::{API_KEY_ENV, BASE_URL_ENV, MODEL_ENV, TIMEOUT_ENV};
use careplan_core::draft::{GeneratorConfig, generator::parse_timeout};
use careplan_core::mode::{DEMO_MODE_ENV, OperatingMode};
use careplan_db::config::{ANON_KEY_ENV, AUTH_URL_ENV, BackendConfig, DATABASE_URL_ENV};

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the careplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/careplan` or `~/.config/careplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("careplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("careplan")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.json")
}

pub fn settings_path() -> PathBuf {
    config_dir().join(careplan_core::settings::SETTINGS_FILE_NAME)
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    write_private(&config_path(), &contents)
}

/// Write `contents` to `path` readable by the owner only (0600 on Unix).
pub fn write_private(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct CareplanConfig {
    pub backend: BackendConfig,
    pub generator: GeneratorConfig,
    pub mode: OperatingMode,
}

impl CareplanConfig {
    /// Resolve configuration from the flag, the process environment and the
    /// config file (if any).
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = if config_path().exists() {
            Some(load_config()?)
        } else {
            None
        };
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Ok(Self::resolve_from(cli_db_url, env, file_config.as_ref()))
    }

    /// Resolution chain with an explicit environment lookup.
    ///
    /// - DB URL: `cli_db_url` > `CAREPLAN_DATABASE_URL` > `[database].url` > none
    /// - Auth: `CAREPLAN_AUTH_URL` / `CAREPLAN_ANON_KEY` > `[auth]` > none
    /// - Generation: `CAREPLAN_GEMINI_*` > `[generation]` > built-in defaults
    /// - Mode: `CAREPLAN_DEMO_MODE` plus what is configured
    pub fn resolve_from(
        cli_db_url: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        file: Option<&ConfigFile>,
    ) -> Self {
        let database_url = cli_db_url
            .map(str::to_owned)
            .or_else(|| env(DATABASE_URL_ENV))
            .or_else(|| file.and_then(|f| f.database.as_ref()).map(|d| d.url.clone()));

        let file_auth = file.and_then(|f| f.auth.as_ref());
        let auth_url = env(AUTH_URL_ENV).or_else(|| file_auth.map(|a| a.url.clone()));
        let anon_key = env(ANON_KEY_ENV).or_else(|| file_auth.map(|a| a.anon_key.clone()));
        let backend = BackendConfig::from_parts(database_url, auth_url, anon_key);

        let gen_file = file.and_then(|f| f.generation.as_ref());
        let defaults = GeneratorConfig::default();
        let timeout = env(TIMEOUT_ENV)
            .and_then(|raw| parse_timeout(&raw))
            .or_else(|| {
                gen_file
                    .and_then(|g| g.timeout_secs)
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
            })
            .unwrap_or(defaults.timeout);
        let generator = GeneratorConfig {
            api_key: env(API_KEY_ENV).or_else(|| gen_file.and_then(|g| g.api_key.clone())),
            model: env(MODEL_ENV)
                .or_else(|| gen_file.and_then(|g| g.model.clone()))
                .unwrap_or(defaults.model),
            base_url: env(BASE_URL_ENV)
                .or_else(|| gen_file.and_then(|g| g.base_url.clone()))
                .unwrap_or(defaults.base_url),
            timeout,
        };

        let mode = OperatingMode::resolve(env(DEMO_MODE_ENV).as_deref(), &backend);

        Self {
            backend,
            generator,
            mode,
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
