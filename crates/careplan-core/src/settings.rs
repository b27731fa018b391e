//! Display settings persisted as one JSON file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        })
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(SettingsError::InvalidValue {
                key: "theme",
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        })
    }
}

impl FromStr for FontSize {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(SettingsError::InvalidValue {
                key: "fontSize",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid {key} {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("unknown setting {0:?} (expected theme or fontSize)")]
    UnknownKey(String),

    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Theme and font size. Read once at startup, written on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub font_size: FontSize,
}

impl DisplaySettings {
    /// Load from `path`. A missing file yields defaults; an unreadable or
    /// malformed one is logged and also yields defaults.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings; using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed settings; using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(write_err)?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Set one value by its persisted key name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            "theme" => self.theme = value.parse()?,
            "fontSize" | "font-size" | "font_size" => self.font_size = value.parse()?,
            other => return Err(SettingsError::UnknownKey(other.to_owned())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_form_uses_camel_case() {
        let settings = DisplaySettings {
            theme: Theme::Dark,
            font_size: FontSize::Large,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"theme":"dark","fontSize":"large"}"#);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        let mut settings = DisplaySettings::default();
        settings.set("theme", "system").unwrap();
        settings.set("fontSize", "small").unwrap();
        settings.save(&path).unwrap();

        let loaded = DisplaySettings::load(&path);
        assert_eq!(loaded.theme, Theme::System);
        assert_eq!(loaded.font_size, FontSize::Small);
    }

    #[test]
    fn malformed_or_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        assert_eq!(DisplaySettings::load(&path), DisplaySettings::default());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(DisplaySettings::load(&path), DisplaySettings::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = DisplaySettings::default();
        assert!(matches!(
            settings.set("theme", "blue"),
            Err(SettingsError::InvalidValue { key: "theme", .. })
        ));
        assert!(matches!(settings.set("color", "x"), Err(SettingsError::UnknownKey(_))));
        assert_eq!(settings, DisplaySettings::default());
    }
}
