//! Settings resolution for the Verdant CLI.
//!
//! Settings come from a JSON file (`~/.config/verdant/config.json` on most
//! platforms, or the path in `VERDANT_CONFIG_PATH`) overlaid with environment
//! variables. The result is a plain [`VerdantSettings`] value that callers
//! inject into the client and the fill engine; nothing downstream reads the
//! environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::{config_dir, home_dir};
use thiserror::Error;
use tracing::debug;
use verdant_types::VerdantSettings;

/// Environment variable allowing callers to override the settings file path.
pub const CONFIG_PATH_ENV: &str = "VERDANT_CONFIG_PATH";
/// Overrides `api.base_url`.
pub const API_BASE_ENV: &str = "VERDANT_API_BASE";
/// Overrides `api.bearer_token`.
pub const API_TOKEN_ENV: &str = "VERDANT_API_TOKEN";
/// Overrides `api.admin_token`; the `VITE_` variant is read when this one is unset.
pub const ADMIN_TOKEN_ENV: &str = "ADMIN_STATIC_TOKEN";
pub const ADMIN_TOKEN_FALLBACK_ENV: &str = "VITE_ADMIN_STATIC_TOKEN";

/// Default filename for the JSON settings document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Error surfaced when reading settings fails.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O failure other than a missing file.
    #[error("settings I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file exists but is not a valid settings document.
    #[error("settings file {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load settings from the default location and apply environment overrides.
pub fn load_settings() -> Result<VerdantSettings, SettingsError> {
    load_settings_from(&default_settings_path())
}

/// Load settings from `path` (a missing file yields defaults) and apply
/// environment overrides.
pub fn load_settings_from(path: &Path) -> Result<VerdantSettings, SettingsError> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Overlay environment variables onto `settings`. Blank values are ignored.
pub fn apply_env_overrides(settings: &mut VerdantSettings) {
    if let Some(base_url) = env_value(API_BASE_ENV) {
        settings.api.base_url = base_url;
    }
    if let Some(token) = env_value(API_TOKEN_ENV) {
        settings.api.bearer_token = Some(token);
    }
    if let Some(token) = env_value(ADMIN_TOKEN_ENV).or_else(|| env_value(ADMIN_TOKEN_FALLBACK_ENV)) {
        settings.api.admin_token = Some(token);
    }
}

/// Path of the settings file, honoring `VERDANT_CONFIG_PATH`.
pub fn default_settings_path() -> PathBuf {
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verdant")
        .join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}

fn read_settings_file(path: &Path) -> Result<VerdantSettings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(data) => {
            debug!(path = %path.display(), "loaded settings file");
            serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(VerdantSettings::default()),
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ALL_ENV: [&str; 5] = [CONFIG_PATH_ENV, API_BASE_ENV, API_TOKEN_ENV, ADMIN_TOKEN_ENV, ADMIN_TOKEN_FALLBACK_ENV];

    fn cleared_env() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_ENV.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        temp_env::with_vars(cleared_env(), || {
            let settings = load_settings_from(&dir.path().join("absent.json")).unwrap();
            assert_eq!(settings, VerdantSettings::default());
        });
    }

    #[test]
    fn file_values_are_overridden_by_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"api": {"base_url": "https://file.example.com", "bearer_token": "from-file"}, "fill": {"batch_size": 2}}"#,
        )
        .unwrap();

        let mut vars = cleared_env();
        vars.push((API_TOKEN_ENV, Some("from-env")));
        vars.push((ADMIN_TOKEN_FALLBACK_ENV, Some("vite-admin")));
        temp_env::with_vars(vars, || {
            let settings = load_settings_from(&path).unwrap();
            assert_eq!(settings.api.base_url, "https://file.example.com");
            assert_eq!(settings.api.bearer_token.as_deref(), Some("from-env"));
            assert_eq!(settings.api.admin_token.as_deref(), Some("vite-admin"));
            assert_eq!(settings.fill.batch_size, 2);
        });
    }

    #[test]
    fn primary_admin_token_wins_over_fallback() {
        let mut vars = cleared_env();
        vars.push((ADMIN_TOKEN_ENV, Some("primary")));
        vars.push((ADMIN_TOKEN_FALLBACK_ENV, Some("fallback")));
        temp_env::with_vars(vars, || {
            let mut settings = VerdantSettings::default();
            apply_env_overrides(&mut settings);
            assert_eq!(settings.api.admin_token.as_deref(), Some("primary"));
        });
    }

    #[test]
    fn invalid_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "not json").unwrap();

        temp_env::with_vars(cleared_env(), || {
            let error = load_settings_from(&path).unwrap_err();
            assert!(matches!(error, SettingsError::Parse { .. }));
        });
    }

    #[test]
    fn default_path_honors_env_override() {
        let mut vars = cleared_env();
        vars.push((CONFIG_PATH_ENV, Some("~/custom/verdant.json")));
        temp_env::with_vars(vars, || {
            assert_eq!(default_settings_path(), expand_tilde("~/custom/verdant.json"));
        });
    }
}
