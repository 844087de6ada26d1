//! Configuration management
//!
//! Settings live in `settings.json` inside the tablero directory:
//! ```json
//! {
//!   "app": { "demoMode": false, "apiUrl": "https://api.example.com", "timeoutMs": 10000 },
//!   "auth": { "token": "..." }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Board API used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Request timeout used when nothing is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    auth: AuthSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Tablero configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load config from the tablero directory
    ///
    /// Environment overrides (for CI/testing and scripted use):
    /// `TABLERO_DEMO_MODE`, `TABLERO_API_URL`, `TABLERO_TOKEN`.
    pub fn load(tablero_dir: &Path) -> Result<Self> {
        let raw = read_settings(tablero_dir)?;

        let demo_mode = match std::env::var("TABLERO_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        let api_url = std::env::var("TABLERO_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(raw.app.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api_token = std::env::var("TABLERO_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .or(raw.auth.token);

        Ok(Self {
            demo_mode,
            api_url,
            api_token,
            timeout_ms: raw.app.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
        })
    }

    /// Persist the demo mode switch
    ///
    /// Only `app.demoMode` is written. Every other key stays as it is in the
    /// file, so values that came from environment overrides never reach disk.
    pub fn set_demo_mode(tablero_dir: &Path, enabled: bool) -> Result<()> {
        let settings_path = tablero_dir.join("settings.json");
        let mut settings = read_settings(tablero_dir)?;
        settings.app.demo_mode = enabled;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn read_settings(tablero_dir: &Path) -> Result<SettingsFile> {
    let settings_path = tablero_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(!config.api_url.is_empty());
    }

    #[test]
    fn test_save_preserves_unmanaged_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app":{"theme":"dark","timeoutMs":2500},"reports":{"period":"Q1"}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.timeout_ms, 2500);

        Config::set_demo_mode(dir.path(), true).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap())
                .unwrap();
        assert_eq!(saved["app"]["theme"], "dark");
        assert_eq!(saved["app"]["demoMode"], true);
        assert_eq!(saved["reports"]["period"], "Q1");
    }

    #[test]
    fn test_set_demo_mode_writes_only_the_switch() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"app":{"apiUrl":"https://file.example.com"}}"#,
        )
        .unwrap();

        Config::set_demo_mode(dir.path(), true).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap())
                .unwrap();
        assert_eq!(saved["app"]["demoMode"], true);
        assert_eq!(saved["app"]["apiUrl"], "https://file.example.com");
        assert!(saved["app"].get("timeoutMs").is_none());
        assert!(saved["auth"].get("token").is_none());
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
