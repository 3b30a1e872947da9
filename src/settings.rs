use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SsrfError};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_currency: default_currency(),
        }
    }
}

impl Settings {
    /// API url with any trailing slash removed; an override (from
    /// `--api-url` / `SSRF_API_URL`) wins over the saved value.
    pub fn effective_api_url(&self, api_override: Option<&str>) -> String {
        api_override
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(&self.api_url)
            .trim()
            .trim_end_matches('/')
            .to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ssrf")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SsrfError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Accept only http(s) urls so a typo doesn't get persisted.
pub fn validate_api_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(SsrfError::Settings(format!(
            "API url must start with http:// or https:// (got '{url}')"
        )))
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            api_url: "https://books.example.org".to_string(),
            default_currency: "CHF".to_string(),
        };
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.api_url, "https://books.example.org");
        assert_eq!(loaded.default_currency, "CHF");
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("missing.json"));
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.default_currency, "EUR");
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"api_url": "http://10.0.0.2:8000"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.default_currency, "EUR");
        assert_eq!(s.api_url, "http://10.0.0.2:8000");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path).api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_effective_api_url() {
        let s = Settings::default();
        assert_eq!(s.effective_api_url(None), "http://localhost:8000");
        assert_eq!(
            s.effective_api_url(Some("https://api.example.org/")),
            "https://api.example.org"
        );
        assert_eq!(s.effective_api_url(Some("  ")), "http://localhost:8000");
    }

    #[test]
    fn test_validate_api_url() {
        assert_eq!(
            validate_api_url("https://x.org/").unwrap(),
            "https://x.org"
        );
        assert!(validate_api_url("x.org").is_err());
    }
}
