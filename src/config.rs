use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LunaConfig {
    // HTTP server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // Generative API (Gemini-style generateContent endpoint)
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_retry_max_output_tokens")]
    pub retry_max_output_tokens: u32,

    // Persistence
    #[serde(default)]
    pub data_dir: Option<String>,

    // Onboarding bypass for synthetic / pre-seeded users
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,

    // Fixed seed for the response selector; unset means entropy
    #[serde(default)]
    pub selector_seed: Option<u64>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8085".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_request_timeout_secs() -> u64 {
    8
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    512
}

fn default_retry_max_output_tokens() -> u32 {
    256
}

fn default_bypass_prefixes() -> Vec<String> {
    vec!["test_varied_".to_string(), "existing_".to_string()]
}

impl Default for LunaConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            gemini_api_url: default_gemini_api_url(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            retry_max_output_tokens: default_retry_max_output_tokens(),
            data_dir: None,
            bypass_prefixes: default_bypass_prefixes(),
            selector_seed: None,
        }
    }
}

impl LunaConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Get the path to the config file (relative to executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("luna_config.toml")
    }

    /// Load config from luna_config.toml (next to executable)
    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<LunaConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Save config to file (next to executable)
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = env::var("LUNA_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Ok(url) = env::var("GEMINI_API_URL") {
            config.gemini_api_url = url;
        }

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                config.gemini_api_key = Some(key);
            }
        }

        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.gemini_model = model;
        }

        if let Ok(timeout) = env::var("LUNA_REQUEST_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse() {
                config.request_timeout_secs = seconds;
            }
        }

        if let Ok(dir) = env::var("LUNA_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(dir);
            }
        }

        if let Ok(seed) = env::var("LUNA_SELECTOR_SEED") {
            if let Ok(seed) = seed.parse() {
                config.selector_seed = Some(seed);
            }
        }

        config
    }

    /// Directory holding the session blob. Falls back to the platform data
    /// dir, then the working directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .map(|base| base.join("luna"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.resolve_data_dir().join("luna_sessions.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: LunaConfig = toml::from_str("").expect("parse empty");
        assert_eq!(config.bind_addr, "127.0.0.1:8085");
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.bypass_prefixes, vec!["test_varied_", "existing_"]);
        assert!(config.selector_seed.is_none());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let config = LunaConfig {
            data_dir: Some("/tmp/luna-test".to_string()),
            ..LunaConfig::default()
        };
        assert_eq!(
            config.sessions_path(),
            PathBuf::from("/tmp/luna-test/luna_sessions.json")
        );
    }
}
