//! Configuration: ERP OAuth2 credentials, chat platform token, endpoints
//!
//! Values come from an optional TOML file in the user config directory,
//! overridden field-by-field by environment variables. Credentials carry
//! no defaults: startup fails naming every missing key rather than running
//! with placeholder secrets.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::auth::OAuthConfig;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";
const DEFAULT_SCOPE: &str = "rest_webservices";
const DEFAULT_RECORD_TYPE: &str = "customrecord_collab_properties";

/// Optional file-backed values; anything absent falls through to the
/// environment or to a documented default.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    auth_url: Option<String>,
    token_url: Option<String>,
    scope: Option<String>,
    erp_base_url: Option<String>,
    record_type: Option<String>,
    telegram_token: Option<String>,
    anthropic_api_key: Option<String>,
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub scope: String,
    /// ERP REST base, e.g. `https://1234567.suitetalk.api.netsuite.com`.
    pub erp_base_url: String,
    /// Script id of the property custom record.
    pub record_type: String,
    pub telegram_token: String,
    /// Only required when the LLM reply strategy is selected.
    pub anthropic_api_key: Option<String>,
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "propconnect", "propconnect")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load the optional config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let file = match Self::config_path() {
            Ok(path) if path.exists() => {
                let content =
                    fs::read_to_string(&path).context("Failed to read config file")?;
                toml::from_str(&content).context("Failed to parse config file")?
            }
            _ => FileConfig::default(),
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::resolve(file, &env)
    }

    fn resolve(file: FileConfig, env: &HashMap<String, String>) -> Result<Self> {
        let pick = |key: &str, file_value: Option<String>| {
            env.get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .or(file_value)
        };

        let mut missing = Vec::new();
        let mut require = |name: &'static str, value: Option<String>| match value {
            Some(v) => v,
            None => {
                missing.push(name);
                String::new()
            }
        };

        let config = Self {
            client_id: require(
                "PROPCONNECT_CLIENT_ID",
                pick("PROPCONNECT_CLIENT_ID", file.client_id),
            ),
            client_secret: require(
                "PROPCONNECT_CLIENT_SECRET",
                pick("PROPCONNECT_CLIENT_SECRET", file.client_secret),
            ),
            redirect_uri: pick("PROPCONNECT_REDIRECT_URI", file.redirect_uri)
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            auth_url: require(
                "PROPCONNECT_AUTH_URL",
                pick("PROPCONNECT_AUTH_URL", file.auth_url),
            ),
            token_url: require(
                "PROPCONNECT_TOKEN_URL",
                pick("PROPCONNECT_TOKEN_URL", file.token_url),
            ),
            scope: pick("PROPCONNECT_SCOPE", file.scope)
                .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            erp_base_url: require(
                "PROPCONNECT_ERP_BASE_URL",
                pick("PROPCONNECT_ERP_BASE_URL", file.erp_base_url),
            ),
            record_type: pick("PROPCONNECT_RECORD_TYPE", file.record_type)
                .unwrap_or_else(|| DEFAULT_RECORD_TYPE.to_string()),
            telegram_token: require(
                "TELEGRAM_BOT_TOKEN",
                pick("TELEGRAM_BOT_TOKEN", file.telegram_token),
            ),
            anthropic_api_key: pick("ANTHROPIC_API_KEY", file.anthropic_api_key),
        };

        if !missing.is_empty() {
            bail!(
                "Missing required configuration: {}. Set the environment \
                 variables or add the matching keys to the config file.",
                missing.join(", ")
            );
        }
        Ok(config)
    }

    /// Credentials and endpoints for the token lifecycle manager.
    pub fn oauth(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            scope: self.scope.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env() -> HashMap<String, String> {
        [
            ("PROPCONNECT_CLIENT_ID", "id"),
            ("PROPCONNECT_CLIENT_SECRET", "secret"),
            ("PROPCONNECT_AUTH_URL", "https://erp.example.com/authorize"),
            ("PROPCONNECT_TOKEN_URL", "https://erp.example.com/token"),
            ("PROPCONNECT_ERP_BASE_URL", "https://erp.example.com"),
            ("TELEGRAM_BOT_TOKEN", "tg-token"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn resolves_from_environment_with_defaults() {
        let config = Config::resolve(FileConfig::default(), &full_env()).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.record_type, DEFAULT_RECORD_TYPE);
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn environment_overrides_file_values() {
        let file = FileConfig {
            client_id: Some("from-file".into()),
            scope: Some("file_scope".into()),
            ..FileConfig::default()
        };
        let config = Config::resolve(file, &full_env()).unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.scope, "file_scope");
    }

    #[test]
    fn missing_credentials_fail_fast_naming_every_key() {
        let mut env = full_env();
        env.remove("PROPCONNECT_CLIENT_SECRET");
        env.remove("TELEGRAM_BOT_TOKEN");

        let err = Config::resolve(FileConfig::default(), &env).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("PROPCONNECT_CLIENT_SECRET"));
        assert!(message.contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn empty_environment_values_do_not_count() {
        let mut env = full_env();
        env.insert("PROPCONNECT_CLIENT_ID".into(), String::new());
        let err = Config::resolve(FileConfig::default(), &env).unwrap_err();
        assert!(format!("{:#}", err).contains("PROPCONNECT_CLIENT_ID"));
    }
}
