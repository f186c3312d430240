//! Configuration schema for the controller connection (TOML + environment).

use crate::config::ConfigError;
use crate::controller::{Credential, RemoteConnection};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Controller base URL, e.g. `https://aap.example.com`.
    pub base_url: String,

    /// OAuth2 / personal access token. Preferred over username/password.
    pub token: Option<String>,

    /// Basic-auth username.
    pub username: Option<String>,

    /// Basic-auth password.
    pub password: Option<String>,

    /// Verify the controller's TLS certificate.
    pub verify_ssl: bool,

    /// Per-request timeout in seconds.
    pub timeout_sec: u64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            username: None,
            password: None,
            verify_ssl: true,
            timeout_sec: 30,
            log_level: "info".into(),
        }
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_sec", &self.timeout_sec)
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Interpret a boolean-ish environment value.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BridgeConfig {
    /// Overlay `AAP_*` variables from `lookup` onto this config.
    ///
    /// Only variables that are present override file values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = non_empty(lookup("AAP_BASE_URL")) {
            self.base_url = url;
        }
        if let Some(token) = non_empty(lookup("AAP_TOKEN")) {
            self.token = Some(token);
        }
        if let Some(user) = non_empty(lookup("AAP_USERNAME")) {
            self.username = Some(user);
        }
        if let Some(pass) = non_empty(lookup("AAP_PASSWORD")) {
            self.password = Some(pass);
        }
        if let Some(verify) = non_empty(lookup("AAP_VERIFY_SSL")) {
            self.verify_ssl = parse_flag(&verify);
        }
        if let Some(timeout) = non_empty(lookup("AAP_TIMEOUT_SEC")) {
            self.timeout_sec = timeout
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
        }
        Ok(())
    }

    /// Validate and build the shared connection settings.
    pub fn connection(&self) -> Result<RemoteConnection, ConfigError> {
        let raw = self.base_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let base_url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidBaseUrl(raw.to_string(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host().is_none() {
            return Err(ConfigError::InvalidBaseUrl(
                raw.to_string(),
                "expected an http(s) URL with a host".into(),
            ));
        }

        let credential = self.credential()?;

        if self.timeout_sec == 0 {
            return Err(ConfigError::InvalidTimeout("0".into()));
        }

        RemoteConnection::new(
            base_url,
            credential,
            self.verify_ssl,
            Duration::from_secs(self.timeout_sec),
        )
        .map_err(|e| ConfigError::InvalidBaseUrl(raw.to_string(), e.to_string()))
    }

    fn credential(&self) -> Result<Credential, ConfigError> {
        if let Some(token) = non_empty(self.token.clone()) {
            return Ok(Credential::Token(token));
        }
        match (
            non_empty(self.username.clone()),
            non_empty(self.password.clone()),
        ) {
            (Some(username), Some(password)) => Ok(Credential::Basic { username, password }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_and_builds_token_connection() {
        let mut cfg = BridgeConfig::default();
        cfg.apply_env(env(&[
            ("AAP_BASE_URL", "https://aap.example.com/"),
            ("AAP_TOKEN", "tok"),
            ("AAP_USERNAME", "admin"),
            ("AAP_PASSWORD", "pw"),
            ("AAP_VERIFY_SSL", "no"),
            ("AAP_TIMEOUT_SEC", "12"),
        ]))
        .unwrap();

        let conn = cfg.connection().unwrap();
        assert_eq!(conn.credential, Credential::Token("tok".into()));
        assert!(!conn.verify_tls);
        assert_eq!(conn.timeout, Duration::from_secs(12));
        assert_eq!(conn.api_root().as_str(), "https://aap.example.com/api/v2/");
    }

    #[test]
    fn basic_auth_when_no_token() {
        let mut cfg = BridgeConfig::default();
        cfg.apply_env(env(&[
            ("AAP_BASE_URL", "http://localhost:8052"),
            ("AAP_TOKEN", ""),
            ("AAP_USERNAME", "admin"),
            ("AAP_PASSWORD", "pw"),
        ]))
        .unwrap();

        let conn = cfg.connection().unwrap();
        assert_eq!(
            conn.credential,
            Credential::Basic {
                username: "admin".into(),
                password: "pw".into()
            }
        );
        assert!(conn.verify_tls);
        assert_eq!(conn.timeout, Duration::from_secs(30));
    }

    #[test]
    fn verify_flag_parsing() {
        for v in ["1", "true", "TRUE", "yes", "y"] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["0", "false", "no", "off", ""] {
            assert!(!parse_flag(v), "{v}");
        }
    }

    #[test]
    fn missing_settings_are_errors() {
        let cfg = BridgeConfig::default();
        assert!(matches!(cfg.connection(), Err(ConfigError::MissingBaseUrl)));

        let cfg = BridgeConfig {
            base_url: "https://aap.example.com".into(),
            username: Some("admin".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.connection(), Err(ConfigError::MissingCredentials)));

        let cfg = BridgeConfig {
            base_url: "ftp://aap.example.com".into(),
            token: Some("t".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.connection(), Err(ConfigError::InvalidBaseUrl(..))));

        let cfg = BridgeConfig {
            base_url: "https://aap.example.com".into(),
            token: Some("t".into()),
            timeout_sec: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.connection(), Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn bad_timeout_env_is_rejected() {
        let mut cfg = BridgeConfig::default();
        let err = cfg
            .apply_env(env(&[("AAP_TIMEOUT_SEC", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(v) if v == "soon"));
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = BridgeConfig {
            token: Some("sekrit".into()),
            password: Some("hunter2".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("sekrit"));
        assert!(!rendered.contains("hunter2"));
    }
}
