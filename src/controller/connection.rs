//! Immutable connection settings for the automation controller.

use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// API root appended to the configured base URL.
pub const API_PREFIX: &str = "api/v2/";

/// Credential applied to every controller request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth2 / personal access token, sent as `Authorization: Bearer`.
    Token(String),
    /// HTTP basic auth.
    Basic { username: String, password: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Validated connection to the controller, shared read-only by all handlers.
#[derive(Debug, Clone)]
pub struct RemoteConnection {
    base_url: Url,
    api_root: Url,
    pub credential: Credential,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl RemoteConnection {
    /// Build a connection from an already-parsed base URL.
    ///
    /// The API root is always `{base_url}/api/v2/`, regardless of whether
    /// the base URL carries a trailing slash or a path prefix.
    pub fn new(
        base_url: Url,
        credential: Credential,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self, UrlError> {
        let mut root = base_url.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let api_root = root
            .join(API_PREFIX)
            .map_err(|e| UrlError::new(base_url.as_str(), e))?;

        Ok(Self {
            base_url,
            api_root,
            credential,
            verify_tls,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Resolve a request path against the API root.
    ///
    /// Relative paths (`jobs/`) land under the API root; absolute paths
    /// (`/api/v2/jobs/?page=2`) and full URLs, as found in pagination
    /// links, are resolved against the host. The result must stay on the
    /// configured origin (scheme, host and port), since credentials are
    /// attached to every request.
    pub fn resolve(&self, path: &str) -> Result<Url, UrlError> {
        let url = self.api_root.join(path).map_err(|e| UrlError::new(path, e))?;
        if url.origin() != self.api_root.origin() {
            return Err(UrlError::new(
                path,
                format!(
                    "points outside the controller origin {}",
                    self.api_root.origin().ascii_serialization()
                ),
            ));
        }
        Ok(url)
    }
}

/// A path could not be joined onto the API root.
#[derive(Debug, thiserror::Error)]
#[error("invalid controller URL '{input}': {reason}")]
pub struct UrlError {
    pub input: String,
    pub reason: String,
}

impl UrlError {
    fn new(input: &str, reason: impl fmt::Display) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
