//! Authenticated HTTP transport for the automation controller REST API.

use crate::controller::connection::{Credential, RemoteConnection};
use crate::controller::error::TransportError;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

// -- Request / response types -----------------------------------------------

/// One call against the controller API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API root, or an absolute link returned by the
    /// controller.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Look up a query parameter by name.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A successful (2xx) controller response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a 200 response carrying a JSON document.
    pub fn json_ok(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body)
            .map_err(|e| TransportError::InvalidResponse(format!("invalid JSON body: {e}")))
    }
}

// -- Transport abstraction ---------------------------------------------------

/// Anything that can carry an [`ApiRequest`] to the controller.
///
/// Non-2xx responses must come back as `Err`, already classified.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}

// -- HTTP implementation -----------------------------------------------------

/// Controller client backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    connection: Arc<RemoteConnection>,
    http: reqwest::Client,
}

impl ControllerClient {
    /// Create a client for the given connection.
    ///
    /// The timeout and TLS policy are fixed here for the life of the client.
    pub fn new(connection: Arc<RemoteConnection>) -> Result<Self, TransportError> {
        if !connection.verify_tls {
            warn!(
                "TLS certificate verification is DISABLED for {}",
                connection.base_url()
            );
        }

        let http = reqwest::Client::builder()
            .timeout(connection.timeout)
            .danger_accept_invalid_certs(!connection.verify_tls)
            .user_agent(concat!("aap-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { connection, http })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.connection.timeout)
        } else if err.is_decode() || err.is_body() {
            TransportError::InvalidResponse(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ControllerClient {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self
            .connection
            .resolve(&request.path)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        debug!("Controller {} {}", request.method, url);

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder = match &self.connection.credential {
            Credential::Token(token) => builder.bearer_auth(token),
            Credential::Basic { username, password } => {
                builder.basic_auth(username, Some(password))
            }
        };

        let resp = builder.send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            debug!("Controller {} {} failed ({})", request.method, url, status);
            return Err(TransportError::from_status(
                status.as_u16(),
                url.as_str(),
                &body,
            ));
        }

        Ok(RawResponse::new(status.as_u16(), body))
    }
}
