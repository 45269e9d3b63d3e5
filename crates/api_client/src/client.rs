//! Community API HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every request is
//! signed with the `bhesignature` scheme over the exact method, path,
//! timestamp and body bytes that are sent.

use std::fmt;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::signer::{self, SignedHeaders, HEADER_REQUEST_DATE, HEADER_SIGNATURE};

pub const VERSION_PATH: &str = "/api/version";
pub const SAVED_QUERIES_PATH: &str = "/api/v2/saved-queries";

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Source of the `RequestDate` value for each request.
pub type Clock = fn() -> String;

/// Error type for API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    /// Transport failure (DNS, refused connection, TLS, timeout)
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx status where a typed result was required
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    /// Response body did not match the expected schema
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Request body could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(String),
}

/// Raw response: status and body, no interpretation.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text (lossy UTF-8).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body into a typed schema.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
    }

    fn require_success(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            let body = self.text();
            Err(ClientError::Http(self.status, body))
        }
    }
}

/// API and server version reported by `/api/version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    pub api_version: String,
    pub server_version: String,
}

/// Saved-query identifier. The server assigns it; integers in practice.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QueryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryId::Number(n) => write!(f, "{}", n),
            QueryId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A saved query as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedQuery {
    pub id: QueryId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub query: String,
}

/// Body of a create request, `{name, query}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSavedQuery {
    pub name: String,
    pub query: String,
}

// ── Response schemas ────────────────────────────────────────────────

#[derive(Deserialize)]
struct VersionEnvelope {
    data: VersionData,
}

#[derive(Deserialize)]
struct VersionData {
    #[serde(rename = "API")]
    api: ApiInfo,
    server_version: String,
}

#[derive(Deserialize)]
struct ApiInfo {
    current_version: String,
}

#[derive(Deserialize)]
struct SavedQueryList {
    data: Vec<SavedQuery>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Signed Community API client (blocking).
#[derive(Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    scheme: String,
    host: String,
    port: u16,
    credentials: Credentials,
    clock: Clock,
}

impl Client {
    /// Create a client for `{scheme}://{host}:{port}`.
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
    ) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            http,
            scheme: scheme.into(),
            host: host.into(),
            port,
            credentials,
            clock: signer::request_timestamp,
        })
    }

    /// Replace the clock that stamps `RequestDate`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Absolute URL for `path`. A single leading slash is dropped.
    pub fn format_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}://{}:{}/{}", self.scheme, self.host, self.port, path)
    }

    /// Send a signed request and return the raw response, whatever its status.
    ///
    /// The signature covers `path` as given (not the stripped form used in
    /// the URL) and exactly the `body` bytes that are sent.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.format_url(path);
        let timestamp = (self.clock)();
        let signed = SignedHeaders::new(&self.credentials, method.as_str(), path, timestamp, body);

        tracing::debug!(method = %method, url = %url, "sending signed request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(reqwest::header::AUTHORIZATION, signed.authorization)
            .header(HEADER_REQUEST_DATE, signed.request_date)
            .header(HEADER_SIGNATURE, signed.signature)
            .header(USER_AGENT, signed.user_agent)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.body(body.to_vec());
        }

        let response = req.send().map_err(|e| ClientError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| ClientError::Network(e.to_string()))?
            .to_vec();

        tracing::debug!(method = %method, url = %url, status, "response received");

        Ok(ApiResponse { status, body })
    }

    /// Fetch API and server version. Confirms connectivity and credentials.
    pub fn get_version(&self) -> Result<ApiVersion, ClientError> {
        let envelope: VersionEnvelope = self
            .request(Method::GET, VERSION_PATH, None)?
            .require_success()?
            .json()?;

        Ok(ApiVersion {
            api_version: envelope.data.api.current_version,
            server_version: envelope.data.server_version,
        })
    }

    /// List every saved query visible to the token.
    pub fn list_saved_queries(&self) -> Result<Vec<SavedQuery>, ClientError> {
        let list: SavedQueryList = self
            .request(Method::GET, SAVED_QUERIES_PATH, None)?
            .require_success()?
            .json()?;
        Ok(list.data)
    }

    /// Create a saved query. The body is serialized once; those bytes are
    /// both signed and sent.
    pub fn create_saved_query(&self, query: &NewSavedQuery) -> Result<ApiResponse, ClientError> {
        let body = serde_json::to_vec(query).map_err(|e| ClientError::Encode(e.to_string()))?;
        self.request(Method::POST, SAVED_QUERIES_PATH, Some(&body))
    }

    /// Delete a saved query by id.
    pub fn delete_saved_query(&self, id: &QueryId) -> Result<ApiResponse, ClientError> {
        let path = format!("{}/{}", SAVED_QUERIES_PATH, id);
        self.request(Method::DELETE, &path, None)
    }
}
