// SPDX-License-Identifier: MIT
//! Typed async client for one workspace's management and SQL APIs.
//!
//! One instance per workspace (source or target), shared across worker tasks
//! behind an `Arc`. reqwest's client is internally pooled and thread-safe, so
//! no locking happens at this layer.
//!
//! Platform errors are surfaced as [`ApiError`] variants rather than raw HTTP
//! failures: the replication tasks branch on `AlreadyExists` / `NotFound` /
//! `BadRequest` the way the original exception taxonomy did, without ever
//! string-matching response bodies themselves.

pub mod catalog;
pub mod sharing;
pub mod sql;

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Error surface of the workspace APIs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("workspace API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// The original scripts treat `BadRequest` on share/recipient/catalog
    /// creation as "already exists"; both variants take the same branch.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ApiError::AlreadyExists(_) | ApiError::BadRequest(_))
    }
}

/// Error body shape returned by the platform: `{"error_code": ..., "message": ...}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map an HTTP status plus platform error code onto the taxonomy.
///
/// The error code wins over the status: the platform reports some
/// already-exists conflicts as 400, not 409.
fn classify(status: StatusCode, code: Option<&str>, message: String) -> ApiError {
    let code = code.unwrap_or_default();
    if code.contains("ALREADY_EXISTS") || status == StatusCode::CONFLICT {
        return ApiError::AlreadyExists(message);
    }
    if code.contains("DOES_NOT_EXIST") || code == "NOT_FOUND" || status == StatusCode::NOT_FOUND {
        return ApiError::NotFound(message);
    }
    match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
        StatusCode::FORBIDDEN => ApiError::PermissionDenied(message),
        _ => ApiError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Async client for one workspace.
#[derive(Debug)]
pub struct WorkspaceClient {
    base: String,
    token: String,
    http: reqwest::Client,
}

impl WorkspaceClient {
    /// Build a client for `host` (scheme optional) authenticating with a
    /// bearer token.
    pub fn new(host: &str, token: &str) -> Result<Self, ApiError> {
        let host = host.trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base,
            token: token.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        Self::into_json(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let resp = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::into_json(resp).await
    }

    pub(crate) async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "PATCH");
        let resp = self
            .http
            .patch(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::into_json(resp).await
    }

    async fn into_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }
        let text = resp.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body.message.unwrap_or(text);
        Err(classify(status, body.error_code.as_deref(), message))
    }
}
