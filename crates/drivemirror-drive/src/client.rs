//! Google Drive v3 API client
//!
//! Provides a typed HTTP client for the Drive `files` resource. Handles the
//! bearer authorization header, JSON (de)serialization, error classification
//! and the retry of transient failures.
//!
//! Reads (`list`, `metadata`) are retried on any transient failure. Writes
//! (`create`, `copy`) are retried only when the server throttled them, since
//! a 5xx or a dropped connection may hide a request that was applied.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivemirror_drive::client::DriveClient;
//!
//! # async fn example() -> Result<(), drivemirror_drive::DriveError> {
//! let client = DriveClient::new("access-token-here");
//! let root = client.get_file("root").await?;
//! println!("root folder id: {}", root.id);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use drivemirror_core::config::DEFAULT_DRIVE_BASE_URL;

use crate::rate_limit::{parse_retry_after, AdaptiveRateLimiter, RetryPolicy};
use crate::DriveError;

/// MIME type Drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested for single-file responses
const FILE_FIELDS: &str = "id,name,mimeType";

/// Fields requested for listing responses
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

/// 403 reasons that mean "slow down" rather than "not allowed"
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// Endpoint categories whose requests are safe to send more than once
const REPLAYABLE_CATEGORIES: &[&str] = &["list", "metadata"];

/// Upper bound for a single HTTP exchange
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Drive API wire types
// ============================================================================

/// A file resource, trimmed to the fields DriveMirror requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of `files.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderBody<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct CopyBody<'a> {
    parents: [&'a str; 1],
}

/// `{"error": {"message": ..., "errors": [{"reason": ...}]}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive v3 API calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction. Every request goes through [`DriveClient::execute_with_retry`],
/// which applies the optional [`AdaptiveRateLimiter`] and the [`RetryPolicy`].
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: String,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("rate_limiter", &self.rate_limiter.is_some())
            .field("retry_policy", &self.retry_policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl DriveClient {
    /// Creates a client against the public Drive endpoint
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, DEFAULT_DRIVE_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token with a Drive scope
    /// * `base_url` - Base URL without trailing slash, e.g. `http://127.0.0.1:4000`
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            rate_limiter: None,
            retry_policy: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a shared adaptive rate limiter
    pub fn with_rate_limiter(mut self, limiter: Arc<AdaptiveRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Replaces the retry policy for transient failures
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Aborts rate-limit and backoff waits once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn rate_limiter(&self) -> Option<&Arc<AdaptiveRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
    }

    /// Fetches a single file resource
    ///
    /// `id` may be the `root` alias, in which case Drive answers with the
    /// concrete id of the user's root folder.
    pub async fn get_file(&self, id: &str) -> Result<DriveFile, DriveError> {
        debug!(id, "GET /files/{{id}}");
        let path = format!("/files/{}", id);
        let response = self
            .execute_with_retry("metadata", || {
                self.request(Method::GET, &path)
                    .query(&[("fields", FILE_FIELDS)])
            })
            .await?;
        decode(response).await
    }

    /// Runs one `files.list` query and returns a single page
    ///
    /// # Arguments
    /// * `query` - Drive query expression (`q` parameter)
    /// * `page_size` - Items per page
    /// * `page_token` - Cursor from a previous page
    pub async fn list_files(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<FileList, DriveError> {
        debug!(query, page_size, has_token = page_token.is_some(), "GET /files");
        let page_size = page_size.to_string();
        let response = self
            .execute_with_retry("list", || {
                let mut params = vec![
                    ("q", query),
                    ("pageSize", page_size.as_str()),
                    ("orderBy", "folder"),
                    ("fields", LIST_FIELDS),
                ];
                if let Some(token) = page_token {
                    params.push(("pageToken", token));
                }
                self.request(Method::GET, "/files").query(&params)
            })
            .await?;
        decode(response).await
    }

    /// Creates a folder named `name` inside `parent_id`
    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile, DriveError> {
        debug!(name, parent_id, "POST /files (folder)");
        let body = CreateFolderBody {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: [parent_id],
        };
        let response = self
            .execute_with_retry("create", || {
                self.request(Method::POST, "/files")
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await?;
        decode(response).await
    }

    /// Copies `file_id` into `parent_id`, keeping its name
    pub async fn copy_file(&self, file_id: &str, parent_id: &str) -> Result<DriveFile, DriveError> {
        debug!(file_id, parent_id, "POST /files/{{id}}/copy");
        let path = format!("/files/{}/copy", file_id);
        let body = CopyBody {
            parents: [parent_id],
        };
        let response = self
            .execute_with_retry("copy", || {
                self.request(Method::POST, &path)
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await?;
        decode(response).await
    }

    // ========================================================================
    // Retry handling
    // ========================================================================

    /// Sends a request built by `build`, retrying transient failures.
    ///
    /// Each attempt:
    /// 1. Acquires a token from the rate limiter for `category` (if any)
    /// 2. Sends the request and classifies a non-2xx status into a [`DriveError`]
    /// 3. On a retryable error, notifies the limiter of throttling, waits for
    ///    Retry-After (or the policy backoff, never longer than `max_delay`)
    ///    and tries again
    ///
    /// Permanent errors are returned immediately, as are 5xx and network
    /// errors for categories outside the replayable set. Once `max_retries`
    /// retries have failed the last error is wrapped in
    /// [`DriveError::RetriesExhausted`]. Cancellation interrupts the waits
    /// but never a request in flight.
    pub async fn execute_with_retry<F>(
        &self,
        category: &str,
        build: F,
    ) -> Result<Response, DriveError>
    where
        F: Fn() -> RequestBuilder,
    {
        let replayable = REPLAYABLE_CATEGORIES.contains(&category);
        let mut attempt: u32 = 0;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(DriveError::Cancelled),
                    _ = limiter.acquire(category) => {}
                }
            }
            if self.cancel.is_cancelled() {
                return Err(DriveError::Cancelled);
            }

            let outcome = match build().send().await {
                Ok(response) => check_status(response).await,
                Err(e) => Err(DriveError::NetworkError(e)),
            };

            let err = match outcome {
                Ok(response) => {
                    if let Some(limiter) = &self.rate_limiter {
                        limiter.on_success(category);
                    }
                    if attempt > 0 {
                        info!(category, attempts = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) if err.is_throttle() => err,
                Err(err) if err.is_transient() && replayable => err,
                Err(err) => {
                    if err.is_transient() {
                        warn!(category, error = %err, "Not replaying a write after an ambiguous failure");
                    }
                    return Err(err);
                }
            };

            if err.is_throttle() {
                if let Some(limiter) = &self.rate_limiter {
                    limiter.on_throttle(category);
                }
            }

            if attempt >= self.retry_policy.max_retries {
                warn!(category, attempts = attempt + 1, error = %err, "Retries exhausted");
                return Err(DriveError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: Box::new(err),
                });
            }

            let delay = self.retry_policy.backoff(attempt, err.retry_after());
            warn!(
                category,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(DriveError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

// ============================================================================
// Response helpers
// ============================================================================

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DriveError> {
    response
        .json::<T>()
        .await
        .map_err(|e| DriveError::InvalidResponse(e.to_string()))
}

/// Passes 2xx responses through and turns anything else into a [`DriveError`]
async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();

    Err(classify_error(status, &body, retry_after))
}

/// Maps an error status and body to a [`DriveError`]
pub(crate) fn classify_error(
    status: StatusCode,
    body: &str,
    retry_after: Option<std::time::Duration>,
) -> DriveError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();

    let message = if parsed.message.is_empty() {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string())
    } else {
        parsed.message
    };
    let rate_limited = parsed
        .errors
        .iter()
        .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()));

    match status {
        StatusCode::UNAUTHORIZED => DriveError::Unauthorized(message),
        StatusCode::FORBIDDEN if rate_limited => DriveError::TooManyRequests { retry_after },
        StatusCode::FORBIDDEN => DriveError::Forbidden(message),
        StatusCode::NOT_FOUND => DriveError::NotFound(message),
        StatusCode::CONFLICT => DriveError::Conflict(message),
        StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests { retry_after },
        s if s.is_server_error() => DriveError::ServerError(format!("{}: {}", s.as_u16(), message)),
        s => DriveError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}
