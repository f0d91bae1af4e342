//! Object store client.
//!
//! Uploads finished artifacts to an external object store at a
//! deterministic path (`diagrams/{session_id}/{uuid}.{ext}`) and returns
//! the public URL. Transient failures (HTTP 5xx, transport errors) retry
//! with jittered exponential backoff; 4xx responses and exhausted retries
//! are permanent. The orchestrator treats permanent failure as a signal to
//! deliver the artifact inline, never as a request error.

use std::time::Duration;

use rand::Rng;
use uuid::Uuid;

use dg_core::RenderedArtifact;

/// Upload failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected the object (4xx). Not retried.
    #[error("store rejected upload: {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
    /// Retries exhausted on transient failures.
    #[error("upload failed after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// The final transient error.
        last_error: String,
    },
}

/// Object store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store base URL.
    pub url: String,
    /// Bucket name.
    pub bucket: String,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
    /// Maximum attempts.
    pub max_attempts: u32,
    /// Base backoff, doubled per attempt with ±25% jitter.
    pub base_backoff: Duration,
}

impl StoreConfig {
    /// Config with the standard timings.
    #[must_use]
    pub fn new(url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bucket: bucket.into(),
            attempt_timeout: Duration::from_secs(5),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// HTTP client for the object store.
pub struct ObjectStoreClient {
    config: StoreConfig,
    client: reqwest::Client,
}

impl ObjectStoreClient {
    /// Create a client.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Upload an artifact, returning its public URL.
    ///
    /// # Errors
    ///
    /// [`StoreError::Rejected`] on a 4xx response, [`StoreError::Exhausted`]
    /// when all attempts fail transiently.
    pub async fn upload(
        &self,
        artifact: &RenderedArtifact,
        session_id: &str,
    ) -> Result<String, StoreError> {
        let path = object_path(session_id, artifact.extension());
        let url = format!(
            "{}/{}/{path}",
            self.config.url.trim_end_matches('/'),
            self.config.bucket
        );

        let mut last_error = String::new();
        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(self.config.base_backoff, attempt)).await;
            }

            let result = self
                .client
                .put(&url)
                .timeout(self.config.attempt_timeout)
                .header("content-type", &artifact.content_type)
                .body(artifact.body.as_bytes().to_vec())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, attempt, "artifact uploaded");
                    return Ok(url);
                }
                Ok(response) if response.status().is_client_error() => {
                    return Err(StoreError::Rejected {
                        status: response.status().as_u16(),
                    });
                }
                Ok(response) => {
                    last_error = format!("status {}", response.status());
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }
            tracing::debug!(url = %url, attempt, error = %last_error, "upload attempt failed");
        }

        Err(StoreError::Exhausted {
            attempts: self.config.max_attempts,
            last_error,
        })
    }
}

/// Deterministic object path for an upload.
fn object_path(session_id: &str, extension: &str) -> String {
    format!("diagrams/{session_id}/{}.{extension}", Uuid::new_v4())
}

/// Exponential backoff with ±25% jitter: `base * 2^(attempt-1)`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1 << (attempt - 1));
    let jitter = rand::rng().random_range(0.75..=1.25);
    exp.mul_f64(jitter)
}
