// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - HEAD for ordinary links (lightweight, no body download)
// - GET against the contents API for GitHub blob links
//   (the API has no cheap existence check)
// - 404 is final; other 4xx and network errors are retried with backoff
// - Everything else (2xx, 3xx, even 5xx) counts as reachable
//
// Rust concepts:
// - async/await: For network I/O and backoff sleeps
// - Enums: To represent the verdict and the detail we report
// - Arc<dyn Trait>: Shared ownership of the transport
// =============================================================================

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::retry::RetryPolicy;
use super::transport::{Method, Transport};
use crate::github::{ApiEndpoints, Classified, UrlKind};

// Final answer for one link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Responded with something other than a client error
    Live,
    /// Confirmed gone (404), never retried
    NotFound,
    /// Kept failing (rate limits, other 4xx, network) until retries ran out
    Unreachable,
}

// What we record next to the verdict: a status code when we got a response,
// an error message when we didn't
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeDetail {
    Status(u16),
    Error(String),
}

impl fmt::Display for ProbeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeDetail::Status(code) => write!(f, "{}", code),
            ProbeDetail::Error(message) => f.write_str(message),
        }
    }
}

// Result of probing a single link
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// The link as it appears in the dataset
    pub url: String,
    /// What was actually requested, and why
    pub classified: Classified,
    pub verdict: Verdict,
    pub detail: ProbeDetail,
    /// Number of requests issued (1 + retries)
    pub attempts: u32,
}

impl ProbeOutcome {
    pub fn is_live(&self) -> bool {
        self.verdict == Verdict::Live
    }
}

// How a single HTTP status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Live,
    NotFound,
    Transient,
}

// HTTP status codes:
// - 404: Not found, definitive
// - 400-499 (including 429): might go away, retry
// - anything else: reachable. A 500 still means a server answered,
//   so it is not reported as a broken link.
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status == StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status.is_client_error() {
        StatusClass::Transient
    } else {
        StatusClass::Live
    }
}

// Probes links with bounded retries
//
// One Prober is built per run and shared by every row.
pub struct Prober {
    transport: Arc<dyn Transport>,
    endpoints: ApiEndpoints,
    policy: RetryPolicy,
}

impl Prober {
    pub fn new(transport: Arc<dyn Transport>, endpoints: ApiEndpoints, policy: RetryPolicy) -> Self {
        Self {
            transport,
            endpoints,
            policy,
        }
    }

    // Checks a single link
    //
    // Loops at most `max_retries + 1` times. The loop exits early on a live
    // response or a 404; otherwise it sleeps according to the retry policy
    // and tries again, remembering the last failure for the report.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let classified = self.endpoints.classify(url);
        let method = match classified.kind {
            UrlKind::GitHubContent { .. } => Method::Get,
            UrlKind::Generic => Method::Head,
        };

        let mut attempt = 0;
        loop {
            let failure = match self.transport.send(method, &classified.target).await {
                Ok(response) => {
                    let code = response.status.as_u16();
                    match classify_status(response.status) {
                        StatusClass::Live => {
                            return self.finish(url, classified, Verdict::Live, ProbeDetail::Status(code), attempt);
                        }
                        StatusClass::NotFound => {
                            return self.finish(url, classified, Verdict::NotFound, ProbeDetail::Status(code), attempt);
                        }
                        StatusClass::Transient => ProbeDetail::Status(code),
                    }
                }
                Err(error) => ProbeDetail::Error(error.to_string()),
            };

            if !self.policy.should_retry(attempt) {
                warn!(
                    url,
                    attempts = self.policy.max_attempts(),
                    detail = %failure,
                    "giving up after retries"
                );
                return self.finish(url, classified, Verdict::Unreachable, failure, attempt);
            }

            let delay = self.policy.wait(attempt).await;
            info!(
                url,
                detail = %failure,
                "⚠️  retried after {:.1}s",
                delay.as_secs_f64()
            );
            attempt += 1;
        }
    }

    fn finish(
        &self,
        url: &str,
        classified: Classified,
        verdict: Verdict,
        detail: ProbeDetail,
        attempt: u32,
    ) -> ProbeOutcome {
        ProbeOutcome {
            url: url.to_string(),
            classified,
            verdict,
            detail,
            attempts: attempt + 1,
        }
    }
}
