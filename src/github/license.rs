// src/github/license.rs
// =============================================================================
// Looks up the license of a GitHub repository.
//
// Strategy:
// 1. GET /repos/{owner}/{repo}/license
//    200 -> license.spdx_id (or "UNKNOWN" if GitHub didn't give one)
// 2. On 404, GET /repos/{owner}/{repo} and read its embedded "license"
//    200 with a license -> its spdx_id, anything else -> "NOT_FOUND"
// 3. Rate limits and network errors are retried with the shared backoff;
//    any other failure ends as "ERROR"
//
// Every answer, ERROR included, is cached for the rest of the run so a
// repository linked from many rows is only asked about once.
//
// Rust concepts:
// - tokio::sync::OnceCell: run an async initializer at most once
// - Mutex<HashMap<..>>: the cache itself
// - serde: Deserialize only the JSON fields we need
// =============================================================================

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::url::{ApiEndpoints, RepoRef};
use crate::checker::{HttpResponse, Method, RetryPolicy, Transport};

pub const UNKNOWN: &str = "UNKNOWN";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const ERROR: &str = "ERROR";

// Outcome of a license lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseLookup {
    /// An SPDX id, or "UNKNOWN" when GitHub knows there is a license but not which
    Found(String),
    /// The repository has no license
    NotFound,
    /// We couldn't tell
    Error,
}

impl LicenseLookup {
    /// Whether this answer may replace a license already stored in the dataset
    pub fn is_definitive(&self) -> bool {
        !matches!(self, LicenseLookup::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            LicenseLookup::Found(id) => id,
            LicenseLookup::NotFound => NOT_FOUND,
            LicenseLookup::Error => ERROR,
        }
    }
}

impl fmt::Display for LicenseLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct LicensePayload {
    license: Option<LicenseInfo>,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    spdx_id: Option<String>,
}

impl LicensePayload {
    fn spdx_id(self) -> Option<String> {
        self.license
            .map(|info| info.spdx_id.unwrap_or_else(|| UNKNOWN.to_string()))
    }
}

// Why a single attempt didn't produce an answer
enum AttemptFailure {
    /// Worth another try (rate limit, network)
    Transient(String),
    /// Not worth retrying
    Fatal(String),
}

type Slot = Arc<OnceCell<LicenseLookup>>;

// Resolves and memoizes repository licenses for one run
pub struct LicenseResolver {
    transport: Arc<dyn Transport>,
    endpoints: ApiEndpoints,
    policy: RetryPolicy,
    cache: Mutex<HashMap<String, Slot>>,
}

impl LicenseResolver {
    pub fn new(transport: Arc<dyn Transport>, endpoints: ApiEndpoints, policy: RetryPolicy) -> Self {
        Self {
            transport,
            endpoints,
            policy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of distinct repositories looked up so far
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // Returns the cached answer for owner/repo, fetching it first if needed.
    //
    // Concurrent callers asking for the same repository share one fetch: the
    // first one runs the initializer, the rest wait on the same cell.
    pub async fn resolve(&self, repo: &RepoRef) -> LicenseLookup {
        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.entry(repo.slug()).or_default().clone()
        };

        if let Some(cached) = slot.get() {
            debug!(repo = %repo.slug(), license = %cached, "license cache hit");
            return cached.clone();
        }

        slot.get_or_init(|| self.fetch(repo)).await.clone()
    }

    async fn fetch(&self, repo: &RepoRef) -> LicenseLookup {
        let mut attempt = 0;
        loop {
            match self.attempt(repo).await {
                Ok(lookup) => return lookup,
                Err(AttemptFailure::Fatal(reason)) => {
                    warn!(repo = %repo.slug(), %reason, "license lookup failed");
                    return LicenseLookup::Error;
                }
                Err(AttemptFailure::Transient(reason)) => {
                    if !self.policy.should_retry(attempt) {
                        warn!(
                            repo = %repo.slug(),
                            %reason,
                            retries = self.policy.max_retries,
                            "license lookup gave up after retries"
                        );
                        return LicenseLookup::Error;
                    }
                    let delay = self.policy.wait(attempt).await;
                    info!(repo = %repo.slug(), %reason, "license lookup retried after {:.1}s", delay.as_secs_f64());
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, repo: &RepoRef) -> Result<LicenseLookup, AttemptFailure> {
        let response = self.get(&self.endpoints.license(repo)).await?;
        if response.status.is_success() {
            return spdx_from(&response).map(LicenseLookup::Found);
        }
        if response.status.as_u16() != 404 {
            return Err(unexpected(&response));
        }

        // No license file detected; the repository metadata may still know
        let response = self.get(&self.endpoints.repository(repo)).await?;
        if response.is_rate_limited() {
            return Err(unexpected(&response));
        }
        if response.status.is_success() {
            let payload: LicensePayload = response
                .json()
                .map_err(|e| AttemptFailure::Fatal(format!("invalid repository JSON: {}", e)))?;
            if let Some(id) = payload.spdx_id() {
                return Ok(LicenseLookup::Found(id));
            }
        }
        Ok(LicenseLookup::NotFound)
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, AttemptFailure> {
        self.transport
            .send(Method::Get, url)
            .await
            .map_err(|e| AttemptFailure::Transient(e.to_string()))
    }
}

fn spdx_from(response: &HttpResponse) -> Result<String, AttemptFailure> {
    let payload: LicensePayload = response
        .json()
        .map_err(|e| AttemptFailure::Fatal(format!("invalid license JSON: {}", e)))?;
    Ok(payload.spdx_id().unwrap_or_else(|| UNKNOWN.to_string()))
}

fn unexpected(response: &HttpResponse) -> AttemptFailure {
    let code = response.status.as_u16();
    if response.is_rate_limited() {
        AttemptFailure::Transient(format!("rate limited (HTTP {})", code))
    } else {
        AttemptFailure::Fatal(format!("HTTP {}", code))
    }
}
