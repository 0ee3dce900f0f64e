// src/validate/row.rs
// =============================================================================
// Validates one resource row.
//
// Each row walks through these stages:
//
//   Pending -> ProbingPrimary -> (ProbingSecondary) -> ResolvingLicense -> Done
//
// - Pending: a row without a primary link goes straight to Done, inactive
// - ProbingPrimary: HEAD/GET the primary link
// - ProbingSecondary: only when the primary is live and a secondary link
//   exists; both must be live
// - ResolvingLicense: whenever the primary link points into a GitHub repo,
//   whatever the probes said
// - Done: "Active" and "Last Checked" are written together
//
// Failures here are data. Nothing in this file returns an error: a broken
// link becomes `active = false` plus a RowFailure for the run summary.
// =============================================================================

use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::checker::{ProbeDetail, ProbeOutcome, Prober, RetryPolicy, Transport, Verdict};
use crate::dataset::{CheckStamp, ResourceOverride, ResourceRecord, RowUpdate, TIMESTAMP_FORMAT};
use crate::github::{extract_repo, ApiEndpoints, CommitLookup, LicenseLookup, LicenseResolver, UrlKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Pending,
    ProbingPrimary,
    ProbingSecondary,
    ResolvingLicense,
    Done,
}

// Why a row ended up inactive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The row has no primary link at all
    MissingLink,
    /// Confirmed 404
    NotFound,
    /// Retries ran out without a usable answer
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub url: String,
    pub status: ProbeDetail,
    pub reason: FailureReason,
}

impl RowFailure {
    fn missing_link() -> Self {
        Self {
            url: String::new(),
            status: ProbeDetail::Error("no primary link".to_string()),
            reason: FailureReason::MissingLink,
        }
    }

    fn from_probe(outcome: &ProbeOutcome) -> Self {
        let reason = match outcome.verdict {
            Verdict::NotFound => FailureReason::NotFound,
            _ => FailureReason::Unreachable,
        };
        Self {
            url: outcome.url.clone(),
            status: outcome.detail.clone(),
            reason,
        }
    }
}

// Everything we learned about one row
#[derive(Debug, Clone)]
pub struct RowOutcome {
    /// 1-based data row number (header not counted)
    pub row_num: usize,
    pub name: String,
    pub url: String,
    /// What the probes found. A forced override value only shows up in `update`.
    pub active: bool,
    /// Present exactly when `active` is false
    pub failure: Option<RowFailure>,
    pub license: Option<LicenseLookup>,
    pub last_modified: Option<String>,
    pub update: RowUpdate,
}

// Timestamp for "Last Checked"
pub fn now_stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

// Forced override values for a row, validated or not.
// A forced "Active" keeps the row's "Last Checked" if that one is locked.
pub fn forced_update(record: &ResourceRecord, overrides: &ResourceOverride) -> RowUpdate {
    let check = overrides.active.map(|active| CheckStamp {
        active,
        checked_at: if overrides.last_checked_locked {
            record.last_checked.clone()
        } else {
            now_stamp()
        },
    });
    RowUpdate {
        check,
        license: overrides.license.clone(),
        description: overrides.description.clone(),
        ..RowUpdate::new(record.id.as_str())
    }
}

// Prober, license resolver and commit lookup for one run.
// The license cache lives inside and dies with it.
pub struct Validator {
    prober: Prober,
    licenses: LicenseResolver,
    commits: CommitLookup,
}

impl Validator {
    pub fn new(transport: Arc<dyn Transport>, endpoints: ApiEndpoints, policy: RetryPolicy) -> Self {
        Self {
            prober: Prober::new(transport.clone(), endpoints.clone(), policy),
            licenses: LicenseResolver::new(transport.clone(), endpoints.clone(), policy),
            commits: CommitLookup::new(transport, endpoints),
        }
    }

    pub fn licenses(&self) -> &LicenseResolver {
        &self.licenses
    }

    pub async fn validate_row(
        &self,
        row_num: usize,
        record: &ResourceRecord,
        overrides: Option<&ResourceOverride>,
    ) -> RowOutcome {
        let locks = overrides.cloned().unwrap_or_default();

        let mut primary: Option<ProbeOutcome> = None;
        let mut secondary: Option<ProbeOutcome> = None;
        let mut license: Option<LicenseLookup> = None;
        let mut last_modified: Option<String> = None;

        let mut stage = Stage::Pending;
        while stage != Stage::Done {
            stage = match stage {
                Stage::Pending => match record.primary_url() {
                    Some(_) => Stage::ProbingPrimary,
                    None => Stage::Done,
                },
                Stage::ProbingPrimary => {
                    let Some(url) = record.primary_url() else {
                        break;
                    };
                    let outcome = self.prober.probe(url).await;
                    let live = outcome.is_live();
                    if live && !locks.last_modified_locked {
                        last_modified = self.last_modified(&outcome).await;
                    }
                    primary = Some(outcome);

                    match (live, record.secondary_url()) {
                        (true, Some(_)) => Stage::ProbingSecondary,
                        _ => Stage::ResolvingLicense,
                    }
                }
                Stage::ProbingSecondary => {
                    if let Some(url) = record.secondary_url() {
                        secondary = Some(self.prober.probe(url).await);
                    }
                    Stage::ResolvingLicense
                }
                Stage::ResolvingLicense => {
                    if !locks.license_locked {
                        if let Some(repo) = record.primary_url().and_then(extract_repo) {
                            license = Some(self.licenses.resolve(&repo).await);
                        }
                    }
                    Stage::Done
                }
                Stage::Done => Stage::Done,
            };
        }

        let failure = match (&primary, &secondary) {
            (None, _) => Some(RowFailure::missing_link()),
            (Some(p), _) if !p.is_live() => Some(RowFailure::from_probe(p)),
            (_, Some(s)) if !s.is_live() => Some(RowFailure::from_probe(s)),
            _ => None,
        };
        let active = failure.is_none();

        let mut update = forced_update(record, &locks);
        if update.check.is_none() && !locks.check_locked() {
            update.check = Some(CheckStamp {
                active,
                checked_at: now_stamp(),
            });
        }
        if update.license.is_none() {
            update.license = license
                .as_ref()
                .filter(|l| l.is_definitive())
                .map(|l| l.to_string());
        }
        update.last_modified = last_modified.clone();

        match &failure {
            None => info!(
                "  ✅ OK: Status {}",
                primary.as_ref().map(|p| p.detail.to_string()).unwrap_or_default()
            ),
            Some(f) => info!("  ❌ BROKEN: {} - Status {}", f.url, f.status),
        }
        if let Some(lookup) = &license {
            info!("  📄 License: {}", lookup);
        }

        RowOutcome {
            row_num,
            name: record.display_name.clone(),
            url: record.primary_link.trim().to_string(),
            active,
            failure,
            license,
            last_modified,
            update,
        }
    }

    async fn last_modified(&self, outcome: &ProbeOutcome) -> Option<String> {
        match &outcome.classified.kind {
            UrlKind::GitHubContent { repo, branch, path } => {
                self.commits.last_modified(repo, path, branch).await
            }
            UrlKind::Generic => None,
        }
    }
}
