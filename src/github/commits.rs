// src/github/commits.rs
// =============================================================================
// Finds when a file in a GitHub repository last changed.
//
// GET /repos/{owner}/{repo}/commits?path=<path>&sha=<branch>&per_page=1
// returns the newest commit touching that path; its committer date becomes
// the resource's "Last Modified" value.
//
// This is opportunistic: one attempt, no retries, any failure just means
// the field is left as it was.
// =============================================================================

use chrono::{DateTime, Local};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::url::{ApiEndpoints, RepoRef};
use crate::checker::{Method, Transport};
use crate::dataset::TIMESTAMP_FORMAT;

#[derive(Debug, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: Option<Signature>,
    author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: Option<String>,
}

pub struct CommitLookup {
    transport: Arc<dyn Transport>,
    endpoints: ApiEndpoints,
}

impl CommitLookup {
    pub fn new(transport: Arc<dyn Transport>, endpoints: ApiEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    // Returns the last-modified timestamp, already formatted for the CSV
    pub async fn last_modified(&self, repo: &RepoRef, path: &str, branch: &str) -> Option<String> {
        let url = self.endpoints.latest_commit(repo, path, branch);
        let response = match self.transport.send(Method::Get, &url).await {
            Ok(response) if response.status.is_success() => response,
            Ok(response) => {
                debug!(%url, status = response.status.as_u16(), "no commit info");
                return None;
            }
            Err(error) => {
                debug!(%url, %error, "commit lookup failed");
                return None;
            }
        };

        let commits: Vec<CommitEntry> = response.json().ok()?;
        let detail = commits.into_iter().next()?.commit;
        let date = detail
            .committer
            .and_then(|s| s.date)
            .or_else(|| detail.author.and_then(|s| s.date))?;

        format_commit_date(&date)
    }
}

// "2024-03-01T12:30:00Z" -> local time in the dataset's timestamp format
fn format_commit_date(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(
        parsed
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::testing::{Reply, ScriptedTransport};

    const COMMITS_URL: &str =
        "https://api.github.com/repos/o/r/commits?path=docs/a.md&sha=main&per_page=1";

    fn lookup(transport: Arc<ScriptedTransport>) -> CommitLookup {
        CommitLookup::new(transport, ApiEndpoints::default())
    }

    #[tokio::test]
    async fn test_reads_committer_date() {
        let body = r#"[{"sha": "abc", "commit": {"committer": {"date": "2024-03-01T12:30:00Z"}}}]"#;
        let transport = Arc::new(ScriptedTransport::new().always(COMMITS_URL, Reply::Json(200, body.into())));

        let value = lookup(transport)
            .last_modified(&RepoRef::new("o", "r"), "docs/a.md", "main")
            .await;

        let expected = DateTime::parse_from_rfc3339("2024-03-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Local)
            .format(TIMESTAMP_FORMAT)
            .to_string();
        assert_eq!(value, Some(expected));
    }

    #[tokio::test]
    async fn test_empty_history_or_error_is_none() {
        let transport = Arc::new(ScriptedTransport::new().always(COMMITS_URL, Reply::Json(200, "[]".into())));
        let repo = RepoRef::new("o", "r");
        assert_eq!(lookup(transport).last_modified(&repo, "docs/a.md", "main").await, None);

        let transport = Arc::new(ScriptedTransport::new().always(COMMITS_URL, Reply::Status(409)));
        assert_eq!(lookup(transport.clone()).last_modified(&repo, "docs/a.md", "main").await, None);
        assert_eq!(transport.calls_to(COMMITS_URL), 1);
    }

    #[test]
    fn test_bad_date_is_ignored() {
        assert_eq!(format_commit_date("yesterday"), None);
    }
}
