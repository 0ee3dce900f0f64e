// src/github/url.rs
// =============================================================================
// This module recognizes GitHub URLs and turns them into REST API endpoints.
//
// Two questions get answered here:
// - "How should I probe this link?" -> classify()
//   A github.com/<owner>/<repo>/blob/<branch>/<path> link is probed through
//   the contents API; everything else is probed as-is.
// - "Which repository does this link belong to?" -> extract_repo()
//   Used to look up the repository's license.
//
// Rust concepts:
// - Enums with data: UrlKind carries the pieces pulled out of the URL
// - Option<T>: extract_repo returns None for non-GitHub links
// - url::Url: proper parsing instead of string slicing
// =============================================================================

use url::Url;

/// Default base of the GitHub REST API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

// Third path segments that still mean "this link points into a repository".
const REPO_SUBPATHS: &[&str] = &[
    "blob", "tree", "commit", "releases", "issues", "pull", "wiki", "actions", "projects",
    "security", "insights", "pulse", "graphs", "network", "settings",
];

// An owner/repo pair, e.g. ("rust-lang", "rust")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// "owner/repo", the license cache key
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

// What kind of link we are looking at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// Any link we probe directly with HEAD
    Generic,
    /// A file inside a GitHub repository, probed through the contents API
    GitHubContent {
        repo: RepoRef,
        branch: String,
        path: String,
    },
}

// Result of classify(): the URL to actually request, plus what it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub target: String,
    pub kind: UrlKind,
}

// Builds GitHub REST API URLs against a configurable base
// (api.github.com normally, a local fake in tests, GHE if someone needs it)
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl ApiEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn contents(&self, repo: &RepoRef, path: &str, branch: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.base, repo.owner, repo.repo, path, branch
        )
    }

    pub fn license(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}/license", self.base, repo.owner, repo.repo)
    }

    pub fn repository(&self, repo: &RepoRef) -> String {
        format!("{}/repos/{}/{}", self.base, repo.owner, repo.repo)
    }

    pub fn latest_commit(&self, repo: &RepoRef, path: &str, branch: &str) -> String {
        format!(
            "{}/repos/{}/{}/commits?path={}&sha={}&per_page=1",
            self.base, repo.owner, repo.repo, path, branch
        )
    }

    // Decides how a link should be probed
    //
    // Example:
    //   https://github.com/o/r/blob/main/docs/a.md
    //   -> https://api.github.com/repos/o/r/contents/docs/a.md?ref=main
    //
    // Never fails: anything that isn't a blob link is Generic and unchanged.
    pub fn classify(&self, url: &str) -> Classified {
        match parse_blob(url) {
            Some((repo, branch, path)) => Classified {
                target: self.contents(&repo, &path, &branch),
                kind: UrlKind::GitHubContent { repo, branch, path },
            },
            None => Classified {
                target: url.to_string(),
                kind: UrlKind::Generic,
            },
        }
    }
}

// Splits a URL into its host and non-empty path segments,
// but only for http(s) URLs on the given GitHub host
fn github_segments(url: &str, host: &str) -> Option<Vec<String>> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let actual = parsed.host_str()?.trim_start_matches("www.");
    if !actual.eq_ignore_ascii_case(host) {
        return None;
    }

    let segments = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some(segments)
}

// github.com/<owner>/<repo>/blob/<branch>/<path...>
fn parse_blob(url: &str) -> Option<(RepoRef, String, String)> {
    let segments = github_segments(url, "github.com")?;
    if segments.len() < 5 || segments[2] != "blob" {
        return None;
    }

    let repo = RepoRef::new(&segments[0], &segments[1]);
    let branch = segments[3].clone();
    let path = segments[4..].join("/");
    Some((repo, branch, path))
}

// Extracts owner and repository name from the GitHub URLs we know about
//
// Supported formats:
//   - https://github.com/owner/repo (optionally with trailing / or .git)
//   - https://github.com/owner/repo/<blob|tree|issues|...>/...
//   - https://gist.github.com/owner/<gist id>
//
// Returns None for anything else (including github.com/owner alone).
pub fn extract_repo(url: &str) -> Option<RepoRef> {
    if let Some(segments) = github_segments(url, "gist.github.com") {
        return match segments.as_slice() {
            [owner, gist, ..] => Some(RepoRef::new(owner, gist)),
            _ => None,
        };
    }

    let segments = github_segments(url, "github.com")?;
    match segments.as_slice() {
        [owner, repo] => Some(RepoRef::new(owner, repo.trim_end_matches(".git"))),
        [owner, repo, section, ..] if REPO_SUBPATHS.contains(&section.as_str()) => {
            Some(RepoRef::new(owner, repo))
        }
        _ => None,
    }
}
