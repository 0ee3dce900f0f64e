// src/github/mod.rs
// =============================================================================
// This module holds everything GitHub-specific.
//
// - url: Recognizing GitHub links and building REST API endpoints
// - license: Repository license lookup with a per-run cache
// - commits: Last-modified date of a file via the commits API
//
// Unauthenticated API calls are limited to 60 per hour; set GITHUB_TOKEN
// to raise that for full runs.
// =============================================================================

mod commits;
mod license;
mod url;

pub use commits::CommitLookup;
pub use license::{LicenseLookup, LicenseResolver};
pub use self::url::{extract_repo, ApiEndpoints, Classified, RepoRef, UrlKind, DEFAULT_API_BASE};
