// src/config.rs
// =============================================================================
// Runtime configuration built from the command line (and the GITHUB_TOKEN /
// GITHUB_API_URL environment variables clap reads for us).
// =============================================================================

use std::time::Duration;

use crate::checker::RetryPolicy;
use crate::cli::HttpArgs;
use crate::github::ApiEndpoints;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub api_base: String,
    pub github_token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl HttpConfig {
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints::new(&self.api_base)
    }
}

impl From<&HttpArgs> for HttpConfig {
    fn from(args: &HttpArgs) -> Self {
        Self {
            api_base: args.api_base.clone(),
            // an exported-but-empty GITHUB_TOKEN is the same as none
            github_token: args
                .github_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            timeout: Duration::from_secs(args.timeout.max(1)),
            user_agent: format!("link-curator/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryPolicy::with_max_retries(args.max_retries),
        }
    }
}
