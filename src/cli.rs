// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Subcommands:
// - validate: check every resource in the CSV and rewrite it
// - check: check a single resource without touching the CSV
// - id: print the ID a new resource should get
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Enums: Types that can be one of several variants
// - #[command(flatten)]: share one group of flags between subcommands
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::checker::DEFAULT_MAX_RETRIES;
use crate::github::DEFAULT_API_BASE;

#[derive(Parser, Debug)]
#[command(
    name = "link-curator",
    version,
    about = "Validate the links and licenses of a curated resource list",
    long_about = "link-curator checks every resource link in a CSV resource table, looks up \
                  GitHub licenses, and rewrites the table with fresh Active / Last Checked / \
                  License values. It's meant to run on a schedule in CI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

// HTTP settings shared by every subcommand that talks to the network
#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// GitHub token, raises the API rate limit from 60 to 5000 requests/hour
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15)]
    pub timeout: u64,

    /// Retries after a rate limit or network error
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate every resource in the table and write the results back
    ///
    /// Example: link-curator validate --csv THE_RESOURCES_TABLE.csv --max-links 20
    Validate {
        /// Resource table to validate (rewritten in place)
        #[arg(long, default_value = "THE_RESOURCES_TABLE.csv")]
        csv: PathBuf,

        /// Overrides file; a missing file means no overrides
        #[arg(long, default_value = "templates/resource-overrides.yaml")]
        overrides: PathBuf,

        /// Stop after validating this many rows (the rest are left as they are)
        #[arg(long)]
        max_links: Option<NonZeroUsize>,

        /// CI mode: JSON summary on stdout, report and warnings on stderr
        #[arg(long)]
        github_action: bool,

        /// Shortest pause between two rows, in seconds
        #[arg(long, default_value_t = 2.0)]
        min_delay: f64,

        /// Longest pause between two rows, in seconds
        #[arg(long, default_value_t = 4.0)]
        max_delay: f64,

        /// Exit with code 1 when broken links were found
        #[arg(long)]
        fail_on_broken: bool,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Validate a single resource without touching the table
    ///
    /// Example: link-curator check https://github.com/user/repo --secondary https://example.com
    Check {
        /// Primary link of the resource
        url: String,

        /// Optional secondary link, must also be live
        #[arg(long)]
        secondary: Option<String>,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        http: HttpArgs,
    },

    /// Print the ID for a new resource
    ///
    /// Example: link-curator id --name "My Hook" --link https://github.com/u/r --category Hooks
    Id {
        /// Display name of the resource
        #[arg(long)]
        name: String,

        /// Primary link of the resource
        #[arg(long)]
        link: String,

        /// Category, picks the ID prefix
        #[arg(long, default_value = "")]
        category: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_validate_defaults() {
        let cli = Cli::try_parse_from(["link-curator", "validate", "--max-links", "5"]).unwrap();
        match cli.command {
            Commands::Validate {
                csv,
                max_links,
                github_action,
                min_delay,
                max_delay,
                http,
                ..
            } => {
                assert_eq!(csv, PathBuf::from("THE_RESOURCES_TABLE.csv"));
                assert_eq!(max_links, NonZeroUsize::new(5));
                assert!(!github_action);
                assert_eq!((min_delay, max_delay), (2.0, 4.0));
                assert_eq!(http.max_retries, 3);
                assert_eq!(http.timeout, 15);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_max_links_is_rejected() {
        assert!(Cli::try_parse_from(["link-curator", "validate", "--max-links", "0"]).is_err());
    }

    #[test]
    fn test_check_takes_positional_url() {
        let cli = Cli::try_parse_from([
            "link-curator",
            "check",
            "https://example.com",
            "--secondary",
            "https://example.org",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Check { url, secondary, json, .. } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(secondary.as_deref(), Some("https://example.org"));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
