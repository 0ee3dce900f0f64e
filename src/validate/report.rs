// src/validate/report.rs
// =============================================================================
// Turns run results into something people (or CI) can read.
//
// - RunSummary: totals plus the list of broken links, as JSON or a table
// - license_counts: how many resources carry each license
// - CheckReport: result of validating a single resource
// =============================================================================

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;

use super::row::{FailureReason, RowOutcome};
use super::run::RunResult;
use crate::checker::ProbeDetail;
use crate::dataset::ResourceRecord;

#[derive(Debug, Clone, Serialize)]
pub struct BrokenLink {
    pub name: String,
    pub url: String,
    pub row_num: usize,
    pub status: ProbeDetail,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub execution_time: String,
    pub total_links: usize,
    pub active_links: usize,
    pub broken_links: Vec<BrokenLink>,
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub unvalidated: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl RunSummary {
    pub fn new(result: &RunResult, started: DateTime<Local>, finished: DateTime<Local>) -> Self {
        let broken_links: Vec<BrokenLink> = result
            .outcomes
            .iter()
            .filter_map(|outcome| {
                outcome.failure.as_ref().map(|failure| BrokenLink {
                    name: outcome.name.clone(),
                    url: if failure.url.is_empty() {
                        outcome.url.clone()
                    } else {
                        failure.url.clone()
                    },
                    row_num: outcome.row_num,
                    status: failure.status.clone(),
                    reason: failure.reason,
                })
            })
            .collect();

        let elapsed = (finished - started).to_std().unwrap_or_default();
        Self {
            timestamp: finished.to_rfc3339(),
            execution_time: format!("{:.1}s", elapsed.as_secs_f64()),
            total_links: result.outcomes.len(),
            active_links: result.outcomes.len() - broken_links.len(),
            broken_links,
            skipped: result.skipped,
            unvalidated: result.unvalidated,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_table(&self) -> String {
        let mut out = String::new();

        if self.broken_links.is_empty() {
            let _ = writeln!(out, "🎉 All {} validated links are working!", self.total_links);
        } else {
            let _ = writeln!(out, "{:<6} {:<40} {:<12} {}", "ROW", "NAME", "STATUS", "URL");
            let _ = writeln!(out, "{}", "=".repeat(100));
            for link in &self.broken_links {
                let _ = writeln!(
                    out,
                    "{:<6} {:<40} {:<12} {}",
                    link.row_num,
                    truncate(&link.name, 38),
                    link.status.to_string(),
                    link.url
                );
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "📊 Summary:");
        let _ = writeln!(out, "   ✅ Active: {}", self.active_links);
        let _ = writeln!(out, "   ❌ Broken: {}", self.broken_links.len());
        let _ = writeln!(out, "   📋 Checked: {}", self.total_links);
        if self.skipped > 0 {
            let _ = writeln!(out, "   ⏭️  Skipped (override): {}", self.skipped);
        }
        if self.unvalidated > 0 {
            let _ = writeln!(out, "   ⏸️  Not checked (limit): {}", self.unvalidated);
        }
        let _ = writeln!(out, "   ⏱️  Time: {}", self.execution_time);
        out
    }
}

// Truncate for display, on a char boundary
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

// Counts resources per license, most common first, ties by name
pub fn license_counts(records: &[ResourceRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let license = record.license.trim();
        if !license.is_empty() {
            *counts.entry(license).or_default() += 1;
        }
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(license, count)| (license.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

pub fn render_license_summary(counts: &[(String, usize)]) -> String {
    let mut out = String::new();
    if counts.is_empty() {
        return out;
    }
    let _ = writeln!(out, "LICENSE SUMMARY:");
    let _ = writeln!(out, "{}", "=".repeat(40));
    for (license, count) in counts {
        let _ = writeln!(out, "  {:<20}: {:>3}", license, count);
    }
    let _ = writeln!(out, "{}", "=".repeat(40));
    out
}

// Everything a person wants to see after a run: broken links, totals and
// the license summary of the rewritten table
pub fn render_report(summary: &RunSummary, records: &[ResourceRecord]) -> String {
    let mut out = summary.render_table();
    let licenses = render_license_summary(&license_counts(records));
    if !licenses.is_empty() {
        out.push('\n');
        out.push_str(&licenses);
    }
    out
}

// Result of `link-curator check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_url: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<super::row::RowFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
}

impl CheckReport {
    pub fn new(outcome: &RowOutcome, secondary_url: Option<String>) -> Self {
        Self {
            url: outcome.url.clone(),
            secondary_url,
            valid: outcome.active,
            failure: outcome.failure.clone(),
            license: outcome.license.as_ref().map(|l| l.to_string()),
            last_modified: outcome.last_modified.clone(),
            checked_at: outcome.update.check.as_ref().map(|c| c.checked_at.clone()),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Valid: {}", if self.valid { "✓ Yes" } else { "✗ No" });
        if let Some(failure) = &self.failure {
            let target = if failure.url.is_empty() { &self.url } else { &failure.url };
            let _ = writeln!(out, "  - {} failed: {}", target, failure.status);
        }
        if let Some(license) = &self.license {
            let _ = writeln!(out, "  license: {}", license);
        }
        if let Some(last_modified) = &self.last_modified {
            let _ = writeln!(out, "  last_modified: {}", last_modified);
        }
        out
    }
}
