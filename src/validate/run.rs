// src/validate/run.rs
// =============================================================================
// Drives a validation run over every row of the table.
//
// Rows are checked one at a time with a random pause in between. GitHub
// and most hosts throttle bursts, and one request in flight at a time keeps
// us well under any per-host limit.
//
// An optional `max_links` stops validation after N rows; the remaining rows
// are passed through untouched, keeping whatever Active / Last Checked
// values they already had.
// =============================================================================

use rand::thread_rng;
use std::num::NonZeroUsize;
use tracing::{info, warn};

use super::row::{forced_update, RowOutcome, Validator};
use crate::checker::jitter;
use crate::dataset::{Overrides, ResourceRecord, RowUpdate};

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub max_links: Option<NonZeroUsize>,
    /// Seconds to wait between two validated rows, picked uniformly
    pub row_delay: (f64, f64),
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_links: None,
            row_delay: (2.0, 4.0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub outcomes: Vec<RowOutcome>,
    pub updates: Vec<RowUpdate>,
    /// Rows passed over because an override says so
    pub skipped: usize,
    /// Rows left alone because `max_links` was reached
    pub unvalidated: usize,
}

impl RunResult {
    pub fn limit_reached(&self) -> bool {
        self.unvalidated > 0
    }
}

pub async fn run(
    validator: &Validator,
    records: &[ResourceRecord],
    overrides: &Overrides,
    options: &RunOptions,
) -> RunResult {
    let mut result = RunResult::default();
    info!("Processing {} links...", records.len());

    for (index, record) in records.iter().enumerate() {
        let row_num = index + 1;
        let row_override = overrides.get(&record.id);

        if let Some(o) = row_override.filter(|o| o.skips_validation()) {
            info!("[{}] Skipping: {} (override)", row_num, record.display_name);
            let update = forced_update(record, o);
            if !update.is_empty() {
                result.updates.push(update);
            }
            result.skipped += 1;
            continue;
        }

        let processed = result.outcomes.len();
        if options.max_links.is_some_and(|max| processed >= max.get()) {
            if result.unvalidated == 0 {
                warn!(
                    "⚠️  Reached maximum links limit ({}). Stopping validation.",
                    processed
                );
            }
            result.unvalidated += 1;
            continue;
        }

        if processed > 0 {
            let delay = jitter(options.row_delay, &mut thread_rng());
            tokio::time::sleep(delay).await;
        }

        info!(
            "[{}] Checking: {} - {}",
            row_num,
            record.display_name,
            record.primary_link.trim()
        );
        let outcome = validator.validate_row(row_num, record, row_override).await;
        result.updates.push(outcome.update.clone());
        result.outcomes.push(outcome);
    }

    result
}
