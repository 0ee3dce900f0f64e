// src/validate/mod.rs
// =============================================================================
// Validation runs over the resource table.
//
// - row: The per-row state machine (probe links, resolve license)
// - run: Sequential driver with delays and the max_links cap
// - report: Run summary (JSON / table), license counts, single checks
// =============================================================================

mod report;
mod row;
mod run;

pub use report::{render_report, CheckReport, RunSummary};
pub use row::{RowOutcome, Validator};
pub use run::{run, RunOptions, RunResult};
