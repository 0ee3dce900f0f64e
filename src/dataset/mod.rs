// src/dataset/mod.rs
// =============================================================================
// The resource table (CSV) and the files that travel with it.
//
// Submodules:
// - record: ResourceRecord and the column schema
// - store: Loading, applying row updates, atomic rewrite
// - overrides: Maintainer overrides (locked fields, skipped rows)
// - id: Stable resource IDs
// =============================================================================

mod id;
mod overrides;
mod record;
mod store;

pub use id::generate_resource_id;
pub use overrides::{Overrides, ResourceOverride};
pub use record::{ResourceRecord, TIMESTAMP_FORMAT};
pub use store::{rewrite, CheckStamp, Dataset, RowUpdate};
