// src/dataset/store.rs
// =============================================================================
// Reading and rewriting the resource table.
//
// A run reads the whole file once at the start and writes it once at the
// end. The write goes to a temporary file in the same directory which is
// then renamed over the original, so readers see either the old table or
// the new one, never half of each.
//
// Updates are matched to rows by ID. The table is re-read right before the
// rewrite, so an ID that has disappeared in the meantime is an error rather
// than a silently dropped update.
// =============================================================================

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use super::record::{ResourceRecord, Schema};
use crate::error::DatasetError;

// Line ending used by the file we loaded; kept so a rewrite doesn't touch
// every line of a CRLF table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

// The validation result for one row, "Active" and "Last Checked" always
// travel together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStamp {
    pub active: bool,
    pub checked_at: String,
}

// Everything a run wants to change about one row. None = leave as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowUpdate {
    pub id: String,
    pub check: Option<CheckStamp>,
    pub license: Option<String>,
    pub last_modified: Option<String>,
    pub description: Option<String>,
}

impl RowUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.check.is_none()
            && self.license.is_none()
            && self.last_modified.is_none()
            && self.description.is_none()
    }

    pub fn apply(&self, record: &mut ResourceRecord) {
        if let Some(check) = &self.check {
            record.set_active(check.active);
            record.last_checked = check.checked_at.clone();
        }
        if let Some(license) = &self.license {
            record.license = license.clone();
        }
        if let Some(last_modified) = &self.last_modified {
            record.last_modified = last_modified.clone();
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    records: Vec<ResourceRecord>,
    line_ending: LineEnding,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::parse(&text)?;
        debug!(path = %path.display(), rows = dataset.records.len(), "loaded resource table");
        Ok(dataset)
    }

    pub fn parse(text: &str) -> Result<Self, DatasetError> {
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let schema = Schema::from_headers(reader.headers()?)?;

        let mut records = Vec::new();
        let mut ids: HashMap<String, usize> = HashMap::new();
        for (index, row) in reader.records().enumerate() {
            let row_num = index + 1;
            let record = schema.decode(&row?, row_num)?;

            if record.id.trim().is_empty() {
                return Err(DatasetError::EmptyId { row: row_num });
            }
            if let Some(first) = ids.insert(record.id.clone(), row_num) {
                return Err(DatasetError::DuplicateId {
                    id: record.id,
                    row: row_num,
                    first,
                });
            }
            records.push(record);
        }

        Ok(Self {
            schema,
            records,
            line_ending,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies updates in place, matching rows by ID
    pub fn apply(&mut self, updates: &[RowUpdate]) -> Result<(), DatasetError> {
        let positions: HashMap<&str, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut targets = Vec::with_capacity(updates.len());
        for update in updates {
            let index = positions
                .get(update.id.as_str())
                .copied()
                .ok_or_else(|| DatasetError::UnknownId(update.id.clone()))?;
            targets.push(index);
        }

        // only mutate once every ID is known to exist
        for (update, index) in updates.iter().zip(targets) {
            update.apply(&mut self.records[index]);
        }
        Ok(())
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, DatasetError> {
        let terminator = match self.line_ending {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::CrLf => Terminator::CRLF,
        };
        let mut writer = WriterBuilder::new()
            .terminator(terminator)
            .from_writer(Vec::new());

        writer.write_record(self.schema.headers())?;
        for record in &self.records {
            writer.write_record(self.schema.encode(record))?;
        }
        writer
            .into_inner()
            .map_err(|e| DatasetError::Csv(e.into_error().into()))
    }

    // Writes the whole table to `path` via temp file + rename
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let bytes = self.to_csv()?;
        let write_error = |source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(&bytes).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(path).map_err(|e| write_error(e.error))?;

        debug!(path = %path.display(), rows = self.records.len(), "rewrote resource table");
        Ok(())
    }
}

// Re-reads the table, applies the updates and replaces the file in one go
pub fn rewrite(path: &Path, updates: &[RowUpdate]) -> Result<Dataset, DatasetError> {
    let mut dataset = Dataset::load(path)?;
    dataset.apply(updates)?;
    dataset.save(path)?;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TABLE: &str = "\
ID,Display Name,Category,Sub-Category,Primary Link,Secondary Link,Author Name,Author Link,Active,Date Added,Last Modified,Last Checked,License,Description
tool-1a2b3c4d,First,Tooling,,https://example.com/a,,Ann,https://example.com/ann,TRUE,2025-01-01,,2025-01-02:10-00-00,MIT,\"Quoted, with comma\"
tool-5e6f7a8b,Second,Tooling,CLI,https://github.com/o/r,https://example.com/docs,Bo,,FALSE,,,,NOT_FOUND,\"Has \"\"quotes\"\"\"
hook-99aa00bb,Third,Hooks,,,,,,,,,,,
";

    fn stamp(active: bool) -> Option<CheckStamp> {
        Some(CheckStamp {
            active,
            checked_at: "2025-02-03:04-05-06".into(),
        })
    }

    #[test]
    fn test_parse_reads_every_row() {
        let dataset = Dataset::parse(TABLE).unwrap();
        assert_eq!(dataset.len(), 3);
        let first = &dataset.records()[0];
        assert_eq!(first.display_name, "First");
        assert_eq!(first.active, Some(true));
        assert_eq!(first.description, "Quoted, with comma");
        assert_eq!(dataset.records()[1].description, "Has \"quotes\"");
        assert_eq!(dataset.records()[2].active, None);
    }

    #[test]
    fn test_unchanged_table_round_trips_byte_for_byte() {
        let dataset = Dataset::parse(TABLE).unwrap();
        let bytes = dataset.to_csv().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), TABLE);
    }

    #[test]
    fn test_crlf_is_preserved() {
        let crlf = TABLE.replace('\n', "\r\n");
        let dataset = Dataset::parse(&crlf).unwrap();
        assert_eq!(String::from_utf8(dataset.to_csv().unwrap()).unwrap(), crlf);
    }

    #[test]
    fn test_active_spelling_survives_unless_rewritten() {
        let lowercase = TABLE.replace(",TRUE,", ",true,").replace(",FALSE,", ",False,");
        let mut dataset = Dataset::parse(&lowercase).unwrap();
        assert_eq!(dataset.records()[0].active, Some(true));
        assert_eq!(String::from_utf8(dataset.to_csv().unwrap()).unwrap(), lowercase);

        dataset
            .apply(&[RowUpdate {
                check: stamp(false),
                ..RowUpdate::new("tool-1a2b3c4d")
            }])
            .unwrap();
        let text = String::from_utf8(dataset.to_csv().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].contains(",FALSE,2025-01-01,"), "{}", lines[1]);
        assert!(lines[2].contains(",False,"), "{}", lines[2]);
    }

    #[test]
    fn test_duplicate_and_empty_ids_fail() {
        let duplicate = format!("{}tool-1a2b3c4d,Again,,,,,,,,,,,,\n", TABLE);
        assert!(matches!(
            Dataset::parse(&duplicate),
            Err(DatasetError::DuplicateId { row: 4, first: 1, .. })
        ));

        let empty = format!("{},Nameless,,,,,,,,,,,,\n", TABLE);
        assert!(matches!(
            Dataset::parse(&empty),
            Err(DatasetError::EmptyId { row: 4 })
        ));
    }

    #[test]
    fn test_ragged_row_fails() {
        let ragged = format!("{}short,row\n", TABLE);
        assert!(matches!(Dataset::parse(&ragged), Err(DatasetError::Csv(_))));
    }

    #[test]
    fn test_apply_touches_only_named_fields() {
        let mut dataset = Dataset::parse(TABLE).unwrap();
        let before = dataset.records()[1].clone();

        let update = RowUpdate {
            check: stamp(true),
            license: Some("Apache-2.0".into()),
            ..RowUpdate::new("tool-5e6f7a8b")
        };
        dataset.apply(&[update]).unwrap();

        let after = &dataset.records()[1];
        assert_eq!(after.active, Some(true));
        assert_eq!(after.last_checked, "2025-02-03:04-05-06");
        assert_eq!(after.license, "Apache-2.0");
        assert_eq!(after.description, before.description);
        assert_eq!(after.author_name, before.author_name);
        assert_eq!(after.last_modified, before.last_modified);
    }

    #[test]
    fn test_unknown_id_leaves_dataset_untouched() {
        let mut dataset = Dataset::parse(TABLE).unwrap();
        let updates = [
            RowUpdate {
                check: stamp(false),
                ..RowUpdate::new("tool-1a2b3c4d")
            },
            RowUpdate::new("missing"),
        ];
        let err = dataset.apply(&updates).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownId(ref id) if id == "missing"));
        assert_eq!(dataset.records()[0].active, Some(true));
    }

    #[test]
    fn test_rewrite_then_reload_keeps_untouched_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resources.csv");
        fs::write(&path, TABLE).unwrap();
        let original = Dataset::load(&path).unwrap();

        let updates: Vec<RowUpdate> = original
            .records()
            .iter()
            .map(|r| RowUpdate {
                check: stamp(false),
                ..RowUpdate::new(r.id.clone())
            })
            .collect();
        rewrite(&path, &updates).unwrap();

        let reloaded = Dataset::load(&path).unwrap();
        assert_eq!(reloaded.len(), original.len());
        assert_eq!(reloaded.schema().headers(), original.schema().headers());
        for (old, new) in original.records().iter().zip(reloaded.records()) {
            assert_eq!(new.active, Some(false));
            assert_eq!(new.last_checked, "2025-02-03:04-05-06");
            assert_eq!(new.id, old.id);
            assert_eq!(new.description, old.description);
            assert_eq!(new.author_name, old.author_name);
            assert_eq!(new.license, old.license);
            assert_eq!(
                original.schema().encode(old)[9],
                reloaded.schema().encode(new)[9],
                "Date Added survives"
            );
        }
    }

    #[test]
    fn test_failed_rewrite_keeps_original_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resources.csv");
        fs::write(&path, TABLE).unwrap();

        let err = rewrite(&path, &[RowUpdate::new("nope")]).unwrap_err();
        assert!(matches!(err, DatasetError::UnknownId(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), TABLE);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = Dataset::load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
