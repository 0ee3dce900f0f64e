// src/dataset/record.rs
// =============================================================================
// One row of the resource table, and the schema that maps CSV columns onto it.
//
// The table is identified by header names, not positions. Loading checks
// that every required column is present, so a renamed column fails right
// away instead of quietly reading as empty strings. Columns we don't know
// about are carried along untouched so newer tables still round-trip.
//
// Rust concepts:
// - Enums as identifiers: Column names every field we understand
// - Option<bool>: "Active" may be TRUE, FALSE or blank
// - Result + ?: the first bad row stops the load
// =============================================================================

use csv::StringRecord;
use std::collections::HashSet;

use crate::error::DatasetError;

/// Format of "Last Checked" / "Last Modified" values, e.g. 2025-01-31:14-05-09
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d:%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    DisplayName,
    Category,
    SubCategory,
    PrimaryLink,
    SecondaryLink,
    AuthorName,
    AuthorLink,
    Active,
    LastModified,
    LastChecked,
    License,
    Description,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Id,
        Column::DisplayName,
        Column::Category,
        Column::SubCategory,
        Column::PrimaryLink,
        Column::SecondaryLink,
        Column::AuthorName,
        Column::AuthorLink,
        Column::Active,
        Column::LastModified,
        Column::LastChecked,
        Column::License,
        Column::Description,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::DisplayName => "Display Name",
            Column::Category => "Category",
            Column::SubCategory => "Sub-Category",
            Column::PrimaryLink => "Primary Link",
            Column::SecondaryLink => "Secondary Link",
            Column::AuthorName => "Author Name",
            Column::AuthorLink => "Author Link",
            Column::Active => "Active",
            Column::LastModified => "Last Modified",
            Column::LastChecked => "Last Checked",
            Column::License => "License",
            Column::Description => "Description",
        }
    }

    /// Columns the validator reads or writes; a table without them can't be used
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Column::Id
                | Column::DisplayName
                | Column::PrimaryLink
                | Column::SecondaryLink
                | Column::Active
                | Column::LastChecked
                | Column::License
        )
    }

    fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

// A resource as stored in the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: String,
    pub display_name: String,
    pub category: String,
    pub subcategory: String,
    pub primary_link: String,
    pub secondary_link: String,
    pub author_name: String,
    pub author_link: String,
    pub active: Option<bool>,
    /// "Active" exactly as read, so an untouched "true" isn't rewritten as "TRUE"
    pub active_raw: String,
    pub last_modified: String,
    pub last_checked: String,
    pub license: String,
    pub description: String,
    /// Values of unknown columns, in column order
    pub extra: Vec<String>,
}

impl ResourceRecord {
    pub fn primary_url(&self) -> Option<&str> {
        non_blank(&self.primary_link)
    }

    pub fn secondary_url(&self) -> Option<&str> {
        non_blank(&self.secondary_link)
    }

    /// Sets "Active"; the value is written in canonical TRUE/FALSE form
    pub fn set_active(&mut self, active: bool) {
        self.active = Some(active);
        self.active_raw = format_flag(self.active).to_string();
    }

    // The raw text while it still says what `active` says, canonical otherwise
    fn active_text(&self) -> String {
        match flag_value(&self.active_raw) {
            Some(parsed) if parsed == self.active => self.active_raw.clone(),
            _ => format_flag(self.active).to_string(),
        }
    }

    fn get(&self, column: Column) -> String {
        let value = match column {
            Column::Id => &self.id,
            Column::DisplayName => &self.display_name,
            Column::Category => &self.category,
            Column::SubCategory => &self.subcategory,
            Column::PrimaryLink => &self.primary_link,
            Column::SecondaryLink => &self.secondary_link,
            Column::AuthorName => &self.author_name,
            Column::AuthorLink => &self.author_link,
            Column::Active => return self.active_text(),
            Column::LastModified => &self.last_modified,
            Column::LastChecked => &self.last_checked,
            Column::License => &self.license,
            Column::Description => &self.description,
        };
        value.clone()
    }

    fn set(&mut self, column: Column, value: &str, row: usize) -> Result<(), DatasetError> {
        let value = value.to_string();
        match column {
            Column::Id => self.id = value,
            Column::DisplayName => self.display_name = value,
            Column::Category => self.category = value,
            Column::SubCategory => self.subcategory = value,
            Column::PrimaryLink => self.primary_link = value,
            Column::SecondaryLink => self.secondary_link = value,
            Column::AuthorName => self.author_name = value,
            Column::AuthorLink => self.author_link = value,
            Column::Active => {
                self.active = parse_flag(&value, row)?;
                self.active_raw = value;
            }
            Column::LastModified => self.last_modified = value,
            Column::LastChecked => self.last_checked = value,
            Column::License => self.license = value,
            Column::Description => self.description = value,
        }
        Ok(())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

// None when the text isn't a flag at all
fn flag_value(value: &str) -> Option<Option<bool>> {
    match value.trim().to_ascii_uppercase().as_str() {
        "" => Some(None),
        "TRUE" => Some(Some(true)),
        "FALSE" => Some(Some(false)),
        _ => None,
    }
}

fn parse_flag(value: &str, row: usize) -> Result<Option<bool>, DatasetError> {
    flag_value(value).ok_or_else(|| DatasetError::InvalidFlag {
        row,
        column: Column::Active.header(),
        value: value.to_string(),
    })
}

pub fn format_flag(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "TRUE",
        Some(false) => "FALSE",
        None => "",
    }
}

// What lives at each column position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Known(Column),
    /// Index into ResourceRecord::extra
    Extra(usize),
}

// Header row of a loaded table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    headers: Vec<String>,
    slots: Vec<Slot>,
}

impl Schema {
    pub fn from_headers(headers: &StringRecord) -> Result<Self, DatasetError> {
        if headers.is_empty() {
            return Err(DatasetError::MissingHeader);
        }

        // a UTF-8 BOM can sneak in front of the first header
        let names: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(names.len());
        let mut extras = 0;
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
            match Column::from_header(name) {
                Some(column) => slots.push(Slot::Known(column)),
                None => {
                    slots.push(Slot::Extra(extras));
                    extras += 1;
                }
            }
        }

        let schema = Schema {
            headers: names.clone(),
            slots,
        };

        if let Some(missing) = Column::ALL
            .into_iter()
            .find(|c| c.is_required() && !schema.has(*c))
        {
            return Err(DatasetError::MissingColumn(missing.header()));
        }

        Ok(schema)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has(&self, column: Column) -> bool {
        self.slots.contains(&Slot::Known(column))
    }

    /// Turns one CSV row into a record. `row` is the 1-based data row number.
    pub fn decode(&self, fields: &StringRecord, row: usize) -> Result<ResourceRecord, DatasetError> {
        let mut record = ResourceRecord::default();
        for (slot, value) in self.slots.iter().zip(fields.iter()) {
            match slot {
                Slot::Known(column) => record.set(*column, value, row)?,
                Slot::Extra(_) => record.extra.push(value.to_string()),
            }
        }
        Ok(record)
    }

    /// Turns a record back into a row, in header order
    pub fn encode(&self, record: &ResourceRecord) -> Vec<String> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Known(column) => record.get(*column),
                Slot::Extra(i) => record.extra.get(*i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}
