// src/dataset/overrides.rs
// =============================================================================
// Manual corrections maintainers keep next to the table.
//
// templates/resource-overrides.yaml:
//
//   overrides:
//     tool-1a2b3c4d:
//       license: MIT
//       license_locked: true
//       active: "TRUE"
//       skip_validation: true
//       notes: "upstream repo is private, checked by hand"
//
// Locked fields are never written by validation. Forced values (license,
// description, active) are written on every rewrite. A forced "Active" goes
// out with a "Last Checked" stamp like any other check result.
// =============================================================================

use serde::{de, Deserialize, Deserializer};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::DatasetError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceOverride {
    pub license: Option<String>,
    pub description: Option<String>,
    /// Forced "Active" value, replaces whatever the probes found
    #[serde(default, deserialize_with = "forced_flag")]
    pub active: Option<bool>,
    #[serde(default)]
    pub license_locked: bool,
    #[serde(default)]
    pub active_locked: bool,
    #[serde(default)]
    pub last_checked_locked: bool,
    #[serde(default)]
    pub last_modified_locked: bool,
    #[serde(default)]
    pub skip_validation: bool,
    pub notes: Option<String>,
}

impl ResourceOverride {
    /// Nothing validation could write is left unlocked
    pub fn skips_validation(&self) -> bool {
        self.skip_validation || (self.active_locked && self.last_checked_locked)
    }

    /// "Active" and "Last Checked" are only ever written as a pair, so
    /// locking either one locks both
    pub fn check_locked(&self) -> bool {
        self.active_locked || self.last_checked_locked
    }
}

// `active: "TRUE"` and `active: true` both work; anything else is a
// malformed overrides file
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

fn forced_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<FlagValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlagValue::Bool(flag)) => Ok(Some(flag)),
        Some(FlagValue::Text(text)) => match text.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Ok(Some(true)),
            "FALSE" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!(
                "invalid active value '{}' (expected TRUE or FALSE)",
                text
            ))),
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    overrides: HashMap<String, ResourceOverride>,
}

impl Overrides {
    // A missing file simply means "no overrides"
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(DatasetError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, DatasetError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| DatasetError::Overrides {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, id: &str) -> Option<&ResourceOverride> {
        self.overrides.get(id)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
overrides:
  tool-1:
    license: MIT
    license_locked: true
    notes: checked by hand
  tool-2:
    active_locked: true
    last_checked_locked: true
  tool-3:
    skip_validation: true
    description: "Replacement text"
"#;

    #[test]
    fn test_parse_entries() {
        let overrides = Overrides::parse(YAML, Path::new("o.yaml")).unwrap();
        assert_eq!(overrides.len(), 3);

        let one = overrides.get("tool-1").unwrap();
        assert_eq!(one.license.as_deref(), Some("MIT"));
        assert!(one.license_locked);
        assert!(!one.skips_validation());
        assert!(!one.check_locked());

        assert!(overrides.get("tool-2").unwrap().skips_validation());
        let three = overrides.get("tool-3").unwrap();
        assert!(three.skips_validation());
        assert_eq!(three.description.as_deref(), Some("Replacement text"));
        assert!(overrides.get("tool-4").is_none());
    }

    #[test]
    fn test_forced_active_accepts_text_and_bool() {
        let overrides = Overrides::parse(
            "overrides:\n  a:\n    active: \"TRUE\"\n  b:\n    active: false\n  c:\n    active: \"false\"\n  d:\n    notes: x\n",
            Path::new("o.yaml"),
        )
        .unwrap();
        assert_eq!(overrides.get("a").unwrap().active, Some(true));
        assert_eq!(overrides.get("b").unwrap().active, Some(false));
        assert_eq!(overrides.get("c").unwrap().active, Some(false));
        assert_eq!(overrides.get("d").unwrap().active, None);
    }

    #[test]
    fn test_invalid_forced_active_is_an_error() {
        let err = Overrides::parse("overrides:\n  a:\n    active: maybe\n", Path::new("o.yaml")).unwrap_err();
        assert!(matches!(err, DatasetError::Overrides { .. }));
        assert!(err.to_string().contains("maybe"), "{err}");
    }

    #[test]
    fn test_single_lock_locks_the_pair() {
        let o = ResourceOverride {
            active_locked: true,
            ..Default::default()
        };
        assert!(o.check_locked());
        assert!(!o.skips_validation());
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Overrides::load(&dir.path().join("none.yaml")).unwrap();
        assert!(missing.is_empty());

        let empty = Overrides::parse("  \n", Path::new("e.yaml")).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = Overrides::parse("overrides: [1, 2", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, DatasetError::Overrides { .. }));
    }
}
