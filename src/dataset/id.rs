// src/dataset/id.rs
// Resource IDs: "<category prefix>-<8 hex chars of sha256(name + primary link)>".
// Assigned once when a resource is added; never recomputed for existing rows.

use sha2::{Digest, Sha256};

const CATEGORY_PREFIXES: &[(&str, &str)] = &[
    ("Slash-Commands", "cmd"),
    ("Workflows & Knowledge Guides", "wf"),
    ("Tooling", "tool"),
    ("CLAUDE.md Files", "claude"),
    ("Hooks", "hook"),
    ("Official Documentation", "doc"),
];

pub fn category_prefix(category: &str) -> &'static str {
    CATEGORY_PREFIXES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, prefix)| *prefix)
        .unwrap_or("res")
}

pub fn generate_resource_id(display_name: &str, primary_link: &str, category: &str) -> String {
    let digest = Sha256::new()
        .chain_update(display_name.as_bytes())
        .chain_update(primary_link.as_bytes())
        .finalize();
    let hash = hex::encode(digest);
    format!("{}-{}", category_prefix(category), &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shape() {
        let id = generate_resource_id("My Tool", "https://github.com/o/r", "Tooling");
        assert!(id.starts_with("tool-"));
        assert_eq!(id.len(), "tool-".len() + 8);
        assert!(id[5..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_is_stable_and_name_sensitive() {
        let a = generate_resource_id("A", "https://x", "Hooks");
        assert_eq!(a, generate_resource_id("A", "https://x", "Hooks"));
        assert_ne!(a, generate_resource_id("B", "https://x", "Hooks"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("") = e3b0c442...
        assert_eq!(generate_resource_id("", "", "Something Else"), "res-e3b0c442");
    }
}
