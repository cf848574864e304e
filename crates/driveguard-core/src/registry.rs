//! Resource registry: alias to remote-identifier mapping.
//!
//! The registry is the administrative allowlist for the whole tool. An alias
//! that resolves means "this spreadsheet or folder is sanctioned for use";
//! anything else is rejected before a single remote call is made.
//!
//! The registry is loaded once from a JSON document with two collections:
//!
//! ```json
//! {
//!   "sheets":        { "todo":    { "id": "1Abc...", "profile": "default" } },
//!   "drive_folders": { "reports": { "id": "0Bxy...", "profile": "work",
//!                                   "description": "quarterly exports" } }
//! }
//! ```
//!
//! A missing or malformed file loads as an empty registry (logged as a
//! warning): the feature is then administratively disabled, not broken.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Which registry collection an alias belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A Google Sheets spreadsheet.
    Sheet,
    /// A Google Drive folder.
    Folder,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sheet => write!(f, "sheet"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// A single registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// The remote identifier (spreadsheet ID or folder ID).
    pub id: String,

    /// The profile that owns this entry and whose credentials are used
    /// for it. Contributes to that profile's folder allowlist.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_profile() -> String {
    "default".to_string()
}

/// The loaded registry. Aliases are unique per collection, not globally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    /// Spreadsheet aliases.
    #[serde(default)]
    pub sheets: BTreeMap<String, ResourceEntry>,

    /// Drive folder aliases.
    #[serde(default)]
    pub drive_folders: BTreeMap<String, ResourceEntry>,
}

impl ResourceRegistry {
    /// Loads the registry from the given path.
    ///
    /// A missing file or one that fails to parse yields an empty registry;
    /// both cases are logged but never fail the caller.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "no registry file, starting empty");
            return Self::default();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read registry file");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse registry file");
                Self::default()
            }
        }
    }

    /// Resolves an alias in the given collection.
    ///
    /// This is the allowlist gate: an alias that is absent fails with
    /// [`CoreError::NotFound`], and the input string is never used as a raw
    /// remote identifier.
    pub fn resolve(&self, kind: ResourceKind, alias: &str) -> CoreResult<&ResourceEntry> {
        let collection = match kind {
            ResourceKind::Sheet => &self.sheets,
            ResourceKind::Folder => &self.drive_folders,
        };

        collection
            .get(alias)
            .ok_or_else(|| CoreError::not_found(kind, alias))
    }

    /// Returns the folder IDs a profile may operate on.
    ///
    /// With `profile` set, only entries owned by that profile are returned;
    /// without it, every configured folder ID (maintenance and listing paths
    /// only; a profile-scoped service must always pass its profile).
    pub fn allowlisted_folder_ids(&self, profile: Option<&str>) -> Vec<String> {
        self.drive_folders
            .values()
            .filter(|entry| profile.is_none_or(|p| entry.profile == p))
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Returns `(alias, entry)` pairs of sheets owned by a profile.
    pub fn sheets_for(&self, profile: &str) -> Vec<(&str, &ResourceEntry)> {
        self.sheets
            .iter()
            .filter(|(_, entry)| entry.profile == profile)
            .map(|(alias, entry)| (alias.as_str(), entry))
            .collect()
    }

    /// Returns `(alias, entry)` pairs of folders owned by a profile.
    pub fn folders_for(&self, profile: &str) -> Vec<(&str, &ResourceEntry)> {
        self.drive_folders
            .iter()
            .filter(|(_, entry)| entry.profile == profile)
            .map(|(alias, entry)| (alias.as_str(), entry))
            .collect()
    }

    /// Returns the sorted, deduplicated profiles owning at least one entry.
    pub fn profiles(&self) -> Vec<String> {
        let mut profiles: Vec<String> = self
            .sheets
            .values()
            .chain(self.drive_folders.values())
            .map(|entry| entry.profile.clone())
            .collect();
        profiles.sort();
        profiles.dedup();
        profiles
    }

    /// Returns true if neither collection has entries.
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty() && self.drive_folders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ResourceRegistry {
        let json = r#"{
            "sheets": {
                "todo": { "id": "S1", "profile": "default" },
                "budget": { "id": "S2", "profile": "work", "description": "2026 budget" }
            },
            "drive_folders": {
                "reports": { "id": "F1", "profile": "default" },
                "archive": { "id": "F2", "profile": "work" }
            }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolve_known_alias() {
        let registry = sample_registry();
        let entry = registry.resolve(ResourceKind::Sheet, "todo").unwrap();
        assert_eq!(entry.id, "S1");
        assert_eq!(entry.profile, "default");
    }

    #[test]
    fn resolve_missing_alias_is_not_found() {
        let registry = sample_registry();
        let err = registry.resolve(ResourceKind::Sheet, "missing").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn alias_uniqueness_is_per_collection() {
        let json = r#"{
            "sheets": { "same": { "id": "S1" } },
            "drive_folders": { "same": { "id": "F1" } }
        }"#;
        let registry: ResourceRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.resolve(ResourceKind::Sheet, "same").unwrap().id, "S1");
        assert_eq!(registry.resolve(ResourceKind::Folder, "same").unwrap().id, "F1");
    }

    #[test]
    fn profile_defaults_to_default() {
        let json = r#"{ "sheets": { "todo": { "id": "S1" } } }"#;
        let registry: ResourceRegistry = serde_json::from_str(json).unwrap();
        let entry = registry.resolve(ResourceKind::Sheet, "todo").unwrap();
        assert_eq!(entry.profile, "default");
    }

    #[test]
    fn allowlist_filtered_by_profile() {
        let registry = sample_registry();
        assert_eq!(
            registry.allowlisted_folder_ids(Some("default")),
            vec!["F1".to_string()]
        );
        assert_eq!(
            registry.allowlisted_folder_ids(Some("work")),
            vec!["F2".to_string()]
        );
        assert!(registry.allowlisted_folder_ids(Some("unknown")).is_empty());
    }

    #[test]
    fn allowlist_without_profile_returns_all() {
        let registry = sample_registry();
        let mut ids = registry.allowlisted_folder_ids(None);
        ids.sort();
        assert_eq!(ids, vec!["F1".to_string(), "F2".to_string()]);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ResourceRegistry::load(dir.path().join("config.json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn load_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let registry = ResourceRegistry::load(&path);
        assert!(registry.is_empty());
    }

    #[test]
    fn load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let registry = sample_registry();
        std::fs::write(&path, serde_json::to_string_pretty(&registry).unwrap()).unwrap();
        assert_eq!(ResourceRegistry::load(&path), registry);
    }

    #[test]
    fn profiles_are_sorted_and_deduplicated() {
        let registry = sample_registry();
        assert_eq!(
            registry.profiles(),
            vec!["default".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn listing_helpers_filter_by_profile() {
        let registry = sample_registry();
        let sheets = registry.sheets_for("work");
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].0, "budget");

        let folders = registry.folders_for("default");
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].1.id, "F1");
    }
}
