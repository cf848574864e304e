//! Fixed schema for prompt rows stored in a sheet tab.
//!
//! Prompt tabs use six columns: Name, Content, Created By, Created At,
//! Last Modified By, Last Modified At. Rows read back from the API are
//! ragged (trailing empty cells are omitted), so decoding defaults any
//! missing column to the empty string instead of indexing positionally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header row of a prompt tab.
pub const PROMPT_HEADERS: [&str; 6] = [
    "Name",
    "Content",
    "Created By",
    "Created At",
    "Last Modified By",
    "Last Modified At",
];

/// The column span of a prompt tab in A1 notation, header included.
pub const PROMPT_COLUMN_SPAN: &str = "A:F";

/// One prompt row with named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Short prompt name.
    pub name: String,
    /// The prompt text itself.
    pub content: String,
    /// Who created the row.
    pub created_by: String,
    /// ISO-8601 creation timestamp, as stored in the sheet.
    pub created_at: String,
    /// Who last modified the row.
    pub last_modified_by: String,
    /// ISO-8601 last-modification timestamp.
    pub last_modified_at: String,
}

impl PromptRecord {
    /// Creates a fresh record authored now by `author`.
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let author = author.into();
        let stamp = now.to_rfc3339();
        Self {
            name: name.into(),
            content: content.into(),
            created_by: author.clone(),
            created_at: stamp.clone(),
            last_modified_by: author,
            last_modified_at: stamp,
        }
    }

    /// Decodes a row, defaulting missing trailing columns to empty strings.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
        Self {
            name: cell(0),
            content: cell(1),
            created_by: cell(2),
            created_at: cell(3),
            last_modified_by: cell(4),
            last_modified_at: cell(5),
        }
    }

    /// Encodes the record back into a six-column row.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.content.clone(),
            self.created_by.clone(),
            self.created_at.clone(),
            self.last_modified_by.clone(),
            self.last_modified_at.clone(),
        ]
    }
}
