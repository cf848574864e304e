//! Sheets operations.
//!
//! Ranges are validated locally before any remote call. Prompt tabs use the
//! fixed six-column schema from [`driveguard_core::prompt`]; new prompts are
//! inserted directly under the header row so the most recent entry is always
//! at the top.

use chrono::Utc;
use tracing::info;

use driveguard_core::{PROMPT_COLUMN_SPAN, PromptRecord, SheetRange};

use crate::client::ApiClient;
use crate::error::GoogleResult;

/// Sheets operations for one profile.
pub struct SheetsService<'a> {
    api: &'a ApiClient,
}

impl<'a> SheetsService<'a> {
    /// Creates a Sheets service over the given client.
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Lists the tab titles of a spreadsheet.
    pub async fn list_tabs(&self, spreadsheet_id: &str) -> GoogleResult<Vec<String>> {
        self.api.sheet_tabs(spreadsheet_id).await
    }

    /// Reads the cell values of a validated A1 range.
    pub async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> GoogleResult<Vec<Vec<String>>> {
        let range = SheetRange::parse(range)?;
        self.api.get_values(spreadsheet_id, &range.to_string()).await
    }

    /// Reads all prompt rows from a tab, skipping the header row.
    pub async fn get_prompts(
        &self,
        spreadsheet_id: &str,
        tab: &str,
    ) -> GoogleResult<Vec<PromptRecord>> {
        let range = SheetRange::for_tab(tab, PROMPT_COLUMN_SPAN)?;
        let rows = self.api.get_values(spreadsheet_id, &range.to_string()).await?;

        Ok(rows
            .iter()
            .skip(1) // header
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|row| PromptRecord::from_row(row))
            .collect())
    }

    /// Inserts a prompt row at the top of a tab, under the header.
    ///
    /// Existing rows shift down; nothing is overwritten. Returns the record
    /// that was written.
    pub async fn insert_prompt(
        &self,
        spreadsheet_id: &str,
        tab: &str,
        name: &str,
        content: &str,
        author: &str,
    ) -> GoogleResult<PromptRecord> {
        let record = PromptRecord::new(name, content, author, Utc::now());

        let sheet_id = self.api.sheet_id_for_tab(spreadsheet_id, tab).await?;

        // Open a blank row at index 1 (directly under the header), then fill it
        self.api.insert_rows(spreadsheet_id, sheet_id, 1, 1).await?;

        let target = SheetRange::for_tab(tab, "A2:F2")?;
        self.api
            .update_values(spreadsheet_id, &target.to_string(), vec![record.to_row()])
            .await?;

        info!(tab, name, "inserted prompt at top");
        Ok(record)
    }
}
