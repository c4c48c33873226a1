// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spreadsheet row store with typed operations.
//!
//! Provides high-level operations for:
//! - Athletes (OAuth tokens, keyed by athlete_id)
//! - Activities (keyed by activity_id)
//! - Segment efforts (grouped by activity_id)
//! - Inbox (append-only audit of webhook payloads)

use super::auth::ServiceAccountAuth;
use super::client::{to_cell_value, SheetsClient};
use super::memory::MemorySheets;
use super::{column_letter, ids_match, quote_tab, tabs};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    is_text_column, ActivityRow, AthleteRow, InboxRow, SegmentEffortRow, ACTIVITY_HEADERS,
    ATHLETE_HEADERS, INBOX_HEADERS, SEGMENT_EFFORT_HEADERS,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Every tab this service owns, with its header row.
pub const SCHEMA: [(&str, &[&str]); 4] = [
    (tabs::ATHLETES, &ATHLETE_HEADERS),
    (tabs::ACTIVITIES, &ACTIVITY_HEADERS),
    (tabs::SEGMENT_EFFORTS, &SEGMENT_EFFORT_HEADERS),
    (tabs::INBOX, &INBOX_HEADERS),
];

/// Typed cell values for a run of cells starting at column `start_col`.
///
/// Columns are named by the schema's header layout. Free-text columns stay
/// strings; the rest go through numeric and boolean coercion.
fn typed_cells(tab: &str, start_col: usize, values: &[String]) -> Vec<Value> {
    let headers: &[&str] = SCHEMA
        .iter()
        .find(|(name, _)| *name == tab)
        .map(|(_, headers)| *headers)
        .unwrap_or(&[]);

    values
        .iter()
        .enumerate()
        .map(|(i, cell)| match headers.get(start_col + i) {
            Some(header) if is_text_column(header) => Value::String(cell.clone()),
            _ => to_cell_value(cell),
        })
        .collect()
}

#[derive(Clone)]
enum Backend {
    Remote(Arc<SheetsClient>),
    Memory(MemorySheets),
}

/// Rows removed by an activity delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub activities: usize,
    pub segment_efforts: usize,
}

/// Spreadsheet database handle.
#[derive(Clone)]
pub struct SheetsDb {
    backend: Backend,
}

impl SheetsDb {
    /// Create a client for the configured spreadsheet.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Sheets(format!("Failed to build HTTP client: {}", e)))?;

        let auth = ServiceAccountAuth::new(
            http.clone(),
            config.google_service_account_email.clone(),
            config.google_private_key.clone(),
            config.google_token_uri.clone(),
        );

        let client = SheetsClient::new(
            http,
            config.sheets_api_base.clone(),
            config.spreadsheet_id.clone(),
            auth,
        );

        tracing::info!(spreadsheet = %config.spreadsheet_id, "Sheets client configured");

        Ok(Self {
            backend: Backend::Remote(Arc::new(client)),
        })
    }

    /// Create a database backed by in-memory tabs (tests and offline mode).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemorySheets::new()),
        }
    }

    /// The in-memory tabs, when running without a real spreadsheet.
    pub fn memory(&self) -> Option<&MemorySheets> {
        match &self.backend {
            Backend::Memory(mem) => Some(mem),
            Backend::Remote(_) => None,
        }
    }

    // ─── Backend primitives ──────────────────────────────────────

    async fn has_tab(&self, tab: &str) -> Result<bool, AppError> {
        match &self.backend {
            Backend::Remote(client) => Ok(client.sheet_id(tab).await?.is_some()),
            Backend::Memory(mem) => Ok(mem.has_tab(tab)),
        }
    }

    async fn add_tab(&self, tab: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Remote(client) => client.add_sheet(tab).await,
            Backend::Memory(mem) => {
                mem.add_tab(tab);
                Ok(())
            }
        }
    }

    /// Read the header row of a tab.
    pub async fn headers(&self, tab: &str) -> Result<Vec<String>, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let range = format!("{}!1:1", quote_tab(tab));
                Ok(client.get_values(&range).await?.into_iter().next().unwrap_or_default())
            }
            Backend::Memory(mem) => Ok(mem.rows(tab).into_iter().next().unwrap_or_default()),
        }
    }

    /// Cells of one column below the header. Index `i` is sheet row `i + 2`.
    async fn read_column(&self, tab: &str, col: usize) -> Result<Vec<String>, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let letter = column_letter(col);
                let range = format!("{}!{}2:{}", quote_tab(tab), letter, letter);
                Ok(client
                    .get_values(&range)
                    .await?
                    .into_iter()
                    .map(|row| row.into_iter().next().unwrap_or_default())
                    .collect())
            }
            Backend::Memory(mem) => Ok(mem
                .data_rows(tab)
                .into_iter()
                .map(|row| row.get(col).cloned().unwrap_or_default())
                .collect()),
        }
    }

    /// Read one row (1-based).
    pub async fn read_row(&self, tab: &str, row: u32) -> Result<Vec<String>, AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let range = format!("{}!{}:{}", quote_tab(tab), row, row);
                Ok(client.get_values(&range).await?.into_iter().next().unwrap_or_default())
            }
            Backend::Memory(mem) => Ok(mem
                .rows(tab)
                .get(row.saturating_sub(1) as usize)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn write_cells(
        &self,
        tab: &str,
        row: u32,
        col: usize,
        values: Vec<String>,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Remote(client) => {
                let range = format!("{}!{}{}", quote_tab(tab), column_letter(col), row);
                client
                    .update_values(&range, vec![typed_cells(tab, col, &values)])
                    .await
            }
            Backend::Memory(mem) => {
                mem.write(tab, row, col, &values);
                Ok(())
            }
        }
    }

    // ─── Row store operations ────────────────────────────────────

    /// Create the tab if missing and write the header row if it is empty.
    pub async fn ensure_tab(&self, tab: &str, headers: &[&str]) -> Result<(), AppError> {
        if !self.has_tab(tab).await? {
            self.add_tab(tab).await?;
        }

        let existing = self.headers(tab).await?;
        if existing.iter().all(|h| h.trim().is_empty()) {
            let header_row = headers.iter().map(|h| h.to_string()).collect();
            self.write_cells(tab, 1, 0, header_row).await?;
            tracing::info!(tab, columns = headers.len(), "Wrote header row");
        } else if existing.iter().map(String::as_str).ne(headers.iter().copied()) {
            tracing::warn!(
                tab,
                existing = ?existing,
                "Header row differs from expected schema; lookups use the existing headers"
            );
        }
        Ok(())
    }

    /// Ensure all tabs exist with headers.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        for (tab, headers) in SCHEMA {
            self.ensure_tab(tab, headers).await?;
        }
        Ok(())
    }

    async fn column_index(&self, tab: &str, header: &str) -> Result<usize, AppError> {
        self.headers(tab)
            .await?
            .iter()
            .position(|h| h.trim() == header)
            .ok_or_else(|| AppError::Sheets(format!("Column {} not found in {}", header, tab)))
    }

    /// All values of the named column, in row order.
    pub async fn column_values(&self, tab: &str, header: &str) -> Result<Vec<String>, AppError> {
        let col = self.column_index(tab, header).await?;
        self.read_column(tab, col).await
    }

    /// Rows (1-based) whose `header` cell holds `id`. Linear scan.
    pub async fn find_rows(&self, tab: &str, header: &str, id: u64) -> Result<Vec<u32>, AppError> {
        Ok(self
            .column_values(tab, header)
            .await?
            .iter()
            .enumerate()
            .filter(|(_, cell)| ids_match(cell, id))
            .map(|(i, _)| i as u32 + 2)
            .collect())
    }

    /// First row whose `header` cell holds `id`.
    pub async fn find_row(&self, tab: &str, header: &str, id: u64) -> Result<Option<u32>, AppError> {
        Ok(self.find_rows(tab, header, id).await?.into_iter().next())
    }

    pub async fn append_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }
        match &self.backend {
            Backend::Remote(client) => {
                let range = format!("{}!A1", quote_tab(tab));
                let rows = rows.iter().map(|row| typed_cells(tab, 0, row)).collect();
                client.append_values(&range, rows).await
            }
            Backend::Memory(mem) => {
                mem.append(tab, &rows);
                Ok(())
            }
        }
    }

    /// Overwrite a row starting at column A.
    pub async fn update_row(&self, tab: &str, row: u32, values: Vec<String>) -> Result<(), AppError> {
        self.write_cells(tab, row, 0, values).await
    }

    /// Overwrite a single cell addressed by header name.
    pub async fn update_cell(
        &self,
        tab: &str,
        row: u32,
        header: &str,
        value: String,
    ) -> Result<(), AppError> {
        let col = self.column_index(tab, header).await?;
        self.write_cells(tab, row, col, vec![value]).await
    }

    /// Delete rows in one batch, highest row first.
    pub async fn delete_rows(&self, tab: &str, mut rows: Vec<u32>) -> Result<usize, AppError> {
        rows.sort_unstable_by(|a, b| b.cmp(a));
        rows.dedup();
        if rows.is_empty() {
            return Ok(0);
        }
        match &self.backend {
            Backend::Remote(client) => client.delete_rows(tab, &rows).await?,
            Backend::Memory(mem) => mem.delete(tab, &rows),
        }
        Ok(rows.len())
    }

    // ─── Athlete Operations ──────────────────────────────────────

    /// Get an athlete and its row number.
    pub async fn get_athlete(&self, athlete_id: u64) -> Result<Option<(u32, AthleteRow)>, AppError> {
        let Some(row) = self.find_row(tabs::ATHLETES, "athlete_id", athlete_id).await? else {
            return Ok(None);
        };
        let headers = self.headers(tabs::ATHLETES).await?;
        let cells = self.read_row(tabs::ATHLETES, row).await?;
        Ok(AthleteRow::from_cells(&headers, &cells).map(|athlete| (row, athlete)))
    }

    /// Overwrite an athlete row in place.
    pub async fn update_athlete(&self, row: u32, athlete: &AthleteRow) -> Result<(), AppError> {
        self.update_row(tabs::ATHLETES, row, athlete.to_row()).await
    }

    /// Create or update an athlete.
    pub async fn upsert_athlete(&self, athlete: &AthleteRow) -> Result<(), AppError> {
        match self
            .find_row(tabs::ATHLETES, "athlete_id", athlete.athlete_id)
            .await?
        {
            Some(row) => self.update_athlete(row, athlete).await,
            None => {
                self.append_rows(tabs::ATHLETES, vec![athlete.to_row()])
                    .await
            }
        }
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn find_activity_row(&self, activity_id: u64) -> Result<Option<u32>, AppError> {
        self.find_row(tabs::ACTIVITIES, "activity_id", activity_id)
            .await
    }

    /// Whether the activity already has a row. Reads the whole id column.
    pub async fn activity_exists(&self, activity_id: u64) -> Result<bool, AppError> {
        Ok(self.find_activity_row(activity_id).await?.is_some())
    }

    /// Append an activity row and its effort rows.
    pub async fn insert_activity(
        &self,
        activity: &ActivityRow,
        efforts: &[SegmentEffortRow],
    ) -> Result<(), AppError> {
        self.append_rows(tabs::ACTIVITIES, vec![activity.to_row()])
            .await?;
        self.append_rows(
            tabs::SEGMENT_EFFORTS,
            efforts.iter().map(SegmentEffortRow::to_row).collect(),
        )
        .await
    }

    pub async fn overwrite_activity(&self, row: u32, activity: &ActivityRow) -> Result<(), AppError> {
        self.update_row(tabs::ACTIVITIES, row, activity.to_row())
            .await
    }

    /// Replace all effort rows of an activity.
    pub async fn replace_segment_efforts(
        &self,
        activity_id: u64,
        efforts: &[SegmentEffortRow],
    ) -> Result<(), AppError> {
        let existing = self
            .find_rows(tabs::SEGMENT_EFFORTS, "activity_id", activity_id)
            .await?;
        self.delete_rows(tabs::SEGMENT_EFFORTS, existing).await?;
        self.append_rows(
            tabs::SEGMENT_EFFORTS,
            efforts.iter().map(SegmentEffortRow::to_row).collect(),
        )
        .await
    }

    /// Delete an activity and all its effort rows.
    pub async fn delete_activity(&self, activity_id: u64) -> Result<DeleteSummary, AppError> {
        let activity_rows = self
            .find_rows(tabs::ACTIVITIES, "activity_id", activity_id)
            .await?;
        let effort_rows = self
            .find_rows(tabs::SEGMENT_EFFORTS, "activity_id", activity_id)
            .await?;

        Ok(DeleteSummary {
            activities: self.delete_rows(tabs::ACTIVITIES, activity_rows).await?,
            segment_efforts: self
                .delete_rows(tabs::SEGMENT_EFFORTS, effort_rows)
                .await?,
        })
    }

    // ─── Inbox Operations ────────────────────────────────────────

    pub async fn append_inbox(&self, entry: &InboxRow) -> Result<(), AppError> {
        self.append_rows(tabs::INBOX, vec![entry.to_row()]).await
    }
}
