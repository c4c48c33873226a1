// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory spreadsheet used for tests and offline runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Tabs of string cells; `rows[0]` is the header row (sheet row 1).
#[derive(Clone, Default)]
pub struct MemorySheets {
    tabs: Arc<Mutex<HashMap<String, Vec<Vec<String>>>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tabs<R>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Vec<String>>>) -> R) -> R {
        let mut guard = self.tabs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn has_tab(&self, tab: &str) -> bool {
        self.with_tabs(|tabs| tabs.contains_key(tab))
    }

    pub fn add_tab(&self, tab: &str) {
        self.with_tabs(|tabs| {
            tabs.entry(tab.to_string()).or_default();
        });
    }

    /// All rows of a tab including the header. Empty if the tab is missing.
    pub fn rows(&self, tab: &str) -> Vec<Vec<String>> {
        self.with_tabs(|tabs| tabs.get(tab).cloned().unwrap_or_default())
    }

    /// Data rows only (everything below the header).
    pub fn data_rows(&self, tab: &str) -> Vec<Vec<String>> {
        self.rows(tab).into_iter().skip(1).collect()
    }

    /// Write `values` into `row` (1-based) starting at zero-based `col`,
    /// growing the tab as needed.
    pub fn write(&self, tab: &str, row: u32, col: usize, values: &[String]) {
        self.with_tabs(|tabs| {
            let rows = tabs.entry(tab.to_string()).or_default();
            let idx = row.saturating_sub(1) as usize;
            if rows.len() <= idx {
                rows.resize(idx + 1, Vec::new());
            }
            let cells = &mut rows[idx];
            if cells.len() < col + values.len() {
                cells.resize(col + values.len(), String::new());
            }
            cells[col..col + values.len()].clone_from_slice(values);
        });
    }

    pub fn append(&self, tab: &str, new_rows: &[Vec<String>]) {
        self.with_tabs(|tabs| {
            tabs.entry(tab.to_string())
                .or_default()
                .extend(new_rows.iter().cloned());
        });
    }

    /// Remove rows; `rows` are 1-based and sorted descending.
    pub fn delete(&self, tab: &str, rows: &[u32]) {
        self.with_tabs(|tabs| {
            if let Some(existing) = tabs.get_mut(tab) {
                for row in rows {
                    let idx = row.saturating_sub(1) as usize;
                    if idx < existing.len() {
                        existing.remove(idx);
                    }
                }
            }
        });
    }
}
