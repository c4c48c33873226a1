// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: a Google spreadsheet used as a row store.
//!
//! Each tab is a table with a header row. Rows are addressed by 1-based
//! sheet row number (row 1 is the header). Lookups by key are linear column
//! scans, O(rows) per operation.

pub mod auth;
pub mod client;
pub mod memory;
pub mod sheets;

pub use memory::MemorySheets;
pub use sheets::{DeleteSummary, SheetsDb};

/// Tab names as constants.
pub mod tabs {
    pub const ATHLETES: &str = "athletes";
    pub const ACTIVITIES: &str = "activities";
    pub const SEGMENT_EFFORTS: &str = "segment_efforts";
    /// Append-only audit log of raw webhook payloads
    pub const INBOX: &str = "inbox";
}

/// Parse a numeric id out of a cell.
///
/// Sheets may hand back ids as plain digits, as floats (`12345678901.0`) or
/// in scientific notation (`1.2345678901E10`), sometimes with a leading
/// apostrophe from forced-text entry.
pub fn parse_id(cell: &str) -> Option<u64> {
    let cell = cell.trim().trim_start_matches('\'').trim_matches('"');
    if cell.is_empty() {
        return None;
    }
    if let Ok(id) = cell.parse::<u64>() {
        return Some(id);
    }

    let value = cell.parse::<f64>().ok()?;
    // 2^53: above this f64 cannot represent every integer
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > 9_007_199_254_740_992.0 {
        return None;
    }
    Some(value as u64)
}

/// Whether a cell holds the given id, in any of its sheet representations.
pub fn ids_match(cell: &str, id: u64) -> bool {
    parse_id(cell) == Some(id)
}

/// Zero-based column index to A1 column letters (0 -> A, 26 -> AA).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Quote a tab name for use in an A1 range.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_representations() {
        assert_eq!(parse_id("12345678901"), Some(12345678901));
        assert_eq!(parse_id(" 12345678901 "), Some(12345678901));
        assert_eq!(parse_id("12345678901.0"), Some(12345678901));
        assert_eq!(parse_id("1.2345678901E10"), Some(12345678901));
        assert_eq!(parse_id("1.2345678901e+10"), Some(12345678901));
        assert_eq!(parse_id("'12345678901"), Some(12345678901));
        assert_eq!(parse_id("\"42\""), Some(42));
    }

    #[test]
    fn parse_id_rejects_non_ids() {
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("12.5"), None);
        assert_eq!(parse_id("-4"), None);
        assert_eq!(parse_id("NaN"), None);
    }

    #[test]
    fn ids_match_across_formats() {
        assert!(ids_match("1.2345678901E10", 12345678901));
        assert!(!ids_match("1.2345678901E10", 12345678902));
        assert!(!ids_match("", 0));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(40), "AO");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn quote_tab_escapes_apostrophes() {
        assert_eq!(quote_tab("inbox"), "'inbox'");
        assert_eq!(quote_tab("bob's"), "'bob''s'");
    }
}
