// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sheets v4 REST client.
//!
//! Thin wrapper over the `values` and `batchUpdate` endpoints. Values are
//! read unformatted and written with `valueInputOption=RAW`, so cell text is
//! never evaluated as a formula.

use super::auth::ServiceAccountAuth;
use crate::error::AppError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Sheets API client bound to one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    auth: ServiceAccountAuth,
    /// Tab title -> numeric sheetId (needed for batchUpdate requests)
    sheet_ids: RwLock<HashMap<String, i64>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        spreadsheet_id: String,
        auth: ServiceAccountAuth,
    ) -> Self {
        Self {
            http,
            base_url,
            spreadsheet_id,
            auth,
            sheet_ids: RwLock::new(HashMap::new()),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    /// Numeric sheetId for a tab title, or `None` if the tab does not exist.
    pub async fn sheet_id(&self, title: &str) -> Result<Option<i64>, AppError> {
        if let Some(id) = self.sheet_ids.read().await.get(title) {
            return Ok(Some(*id));
        }

        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(self.spreadsheet_url())
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await
            .map_err(|e| AppError::Sheets(e.to_string()))?;

        let meta: SpreadsheetMeta = check_response_json(response).await?;

        let mut ids = self.sheet_ids.write().await;
        ids.clear();
        for sheet in meta.sheets {
            ids.insert(sheet.properties.title, sheet.properties.sheet_id);
        }
        Ok(ids.get(title).copied())
    }

    /// Add a tab with the given title.
    pub async fn add_sheet(&self, title: &str) -> Result<(), AppError> {
        let body = self
            .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
            .await?;

        if let Some(id) = body
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(Value::as_i64)
        {
            self.sheet_ids.write().await.insert(title.to_string(), id);
        }
        tracing::info!(tab = title, "Created sheet tab");
        Ok(())
    }

    /// Read a range as rows of cell text.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, AppError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(self.values_url(range))
            .bearer_auth(token)
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Sheets(e.to_string()))?;

        let range: ValueRange = check_response_json(response).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    /// Overwrite a range starting at its top-left cell.
    pub async fn update_values(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), AppError> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .put(self.values_url(range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await
            .map_err(|e| AppError::Sheets(e.to_string()))?;

        check_response(response).await
    }

    /// Append rows after the last row of the table found in `range`.
    pub async fn append_values(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), AppError> {
        let token = self.auth.access_token().await?;
        let url = format!("{}:append", self.values_url(range));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await
            .map_err(|e| AppError::Sheets(e.to_string()))?;

        check_response(response).await
    }

    /// Delete whole rows. `rows` are 1-based and must be sorted descending so
    /// earlier deletions do not shift later ones within the batch.
    pub async fn delete_rows(&self, title: &str, rows: &[u32]) -> Result<(), AppError> {
        if rows.is_empty() {
            return Ok(());
        }
        let sheet_id = self
            .sheet_id(title)
            .await?
            .ok_or_else(|| AppError::Sheets(format!("Tab not found: {}", title)))?;

        let requests = rows
            .iter()
            .map(|row| {
                json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": row - 1,
                            "endIndex": row,
                        }
                    }
                })
            })
            .collect();

        self.batch_update(requests).await?;
        Ok(())
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<Value, AppError> {
        let token = self.auth.access_token().await?;
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| AppError::Sheets(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "Sheets API request failed");
    Err(AppError::Sheets(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Sheets API request failed");
        return Err(AppError::Sheets(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Sheets(format!("JSON parse error: {}", e)))
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert cell text to a typed JSON value so numbers and booleans land in
/// the sheet as numbers and booleans rather than text. Only used for columns
/// that are not free text.
pub(crate) fn to_cell_value(cell: &str) -> Value {
    match cell {
        "TRUE" => return Value::Bool(true),
        "FALSE" => return Value::Bool(false),
        _ => {}
    }

    let looks_numeric = !cell.is_empty()
        && cell.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
        && !(cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0."));

    if looks_numeric {
        if let Ok(int) = cell.parse::<i64>() {
            return Value::from(int);
        }
        if let Ok(float) = cell.parse::<f64>() {
            if float.is_finite() {
                return Value::from(float);
            }
        }
    }
    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_cell_values() {
        assert_eq!(to_cell_value("TRUE"), Value::Bool(true));
        assert_eq!(to_cell_value("12345678901"), json!(12345678901_i64));
        assert_eq!(to_cell_value("151.2"), json!(151.2));
        assert_eq!(to_cell_value("-3"), json!(-3));
        assert_eq!(to_cell_value("0.5"), json!(0.5));
    }

    #[test]
    fn text_stays_text() {
        assert_eq!(to_cell_value(""), json!(""));
        assert_eq!(to_cell_value("007"), json!("007"));
        assert_eq!(to_cell_value("2024-06-09"), json!("2024-06-09"));
        assert_eq!(to_cell_value("=HYPERLINK(\"x\")"), json!("=HYPERLINK(\"x\")"));
        assert_eq!(to_cell_value("abc123"), json!("abc123"));
        assert_eq!(to_cell_value("-"), json!("-"));
    }

    #[test]
    fn cells_read_back_as_text() {
        assert_eq!(cell_to_string(&json!(12345678901_u64)), "12345678901");
        assert_eq!(cell_to_string(&json!(true)), "true");
        assert_eq!(cell_to_string(&Value::Null), "");
        assert_eq!(cell_to_string(&json!("x")), "x");
    }
}
