//! Tabular store boundary.
//!
//! The core only ever sees rectangular grids of scalar values addressed by
//! 1-based row/column coordinates; formatting never crosses this boundary.
//! `SheetsClient` speaks the Google Sheets values API; `MemSheets` is the
//! in-memory stand-in used by tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::fmt;

use crate::config::Config;
use crate::sheets::model::{ClearValuesResponse, UpdateValuesResponse, ValueRange};

pub mod cell;
pub mod mem;
pub mod model;

pub use mem::MemSheets;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/";

/// Address of one sheet (tab) inside a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

/// Read/write access to named regions of rows and columns.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// All rows from `start_row` down, columns `start_col..start_col+width`.
    /// Trailing blank cells may be absent from the returned rows.
    async fn read_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        width: u32,
    ) -> Result<Vec<Vec<Value>>>;

    async fn read_cell(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<Value>;

    /// Write a rectangular block with its top-left corner at (start_row, start_col).
    async fn write_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        rows: &[Vec<Value>],
    ) -> Result<()>;

    async fn write_cell(&self, sheet: &SheetRef, row: u32, col: u32, value: Value) -> Result<()>;

    /// Clear everything from `start_row` down within the first `width` columns.
    async fn clear_rows(&self, sheet: &SheetRef, start_row: u32, width: u32) -> Result<()>;
}

/// Column number to A1 letters: 1 -> "A", 26 -> "Z", 27 -> "AA".
pub fn col_letter(col: u32) -> String {
    debug_assert!(col >= 1);
    let mut n = col;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn quote_sheet(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Open-ended A1 range: all rows from `start_row` down within `width` columns.
pub fn a1_open(sheet_name: &str, start_row: u32, start_col: u32, width: u32) -> String {
    let last = start_col + width.max(1) - 1;
    format!(
        "{}!{}{}:{}",
        quote_sheet(sheet_name),
        col_letter(start_col),
        start_row,
        col_letter(last),
    )
}

/// Bounded A1 rectangle.
pub fn a1_rect(sheet_name: &str, start_row: u32, start_col: u32, height: u32, width: u32) -> String {
    let last_col = start_col + width.max(1) - 1;
    let last_row = start_row + height.max(1) - 1;
    format!(
        "{}!{}{}:{}{}",
        quote_sheet(sheet_name),
        col_letter(start_col),
        start_row,
        col_letter(last_col),
        last_row,
    )
}

pub fn a1_cell(sheet_name: &str, row: u32, col: u32) -> String {
    format!("{}!{}{}", quote_sheet(sheet_name), col_letter(col), row)
}

/// Google Sheets values-API client.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(token: String) -> Self {
        let base_url = Url::parse(SHEETS_API_BASE).expect("valid default Sheets URL");
        Self::with_base_url(token, base_url)
    }

    pub fn with_base_url(token: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("tg-regbot/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.sheets.api_token.clone())
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> Result<Url> {
        self.base_url
            .join(&format!(
                "v4/spreadsheets/{}/values/{}{}",
                spreadsheet_id, range, suffix
            ))
            .context("invalid Sheets base URL")
    }

    async fn get_values(&self, sheet: &SheetRef, range: &str) -> Result<Vec<Vec<Value>>> {
        let url = self.values_url(&sheet.spreadsheet_id, range, "")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "UNFORMATTED_VALUE"),
            ])
            .send()
            .await
            .context("sheets values.get request failed")?
            .error_for_status()
            .context("sheets values.get returned an error status")?;
        let body: ValueRange = resp
            .json()
            .await
            .context("sheets values.get returned malformed JSON")?;
        Ok(body.values.unwrap_or_default())
    }

    async fn put_values(&self, sheet: &SheetRef, range: &str, rows: &[Vec<Value>]) -> Result<()> {
        let url = self.values_url(&sheet.spreadsheet_id, range, "")?;
        let payload = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&payload)
            .send()
            .await
            .context("sheets values.update request failed")?
            .error_for_status()
            .context("sheets values.update returned an error status")?;
        let _body: UpdateValuesResponse = resp
            .json()
            .await
            .context("sheets values.update returned malformed JSON")?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn read_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        width: u32,
    ) -> Result<Vec<Vec<Value>>> {
        let range = a1_open(&sheet.sheet_name, start_row, start_col, width);
        self.get_values(sheet, &range).await
    }

    async fn read_cell(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<Value> {
        let range = a1_cell(&sheet.sheet_name, row, col);
        let rows = self.get_values(sheet, &range).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .unwrap_or(Value::Null))
    }

    async fn write_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        rows: &[Vec<Value>],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let width = rows.iter().map(|r| r.len() as u32).max().unwrap_or(1);
        let range = a1_rect(&sheet.sheet_name, start_row, start_col, rows.len() as u32, width);
        self.put_values(sheet, &range, rows).await
    }

    async fn write_cell(&self, sheet: &SheetRef, row: u32, col: u32, value: Value) -> Result<()> {
        let range = a1_cell(&sheet.sheet_name, row, col);
        self.put_values(sheet, &range, &[vec![value]]).await
    }

    async fn clear_rows(&self, sheet: &SheetRef, start_row: u32, width: u32) -> Result<()> {
        let range = a1_open(&sheet.sheet_name, start_row, 1, width);
        let url = self.values_url(&sheet.spreadsheet_id, &range, ":clear")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await
            .context("sheets values.clear request failed")?
            .error_for_status()
            .context("sheets values.clear returned an error status")?;
        let _body: ClearValuesResponse = resp
            .json()
            .await
            .context("sheets values.clear returned malformed JSON")?;
        Ok(())
    }
}
