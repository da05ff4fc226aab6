//! In-memory [`SheetStore`] used by tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{SheetRef, SheetStore};

type Grid = Vec<Vec<Value>>;

/// A whole "spreadsheet platform" in a mutex-guarded map. Coordinates are
/// 1-based to match the real store; the grid grows on demand.
#[derive(Debug, Default)]
pub struct MemSheets {
    grids: Mutex<HashMap<(String, String), Grid>>,
}

impl MemSheets {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(sheet: &SheetRef) -> (String, String) {
        (sheet.spreadsheet_id.clone(), sheet.sheet_name.clone())
    }

    /// Seed a sheet with rows whose first row lands at `start_row`, col 1.
    pub fn seed(&self, sheet: &SheetRef, start_row: u32, rows: Vec<Vec<Value>>) {
        let mut grids = self.grids.lock().expect("mem sheets poisoned");
        let grid = grids.entry(Self::key(sheet)).or_default();
        for (i, row) in rows.into_iter().enumerate() {
            let r = start_row as usize - 1 + i;
            if grid.len() <= r {
                grid.resize(r + 1, Vec::new());
            }
            grid[r] = row;
        }
    }

    /// Snapshot of the sheet as stored (rows from row 1, possibly ragged).
    pub fn dump(&self, sheet: &SheetRef) -> Grid {
        let grids = self.grids.lock().expect("mem sheets poisoned");
        grids.get(&Self::key(sheet)).cloned().unwrap_or_default()
    }

    /// Single cell, 1-based coordinates.
    pub fn cell(&self, sheet: &SheetRef, row: u32, col: u32) -> Value {
        let grids = self.grids.lock().expect("mem sheets poisoned");
        grids
            .get(&Self::key(sheet))
            .and_then(|g| g.get(row as usize - 1))
            .and_then(|r| r.get(col as usize - 1))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn with_grid<T>(&self, sheet: &SheetRef, f: impl FnOnce(&mut Grid) -> T) -> T {
        let mut grids = self.grids.lock().expect("mem sheets poisoned");
        f(grids.entry(Self::key(sheet)).or_default())
    }
}

fn set_cell(grid: &mut Grid, row: usize, col: usize, value: Value) {
    if grid.len() <= row {
        grid.resize(row + 1, Vec::new());
    }
    let r = &mut grid[row];
    if r.len() <= col {
        r.resize(col + 1, Value::Null);
    }
    r[col] = value;
}

#[async_trait]
impl SheetStore for MemSheets {
    async fn read_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        width: u32,
    ) -> Result<Vec<Vec<Value>>> {
        Ok(self.with_grid(sheet, |grid| {
            grid.iter()
                .skip(start_row as usize - 1)
                .map(|row| {
                    row.iter()
                        .skip(start_col as usize - 1)
                        .take(width as usize)
                        .cloned()
                        .collect()
                })
                .collect()
        }))
    }

    async fn read_cell(&self, sheet: &SheetRef, row: u32, col: u32) -> Result<Value> {
        Ok(self.cell(sheet, row, col))
    }

    async fn write_rows(
        &self,
        sheet: &SheetRef,
        start_row: u32,
        start_col: u32,
        rows: &[Vec<Value>],
    ) -> Result<()> {
        self.with_grid(sheet, |grid| {
            for (i, row) in rows.iter().enumerate() {
                for (j, value) in row.iter().enumerate() {
                    set_cell(
                        grid,
                        start_row as usize - 1 + i,
                        start_col as usize - 1 + j,
                        value.clone(),
                    );
                }
            }
        });
        Ok(())
    }

    async fn write_cell(&self, sheet: &SheetRef, row: u32, col: u32, value: Value) -> Result<()> {
        self.with_grid(sheet, |grid| {
            set_cell(grid, row as usize - 1, col as usize - 1, value);
        });
        Ok(())
    }

    async fn clear_rows(&self, sheet: &SheetRef, start_row: u32, width: u32) -> Result<()> {
        self.with_grid(sheet, |grid| {
            for row in grid.iter_mut().skip(start_row as usize - 1) {
                for cell in row.iter_mut().take(width as usize) {
                    *cell = Value::Null;
                }
            }
            while grid
                .last()
                .is_some_and(|r| r.iter().all(|c| matches!(c, Value::Null)))
            {
                grid.pop();
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet() -> SheetRef {
        SheetRef::new("sid", "Реєстр")
    }

    #[tokio::test]
    async fn roundtrip_with_offsets() {
        let mem = MemSheets::new();
        mem.write_rows(&sheet(), 7, 2, &[vec![json!("a"), json!("b")]])
            .await
            .unwrap();
        let rows = mem.read_rows(&sheet(), 7, 2, 2).await.unwrap();
        assert_eq!(rows, vec![vec![json!("a"), json!("b")]]);
        // Column 1 of the same row was never written.
        assert_eq!(mem.cell(&sheet(), 7, 1), Value::Null);
    }

    #[tokio::test]
    async fn clear_then_rewrite_shrinks_the_region() {
        let mem = MemSheets::new();
        mem.seed(
            &sheet(),
            7,
            vec![
                vec![json!("one")],
                vec![json!("two")],
                vec![json!("three")],
            ],
        );
        mem.clear_rows(&sheet(), 7, 5).await.unwrap();
        mem.write_rows(&sheet(), 7, 1, &[vec![json!("only")]])
            .await
            .unwrap();
        let rows = mem.read_rows(&sheet(), 7, 1, 5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], json!("only"));
    }

    #[tokio::test]
    async fn read_cell_out_of_bounds_is_null() {
        let mem = MemSheets::new();
        assert_eq!(mem.read_cell(&sheet(), 99, 99).await.unwrap(), Value::Null);
    }
}
