//! Row reconciliation engine.
//!
//! Copies rows from the wide source ledger into the narrow target register
//! for one calendar day, reusing target rows that already hold the same
//! logical record so their approval/paid flags and identifiers survive a
//! re-run. The whole computation is pure; callers own the surrounding
//! read/lock/rewrite cycle.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::config::{PaymentColumns, RegisterColumns};
use crate::dates;
use crate::ident;
use crate::sheets::cell;

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Full replacement contents for the target region, top row first.
    pub rows: Vec<Vec<Value>>,
    /// Rows synthesized this pass (each carries a fresh 'U' identifier).
    pub created: usize,
    /// Existing target rows reused with their state intact.
    pub reused: usize,
}

/// Merge `source_rows` (a slice whose first cell sits at 1-based column
/// `source_offset`) into `target_rows` (full-width, starting at column 1)
/// for `filter_date`.
pub fn reconcile(
    source_rows: &[Vec<Value>],
    source_offset: u32,
    target_rows: &[Vec<Value>],
    filter_date: NaiveDate,
    source_cols: &PaymentColumns,
    target_cols: &RegisterColumns,
) -> ReconcileOutcome {
    let width = target_cols.max_col() as usize;
    let scell = |row: &[Value], col: u32| cell::at(row, col + 1 - source_offset);
    let target_day = |row: &[Value]| dates::cell_day(&cell::at(row, target_cols.pay.plan_payment_date));

    // An empty source range is a no-op: the target keeps whatever it holds.
    if source_rows.is_empty() {
        let rows = target_rows.iter().map(|r| pad(r.clone(), width)).collect();
        return ReconcileOutcome {
            rows,
            created: 0,
            reused: 0,
        };
    }

    // 1. Retain source rows for the filter day with a usable amount.
    let retained: Vec<&Vec<Value>> = source_rows
        .iter()
        .filter(|row| {
            let Some(day) = dates::cell_day(&scell(row, source_cols.plan_payment_date)) else {
                return false;
            };
            match cell::number(&scell(row, source_cols.amount)) {
                Some(amount) if amount > 0.0 => day == filter_date,
                _ => false,
            }
        })
        .collect();

    // 2./3. Reuse a matching target row per source row, else synthesize one.
    // A target row is claimed at most once, so duplicated source rows keep
    // their own register rows across passes.
    let field_pairs: Vec<(u32, u32)> = source_cols
        .positions()
        .into_iter()
        .zip(target_cols.pay.positions())
        .filter(|&(s, _)| s != source_cols.plan_payment_date)
        .collect();
    let mut claimed = vec![false; target_rows.len()];
    let mut fresh: Vec<Vec<Value>> = Vec::with_capacity(retained.len());
    let mut created = 0;
    let mut reused = 0;

    for srow in &retained {
        let existing = target_rows.iter().enumerate().position(|(i, trow)| {
            !claimed[i]
                && target_day(trow) == Some(filter_date)
                && field_pairs
                    .iter()
                    .all(|&(s, t)| cell::eq(&scell(srow, s), &cell::at(trow, t)))
        });
        match existing {
            Some(i) => {
                claimed[i] = true;
                fresh.push(pad(target_rows[i].clone(), width));
                reused += 1;
            }
            None => {
                let mut row = vec![cell::blank(); width];
                for (&s, &t) in source_cols.positions().iter().zip(target_cols.pay.positions().iter()) {
                    row[t as usize - 1] = scell(srow, s);
                }
                row[target_cols.approved as usize - 1] = json!(false);
                row[target_cols.paid as usize - 1] = json!(false);
                row[target_cols.payment_id as usize - 1] = json!(ident::generate_unnotified());
                fresh.push(row);
                created += 1;
            }
        }
    }

    // 4. Kept rows: everything except the replaced day and dateless rows.
    let kept: Vec<Vec<Value>> = target_rows
        .iter()
        .filter(|row| matches!(target_day(row), Some(d) if d != filter_date))
        .map(|row| pad(row.clone(), width))
        .collect();

    // Insert before the first strictly earlier row; failing that, after the
    // last strictly later row; failing that, at the very start.
    let pos = kept
        .iter()
        .position(|row| matches!(target_day(row), Some(d) if d < filter_date))
        .or_else(|| {
            kept.iter()
                .rposition(|row| matches!(target_day(row), Some(d) if d > filter_date))
                .map(|i| i + 1)
        })
        .unwrap_or(0);

    let mut rows = kept;
    rows.splice(pos..pos, fresh);

    ReconcileOutcome {
        rows,
        created,
        reused,
    }
}

fn pad(mut row: Vec<Value>, width: usize) -> Vec<Value> {
    if row.len() < width {
        row.resize(width, cell::blank());
    }
    row
}
