//! Bulk register scans that build per-user notification payloads.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::{PaymentColumns, RegisterColumns};
use crate::dates;
use crate::ident;
use crate::model::{PaymentItem, User};
use crate::sheets::cell;
use crate::users::UserDirectory;

/// One user's batch of overdue payment notifications.
#[derive(Debug, Clone)]
pub struct UserPayments {
    pub user: User,
    pub payments: Vec<PaymentItem>,
}

/// An unapproved register row plus the action token for its approve button.
#[derive(Debug, Clone)]
pub struct Unapproved {
    pub item: PaymentItem,
    pub token: String,
}

/// Purpose text priority: the project label and the purpose field joined
/// with ", " when both are present, else whichever exists, else the
/// nomenclature.
pub fn purpose_text(row: &[Value], cols: &PaymentColumns) -> String {
    let mut parts = Vec::new();
    let project = cell::text(&cell::at(row, cols.project));
    if !project.is_empty() {
        parts.push(format!("Проект: {project}"));
    }
    let purpose = cell::text(&cell::at(row, cols.purpose));
    if !purpose.is_empty() {
        parts.push(purpose);
    }
    if parts.is_empty() {
        let nomenclature = cell::text(&cell::at(row, cols.nomenclature));
        if !nomenclature.is_empty() {
            parts.push(nomenclature);
        }
    }
    parts.join(", ")
}

/// Render a register row into the fields a notification shows.
pub fn payment_item(row: &[Value], cols: &PaymentColumns) -> PaymentItem {
    PaymentItem {
        date: cell::at(row, cols.plan_payment_date),
        contractor: cell::text(&cell::at(row, cols.contractor)),
        amount: cell::text(&cell::at(row, cols.amount)),
        currency: cell::text(&cell::at(row, cols.currency)),
        purpose: purpose_text(row, cols),
    }
}

/// Row-level unpaid filter: a dated, not-yet-paid row due today or earlier
/// with a usable amount. A date that fails to parse does not count as
/// "after today"; such rows stay in.
fn unpaid_row(row: &[Value], today: NaiveDate, cols: &RegisterColumns) -> Option<PaymentItem> {
    let date_cell = cell::at(row, cols.pay.plan_payment_date);
    if cell::is_blank(&date_cell) {
        return None;
    }
    if cell::is_true(&cell::at(row, cols.paid)) {
        return None;
    }
    if dates::cell_day(&date_cell).is_some_and(|d| d > today) {
        return None;
    }
    let amount = cell::at(row, cols.pay.amount);
    if cell::is_blank(&amount) || cell::number(&amount) == Some(0.0) {
        return None;
    }
    Some(payment_item(row, &cols.pay))
}

/// Group qualifying unpaid rows by the resolved responsible user. Users with
/// the unpaid toggle off or without a chat id are excluded, as are rows whose
/// responsible cannot be resolved at all.
pub fn unpaid_by_user(
    rows: &[Vec<Value>],
    today: NaiveDate,
    directory: &UserDirectory,
    cols: &RegisterColumns,
) -> BTreeMap<String, UserPayments> {
    let mut grouped: BTreeMap<String, UserPayments> = BTreeMap::new();
    for row in rows {
        let Some(item) = unpaid_row(row, today, cols) else {
            continue;
        };
        let responsible = cell::text(&cell::at(row, cols.pay.responsible));
        let Some(user) = directory.by_name(&responsible) else {
            continue;
        };
        if !user.settings.unpaid || user.chat_id.is_empty() {
            continue;
        }
        grouped
            .entry(user.chat_id.clone())
            .or_insert_with(|| UserPayments {
                user: user.clone(),
                payments: Vec::new(),
            })
            .payments
            .push(item);
    }
    grouped
}

/// Unpaid rows belonging to one specific user, for the on-demand menu flow.
/// The notification toggle is deliberately not consulted here: the user
/// asked for the list.
pub fn unpaid_for_user(
    rows: &[Vec<Value>],
    today: NaiveDate,
    directory: &UserDirectory,
    user: &User,
    cols: &RegisterColumns,
) -> Vec<PaymentItem> {
    rows.iter()
        .filter_map(|row| {
            let item = unpaid_row(row, today, cols)?;
            let responsible = cell::text(&cell::at(row, cols.pay.responsible));
            let resolved = directory.by_name(&responsible)?;
            (resolved.chat_id == user.chat_id).then_some(item)
        })
        .collect()
}

/// Rows awaiting approval, ascending by payment day. Rows without an
/// identifier are skipped: there is nothing to bind the button to yet; the
/// watcher assigns ids on its next pass.
pub fn unapproved(rows: &[Vec<Value>], cols: &RegisterColumns) -> Vec<Unapproved> {
    let mut out: Vec<(i64, Unapproved)> = rows
        .iter()
        .filter_map(|row| {
            if cell::is_true(&cell::at(row, cols.approved)) {
                return None;
            }
            if cell::is_blank(&cell::at(row, cols.pay.amount)) {
                return None;
            }
            let id = cell::text(&cell::at(row, cols.payment_id));
            if id.is_empty() {
                return None;
            }
            let day = dates::cell_day_timestamp(&cell::at(row, cols.pay.plan_payment_date))
                .unwrap_or(i64::MAX);
            Some((
                day,
                Unapproved {
                    item: payment_item(row, &cols.pay),
                    token: ident::token(&id).to_string(),
                },
            ))
        })
        .collect();
    out.sort_by_key(|(day, _)| *day);
    out.into_iter().map(|(_, u)| u).collect()
}
