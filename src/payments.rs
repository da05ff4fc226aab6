//! Payment register flows: the daily pull, the paid-row watch, overdue
//! broadcasts and the approval actions.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::{self, UserPayments};
use crate::app::App;
use crate::dates;
use crate::format;
use crate::ident;
use crate::menu;
use crate::model::User;
use crate::reconcile;
use crate::sheets::cell;
use crate::users::UserDirectory;

const PAID_TITLE: &str = "💰 Оплату здійснено!";
const UNPAID_TITLE: &str = "⏰ Протерміновані оплати:";
const UNPAID_EMPTY: &str = "Всі оплати виконані вчасно! ✅";
const APPROVE_TITLE: &str = "🔔 Заявка на затвердження:";
const APPROVE_EMPTY: &str = "Немає заявок на затвердження ✅";

/// Write today's date into the gate cell ahead of the daily pull.
#[instrument(skip_all)]
pub async fn set_today_date(app: &App, today: NaiveDate) -> Result<()> {
    let gate = &app.cfg.sheets.payments.date_cell;
    app.store
        .write_cell(
            &app.target_sheet(),
            gate.row,
            gate.col,
            json!(dates::format_day(today)),
        )
        .await
        .context("failed to write the date gate cell")
}

/// Daily pull: merge today's source-ledger rows into the target register.
/// The whole read-reconcile-rewrite runs under the register lock; a blank
/// gate cell turns the pull into a no-op.
#[instrument(skip_all)]
pub async fn refresh_register(app: &App, today: NaiveDate) -> Result<usize> {
    let _guard = app.payments_lock.lock().await;

    let target_sheet = app.target_sheet();
    let gate = &app.cfg.sheets.payments.date_cell;
    let gate_value = app
        .store
        .read_cell(&target_sheet, gate.row, gate.col)
        .await?;
    if cell::is_blank(&gate_value) {
        debug!("date gate cell is blank; skipping register refresh");
        return Ok(0);
    }

    let source_cfg = &app.cfg.sheets.payments.source;
    let offset = app.source_cols.min_col();
    let source_width = app.source_cols.max_col() - offset + 1;
    let source_rows = app
        .store
        .read_rows(
            &app.source_sheet(),
            source_cfg.data_start_row,
            offset,
            source_width,
        )
        .await
        .context("failed to read the source ledger")?;
    if source_rows.is_empty() {
        debug!("source ledger is empty; skipping register refresh");
        return Ok(0);
    }

    let target_cfg = &app.cfg.sheets.payments.target;
    let target_width = app.target_cols.max_col();
    let target_rows = app
        .store
        .read_rows(&target_sheet, target_cfg.data_start_row, 1, target_width)
        .await
        .context("failed to read the payments register")?;

    let outcome = reconcile::reconcile(
        &source_rows,
        offset,
        &target_rows,
        today,
        &app.source_cols,
        &app.target_cols,
    );

    app.store
        .clear_rows(&target_sheet, target_cfg.data_start_row, target_width)
        .await
        .context("failed to clear the payments register")?;
    app.store
        .write_rows(&target_sheet, target_cfg.data_start_row, 1, &outcome.rows)
        .await
        .context("failed to rewrite the payments register")?;

    info!(
        created = outcome.created,
        reused = outcome.reused,
        total = outcome.rows.len(),
        "payments register refreshed"
    );
    Ok(outcome.created)
}

/// One watcher pass over the register: assign missing identifiers, then send
/// the "payment made" notice for paid rows still tagged 'U' and flip them to
/// 'N'. Already-notified rows are no-ops, so the scan can run forever.
#[instrument(skip_all)]
pub async fn watch_once(app: &App) -> Result<()> {
    let _guard = app.payments_lock.lock().await;

    let sheet = app.target_sheet();
    let start_row = app.cfg.sheets.payments.target.data_start_row;
    let rows = app
        .store
        .read_rows(&sheet, start_row, 1, app.target_cols.max_col())
        .await
        .context("failed to read the payments register")?;
    let directory = app.load_directory().await?;

    for (i, row) in rows.iter().enumerate() {
        let sheet_row = start_row + i as u32;
        if let Err(err) = watch_row(app, &directory, row, sheet_row).await {
            warn!(?err, sheet_row, "payment row processing failed");
        }
    }
    Ok(())
}

async fn watch_row(
    app: &App,
    directory: &UserDirectory,
    row: &[serde_json::Value],
    sheet_row: u32,
) -> Result<()> {
    let cols = &app.target_cols;
    let date = cell::at(row, cols.pay.plan_payment_date);
    let amount = cell::at(row, cols.pay.amount);
    if cell::is_blank(&date) || cell::is_blank(&amount) {
        return Ok(());
    }

    let sheet = app.target_sheet();
    let mut id = cell::text(&cell::at(row, cols.payment_id));
    if id.is_empty() {
        id = ident::generate_unnotified();
        app.store
            .write_cell(&sheet, sheet_row, cols.payment_id, json!(id.clone()))
            .await?;
    }

    if !cell::is_true(&cell::at(row, cols.paid)) || ident::is_notified(&id) {
        return Ok(());
    }

    let responsible = cell::text(&cell::at(row, cols.pay.responsible));
    if responsible.is_empty() {
        debug!(sheet_row, "no responsible on a paid row; skipping notice");
        return Ok(());
    }
    let Some(user) = directory.by_name(&responsible) else {
        debug!(sheet_row, %responsible, "responsible not found in the directory");
        return Ok(());
    };
    if !user.settings.payments {
        debug!(chat_id = %user.chat_id, "payment notices disabled; skipping");
        return Ok(());
    }
    let Some(chat) = user.chat_id_num() else {
        debug!(%user.full_name, "user has no usable chat id");
        return Ok(());
    };

    let item = aggregate::payment_item(row, &cols.pay);
    let text = format::payment_message(PAID_TITLE, &item);
    app.messenger.send(chat, &text, None).await?;
    // Only after a successful dispatch does the id flip to 'N'.
    app.store
        .write_cell(&sheet, sheet_row, cols.payment_id, json!(ident::mark_notified(&id)))
        .await?;
    debug!(chat_id = %user.chat_id, sheet_row, "paid notice sent");
    Ok(())
}

/// Evening broadcast: every user with overdue unpaid applications gets one
/// message. A failed send is logged per user and never blocks the rest.
#[instrument(skip_all)]
pub async fn notify_unpaid(app: &App, today: NaiveDate) -> Result<()> {
    let start_row = app.cfg.sheets.payments.target.data_start_row;
    let rows = app
        .store
        .read_rows(&app.target_sheet(), start_row, 1, app.target_cols.max_col())
        .await
        .context("failed to read the payments register")?;
    let directory = app.load_directory().await?;
    let grouped = aggregate::unpaid_by_user(&rows, today, &directory, &app.target_cols);

    let sends = grouped.values().map(|batch| async move {
        (batch.user.chat_id.clone(), send_unpaid_batch(app, batch).await)
    });
    for (chat_id, result) in futures::future::join_all(sends).await {
        if let Err(err) = result {
            error!(?err, %chat_id, "unpaid broadcast failed for user");
        }
    }
    Ok(())
}

async fn send_unpaid_batch(app: &App, batch: &UserPayments) -> Result<()> {
    let Some(chat) = batch.user.chat_id_num() else {
        debug!(%batch.user.full_name, "user chat id is not numeric; skipping");
        return Ok(());
    };
    let blocks: Vec<String> = batch.payments.iter().map(format::payment_block).collect();
    let text = format::format_list(UNPAID_TITLE, &blocks, UNPAID_EMPTY);
    app.messenger.send(chat, &text, None).await?;
    Ok(())
}

/// On-demand list of the requesting user's own unpaid applications. Sent
/// even when empty, since the user asked for it.
#[instrument(skip_all)]
pub async fn my_unpaid(
    app: &App,
    directory: &UserDirectory,
    user: &User,
    today: NaiveDate,
) -> Result<()> {
    let start_row = app.cfg.sheets.payments.target.data_start_row;
    let rows = app
        .store
        .read_rows(&app.target_sheet(), start_row, 1, app.target_cols.max_col())
        .await
        .context("failed to read the payments register")?;
    let items = aggregate::unpaid_for_user(&rows, today, directory, user, &app.target_cols);
    let blocks: Vec<String> = items.iter().map(format::payment_block).collect();
    let text = format::format_list(UNPAID_TITLE, &blocks, UNPAID_EMPTY);
    let chat = user
        .chat_id_num()
        .context("requesting user has no numeric chat id")?;
    app.messenger.send(chat, &text, None).await?;
    Ok(())
}

/// Approver flow: one message with an approve button per unapproved row.
#[instrument(skip_all)]
pub async fn applications_to_approve(app: &App, user: &User) -> Result<()> {
    let chat = user
        .chat_id_num()
        .context("approver has no numeric chat id")?;
    let start_row = app.cfg.sheets.payments.target.data_start_row;
    let rows = app
        .store
        .read_rows(&app.target_sheet(), start_row, 1, app.target_cols.max_col())
        .await
        .context("failed to read the payments register")?;
    let pending = aggregate::unapproved(&rows, &app.target_cols);

    if pending.is_empty() {
        app.messenger
            .send(chat, &format!("<b>{APPROVE_EMPTY}</b>"), None)
            .await?;
        return Ok(());
    }
    for entry in &pending {
        let text = format::payment_message(APPROVE_TITLE, &entry.item);
        let markup = menu::approve_keyboard(&entry.token);
        app.messenger
            .send(
                chat,
                &text,
                Some(teloxide::types::ReplyMarkup::InlineKeyboard(markup)),
            )
            .await
            .context("failed to send an approval request")?;
    }
    Ok(())
}

/// Set the approval flag on the row whose identifier contains `token`.
/// Returns false when no such row exists; the caller reports that, because
/// the action was user-initiated.
#[instrument(skip_all)]
pub async fn approve(app: &App, token: &str) -> Result<bool> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(false);
    }
    let _guard = app.payments_lock.lock().await;

    let sheet = app.target_sheet();
    let start_row = app.cfg.sheets.payments.target.data_start_row;
    let cols = &app.target_cols;
    let rows = app
        .store
        .read_rows(&sheet, start_row, 1, cols.max_col())
        .await
        .context("failed to read the payments register")?;

    let hit = rows.iter().position(|row| {
        let id = cell::text(&cell::at(row, cols.payment_id));
        !id.is_empty() && id.contains(token)
    });
    let Some(i) = hit else {
        return Ok(false);
    };
    app.store
        .write_cell(&sheet, start_row + i as u32, cols.approved, json!(true))
        .await
        .context("failed to set the approval flag")?;
    info!(row = start_row + i as u32, "payment approved");
    Ok(true)
}
