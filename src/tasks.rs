//! Task register flows: the new-task watch, in-progress reminders and the
//! complete action.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::app::App;
use crate::config::TaskColumns;
use crate::dates;
use crate::format;
use crate::ident;
use crate::menu;
use crate::model::{TaskItem, TaskStatus, User};
use crate::sheets::cell;
use crate::users::UserDirectory;

const NEW_TASK_TITLE: &str = "😮‍💨 Вам призначено нове завдання:";
const MY_TASKS_TITLE: &str = "⏳ Завдання в роботі:";
const REMINDER_TITLE: &str = "⏳ Нагадування про завдання в роботі:";
const TASKS_EMPTY: &str = "Всі завдання виконані! ✅";

/// Which daily reminder is being sent; each has its own user toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderMode {
    Morning,
    Evening,
}

impl ReminderMode {
    fn allowed_for(&self, user: &User) -> bool {
        match self {
            ReminderMode::Morning => user.settings.morning_tasks,
            ReminderMode::Evening => user.settings.evening_tasks,
        }
    }
}

fn task_item(row: &[Value], cols: &TaskColumns) -> TaskItem {
    TaskItem {
        description: cell::text(&cell::at(row, cols.description)),
        decision: cell::text(&cell::at(row, cols.decision)),
        due: cell::at(row, cols.due_date),
    }
}

fn row_status(row: &[Value], cols: &TaskColumns) -> Option<TaskStatus> {
    TaskStatus::parse(&cell::text(&cell::at(row, cols.status)))
}

/// One watcher pass over the task register: in-progress rows without an id
/// get one, rows still tagged 'U' produce the new-task notice and flip to
/// 'N'. Rows already tagged 'N' are no-ops whatever else changed.
#[instrument(skip_all)]
pub async fn watch_once(app: &App, today: NaiveDate) -> Result<()> {
    let _guard = app.tasks_lock.lock().await;

    let sheet = app.tasks_sheet();
    let start_row = app.cfg.sheets.tasks.data_start_row;
    let rows = app
        .store
        .read_rows(&sheet, start_row, 1, app.task_cols.max_col())
        .await
        .context("failed to read the task register")?;
    let directory = app.load_directory().await?;

    for (i, row) in rows.iter().enumerate() {
        let sheet_row = start_row + i as u32;
        if let Err(err) = watch_row(app, &directory, row, sheet_row, today).await {
            warn!(?err, sheet_row, "task row processing failed");
        }
    }
    Ok(())
}

async fn watch_row(
    app: &App,
    directory: &UserDirectory,
    row: &[Value],
    sheet_row: u32,
    today: NaiveDate,
) -> Result<()> {
    let cols = &app.task_cols;
    if row_status(row, cols) != Some(TaskStatus::InProgress) {
        return Ok(());
    }

    let sheet = app.tasks_sheet();
    let mut id = cell::text(&cell::at(row, cols.id));
    if id.is_empty() {
        id = ident::generate_unnotified();
        app.store
            .write_cell(&sheet, sheet_row, cols.id, json!(id.clone()))
            .await?;
    }
    if ident::is_notified(&id) {
        return Ok(());
    }

    let responsible = cell::text(&cell::at(row, cols.responsible));
    if responsible.is_empty() {
        debug!(sheet_row, "task has no responsible; skipping notice");
        return Ok(());
    }
    let Some(user) = directory.by_name(&responsible) else {
        debug!(sheet_row, %responsible, "responsible not found in the directory");
        return Ok(());
    };
    if !user.settings.new_tasks {
        debug!(chat_id = %user.chat_id, "new-task notices disabled; skipping");
        return Ok(());
    }
    let Some(chat) = user.chat_id_num() else {
        debug!(%user.full_name, "user has no usable chat id");
        return Ok(());
    };

    let item = task_item(row, cols);
    if item.description.is_empty() && item.decision.is_empty() {
        debug!(sheet_row, "task has neither description nor decision; skipping");
        return Ok(());
    }

    let text = format::task_message(NEW_TASK_TITLE, &item, today);
    let markup = menu::task_keyboard(&id).map(teloxide::types::ReplyMarkup::InlineKeyboard);
    app.messenger.send(chat, &text, markup).await?;
    // The id flips only after a successful dispatch.
    app.store
        .write_cell(&sheet, sheet_row, cols.id, json!(ident::mark_notified(&id)))
        .await?;
    debug!(chat_id = %user.chat_id, sheet_row, "new-task notice sent");
    Ok(())
}

/// Assign 'U' identifiers to described rows that never got one (a one-off
/// for registers that predate the bot). Blank rows keep a blank id cell.
#[instrument(skip_all)]
pub async fn backfill_ids(app: &App) -> Result<usize> {
    let _guard = app.tasks_lock.lock().await;

    let sheet = app.tasks_sheet();
    let start_row = app.cfg.sheets.tasks.data_start_row;
    let cols = &app.task_cols;
    let rows = app
        .store
        .read_rows(&sheet, start_row, 1, cols.max_col())
        .await
        .context("failed to read the task register")?;
    if rows.is_empty() {
        return Ok(0);
    }

    let mut assigned = 0;
    let ids: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            if cell::is_blank(&cell::at(row, cols.description)) {
                return vec![json!("")];
            }
            let existing = cell::text(&cell::at(row, cols.id));
            if !existing.is_empty() {
                return vec![json!(existing)];
            }
            assigned += 1;
            vec![json!(ident::generate_unnotified())]
        })
        .collect();

    app.store
        .write_rows(&sheet, start_row, cols.id, &ids)
        .await
        .context("failed to write task identifiers")?;
    info!(assigned, "task identifiers backfilled");
    Ok(assigned)
}

fn in_progress_for_user(
    rows: &[Vec<Value>],
    directory: &UserDirectory,
    user: &User,
    cols: &TaskColumns,
) -> Vec<TaskItem> {
    let mut items: Vec<TaskItem> = rows
        .iter()
        .filter_map(|row| {
            if row_status(row, cols) != Some(TaskStatus::InProgress) {
                return None;
            }
            let responsible = cell::text(&cell::at(row, cols.responsible));
            let resolved = directory.by_name(&responsible)?;
            if resolved.chat_id != user.chat_id {
                return None;
            }
            let item = task_item(row, cols);
            (!item.description.is_empty() || !item.decision.is_empty()).then_some(item)
        })
        .collect();
    items.sort_by_key(|item| dates::cell_day_timestamp(&item.due).unwrap_or(i64::MAX));
    items
}

/// On-demand list of the requesting user's in-progress tasks, nearest due
/// date first. Sent even when empty.
#[instrument(skip_all)]
pub async fn my_tasks(
    app: &App,
    directory: &UserDirectory,
    user: &User,
    today: NaiveDate,
) -> Result<()> {
    let start_row = app.cfg.sheets.tasks.data_start_row;
    let rows = app
        .store
        .read_rows(&app.tasks_sheet(), start_row, 1, app.task_cols.max_col())
        .await
        .context("failed to read the task register")?;
    let items = in_progress_for_user(&rows, directory, user, &app.task_cols);
    let blocks: Vec<String> = items.iter().map(|i| format::task_block(i, today)).collect();
    let text = format::format_list(MY_TASKS_TITLE, &blocks, TASKS_EMPTY);
    let chat = user
        .chat_id_num()
        .context("requesting user has no numeric chat id")?;
    app.messenger.send(chat, &text, None).await?;
    Ok(())
}

/// Morning/evening reminder: group in-progress tasks by resolved responsible
/// and send one list per user honoring that mode's toggle. One user's
/// failure never blocks the rest of the broadcast.
#[instrument(skip_all)]
pub async fn notify_in_progress(app: &App, mode: ReminderMode, today: NaiveDate) -> Result<()> {
    let start_row = app.cfg.sheets.tasks.data_start_row;
    let cols = &app.task_cols;
    let rows = app
        .store
        .read_rows(&app.tasks_sheet(), start_row, 1, cols.max_col())
        .await
        .context("failed to read the task register")?;
    let directory = app.load_directory().await?;

    let mut grouped: BTreeMap<String, (User, Vec<TaskItem>)> = BTreeMap::new();
    for row in &rows {
        if row_status(row, cols) != Some(TaskStatus::InProgress) {
            continue;
        }
        let item = task_item(row, cols);
        if item.description.is_empty() && item.decision.is_empty() {
            continue;
        }
        let responsible = cell::text(&cell::at(row, cols.responsible));
        if responsible.is_empty() {
            continue;
        }
        let Some(user) = directory.by_name(&responsible) else {
            continue;
        };
        if user.chat_id.is_empty() || !mode.allowed_for(user) {
            continue;
        }
        grouped
            .entry(user.chat_id.clone())
            .or_insert_with(|| (user.clone(), Vec::new()))
            .1
            .push(item);
    }

    let sends = grouped.values().map(|(user, items)| async move {
        (user.chat_id.clone(), send_reminder(app, user, items, today).await)
    });
    for (chat_id, result) in futures::future::join_all(sends).await {
        if let Err(err) = result {
            error!(?err, %chat_id, "task reminder failed for user");
        }
    }
    Ok(())
}

async fn send_reminder(app: &App, user: &User, items: &[TaskItem], today: NaiveDate) -> Result<()> {
    let Some(chat) = user.chat_id_num() else {
        debug!(%user.full_name, "user chat id is not numeric; skipping");
        return Ok(());
    };
    let blocks: Vec<String> = items.iter().map(|i| format::task_block(i, today)).collect();
    let text = format::format_list(REMINDER_TITLE, &blocks, TASKS_EMPTY);
    app.messenger.send(chat, &text, None).await?;
    Ok(())
}

/// Mark the task whose identifier contains `token` as completed and remove
/// the originating notification message. Returns false when no row matches.
#[instrument(skip_all)]
pub async fn complete(app: &App, token: &str, chat_id: i64, message_id: i32) -> Result<bool> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(false);
    }
    let _guard = app.tasks_lock.lock().await;

    let sheet = app.tasks_sheet();
    let start_row = app.cfg.sheets.tasks.data_start_row;
    let cols = &app.task_cols;
    let rows = app
        .store
        .read_rows(&sheet, start_row, 1, cols.max_col())
        .await
        .context("failed to read the task register")?;

    let hit = rows.iter().position(|row| {
        let id = cell::text(&cell::at(row, cols.id));
        !id.is_empty() && id.contains(token)
    });
    let Some(i) = hit else {
        return Ok(false);
    };
    app.store
        .write_cell(
            &sheet,
            start_row + i as u32,
            cols.status,
            json!(TaskStatus::Completed.as_sheet_text()),
        )
        .await
        .context("failed to update the task status")?;
    app.messenger.delete(chat_id, message_id).await?;
    info!(row = start_row + i as u32, "task completed");
    Ok(true)
}
