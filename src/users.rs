//! User directory backed by the users sheet.
//!
//! Loaded once per invocation and passed explicitly to whatever needs user
//! resolution; there is no global user table.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::model::{SettingKey, User, UserSettings};
use crate::sheets::{cell, SheetRef, SheetStore};

const COL_FULL_NAME: u32 = 1;
const COL_POSITION: u32 = 2;
const COL_SERVICE: u32 = 3;
const COL_CHAT_ID: u32 = 4;

/// Column of a toggle on the users sheet.
pub fn setting_column(key: SettingKey) -> u32 {
    match key {
        SettingKey::Payments => 5,
        SettingKey::Unpaid => 6,
        SettingKey::NewTasks => 7,
        SettingKey::MorningTasks => 8,
        SettingKey::EveningTasks => 9,
    }
}

const SHEET_WIDTH: u32 = 9;

#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    /// Read the whole users sheet. Row 1 is the header and is skipped; rows
    /// with neither a name nor a chat id are ignored as padding.
    #[instrument(skip_all)]
    pub async fn load(store: &dyn SheetStore, sheet: &SheetRef) -> Result<Self> {
        let rows = store
            .read_rows(sheet, 1, 1, SHEET_WIDTH)
            .await
            .context("failed to read users sheet")?;

        let mut users = Vec::new();
        for (i, row) in rows.iter().enumerate().skip(1) {
            let full_name = cell::text(&cell::at(row, COL_FULL_NAME));
            let chat_id = cell::text(&cell::at(row, COL_CHAT_ID));
            if full_name.is_empty() && chat_id.is_empty() {
                continue;
            }
            users.push(User {
                row: i as u32 + 1,
                full_name,
                position: cell::text(&cell::at(row, COL_POSITION)),
                service: cell::text(&cell::at(row, COL_SERVICE)),
                chat_id,
                settings: read_settings(row),
            });
        }
        Ok(Self { users })
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Exact string-equality match on the chat-id column.
    pub fn by_chat_id(&self, chat_id: &str) -> Option<&User> {
        let wanted = chat_id.trim();
        if wanted.is_empty() {
            return None;
        }
        self.users.iter().find(|u| u.chat_id == wanted)
    }

    /// First user whose full name *contains* the trimmed lowercase query.
    /// Deliberately substring containment, not equality: responsible-party
    /// cells often hold a short form of the name. When several names overlap
    /// the earliest row wins.
    pub fn by_name(&self, name: &str) -> Option<&User> {
        let query = name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.users
            .iter()
            .find(|u| u.full_name.to_lowercase().contains(&query))
    }

    /// Flip one toggle: persist the new value at the user's row and mutate
    /// the in-memory user. The caller re-renders the settings menu.
    #[instrument(skip_all, fields(chat_id = %user.chat_id, setting = key.as_str()))]
    pub async fn set_setting(
        store: &dyn SheetStore,
        sheet: &SheetRef,
        user: &mut User,
        key: SettingKey,
    ) -> Result<bool> {
        let next = !user.settings.get(key);
        store
            .write_cell(sheet, user.row, setting_column(key), Value::Bool(next))
            .await
            .context("failed to persist user setting")?;
        user.settings.set(key, next);
        debug!(%user.full_name, value = next, "updated notification setting");
        Ok(next)
    }
}

fn read_settings(row: &[Value]) -> UserSettings {
    let mut settings = UserSettings::default();
    for key in SettingKey::ALL {
        settings.set(key, cell::is_true(&cell::at(row, setting_column(key))));
    }
    settings
}
