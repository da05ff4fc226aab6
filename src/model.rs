use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task lifecycle status as written in the register's status column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Completed,
    Postponed,
}

impl TaskStatus {
    /// The exact text stored in the status cell.
    pub fn as_sheet_text(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "В роботі",
            TaskStatus::Completed => "Виконано",
            TaskStatus::Postponed => "Перенесено",
        }
    }

    /// Case-insensitive parse of a status cell; unknown text maps to `None`.
    pub fn parse(text: &str) -> Option<TaskStatus> {
        let t = text.trim().to_lowercase();
        [
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Postponed,
        ]
        .into_iter()
        .find(|s| s.as_sheet_text().to_lowercase() == t)
    }
}

/// The five per-user notification toggles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettingKey {
    Payments,
    Unpaid,
    NewTasks,
    MorningTasks,
    EveningTasks,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::Payments,
        SettingKey::Unpaid,
        SettingKey::NewTasks,
        SettingKey::MorningTasks,
        SettingKey::EveningTasks,
    ];

    /// Stable token used in `change_option:<token>` callback payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Payments => "payments",
            SettingKey::Unpaid => "unpaid",
            SettingKey::NewTasks => "new_tasks",
            SettingKey::MorningTasks => "morning_tasks",
            SettingKey::EveningTasks => "evening_tasks",
        }
    }

    pub fn parse(token: &str) -> Option<SettingKey> {
        Self::ALL.into_iter().find(|k| k.as_str() == token)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSettings {
    pub payments: bool,
    pub unpaid: bool,
    pub new_tasks: bool,
    pub morning_tasks: bool,
    pub evening_tasks: bool,
}

impl UserSettings {
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::Payments => self.payments,
            SettingKey::Unpaid => self.unpaid,
            SettingKey::NewTasks => self.new_tasks,
            SettingKey::MorningTasks => self.morning_tasks,
            SettingKey::EveningTasks => self.evening_tasks,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: bool) {
        match key {
            SettingKey::Payments => self.payments = value,
            SettingKey::Unpaid => self.unpaid = value,
            SettingKey::NewTasks => self.new_tasks = value,
            SettingKey::MorningTasks => self.morning_tasks = value,
            SettingKey::EveningTasks => self.evening_tasks = value,
        }
    }
}

/// One row of the users sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// 1-based sheet row the user was loaded from (needed for write-back).
    pub row: u32,
    pub full_name: String,
    pub position: String,
    pub service: String,
    pub chat_id: String,
    pub settings: UserSettings,
}

impl User {
    /// Telegram chat id as a number, when the cell holds one.
    pub fn chat_id_num(&self) -> Option<i64> {
        self.chat_id.trim().parse().ok()
    }
}

/// Payment fields as rendered into a notification block.
#[derive(Debug, Clone)]
pub struct PaymentItem {
    pub date: Value,
    pub contractor: String,
    pub amount: String,
    pub currency: String,
    pub purpose: String,
}

/// Task fields as rendered into a notification block.
#[derive(Debug, Clone)]
pub struct TaskItem {
    pub description: String,
    pub decision: String,
    pub due: Value,
}
