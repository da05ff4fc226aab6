#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::types::{InlineKeyboardMarkup, ReplyMarkup};

use tg_regbot::app::App;
use tg_regbot::config::{self, Config, PaymentColumns, RegisterColumns, TaskColumns};
use tg_regbot::sheets::{MemSheets, SheetStore};
use tg_regbot::telegram::Messenger;

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub has_markup: bool,
}

/// Messenger double recording outbound traffic; selected chats can be made
/// to reject sends.
#[derive(Default)]
pub struct RecordingMessenger {
    next_id: AtomicI32,
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<(i64, i32, String)>>,
    deletes: Mutex<Vec<(i64, i32)>>,
    acks: Mutex<Vec<String>>,
    failing_chats: Mutex<HashSet<i64>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_chat(&self, chat_id: i64) {
        self.failing_chats
            .lock()
            .expect("messenger poisoned")
            .insert(chat_id);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("messenger poisoned").clone()
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text)
            .collect()
    }

    pub fn edits(&self) -> Vec<(i64, i32, String)> {
        self.edits.lock().expect("messenger poisoned").clone()
    }

    pub fn deletes(&self) -> Vec<(i64, i32)> {
        self.deletes.lock().expect("messenger poisoned").clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> Result<i32> {
        if self
            .failing_chats
            .lock()
            .expect("messenger poisoned")
            .contains(&chat_id)
        {
            bail!("send rejected for chat {chat_id}");
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().expect("messenger poisoned").push(SentMessage {
            chat_id,
            text: text.to_string(),
            has_markup: markup.is_some(),
        });
        Ok(id)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        _markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        self.edits
            .lock()
            .expect("messenger poisoned")
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.deletes
            .lock()
            .expect("messenger poisoned")
            .push((chat_id, message_id));
        Ok(())
    }

    async fn ack_callback(&self, callback_id: &str) -> Result<()> {
        self.acks
            .lock()
            .expect("messenger poisoned")
            .push(callback_id.to_string());
        Ok(())
    }
}

pub struct TestBot {
    pub mem: Arc<MemSheets>,
    pub messenger: Arc<RecordingMessenger>,
    pub app: App,
}

/// App over the example config, an in-memory store and a recording messenger.
pub fn test_app() -> TestBot {
    let cfg: Config = serde_yaml::from_str(config::example()).expect("example config parses");
    config::validate(&cfg).expect("example config is valid");
    let mem = Arc::new(MemSheets::new());
    let messenger = Arc::new(RecordingMessenger::new());
    let app = App::new(
        cfg,
        mem.clone() as Arc<dyn SheetStore>,
        messenger.clone() as Arc<dyn Messenger>,
    );
    TestBot {
        mem,
        messenger,
        app,
    }
}

pub fn users_header() -> Vec<Value> {
    vec![
        json!("ПІБ"),
        json!("Посада"),
        json!("Служба"),
        json!("Telegram chat_id"),
        json!("payments_notifications"),
        json!("unpaid_notifications"),
        json!("new_tasks_notifications"),
        json!("morning_tasks_notifications"),
        json!("evening_tasks_notifications"),
    ]
}

/// One users-sheet row; toggles in sheet order (payments, unpaid, new tasks,
/// morning, evening).
pub fn user_row(name: &str, chat_id: &str, toggles: [bool; 5]) -> Vec<Value> {
    vec![
        json!(name),
        json!("Менеджер"),
        json!("Фінанси"),
        json!(chat_id),
        json!(toggles[0]),
        json!(toggles[1]),
        json!(toggles[2]),
        json!(toggles[3]),
        json!(toggles[4]),
    ]
}

pub fn seed_users(bot: &TestBot, rows: Vec<Vec<Value>>) {
    let mut all = vec![users_header()];
    all.extend(rows);
    bot.mem.seed(&bot.app.users_sheet(), 1, all);
}

/// A source-ledger slice row, columns `min_col..=max_col` of the default
/// source layout.
pub fn source_row(date: &str, amount: Value, responsible: &str, contractor: &str) -> Vec<Value> {
    let cols = PaymentColumns::source_default();
    let offset = cols.min_col();
    let mut row = vec![json!(""); (cols.max_col() - offset + 1) as usize];
    let mut put = |col: u32, v: Value| row[(col - offset) as usize] = v;
    put(cols.plan_payment_date, json!(date));
    put(cols.amount, amount);
    put(cols.responsible, json!(responsible));
    put(cols.contractor, json!(contractor));
    put(cols.currency, json!("UAH"));
    row
}

/// A full-width payments-register row in the default target layout.
pub fn register_row(
    date: &str,
    responsible: &str,
    amount: Value,
    paid: Value,
    approved: Value,
    id: &str,
) -> Vec<Value> {
    let cols = RegisterColumns::target_default();
    let mut row = vec![json!(""); cols.max_col() as usize];
    row[cols.pay.plan_payment_date as usize - 1] = json!(date);
    row[cols.pay.responsible as usize - 1] = json!(responsible);
    row[cols.pay.amount as usize - 1] = amount;
    row[cols.pay.contractor as usize - 1] = json!("ТОВ Тест");
    row[cols.pay.currency as usize - 1] = json!("UAH");
    row[cols.paid as usize - 1] = paid;
    row[cols.approved as usize - 1] = approved;
    row[cols.payment_id as usize - 1] = json!(id);
    row
}

/// A full-width task-register row in the default layout.
pub fn task_row(
    description: &str,
    decision: &str,
    responsible: &str,
    due: &str,
    status: &str,
    id: &str,
) -> Vec<Value> {
    let cols = TaskColumns::default_layout();
    let mut row = vec![json!(""); cols.max_col() as usize];
    row[cols.description as usize - 1] = json!(description);
    row[cols.decision as usize - 1] = json!(decision);
    row[cols.responsible as usize - 1] = json!(responsible);
    row[cols.due_date as usize - 1] = json!(due);
    row[cols.status as usize - 1] = json!(status);
    row[cols.id as usize - 1] = json!(id);
    row
}
