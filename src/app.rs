//! Shared state wired once at startup and passed to every flow.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::config::{Config, PaymentColumns, RegisterColumns, TaskColumns};
use crate::sheets::{SheetRef, SheetStore};
use crate::telegram::Messenger;
use crate::users::UserDirectory;

pub struct App {
    pub cfg: Config,
    pub store: Arc<dyn SheetStore>,
    pub messenger: Arc<dyn Messenger>,
    /// Column layouts, resolved from the config exactly once.
    pub source_cols: PaymentColumns,
    pub target_cols: RegisterColumns,
    pub task_cols: TaskColumns,
    /// Serializes every read-modify-write against the payments register.
    /// The delete-then-rewrite reconcile and the id-state transitions are
    /// not safe under concurrent invocations.
    pub payments_lock: Mutex<()>,
    /// Same, for the tasks register.
    pub tasks_lock: Mutex<()>,
}

impl App {
    pub fn new(cfg: Config, store: Arc<dyn SheetStore>, messenger: Arc<dyn Messenger>) -> Self {
        let source_cols = cfg.source_columns();
        let target_cols = cfg.target_columns();
        let task_cols = cfg.task_columns();
        Self {
            cfg,
            store,
            messenger,
            source_cols,
            target_cols,
            task_cols,
            payments_lock: Mutex::new(()),
            tasks_lock: Mutex::new(()),
        }
    }

    pub fn users_sheet(&self) -> SheetRef {
        SheetRef::new(
            self.cfg.sheets.users.spreadsheet_id.clone(),
            self.cfg.sheets.users.sheet_name.clone(),
        )
    }

    pub fn source_sheet(&self) -> SheetRef {
        SheetRef::new(
            self.cfg.sheets.payments.spreadsheet_id.clone(),
            self.cfg.sheets.payments.source.sheet_name.clone(),
        )
    }

    pub fn target_sheet(&self) -> SheetRef {
        SheetRef::new(
            self.cfg.sheets.payments.spreadsheet_id.clone(),
            self.cfg.sheets.payments.target.sheet_name.clone(),
        )
    }

    pub fn tasks_sheet(&self) -> SheetRef {
        SheetRef::new(
            self.cfg.sheets.tasks.spreadsheet_id.clone(),
            self.cfg.sheets.tasks.sheet_name.clone(),
        )
    }

    /// Fresh directory snapshot for one invocation.
    pub async fn load_directory(&self) -> Result<UserDirectory> {
        UserDirectory::load(self.store.as_ref(), &self.users_sheet()).await
    }
}
