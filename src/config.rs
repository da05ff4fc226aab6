//! Configuration loader and validator for the register notification bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub sheets: Sheets,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Register watcher period.
    pub poll_interval_ms: u64,
    /// Local hour of the morning run (register pull + task reminders).
    pub morning_hour: u32,
    /// Local hour of the evening run (unpaid + task reminders).
    pub evening_hour: u32,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    /// Full names entitled to the payment-approval flow.
    pub approvers: Vec<String>,
}

/// Spreadsheet access and register mappings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sheets {
    pub api_token: String,
    pub users: UsersSheet,
    pub payments: PaymentsSheets,
    pub tasks: TasksSheet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsersSheet {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentsSheets {
    pub spreadsheet_id: String,
    pub source: SourceSheet,
    pub target: TargetSheet,
    /// Cell gating the daily pull; blank means "do not pull today".
    pub date_cell: DateCell,
}

/// The wide application ledger rows are pulled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSheet {
    pub sheet_name: String,
    pub data_start_row: u32,
    #[serde(default)]
    pub columns: PaymentColumnsOverride,
}

/// The narrow payment register rows are reconciled into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetSheet {
    pub sheet_name: String,
    pub data_start_row: u32,
    #[serde(default)]
    pub columns: RegisterColumnsOverride,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateCell {
    pub row: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TasksSheet {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub data_start_row: u32,
    #[serde(default)]
    pub columns: TaskColumnsOverride,
}

/// 1-based positions of the logical payment fields on a sheet. Source and
/// target sheets carry the same fields at different positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentColumns {
    pub plan_payment_date: u32,
    pub organization: u32,
    pub contractor: u32,
    pub project: u32,
    pub nomenclature: u32,
    pub contract: u32,
    pub invoice: u32,
    pub purpose: u32,
    pub department: u32,
    pub responsible: u32,
    pub amount: u32,
    pub currency: u32,
}

/// Sparse per-sheet override of [`PaymentColumns`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentColumnsOverride {
    pub plan_payment_date: Option<u32>,
    pub organization: Option<u32>,
    pub contractor: Option<u32>,
    pub project: Option<u32>,
    pub nomenclature: Option<u32>,
    pub contract: Option<u32>,
    pub invoice: Option<u32>,
    pub purpose: Option<u32>,
    pub department: Option<u32>,
    pub responsible: Option<u32>,
    pub amount: Option<u32>,
    pub currency: Option<u32>,
}

impl PaymentColumns {
    /// Default layout of the source ledger ("Свод заявок").
    pub fn source_default() -> Self {
        Self {
            plan_payment_date: 25, // Y
            organization: 26,      // Z
            contractor: 27,        // AA
            project: 28,           // AB
            nomenclature: 29,      // AC
            contract: 35,          // AI
            invoice: 36,           // AJ
            purpose: 37,           // AK
            department: 38,        // AL
            responsible: 43,       // AQ
            amount: 33,            // AG
            currency: 34,          // AH
        }
    }

    /// Default layout of the target register ("Реєстр"), columns A..L.
    pub fn target_default() -> Self {
        Self {
            plan_payment_date: 1,
            organization: 2,
            contractor: 3,
            project: 4,
            nomenclature: 5,
            contract: 6,
            invoice: 7,
            purpose: 8,
            department: 9,
            responsible: 10,
            amount: 11,
            currency: 12,
        }
    }

    /// Base layout with the sparse override applied. Resolution happens once,
    /// at component construction.
    pub fn resolve(base: Self, over: &PaymentColumnsOverride) -> Self {
        Self {
            plan_payment_date: over.plan_payment_date.unwrap_or(base.plan_payment_date),
            organization: over.organization.unwrap_or(base.organization),
            contractor: over.contractor.unwrap_or(base.contractor),
            project: over.project.unwrap_or(base.project),
            nomenclature: over.nomenclature.unwrap_or(base.nomenclature),
            contract: over.contract.unwrap_or(base.contract),
            invoice: over.invoice.unwrap_or(base.invoice),
            purpose: over.purpose.unwrap_or(base.purpose),
            department: over.department.unwrap_or(base.department),
            responsible: over.responsible.unwrap_or(base.responsible),
            amount: over.amount.unwrap_or(base.amount),
            currency: over.currency.unwrap_or(base.currency),
        }
    }

    /// All mapped positions, in a fixed field order shared by every sheet.
    /// Index 0 is always `plan_payment_date`.
    pub fn positions(&self) -> [u32; 12] {
        [
            self.plan_payment_date,
            self.organization,
            self.contractor,
            self.project,
            self.nomenclature,
            self.contract,
            self.invoice,
            self.purpose,
            self.department,
            self.responsible,
            self.amount,
            self.currency,
        ]
    }

    pub fn min_col(&self) -> u32 {
        self.positions().into_iter().min().unwrap_or(1)
    }

    pub fn max_col(&self) -> u32 {
        self.positions().into_iter().max().unwrap_or(1)
    }
}

/// Target register layout: the payment fields plus the register-only
/// approval/paid flags and the notification identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterColumns {
    pub pay: PaymentColumns,
    pub approved: u32,
    pub paid: u32,
    pub payment_id: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterColumnsOverride {
    #[serde(flatten)]
    pub pay: PaymentColumnsOverride,
    pub approved: Option<u32>,
    pub paid: Option<u32>,
    pub payment_id: Option<u32>,
}

impl RegisterColumns {
    pub fn target_default() -> Self {
        Self {
            pay: PaymentColumns::target_default(),
            approved: 13,   // M
            paid: 14,       // N
            payment_id: 15, // O
        }
    }

    pub fn resolve(base: Self, over: &RegisterColumnsOverride) -> Self {
        Self {
            pay: PaymentColumns::resolve(base.pay, &over.pay),
            approved: over.approved.unwrap_or(base.approved),
            paid: over.paid.unwrap_or(base.paid),
            payment_id: over.payment_id.unwrap_or(base.payment_id),
        }
    }

    /// Width of the register region: union of every configured column.
    pub fn max_col(&self) -> u32 {
        self.pay
            .max_col()
            .max(self.approved)
            .max(self.paid)
            .max(self.payment_id)
    }

    fn min_col(&self) -> u32 {
        self.pay
            .min_col()
            .min(self.approved)
            .min(self.paid)
            .min(self.payment_id)
    }
}

/// Task register layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskColumns {
    pub description: u32,
    pub decision: u32,
    pub responsible: u32,
    pub due_date: u32,
    pub status: u32,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskColumnsOverride {
    pub description: Option<u32>,
    pub decision: Option<u32>,
    pub responsible: Option<u32>,
    pub due_date: Option<u32>,
    pub status: Option<u32>,
    pub id: Option<u32>,
}

impl TaskColumns {
    pub fn default_layout() -> Self {
        Self {
            description: 1, // A
            decision: 4,    // D
            responsible: 5, // E
            due_date: 6,    // F
            status: 7,      // G
            id: 8,          // H
        }
    }

    pub fn resolve(base: Self, over: &TaskColumnsOverride) -> Self {
        Self {
            description: over.description.unwrap_or(base.description),
            decision: over.decision.unwrap_or(base.decision),
            responsible: over.responsible.unwrap_or(base.responsible),
            due_date: over.due_date.unwrap_or(base.due_date),
            status: over.status.unwrap_or(base.status),
            id: over.id.unwrap_or(base.id),
        }
    }

    pub fn positions(&self) -> [u32; 6] {
        [
            self.description,
            self.decision,
            self.responsible,
            self.due_date,
            self.status,
            self.id,
        ]
    }

    pub fn max_col(&self) -> u32 {
        self.positions().into_iter().max().unwrap_or(1)
    }

    fn min_col(&self) -> u32 {
        self.positions().into_iter().min().unwrap_or(1)
    }
}

impl Config {
    /// Source ledger layout with overrides applied.
    pub fn source_columns(&self) -> PaymentColumns {
        PaymentColumns::resolve(
            PaymentColumns::source_default(),
            &self.sheets.payments.source.columns,
        )
    }

    /// Target register layout with overrides applied.
    pub fn target_columns(&self) -> RegisterColumns {
        RegisterColumns::resolve(
            RegisterColumns::target_default(),
            &self.sheets.payments.target.columns,
        )
    }

    /// Task register layout with overrides applied.
    pub fn task_columns(&self) -> TaskColumns {
        TaskColumns::resolve(TaskColumns::default_layout(), &self.sheets.tasks.columns)
    }

    pub fn is_approver(&self, full_name: &str) -> bool {
        let name = full_name.trim();
        self.telegram.approvers.iter().any(|a| a.trim() == name)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }
    if cfg.app.morning_hour > 23 {
        return Err(ConfigError::Invalid("app.morning_hour must be 0..=23"));
    }
    if cfg.app.evening_hour > 23 {
        return Err(ConfigError::Invalid("app.evening_hour must be 0..=23"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }

    if cfg.sheets.api_token.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.api_token must be non-empty"));
    }

    if cfg.sheets.users.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.users.spreadsheet_id must be non-empty"));
    }
    if cfg.sheets.users.sheet_name.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.users.sheet_name must be non-empty"));
    }

    let pay = &cfg.sheets.payments;
    if pay.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.payments.spreadsheet_id must be non-empty"));
    }
    if pay.source.sheet_name.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.payments.source.sheet_name must be non-empty"));
    }
    if pay.target.sheet_name.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.payments.target.sheet_name must be non-empty"));
    }
    if pay.source.data_start_row == 0 || pay.target.data_start_row == 0 {
        return Err(ConfigError::Invalid("payments data_start_row must be >= 1"));
    }
    if pay.date_cell.row == 0 || pay.date_cell.col == 0 {
        return Err(ConfigError::Invalid("sheets.payments.date_cell must use 1-based coordinates"));
    }
    if cfg.source_columns().min_col() == 0 {
        return Err(ConfigError::Invalid("payments source columns must be 1-based"));
    }
    if cfg.target_columns().min_col() == 0 {
        return Err(ConfigError::Invalid("payments target columns must be 1-based"));
    }

    let tasks = &cfg.sheets.tasks;
    if tasks.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.tasks.spreadsheet_id must be non-empty"));
    }
    if tasks.sheet_name.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.tasks.sheet_name must be non-empty"));
    }
    if tasks.data_start_row == 0 {
        return Err(ConfigError::Invalid("sheets.tasks.data_start_row must be >= 1"));
    }
    if cfg.task_columns().min_col() == 0 {
        return Err(ConfigError::Invalid("tasks columns must be 1-based"));
    }

    Ok(())
}

/// Example YAML configuration, also exercised by tests.
pub fn example() -> &'static str {
    r#"app:
  poll_interval_ms: 30000
  morning_hour: 7
  evening_hour: 18

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  approvers:
    - "Ващенко Ігор Володимирович"

sheets:
  api_token: "YOUR_SHEETS_API_TOKEN"

  users:
    spreadsheet_id: "USERS_SPREADSHEET_ID"
    sheet_name: "users"

  payments:
    spreadsheet_id: "PAYMENTS_SPREADSHEET_ID"
    source:
      sheet_name: "Свод заявок"
      data_start_row: 2
    target:
      sheet_name: "Реєстр"
      data_start_row: 7
    date_cell:
      row: 2
      col: 3

  tasks:
    spreadsheet_id: "TASKS_SPREADSHEET_ID"
    sheet_name: "Завдання"
    data_start_row: 11
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
    }

    #[test]
    fn example_resolves_default_layouts() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        assert_eq!(cfg.source_columns(), PaymentColumns::source_default());
        assert_eq!(cfg.target_columns(), RegisterColumns::target_default());
        assert_eq!(cfg.task_columns(), TaskColumns::default_layout());
        assert_eq!(cfg.target_columns().max_col(), 15);
    }

    #[test]
    fn sparse_override_beats_default_and_leaves_the_rest() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.payments.source.columns.amount = Some(50);
        let cols = cfg.source_columns();
        assert_eq!(cols.amount, 50);
        assert_eq!(cols.contractor, PaymentColumns::source_default().contractor);

        cfg.sheets.payments.target.columns.payment_id = Some(20);
        assert_eq!(cfg.target_columns().payment_id, 20);
        assert_eq!(cfg.target_columns().max_col(), 50.max(20));
    }

    #[test]
    fn register_override_flattens_payment_fields() {
        let yaml = r#"
plan_payment_date: 2
approved: 16
"#;
        let over: RegisterColumnsOverride = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(over.pay.plan_payment_date, Some(2));
        assert_eq!(over.approved, Some(16));
        let cols = RegisterColumns::resolve(RegisterColumns::target_default(), &over);
        assert_eq!(cols.pay.plan_payment_date, 2);
        assert_eq!(cols.approved, 16);
        assert_eq!(cols.paid, 14);
    }

    #[test]
    fn invalid_bot_token() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.telegram.bot_token = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("telegram.bot_token")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_sheet_ids() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.users.spreadsheet_id = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.payments.spreadsheet_id = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.tasks.spreadsheet_id = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_intervals_and_coordinates() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.poll_interval_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.morning_hour = 24;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.payments.date_cell.col = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.sheets.payments.source.columns.amount = Some(0);
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn approver_match_is_trimmed_exact() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        assert!(cfg.is_approver(" Ващенко Ігор Володимирович "));
        assert!(!cfg.is_approver("Ващенко"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(example().as_bytes()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.morning_hour, 7);
        assert_eq!(cfg.sheets.tasks.data_start_row, 11);
    }
}
