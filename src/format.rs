//! HTML notification rendering, bounded by the Telegram message ceiling.

use chrono::NaiveDate;

use crate::dates;
use crate::model::{PaymentItem, TaskItem};

/// Hard platform ceiling for one message.
pub const TELEGRAM_LIMIT: usize = 4096;

pub const TRUNCATION_NOTICE: &str = "<i>Далі список обрізано через ліміт Telegram</i>\n";

const SEPARATOR: &str = "_______________________________________\n";

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn payment_fields(item: &PaymentItem, date_label: &str) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "📅 <b>{date_label}:</b> {}\n",
        dates::format_cell(&item.date)
    ));
    s.push_str(&format!(
        "📋 <b>Контрагент:</b> {}\n",
        or_fallback(&item.contractor, "Не вказано")
    ));
    s.push_str(&format!(
        "💵 <b>Сума:</b> {} {}\n",
        or_fallback(&item.amount, "0"),
        or_fallback(&item.currency, "UAH")
    ));
    s.push_str(&format!(
        "📝 <b>Призначення:</b> {}",
        or_fallback(&item.purpose, "Не вказано")
    ));
    s
}

/// One standalone payment notification.
pub fn payment_message(title: &str, item: &PaymentItem) -> String {
    format!("<b>{title}</b>\n\n{}", payment_fields(item, "Дата оплати"))
}

/// One payment entry of a list, newline-terminated.
pub fn payment_block(item: &PaymentItem) -> String {
    let mut s = payment_fields(item, "Дата платежу");
    s.push('\n');
    s
}

fn task_fields(item: &TaskItem, today: NaiveDate) -> String {
    let overdue = dates::cell_day(&item.due).is_some_and(|d| d < today);
    let mut s = String::new();
    if !item.description.trim().is_empty() {
        s.push_str(&format!("📋 <b>Завдання:</b> {}\n", item.description));
    }
    if !item.decision.trim().is_empty() {
        s.push_str(&format!("💵 {}\n", item.decision));
    }
    s.push_str(&format!(
        "📅 <b>Виконати до:</b> {}",
        dates::format_cell(&item.due)
    ));
    if overdue {
        s.push_str("\n ⚠️ <i>(Протерміновано)</i>");
    }
    s
}

/// One standalone task notification.
pub fn task_message(title: &str, item: &TaskItem, today: NaiveDate) -> String {
    format!("<b>{title}</b>\n\n{}", task_fields(item, today))
}

/// One task entry of a list, newline-terminated.
pub fn task_block(item: &TaskItem, today: NaiveDate) -> String {
    let mut s = task_fields(item, today);
    s.push('\n');
    s
}

/// Title plus numbered blocks, stopping with a single truncation notice once
/// the next block would cross the ceiling. Empty input renders only the
/// `empty_text` (bold, no title).
pub fn format_list(title: &str, blocks: &[String], empty_text: &str) -> String {
    if blocks.is_empty() {
        return format!("<b>{empty_text}</b>");
    }
    let mut message = format!("<b>{title}</b>\n\n");
    let mut current = message.chars().count();
    let last = blocks.len() - 1;
    for (i, block) in blocks.iter().enumerate() {
        let mut item = format!("{}.\n{}", i + 1, block);
        if !item.ends_with('\n') {
            item.push('\n');
        }
        if i < last {
            item.push_str(SEPARATOR);
        }
        let len = item.chars().count();
        if current + len > TELEGRAM_LIMIT {
            message.push_str(TRUNCATION_NOTICE);
            break;
        }
        message.push_str(&item);
        current += len;
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(purpose: &str) -> PaymentItem {
        PaymentItem {
            date: json!("01.06.2026"),
            contractor: "ТОВ Тест".into(),
            amount: "500".into(),
            currency: "UAH".into(),
            purpose: purpose.into(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn payment_message_layout() {
        let text = payment_message("💰 Оплату здійснено!", &item("Проект: Альфа"));
        assert!(text.starts_with("<b>💰 Оплату здійснено!</b>\n\n"));
        assert!(text.contains("📅 <b>Дата оплати:</b> 01.06.2026"));
        assert!(text.contains("💵 <b>Сума:</b> 500 UAH"));
        assert!(text.contains("📝 <b>Призначення:</b> Проект: Альфа"));
    }

    #[test]
    fn payment_fallbacks() {
        let empty = PaymentItem {
            date: json!(""),
            contractor: String::new(),
            amount: String::new(),
            currency: String::new(),
            purpose: String::new(),
        };
        let text = payment_message("t", &empty);
        assert!(text.contains("Дата оплати:</b> Не вказано"));
        assert!(text.contains("Контрагент:</b> Не вказано"));
        assert!(text.contains("Сума:</b> 0 UAH"));
        assert!(text.contains("Призначення:</b> Не вказано"));
    }

    #[test]
    fn task_message_marks_overdue() {
        let task = TaskItem {
            description: "Підготувати звіт".into(),
            decision: String::new(),
            due: json!("01.06.2026"),
        };
        let late = task_message("😮‍💨 Вам призначено нове завдання:", &task, day(2026, 6, 2));
        assert!(late.contains("⚠️ <i>(Протерміновано)</i>"));
        let on_time = task_message("😮‍💨 Вам призначено нове завдання:", &task, day(2026, 5, 30));
        assert!(!on_time.contains("Протерміновано"));
        // Unparseable due date never counts as overdue.
        let vague = TaskItem {
            due: json!("до кінця місяця"),
            ..task
        };
        assert!(!task_message("t", &vague, day(2026, 6, 2)).contains("Протерміновано"));
    }

    #[test]
    fn empty_list_renders_only_the_empty_text() {
        let text = format_list("⏰ Протерміновані оплати:", &[], "Всі оплати виконані вчасно! ✅");
        assert_eq!(text, "<b>Всі оплати виконані вчасно! ✅</b>");
    }

    #[test]
    fn list_is_numbered_and_separated_except_after_last() {
        let blocks = vec![payment_block(&item("a")), payment_block(&item("b"))];
        let text = format_list("⏰ Протерміновані оплати:", &blocks, "порожньо");
        assert!(text.starts_with("<b>⏰ Протерміновані оплати:</b>\n\n1.\n"));
        assert!(text.contains("2.\n"));
        assert_eq!(text.matches(SEPARATOR).count(), 1);
        assert!(!text.ends_with(SEPARATOR));
    }

    #[test]
    fn truncation_is_bounded_and_single() {
        let blocks: Vec<String> = (0..200).map(|_| payment_block(&item("Проект: Альфа, деталі довгого призначення платежу"))).collect();
        let text = format_list("⏰ Протерміновані оплати:", &blocks, "порожньо");
        assert!(text.chars().count() <= TELEGRAM_LIMIT + TRUNCATION_NOTICE.chars().count());
        assert!(text.ends_with(TRUNCATION_NOTICE));
        assert_eq!(text.matches(TRUNCATION_NOTICE).count(), 1);
    }
}
