//! Keyboards and the callback-action protocol.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use crate::ident;
use crate::model::{SettingKey, User};

pub const BTN_MY_TASKS: &str = "⏳ Мої завдання в роботі";
pub const BTN_MY_UNPAID: &str = "💳 Мої неоплачені заявки";
pub const BTN_TO_APPROVE: &str = "✅ Заявки на затвердження";
pub const BTN_SETTINGS: &str = "⚙️ Налаштування";

pub const MAIN_MENU_TEXT: &str = "Головне меню: оберіть потрібний розділ 👇";
pub const SETTINGS_TEXT: &str = "Налаштування сповіщень: оберіть потрібний параметр 👇";

/// Callback tokens; the payload follows after the first ':'.
pub const ACTION_CHANGE_OPTION: &str = "change_option";
pub const ACTION_APPROVE_PAYMENT: &str = "approve_payment";
pub const ACTION_COMPLETE_TASK: &str = "complete_task";

/// Persistent reply keyboard; approvers get the extra approval entry.
pub fn main_menu(is_approver: bool) -> ReplyMarkup {
    let mut second_row = vec![KeyboardButton::new(BTN_SETTINGS)];
    if is_approver {
        second_row.insert(0, KeyboardButton::new(BTN_TO_APPROVE));
    }
    let markup = KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(BTN_MY_TASKS),
            KeyboardButton::new(BTN_MY_UNPAID),
        ],
        second_row,
    ])
    .resize_keyboard(true);
    ReplyMarkup::Keyboard(markup)
}

fn option_label(key: SettingKey, enabled: bool) -> String {
    let subject = match key {
        SettingKey::Payments => "сповіщення про оплати",
        SettingKey::Unpaid => "сповіщення про несплачені заявки",
        SettingKey::NewTasks => "сповіщення про нові завдання",
        SettingKey::MorningTasks => "ранкові сповіщення про завдання",
        SettingKey::EveningTasks => "вечірні сповіщення про завдання",
    };
    if enabled {
        format!("✅ Отримувати {subject} (ввімкнено)")
    } else {
        format!("❌ Отримувати {subject} (вимкнено)")
    }
}

/// One toggle per row, label reflecting the current state.
pub fn settings_menu(user: &User) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(SettingKey::ALL.into_iter().map(|key| {
        vec![InlineKeyboardButton::callback(
            option_label(key, user.settings.get(key)),
            format!("{ACTION_CHANGE_OPTION}:{}", key.as_str()),
        )]
    }))
}

/// Approve button for one unapproved application.
pub fn approve_keyboard(token: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        "Затвердити ✅",
        format!("{ACTION_APPROVE_PAYMENT}:{token}"),
    )]])
}

/// Complete button for a task notification; rows without an id get none.
pub fn task_keyboard(id: &str) -> Option<InlineKeyboardMarkup> {
    if id.trim().is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        "Відмітити як виконане ✅",
        format!("{ACTION_COMPLETE_TASK}:{}", ident::token(id.trim())),
    )]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserSettings;
    use teloxide::types::InlineKeyboardButtonKind;

    fn user() -> User {
        User {
            row: 2,
            full_name: "Ivan Petrenko".into(),
            position: String::new(),
            service: String::new(),
            chat_id: "100".into(),
            settings: UserSettings {
                payments: true,
                ..UserSettings::default()
            },
        }
    }

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn main_menu_rows_depend_on_approver() {
        let ReplyMarkup::Keyboard(plain) = main_menu(false) else {
            panic!("expected reply keyboard");
        };
        assert_eq!(plain.keyboard.len(), 2);
        assert_eq!(plain.keyboard[1].len(), 1);
        assert_eq!(plain.keyboard[1][0].text, BTN_SETTINGS);

        let ReplyMarkup::Keyboard(approver) = main_menu(true) else {
            panic!("expected reply keyboard");
        };
        assert_eq!(approver.keyboard[1][0].text, BTN_TO_APPROVE);
        assert_eq!(approver.keyboard[1][1].text, BTN_SETTINGS);
    }

    #[test]
    fn settings_menu_reflects_toggle_state() {
        let markup = settings_menu(&user());
        assert_eq!(markup.inline_keyboard.len(), 5);
        let first = &markup.inline_keyboard[0][0];
        assert!(first.text.starts_with("✅"));
        assert_eq!(callback_data(first), "change_option:payments");
        let second = &markup.inline_keyboard[1][0];
        assert!(second.text.starts_with("❌"));
        assert_eq!(callback_data(second), "change_option:unpaid");
    }

    #[test]
    fn task_keyboard_strips_the_state_prefix() {
        let markup = task_keyboard("Uabc-123").unwrap();
        assert_eq!(
            callback_data(&markup.inline_keyboard[0][0]),
            "complete_task:abc-123"
        );
        assert!(task_keyboard("").is_none());
        assert!(task_keyboard("   ").is_none());
    }
}
