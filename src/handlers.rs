//! Telegram update handling.
//!
//! Every branch funnels through a `Result`-returning inner function; the
//! dispatcher-facing endpoints log the failure with its chat context and
//! swallow it, so one broken update never takes the dispatcher down.

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;
use tracing::{debug, error, instrument};

use crate::app::App;
use crate::menu;
use crate::model::SettingKey;
use crate::payments;
use crate::tasks;
use crate::users::UserDirectory;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

#[instrument(skip_all)]
async fn on_message(msg: Message, app: Arc<App>) -> HandlerResult {
    if let Err(err) = handle_message(&app, &msg).await {
        error!(?err, chat_id = msg.chat.id.0, "message handling failed");
    }
    Ok(())
}

async fn handle_message(app: &App, msg: &Message) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let text = text.trim();
    let chat_id = msg.chat.id.0;

    let directory = app.load_directory().await?;
    let Some(user) = directory.by_chat_id(&chat_id.to_string()).cloned() else {
        let greeting = format!(
            "👋 Привіт!\n\n\
             Ви ще не зареєстровані в системі.\n\
             Зверніться до адміністратора для реєстрації.\n\n\
             Ваш chat_id: {chat_id}"
        );
        app.messenger.send(chat_id, &greeting, None).await?;
        return Ok(());
    };

    let today = Local::now().date_naive();
    if text == "/start" || text.starts_with("/start ") {
        let markup = menu::main_menu(app.cfg.is_approver(&user.full_name));
        app.messenger
            .send(chat_id, menu::MAIN_MENU_TEXT, Some(markup))
            .await?;
    } else if text == menu::BTN_MY_TASKS {
        tasks::my_tasks(app, &directory, &user, today).await?;
    } else if text == menu::BTN_MY_UNPAID {
        payments::my_unpaid(app, &directory, &user, today).await?;
    } else if text == menu::BTN_TO_APPROVE {
        if app.cfg.is_approver(&user.full_name) {
            payments::applications_to_approve(app, &user).await?;
        } else {
            debug!(chat_id, "approval list requested by a non-approver");
        }
    } else if text == menu::BTN_SETTINGS {
        app.messenger
            .send(
                chat_id,
                menu::SETTINGS_TEXT,
                Some(ReplyMarkup::InlineKeyboard(menu::settings_menu(&user))),
            )
            .await?;
    } else {
        debug!(chat_id, "unrecognized message text");
    }
    Ok(())
}

#[instrument(skip_all)]
async fn on_callback(q: CallbackQuery, app: Arc<App>) -> HandlerResult {
    let callback_id = q.id.clone();
    if let Err(err) = handle_callback(&app, &q).await {
        error!(?err, callback_id = %callback_id, "callback handling failed");
    }
    if let Err(err) = app.messenger.ack_callback(&callback_id).await {
        debug!(?err, "callback acknowledgement failed");
    }
    Ok(())
}

async fn handle_callback(app: &App, q: &CallbackQuery) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    // Opaque `action:payload` token, split on the first colon.
    let (action, payload) = data.split_once(':').unwrap_or((data, ""));

    let Some(message) = q.message.as_ref() else {
        debug!(action, "callback without an attached message");
        return Ok(());
    };
    let chat_id = message.chat.id.0;
    let message_id = message.id.0;

    let directory = app.load_directory().await?;
    let Some(user) = directory.by_chat_id(&chat_id.to_string()).cloned() else {
        debug!(chat_id, "callback from an unregistered chat");
        return Ok(());
    };

    match action {
        menu::ACTION_CHANGE_OPTION => {
            let Some(key) = SettingKey::parse(payload) else {
                debug!(payload, "unknown setting token");
                return Ok(());
            };
            let mut user = user;
            UserDirectory::set_setting(app.store.as_ref(), &app.users_sheet(), &mut user, key)
                .await?;
            // Re-render the settings menu in place.
            app.messenger
                .edit(
                    chat_id,
                    message_id,
                    menu::SETTINGS_TEXT,
                    Some(menu::settings_menu(&user)),
                )
                .await?;
        }
        menu::ACTION_APPROVE_PAYMENT => {
            if !app.cfg.is_approver(&user.full_name) {
                debug!(chat_id, "approval callback from a non-approver");
                return Ok(());
            }
            if payments::approve(app, payload).await? {
                let text = format!("{}\n\n✅ Затверджено", message.text().unwrap_or_default());
                app.messenger.edit(chat_id, message_id, &text, None).await?;
            } else {
                // User-initiated action on a row that no longer exists.
                error!(payload, chat_id, "payment to approve not found");
            }
        }
        menu::ACTION_COMPLETE_TASK => {
            if !tasks::complete(app, payload, chat_id, message_id).await? {
                error!(payload, chat_id, "task to complete not found");
            }
        }
        _ => debug!(action, "unknown callback action"),
    }
    Ok(())
}
