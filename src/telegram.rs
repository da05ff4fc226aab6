//! Messaging boundary: send/edit/delete plus callback acknowledgement.
//!
//! Flows talk to `Messenger` so tests can record outbound traffic; the real
//! implementation is a thin teloxide wrapper. A non-ok send surfaces as an
//! error to the caller, never swallowed here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode, ReplyMarkup};

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send an HTML message; returns the new message id.
    async fn send(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> Result<i32>;

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()>;

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()>;

    async fn ack_callback(&self, callback_id: &str) -> Result<()>;
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, text: &str, markup: Option<ReplyMarkup>) -> Result<i32> {
        // Telegram rejects empty text outright.
        let text = if text.is_empty() { " " } else { text };
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            req = req.reply_markup(markup);
        }
        let msg = req.await.context("sendMessage failed")?;
        Ok(msg.id.0)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            req = req.reply_markup(markup);
        }
        req.await.context("editMessageText failed")?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .context("deleteMessage failed")?;
        Ok(())
    }

    async fn ack_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(callback_id)
            .await
            .context("answerCallbackQuery failed")?;
        Ok(())
    }
}
