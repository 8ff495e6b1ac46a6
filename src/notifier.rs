//! Telegram notifications

use serde::Serialize;
use tracing::{debug, error};

use crate::config::TelegramConfig;
use crate::error::{RelayError, Result};

pub const PARSE_MODE_MARKDOWN: &str = "Markdown";

#[derive(Debug, Clone, Serialize)]
pub struct TelegramMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    pub disable_web_page_preview: bool,
}

/// Rows of link buttons shown under a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub url: String,
}

impl InlineKeyboardMarkup {
    /// One row holding one link button.
    pub fn single_link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: label.into(),
                url: url.into(),
            }]],
        }
    }
}

/// Sends "Update for <app>" messages to one chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    app_name: String,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(
        client: reqwest::Client,
        app_name: impl Into<String>,
        config: TelegramConfig,
    ) -> Self {
        Self {
            client,
            app_name: app_name.into(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        )
    }

    pub fn build_message(
        &self,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> TelegramMessage {
        TelegramMessage {
            chat_id: self.config.chat_id,
            text: format!("Update for *{}*:\n\n{}", self.app_name, text),
            parse_mode: Some(PARSE_MODE_MARKDOWN),
            reply_markup,
            disable_web_page_preview: true,
        }
    }

    /// POST one message. Any non-2xx answer from the API is an error.
    pub async fn send_message(
        &self,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let message = self.build_message(text, reply_markup);
        let response = self
            .client
            .post(self.endpoint())
            .json(&message)
            .send()
            .await
            // the URL carries the bot token
            .map_err(|e| RelayError::NotifyTransport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::NotifyRejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Telegram accepted message for chat {}", self.config.chat_id);
        Ok(())
    }

    /// Fire-and-forget wrapper: failures are logged and dropped.
    pub async fn notify(&self, text: &str, reply_markup: Option<InlineKeyboardMarkup>) {
        if let Err(e) = self.send_message(text, reply_markup).await {
            error!("Error sending message to Telegram: {}", e);
        }
    }
}
