//! Message delivery through the Telegram Bot API.

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::TelegramConfig;
use crate::error::NotifyError;

/// Something that can deliver a formatted message.
pub trait Notifier {
    /// Sends `text` to the configured destination.
    ///
    /// ## Errors
    ///
    /// Returns `NotifyError` when the message could not be delivered.
    fn deliver(&self, text: &str) -> impl std::future::Future<Output = Result<(), NotifyError>> + Send;
}

/// Body of a `sendMessage` call.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    parse_mode: &'static str,
    text: &'a str,
}

/// [`Notifier`] posting to a Telegram chat with the HTML parse mode.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(client: Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    /// The `sendMessage` endpoint. Contains the bot token; never log it.
    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.token
        )
    }
}

impl Notifier for TelegramNotifier {
    #[instrument(skip_all, fields(chat_id = %self.config.chat_id, chars = text.chars().count()))]
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            parse_mode: "HTML",
            text,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        debug!(status = status.as_u16(), body = %response_body, "Telegram response");

        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: response_body,
            });
        }

        Ok(())
    }
}
