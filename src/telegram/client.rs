//! Telegram Bot API client
//!
//! Thin JSON-over-HTTPS wrapper around the handful of Bot API methods the bot
//! uses. Every call goes through [`TelegramClient::call`], which unwraps the
//! `{ok, result, description, error_code}` envelope into a [`TransportResult`].

use super::traits::*;
use super::updates::User;
use crate::moderation::types::{Ack, ReviewRequest};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Timeout for ordinary method calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const LONG_POLL_SLACK: Duration = Duration::from_secs(10);

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> TransportResult<T> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TransportError::Decode("ok response without result".to_string()));
        }

        if let Some(retry_after) = self.parameters.and_then(|p| p.retry_after) {
            return Err(TransportError::RateLimited { retry_after });
        }

        Err(TransportError::Api {
            code: self.error_code.unwrap_or_default(),
            description: self
                .description
                .unwrap_or_else(|| "no description".to_string()),
        })
    }
}

/// `InlineKeyboardButton` with callback data.
#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: String,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_url>/bot<token>`
    base: String,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> TransportResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base, method);
        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(params)
            .send()
            .await?;

        // Error responses carry the same JSON envelope, so the status code is
        // not inspected separately.
        let body = response.bytes().await?;
        let envelope: ApiResponse<R> = serde_json::from_slice(&body)?;
        envelope.into_result()
    }

    /// Identity of the bot; doubles as a token check at startup.
    pub async fn get_me(&self) -> TransportResult<User> {
        self.call("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates with id `>= offset`.
    ///
    /// Updates come back undecoded so one malformed entry cannot hide the
    /// rest of the batch; see [`Update`](super::updates::Update).
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> TransportResult<Vec<serde_json::Value>> {
        let params = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &params, timeout + LONG_POLL_SLACK)
            .await
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> TransportResult<()> {
        let mut params = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret {
            params["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> TransportResult<()> {
        let _: bool = self
            .call("deleteWebhook", &json!({}), REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn send_message(&self, params: serde_json::Value) -> TransportResult<()> {
        let _: serde_json::Value = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn publish(&self, outlet: &ChatRef, origin: &MessageRef) -> TransportResult<()> {
        // copyMessage rather than forwardMessage keeps the submitter anonymous.
        let params = json!({
            "chat_id": outlet,
            "from_chat_id": origin.chat_id.0,
            "message_id": origin.message_id,
        });
        let _: serde_json::Value = self.call("copyMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    async fn notify(&self, recipient: UserId, text: &str) -> TransportResult<()> {
        self.send_message(json!({ "chat_id": recipient.0, "text": text }))
            .await
    }

    async fn forward(&self, to: UserId, origin: &MessageRef) -> TransportResult<()> {
        let params = json!({
            "chat_id": to.0,
            "from_chat_id": origin.chat_id.0,
            "message_id": origin.message_id,
        });
        let _: serde_json::Value = self
            .call("forwardMessage", &params, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn send_review(&self, to: UserId, request: &ReviewRequest) -> TransportResult<()> {
        let row: Vec<InlineButton> = request
            .buttons()
            .iter()
            .map(|button| InlineButton {
                text: button.label,
                callback_data: button.token.encode(),
            })
            .collect();

        self.send_message(json!({
            "chat_id": to.0,
            "text": request.text(),
            "reply_markup": { "inline_keyboard": [row] },
        }))
        .await
    }

    async fn reply(&self, to: &MessageRef, text: &str) -> TransportResult<()> {
        self.send_message(json!({
            "chat_id": to.chat_id.0,
            "text": text,
            "reply_parameters": {
                "message_id": to.message_id,
                "allow_sending_without_reply": true,
            },
        }))
        .await
    }

    async fn answer_callback(&self, callback: &CallbackId, ack: &Ack) -> TransportResult<()> {
        let mut params = json!({ "callback_query_id": callback.0 });
        if !ack.text.is_empty() {
            params["text"] = json!(ack.text);
            params["show_alert"] = json!(ack.alert);
        }
        let _: bool = self
            .call("answerCallbackQuery", &params, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn edit_view(&self, view: &MessageRef, text: &str) -> TransportResult<()> {
        let params = json!({
            "chat_id": view.chat_id.0,
            "message_id": view.message_id,
            "text": text,
        });
        let _: serde_json::Value = self
            .call("editMessageText", &params, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }
}
