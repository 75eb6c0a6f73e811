//! Telegram Bot API client: message delivery, long polling and webhook
//! registration.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::notify::format::truncate;
use crate::notify::{Button, Notifier, NotifyError, Reply};

pub mod types;

pub use types::{ApiResponse, CallbackQuery, Chat, Message, Update, User, WebhookInfo};

pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

// the token is part of every URL, so reqwest errors are stripped of it
fn http_err(err: reqwest::Error) -> NotifyError {
    NotifyError::Http(err.without_url())
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build().map_err(http_err)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let token = cfg.require_token()?;
        Ok(Self::new(&cfg.telegram_api_base, token, cfg.http_timeout())?)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, NotifyError> {
        let mut req = self.client.post(self.method_url(method)).json(body);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp: ApiResponse<T> = req.send().await.map_err(http_err)?.json().await.map_err(http_err)?;
        if !resp.ok {
            return Err(NotifyError::Api {
                code: resp.error_code.unwrap_or_default(),
                description: resp.description.unwrap_or_default(),
            });
        }
        resp.result.ok_or_else(|| NotifyError::Api {
            code: 0,
            description: format!("{} returned no result", method),
        })
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, keyboard: &[Vec<Button>]) -> Result<(), NotifyError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": truncate(text),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if !keyboard.is_empty() {
            body["reply_markup"] = json!({ "inline_keyboard": keyboard });
        }
        self.call::<Value>("sendMessage", &body, None).await?;
        debug!(chat_id, "message sent");
        Ok(())
    }

    /// Long poll for updates. The request timeout is stretched past the
    /// server-side wait so an idle poll does not count as a failure.
    pub async fn get_updates(&self, offset: i64, wait_secs: u64) -> Result<Vec<Update>, NotifyError> {
        let body = json!({
            "offset": offset,
            "timeout": wait_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body, Some(Duration::from_secs(wait_secs + 10))).await
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), NotifyError> {
        self.call::<bool>("answerCallbackQuery", &json!({ "callback_query_id": callback_id }), None)
            .await
            .map(|_| ())
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<bool, NotifyError> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        self.call("setWebhook", &body, None).await
    }

    pub async fn delete_webhook(&self) -> Result<bool, NotifyError> {
        self.call("deleteWebhook", &json!({}), None).await
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, NotifyError> {
        self.call("getWebhookInfo", &json!({}), None).await
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.send_message(chat_id, text, &[]).await
    }

    async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<(), NotifyError> {
        self.send_message(chat_id, &reply.text, &reply.keyboard).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), NotifyError> {
        self.answer_callback_query(callback_id).await
    }
}
