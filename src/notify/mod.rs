//! Outbound chat messages.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod format;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// A command reply: Markdown text plus optional inline keyboard rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.keyboard.push(row);
        self
    }
}

/// Best-effort delivery to a chat. Callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;

    /// Keyboards are dropped by transports that cannot render them.
    async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<(), NotifyError> {
        self.send(chat_id, &reply.text).await
    }

    /// Stop the client-side spinner on an inline-keyboard press.
    async fn acknowledge(&self, _callback_id: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
