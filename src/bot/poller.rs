use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::bot::{dispatch, CommandHandler};
use crate::telegram::TelegramClient;

/// Server-side wait for `getUpdates`.
const LONG_POLL_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Long-polling command loop for deployments without a public URL.
pub struct UpdatePoller {
    client: Arc<TelegramClient>,
    handler: Arc<CommandHandler>,
    offset: i64,
}

impl UpdatePoller {
    pub fn new(client: Arc<TelegramClient>, handler: Arc<CommandHandler>) -> Self {
        Self {
            client,
            handler,
            offset: 0,
        }
    }

    /// Poll forever. Updates are handled one at a time, in order.
    pub async fn run(mut self) {
        // getUpdates is refused while a webhook is registered
        match self.client.delete_webhook().await {
            Ok(_) => info!("webhook cleared, long polling"),
            Err(e) => warn!(error = %e, "could not clear webhook"),
        }

        loop {
            let updates = match self.client.get_updates(self.offset, LONG_POLL_SECS).await {
                Ok(u) => u,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };
            for update in updates {
                self.offset = self.offset.max(update.update_id + 1);
                dispatch(&self.handler, self.client.as_ref(), &update).await;
            }
        }
    }
}
