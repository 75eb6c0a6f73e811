//! Chat commands: parsing, handling and the two ways updates arrive
//! (long polling here, the webhook route in `server`).

use tracing::{debug, warn};

use crate::notify::Notifier;
use crate::telegram::Update;

pub mod command;
pub mod handler;
pub mod poller;

pub use command::{Command, SettingsCommand};
pub use handler::CommandHandler;
pub use poller::UpdatePoller;

/// Handle one update and send the reply back to its chat. Delivery errors
/// are logged, never returned.
pub async fn dispatch(handler: &CommandHandler, notifier: &dyn Notifier, update: &Update) {
    if let Some(query) = &update.callback_query {
        if let Err(e) = notifier.acknowledge(&query.id).await {
            debug!(error = %e, "callback acknowledgement failed");
        }
    }
    let Some((chat_id, reply)) = handler.handle_update(update).await else {
        debug!(update_id = update.update_id, "update carried no command");
        return;
    };
    if let Err(e) = notifier.send_reply(chat_id, &reply).await {
        warn!(chat_id, error = %e, "reply delivery failed");
    }
}
