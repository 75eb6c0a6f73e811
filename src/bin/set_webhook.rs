//! Register (or with `--delete`, remove) the bot's webhook.
//!
//! Reads TELEGRAM_BOT_TOKEN, WEBHOOK_URL and WEBHOOK_SECRET from the
//! environment. `/webhook` is appended to WEBHOOK_URL unless already there.

use anyhow::{bail, Context, Result};
use tracing::info;
use url::Url;

use fundwatch::config::Config;
use fundwatch::logging;
use fundwatch::telegram::TelegramClient;

fn webhook_endpoint(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("WEBHOOK_URL is not a valid URL: {}", base))?;
    if url.scheme() != "https" {
        bail!("Telegram only delivers webhooks over https, got {}", url.scheme());
    }
    if !url.path().trim_end_matches('/').ends_with("/webhook") {
        let path = format!("{}/webhook", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }
    Ok(url)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let delete = std::env::args().skip(1).any(|a| a == "--delete");

    let cfg = Config::from_env();
    let client = TelegramClient::from_config(&cfg)?;

    if delete {
        client.delete_webhook().await?;
        info!("webhook deleted");
    } else {
        let url = webhook_endpoint(cfg.require_webhook_url()?)?;
        client.set_webhook(url.as_str(), cfg.webhook_secret.as_deref()).await?;
        info!(url = %url, "webhook registered");
    }

    let webhook = client.get_webhook_info().await?;
    info!(
        url = %webhook.url,
        pending = webhook.pending_update_count,
        last_error = webhook.last_error_message.as_deref().unwrap_or("-"),
        "webhook info"
    );
    Ok(())
}
