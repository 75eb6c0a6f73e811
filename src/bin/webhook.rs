//! Webhook deployment: Telegram pushes updates to `POST /webhook` and an
//! external scheduler drives checks through `POST /tick`.
//!
//! State lives in process memory only, so a platform that recycles idle
//! instances loses subscriptions and alert bands between requests.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use fundwatch::bot::CommandHandler;
use fundwatch::config::Config;
use fundwatch::context::AppContext;
use fundwatch::exchange::{BinanceFutures, RateSource};
use fundwatch::logging;
use fundwatch::monitor::Monitor;
use fundwatch::notify::Notifier;
use fundwatch::server::{self, WebhookState};
use fundwatch::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cfg = Config::from_env();
    cfg.validate()?;
    cfg.require_token()?;
    if cfg.webhook_secret.is_none() {
        warn!("WEBHOOK_SECRET not set, /webhook and /tick accept unauthenticated calls");
    }

    let ctx = Arc::new(AppContext::from_config(&cfg));
    let source: Arc<dyn RateSource> = Arc::new(BinanceFutures::new(&cfg)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramClient::from_config(&cfg)?);

    let state = WebhookState {
        handler: Arc::new(CommandHandler::new(ctx.clone(), source.clone())),
        notifier: notifier.clone(),
        monitor: Arc::new(Monitor::new(ctx, source, notifier)),
        secret: cfg.webhook_secret.clone(),
    };

    info!(port = cfg.port, "fundwatch webhook starting");
    tokio::select! {
        res = server::serve(server::webhook_router(state), cfg.port) => res?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    Ok(())
}
