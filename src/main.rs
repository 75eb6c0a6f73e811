//! Long-polling deployment: monitor loop, command poller and health server
//! in one process.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use fundwatch::bot::{CommandHandler, UpdatePoller};
use fundwatch::config::Config;
use fundwatch::context::AppContext;
use fundwatch::exchange::{BinanceFutures, RateSource};
use fundwatch::logging;
use fundwatch::monitor::Monitor;
use fundwatch::notify::Notifier;
use fundwatch::server;
use fundwatch::telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cfg = Config::from_env();
    cfg.validate()?;
    cfg.require_token()?;

    let ctx = Arc::new(AppContext::from_config(&cfg));
    let source: Arc<dyn RateSource> = Arc::new(BinanceFutures::new(&cfg)?);
    let telegram = Arc::new(TelegramClient::from_config(&cfg)?);
    let notifier: Arc<dyn Notifier> = telegram.clone();

    let monitor = Monitor::new(ctx.clone(), source.clone(), notifier);
    let handler = Arc::new(CommandHandler::new(ctx.clone(), source));
    let poller = UpdatePoller::new(telegram, handler);

    let settings = ctx.settings().await;
    info!(
        upper = settings.thresholds.upper,
        lower = settings.thresholds.lower,
        interval_secs = settings.check_interval.as_secs(),
        chats = cfg.chat_ids.len(),
        monitoring = ctx.is_monitoring(),
        "fundwatch starting"
    );

    tokio::select! {
        _ = monitor.run() => {}
        _ = poller.run() => {}
        res = server::serve(server::health_router(), cfg.port) => {
            if let Err(e) = res {
                error!(error = %e, "health server stopped");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    info!("fundwatch stopped");
    Ok(())
}
