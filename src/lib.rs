pub mod alert;
pub mod bot;
pub mod config;
pub mod context;
pub mod exchange;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod server;
pub mod telegram;
