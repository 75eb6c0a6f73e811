//! Scripted fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use fundwatch::alert::{InMemoryAlertStore, RateSnapshot, ThresholdConfig};
use fundwatch::context::{AppContext, Settings};
use fundwatch::exchange::{RateSource, SourceError};
use fundwatch::notify::{Notifier, NotifyError, Reply};

pub fn snap(symbol: &str, rate: f64) -> RateSnapshot {
    RateSnapshot::new(symbol, rate, Utc::now())
}

/// 0.6% / -1.0%, 300 s.
pub fn context() -> Arc<AppContext> {
    Arc::new(AppContext::new(
        Settings {
            thresholds: ThresholdConfig::from_percent(0.6, -1.0),
            check_interval: Duration::from_secs(300),
        },
        Arc::new(InMemoryAlertStore::new()),
    ))
}

/// Hands out one scripted batch per fetch; `None` is a fetch failure.
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Option<Vec<RateSnapshot>>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Option<Vec<RateSnapshot>>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for ScriptedSource {
    async fn fetch_rates(&self) -> Result<Vec<RateSnapshot>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.batches.lock().unwrap().pop_front() {
            Some(Some(batch)) => Ok(batch),
            _ => Err(SourceError::Unavailable {
                attempts: 2,
                last_error: "HTTP 451".to_string(),
            }),
        }
    }
}

/// Records every message; chats in `failing` reject delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub replies: Mutex<Vec<(i64, Reply)>>,
    pub acks: Mutex<Vec<String>>,
    failing: HashSet<i64>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(chats: &[i64]) -> Arc<Self> {
        Arc::new(Self {
            failing: chats.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(i64, Reply)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        if self.failing.contains(&chat_id) {
            return Err(NotifyError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<(), NotifyError> {
        self.replies.lock().unwrap().push((chat_id, reply.clone()));
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), NotifyError> {
        self.acks.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}
