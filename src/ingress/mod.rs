//! Update ingress
//!
//! Receives Bot API updates, either pushed to an HTTP endpoint (webhook) or
//! pulled with `getUpdates` (long polling), and hands every update to the
//! pipeline on its own task. Both modes run until Ctrl-C, after which the
//! updates still being handled get `shutdown_grace` to finish.

pub mod polling;
pub mod webhook;

use crate::moderation::Pipeline;
use crate::store::ProposalStore;
use crate::telegram::retry::RetryPolicy;
use crate::telegram::traits::{ChatTransport, TransportError};
use crate::telegram::updates::Update;
use crate::telegram::TelegramClient;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressMode {
    #[default]
    Polling,
    Webhook,
}

#[derive(Debug, Clone)]
pub struct IngressSettings {
    pub mode: IngressMode,
    /// Webhook listen address.
    pub listen: SocketAddr,
    /// Public base URL Telegram posts to; `/webhook` is appended.
    pub public_url: Option<String>,
    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`.
    pub secret: Option<String>,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
    /// Backoff for failed `getUpdates` calls.
    pub poll_retry: RetryPolicy,
    /// How long in-flight updates may run after Ctrl-C.
    pub shutdown_grace: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("Telegram API error: {0}")]
    Transport(#[from] TransportError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Webhook mode requires ingress.public_url")]
    MissingPublicUrl,
}

/// Run the configured ingress until shutdown, then drain in-flight updates.
pub async fn serve<S: ProposalStore>(
    settings: IngressSettings,
    client: TelegramClient,
    pipeline: Arc<Pipeline<S, TelegramClient>>,
) -> Result<(), IngressError> {
    let dispatcher = Arc::new(Dispatcher::new(pipeline));

    let served = match settings.mode {
        IngressMode::Webhook => webhook::run(&settings, &client, Arc::clone(&dispatcher)).await,
        IngressMode::Polling => polling::run(&settings, &client, &dispatcher).await,
    };

    dispatcher.drain(settings.shutdown_grace).await;
    served
}

/// Hands updates to the pipeline, one task each, and keeps track of the
/// tasks so shutdown can wait for them.
pub struct Dispatcher<S: ProposalStore, T: ChatTransport> {
    pipeline: Arc<Pipeline<S, T>>,
    tasks: Mutex<JoinSet<()>>,
}

impl<S: ProposalStore, T: ChatTransport> Dispatcher<S, T> {
    pub fn new(pipeline: Arc<Pipeline<S, T>>) -> Self {
        Self {
            pipeline,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Convert an update and handle it on a fresh task.
    ///
    /// Returns `false` for updates the bot ignores.
    pub fn dispatch(&self, update: Update) -> bool {
        let update_id = update.update_id;
        let Some(event) = update.into_event() else {
            debug!(update_id, "ignoring update");
            return false;
        };

        let pipeline = Arc::clone(&self.pipeline);
        let mut tasks = self.tasks();
        while let Some(joined) = tasks.try_join_next() {
            log_join(joined);
        }
        tasks.spawn(async move {
            pipeline.handle(event).await;
        });
        true
    }

    /// Updates still being handled.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks();
        while let Some(joined) = tasks.try_join_next() {
            log_join(joined);
        }
        tasks.len()
    }

    /// Wait up to `grace` for every dispatched update to finish. Tasks still
    /// running after that are aborted; returns how many.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.tasks());
        if tasks.is_empty() {
            return 0;
        }

        info!(in_flight = tasks.len(), "waiting for in-flight updates");
        let finished = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                log_join(joined);
            }
        })
        .await;

        if finished.is_ok() {
            return 0;
        }

        let abandoned = tasks.len();
        warn!(abandoned, grace = ?grace, "in-flight updates did not finish in time");
        tasks.abort_all();
        abandoned
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "update handler panicked");
        }
    }
}

/// Resolves on Ctrl-C.
pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "could not listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
