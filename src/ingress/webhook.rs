//! Webhook ingress: Telegram POSTs each update to `/webhook`.
//!
//! The handler only authenticates and decodes; the update is processed on a
//! spawned task and the request is answered immediately, so a slow publish
//! never makes Telegram redeliver.

use super::{shutdown_signal, Dispatcher, IngressError, IngressSettings};
use crate::store::ProposalStore;
use crate::telegram::traits::ChatTransport;
use crate::telegram::updates::Update;
use crate::telegram::TelegramClient;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};

pub const WEBHOOK_PATH: &str = "/webhook";

/// Header Telegram uses to echo the secret given to `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

struct WebhookState<S: ProposalStore, T: ChatTransport> {
    dispatcher: Arc<Dispatcher<S, T>>,
    secret: Option<String>,
}

/// HTTP routes: `POST /webhook` and `GET /healthz`.
pub fn router<S, T>(dispatcher: Arc<Dispatcher<S, T>>, secret: Option<String>) -> Router
where
    S: ProposalStore,
    T: ChatTransport,
{
    let state = Arc::new(WebhookState { dispatcher, secret });

    Router::new()
        .route(WEBHOOK_PATH, post(receive_update::<S, T>))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

async fn receive_update<S, T>(
    State(state): State<Arc<WebhookState<S, T>>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode
where
    S: ProposalStore,
    T: ChatTransport,
{
    if let Some(secret) = &state.secret {
        let provided = headers
            .get(SECRET_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if !constant_time_eq(provided, secret.as_bytes()) {
            warn!("webhook request with missing or wrong secret");
            return StatusCode::UNAUTHORIZED;
        }
    }

    // Undecodable bodies are acknowledged anyway; an error status would only
    // make Telegram retry the same payload.
    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            state.dispatcher.dispatch(update);
        }
        Err(e) => warn!(error = %e, "could not decode webhook update"),
    }

    StatusCode::OK
}

/// Byte comparison whose duration does not depend on where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Register the webhook and serve until Ctrl-C.
pub async fn run<S: ProposalStore>(
    settings: &IngressSettings,
    client: &TelegramClient,
    dispatcher: Arc<Dispatcher<S, TelegramClient>>,
) -> Result<(), IngressError> {
    let public_url = settings
        .public_url
        .as_deref()
        .ok_or(IngressError::MissingPublicUrl)?;
    let url = format!("{}{}", public_url.trim_end_matches('/'), WEBHOOK_PATH);

    client.set_webhook(&url, settings.secret.as_deref()).await?;
    info!(url = %url, "webhook registered");

    let app = router(dispatcher, settings.secret.clone());
    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    info!(listen = %settings.listen, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webhook server stopped");
    Ok(())
}
