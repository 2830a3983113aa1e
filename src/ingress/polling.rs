//! Long-polling ingress: `getUpdates` in a loop.

use super::{shutdown_signal, Dispatcher, IngressError, IngressSettings};
use crate::store::ProposalStore;
use crate::telegram::updates::Update;
use crate::telegram::TelegramClient;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Offset for the next `getUpdates` call: one past the highest id seen.
///
/// Entries are read raw so that an update the bot cannot decode is still
/// acknowledged.
pub fn next_offset(current: i64, batch: &[Value]) -> i64 {
    batch
        .iter()
        .filter_map(|raw| raw.get("update_id").and_then(Value::as_i64))
        .map(|id| id + 1)
        .fold(current, i64::max)
}

/// Decode one entry of a `getUpdates` batch; malformed entries are logged
/// and skipped.
pub fn decode_update(raw: Value) -> Option<Update> {
    let update_id = raw.get("update_id").and_then(Value::as_i64);
    match serde_json::from_value(raw) {
        Ok(update) => Some(update),
        Err(e) => {
            warn!(update_id = ?update_id, error = %e, "skipping undecodable update");
            None
        }
    }
}

/// Drop any registered webhook, then poll until Ctrl-C.
pub async fn run<S: ProposalStore>(
    settings: &IngressSettings,
    client: &TelegramClient,
    dispatcher: &Dispatcher<S, TelegramClient>,
) -> Result<(), IngressError> {
    // getUpdates is refused while a webhook is set.
    client.delete_webhook().await?;
    info!(timeout = ?settings.poll_timeout, "long polling for updates");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut offset = 0;
    let mut failures: u32 = 0;

    loop {
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = client.get_updates(offset, settings.poll_timeout) => result,
        };

        match result {
            Ok(batch) => {
                failures = 0;
                if !batch.is_empty() {
                    debug!(count = batch.len(), offset, "received updates");
                }
                offset = next_offset(offset, &batch);
                for update in batch.into_iter().filter_map(decode_update) {
                    dispatcher.dispatch(update);
                }
            }
            Err(e) => {
                let delay = settings.poll_retry.delay_for(failures, &e);
                if e.is_retryable() {
                    warn!(error = %e, delay_ms = delay.as_millis() as u64, "getUpdates failed");
                } else {
                    error!(error = %e, delay_ms = delay.as_millis() as u64, "getUpdates rejected");
                }
                failures = failures.saturating_add(1);

                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    info!("polling stopped");
    Ok(())
}
