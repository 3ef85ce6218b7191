//! Batch scheduler for price lookups
//!
//! Accumulates individual lookup requests and flushes them to the Scryfall
//! collection endpoint in one call. A flush happens when the pending list
//! hits the batch cap, on a periodic tick, or once a short debounce window
//! after the last enqueue passes with requests pending - whichever is first.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::error::PriceError;
use crate::scryfall::{ScryfallApi, ScryfallCard};

/// Per-identifier result of a flushed batch
pub type FetchOutcome = Result<ScryfallCard, PriceError>;

struct FetchRequest {
    id: String,
    tx: oneshot::Sender<FetchOutcome>,
}

/// Handle to the background flush task
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    tx: mpsc::UnboundedSender<FetchRequest>,
}

impl BatchScheduler {
    /// Spawn the flush task; it runs for the life of the process.
    pub fn start(api: ScryfallApi, config: &SyncConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_flush_loop(
            api,
            rx,
            config.batch_cap,
            config.tick,
            config.debounce,
        ));
        Self { tx }
    }

    /// Register one lookup. The receiver resolves exactly once, when the
    /// batch containing this identifier completes. The caller is expected
    /// to have deduplicated: an identifier is enqueued at most once per
    /// outstanding fetch.
    pub fn enqueue(&self, id: &str) -> oneshot::Receiver<FetchOutcome> {
        let (tx, rx) = oneshot::channel();
        let request = FetchRequest {
            id: id.to_string(),
            tx,
        };
        if self.tx.send(request).is_err() {
            // Flush task gone; the dropped sender resolves the receiver
            // with an error and the caller records a failed snapshot.
            log::warn!("Batch flush task is not running, dropping lookup");
        }
        rx
    }
}

async fn run_flush_loop(
    api: ScryfallApi,
    mut rx: mpsc::UnboundedReceiver<FetchRequest>,
    cap: usize,
    tick: Duration,
    debounce: Duration,
) {
    let mut pending: Vec<FetchRequest> = Vec::new();
    // First tick a full interval out, not immediately.
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(request) => {
                    pending.push(request);
                    if pending.len() >= cap {
                        flush(&api, &mut pending).await;
                    }
                }
                None => {
                    // All handles dropped; drain and stop.
                    flush(&api, &mut pending).await;
                    break;
                }
            },
            _ = ticker.tick() => flush(&api, &mut pending).await,
            // Restarts on every loop iteration, so it measures quiet time
            // since the last enqueue.
            _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                flush(&api, &mut pending).await;
            }
        }
    }
}

/// Send the current pending list as one collection lookup and distribute
/// results. New arrivals during the call start a fresh list.
async fn flush(api: &ScryfallApi, pending: &mut Vec<FetchRequest>) {
    if pending.is_empty() {
        return;
    }
    let batch = std::mem::take(pending);
    let ids: Vec<String> = batch.iter().map(|r| r.id.clone()).collect();
    log::debug!("Flushing batch of {} price lookups", batch.len());

    let (mut cards, batch_err) = api.collection(&ids).await;

    for request in batch {
        let outcome = match cards.remove(&request.id) {
            Some(card) => Ok(card),
            // An identifier missing from a successful response failed on
            // its own; a failed call fails every identifier in the batch.
            None => Err(match &batch_err {
                Some(PriceError::RateLimited) => PriceError::RateLimited,
                Some(e) => PriceError::BatchFailed(e.to_string()),
                None => PriceError::NotFound(request.id.clone()),
            }),
        };
        // Receiver may have given up; nothing to do then.
        let _ = request.tx.send(outcome);
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
