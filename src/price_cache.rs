//! Price cache and fetch coordinator - the public surface of the engine
//!
//! Holds the in-memory map of card ID to last-known price snapshot plus the
//! set of IDs with a fetch outstanding. Concurrent lookups for the same card
//! collapse into one remote fetch; distinct lookups are batched through the
//! [`BatchScheduler`]. Cached snapshots are served while fresh, with a much
//! shorter freshness window for failed fetches so they retry soon.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::batch::{BatchScheduler, FetchOutcome};
use crate::config::{Currency, SyncConfig};
use crate::scryfall::{ScryfallApi, ScryfallCard};

/// Immutable price snapshot for one card.
///
/// All-zero amounts mean "fetch attempted, no usable price" - deliberately
/// indistinguishable from a card that simply has no listing, so both retry
/// on the same short schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub fetched_at: DateTime<Utc>,
    pub eur: f64,
    pub eur_foil: f64,
    pub usd: f64,
    pub usd_foil: f64,
}

impl Pricing {
    /// Snapshot with no usable price, timestamped now
    pub fn unavailable() -> Self {
        Self {
            fetched_at: Utc::now(),
            eur: 0.0,
            eur_foil: 0.0,
            usd: 0.0,
            usd_foil: 0.0,
        }
    }

    fn from_card(card: &ScryfallCard) -> Self {
        Self {
            fetched_at: Utc::now(),
            eur: card.prices.eur(),
            eur_foil: card.prices.eur_foil(),
            usd: card.prices.usd(),
            usd_foil: card.prices.usd_foil(),
        }
    }

    /// Read-time projection of the cached snapshot
    pub fn value(&self, currency: Currency, foil: bool) -> f64 {
        match (currency, foil) {
            (Currency::Eur, false) => self.eur,
            (Currency::Eur, true) => self.eur_foil,
            (Currency::Usd, false) => self.usd,
            (Currency::Usd, true) => self.usd_foil,
        }
    }

    /// Age of the snapshot; a timestamp in the future reads as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or_default()
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Pricing>,
    /// IDs with a fetch outstanding, each with the waiters to notify when
    /// the result lands. Present in this map iff exactly one logical fetch
    /// is outstanding for the ID.
    in_flight: HashMap<String, Vec<oneshot::Sender<Pricing>>>,
}

struct Inner {
    api: ScryfallApi,
    config: SyncConfig,
    state: RwLock<CacheState>,
    scheduler: OnceLock<BatchScheduler>,
}

impl Inner {
    /// Success and failure snapshots age out on different schedules; the
    /// zero check doubles as the failure marker.
    fn is_fresh(&self, pricing: &Pricing, now: DateTime<Utc>) -> bool {
        let age = pricing.age(now);
        if pricing.value(self.config.currency, false) != 0.0 {
            age < self.config.success_ttl
        } else {
            age < self.config.failure_ttl
        }
    }
}

/// Price synchronization engine. Cloning is cheap and clones share the
/// cache, the in-flight set and the background flush task.
#[derive(Clone)]
pub struct PriceSync {
    inner: Arc<Inner>,
}

impl PriceSync {
    pub fn new(config: SyncConfig) -> Self {
        let api = ScryfallApi::new(&config);
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                state: RwLock::new(CacheState::default()),
                scheduler: OnceLock::new(),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Direct access to the rate-gated API, for callers that need card
    /// metadata outside the batched price path.
    pub fn api(&self) -> &ScryfallApi {
        &self.inner.api
    }

    /// Best known amount for one price kind, plus whether it is fresh.
    ///
    /// Never blocks on the network: a missing or stale snapshot triggers a
    /// background fetch (when `fetch` is set) and the current value is
    /// returned as-is.
    pub async fn price(&self, id: &str, foil: bool, fetch: bool) -> (f64, bool) {
        let pricing = self.full_price(id, fetch, false, false).await;
        let value = pricing.value(self.inner.config.currency, foil);
        let fresh = value != 0.0 && pricing.age(Utc::now()) <= self.inner.config.success_ttl;
        (value, fresh)
    }

    /// Canonical accessor for the full snapshot of one card.
    ///
    /// - `fetch`: allow scheduling a remote fetch when the snapshot is
    ///   stale or missing.
    /// - `force_fetch`: skip the freshness check and fetch regardless
    ///   (still joins an already outstanding fetch instead of duplicating).
    /// - `wait`: block until the outstanding fetch - this caller's own or
    ///   one already in flight - completes, and return its result. Without
    ///   it the current value is returned immediately and the fetch
    ///   finishes in the background (stale-while-revalidate).
    pub async fn full_price(&self, id: &str, fetch: bool, force_fetch: bool, wait: bool) -> Pricing {
        let inner = &self.inner;

        if !force_fetch {
            let known = {
                let state = inner.state.read().unwrap();
                let known = state.entries.get(id);
                if let Some(pricing) = known {
                    if inner.is_fresh(pricing, Utc::now()) {
                        return pricing.clone();
                    }
                }
                known.cloned()
            };
            if !fetch {
                return known.unwrap_or_else(Pricing::unavailable);
            }
        }

        // Claim the fetch or join the one in flight, atomically with a
        // freshness re-check in case a racing fetch just landed.
        let mut claimed = false;
        let (current, waiter) = {
            let mut state = inner.state.write().unwrap();
            let current = state.entries.get(id).cloned();
            if !force_fetch {
                if let Some(pricing) = current.as_ref() {
                    if inner.is_fresh(pricing, Utc::now()) {
                        return pricing.clone();
                    }
                }
            }

            if !state.in_flight.contains_key(id) {
                state.in_flight.insert(id.to_string(), Vec::new());
                claimed = true;
            }
            let waiter = if wait {
                let (tx, rx) = oneshot::channel();
                // In-flight entry exists on both paths by now.
                if let Some(waiters) = state.in_flight.get_mut(id) {
                    waiters.push(tx);
                }
                Some(rx)
            } else {
                None
            };
            (current, waiter)
        };

        if claimed {
            // Nobody else enqueues this ID while our in-flight entry is
            // present, so enqueueing outside the lock is safe.
            let outcome = self.scheduler().enqueue(id);
            self.spawn_apply(id.to_string(), outcome);
        }

        match waiter {
            Some(rx) => match rx.await {
                Ok(pricing) => pricing,
                // Applier vanished with the runtime shutting down; fall
                // back to whatever we had.
                Err(_) => current.unwrap_or_else(Pricing::unavailable),
            },
            None => current.unwrap_or_else(Pricing::unavailable),
        }
    }

    /// Flush task is started on first use and lives from then on.
    fn scheduler(&self) -> &BatchScheduler {
        self.inner
            .scheduler
            .get_or_init(|| BatchScheduler::start(self.inner.api.clone(), &self.inner.config))
    }

    /// Await one fetch outcome, overwrite the cache entry, clear the
    /// in-flight marker and release the waiters. The marker is removed on
    /// every path - leaving it behind would make the ID unfetchable.
    fn spawn_apply(&self, id: String, outcome: oneshot::Receiver<FetchOutcome>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let snapshot = match outcome.await {
                Ok(Ok(card)) => Pricing::from_card(&card),
                Ok(Err(e)) => {
                    if e.is_rate_limited() {
                        log::warn!("Price fetch for {} was rate limited", id);
                    } else {
                        log::warn!("Price fetch for {} failed: {}", id, e);
                    }
                    Pricing::unavailable()
                }
                Err(_) => {
                    log::warn!("Price fetch for {} was dropped before completing", id);
                    Pricing::unavailable()
                }
            };

            let waiters = {
                let mut state = inner.state.write().unwrap();
                state.entries.insert(id.clone(), snapshot.clone());
                state.in_flight.remove(&id).unwrap_or_default()
            };
            for waiter in waiters {
                let _ = waiter.send(snapshot.clone());
            }
        });
    }
}

#[cfg(test)]
#[path = "price_cache_tests.rs"]
mod tests;
