//! Scryfall API client for fetching card prices
//!
//! Single-card and bulk collection lookups, both gated by the shared
//! [`RateGate`]. Collection lookups are chunked to Scryfall's 75-identifier
//! cap and merged, keeping partial results when a chunk fails.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{SyncConfig, MAX_PER_COLLECTION};
use crate::error::PriceError;
use crate::rate_limit::RateGate;

const USER_AGENT: &str = "price_sync/1.0";

/// Scryfall card response
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScryfallCard {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub prices: ScryfallPrices,
}

/// Price block of a Scryfall card. Amounts arrive as decimal strings;
/// a missing or unparseable value means "no listed price" and reads as 0.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ScryfallPrices {
    pub eur: Option<String>,
    pub eur_foil: Option<String>,
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
}

impl ScryfallPrices {
    fn amount(raw: &Option<String>) -> f64 {
        raw.as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    pub fn eur(&self) -> f64 {
        Self::amount(&self.eur)
    }

    pub fn eur_foil(&self) -> f64 {
        Self::amount(&self.eur_foil)
    }

    pub fn usd(&self) -> f64 {
        Self::amount(&self.usd)
    }

    pub fn usd_foil(&self) -> f64 {
        Self::amount(&self.usd_foil)
    }
}

#[derive(Debug, Serialize)]
struct CardIdentifier {
    id: String,
}

#[derive(Debug, Serialize)]
struct CollectionRequest {
    identifiers: Vec<CardIdentifier>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    data: Vec<ScryfallCard>,
}

/// Scryfall API handle: one HTTP client plus the shared rate gate
#[derive(Debug, Clone)]
pub struct ScryfallApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    gate: RateGate,
}

impl ScryfallApi {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
            gate: RateGate::new(config.cooldown),
        }
    }

    /// Fetch a single card by Scryfall ID
    pub async fn card(&self, id: &str) -> Result<ScryfallCard, PriceError> {
        let url = format!("{}/cards/{}", self.base_url, id);
        log::debug!("Fetching card from Scryfall: {}", id);

        let slot = self.gate.acquire().await;
        let sent = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await;
        slot.release_after_cooldown();

        let response = sent?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(PriceError::HttpStatus(response.status()));
        }
        Ok(response.json::<ScryfallCard>().await?)
    }

    /// Bulk lookup by Scryfall ID, chunked to the collection cap.
    ///
    /// Chunks are issued sequentially, each rate-gated on its own. Returns
    /// whatever cards were obtained keyed by ID, paired with the first error
    /// if any chunk failed; identifiers absent from the map were either in a
    /// failed chunk or not found by Scryfall.
    pub async fn collection(
        &self,
        ids: &[String],
    ) -> (HashMap<String, ScryfallCard>, Option<PriceError>) {
        let mut cards = HashMap::with_capacity(ids.len());
        let mut first_err = None;

        for chunk in ids.chunks(MAX_PER_COLLECTION) {
            match self.collection_page(chunk).await {
                Ok(page) => cards.extend(page),
                Err(e) => {
                    log::warn!("Collection chunk of {} cards failed: {}", chunk.len(), e);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        (cards, first_err)
    }

    /// One POST /cards/collection call with at most the cap of identifiers
    async fn collection_page(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, ScryfallCard>, PriceError> {
        let body = CollectionRequest {
            identifiers: ids
                .iter()
                .map(|id| CardIdentifier { id: id.clone() })
                .collect(),
        };
        let url = format!("{}/cards/collection", self.base_url);
        log::debug!("Fetching collection of {} cards from Scryfall", ids.len());

        let slot = self.gate.acquire().await;
        let sent = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await;
        slot.release_after_cooldown();

        let response = sent?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(PriceError::HttpStatus(response.status()));
        }

        let parsed = response.json::<CollectionResponse>().await?;
        Ok(parsed
            .data
            .into_iter()
            .map(|card| (card.id.clone(), card))
            .collect())
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
