//! Tuning constants for the price sync engine
//!
//! Everything is caller-supplied; `Default` gives the production values
//! matching Scryfall's documented limits.

use std::time::Duration;

/// Scryfall's base URL for production use
pub const SCRYFALL_BASE_URL: &str = "https://api.scryfall.com";

/// Maximum identifiers Scryfall accepts per /cards/collection call
pub const MAX_PER_COLLECTION: usize = 75;

/// Currency a price projection reads from a snapshot.
///
/// Selection happens at read time only; the full snapshot (all currencies,
/// foil and non-foil) is always fetched and cached together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    Eur,
    Usd,
}

/// Configuration for a [`crate::PriceSync`] engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Currency used for freshness checks and `price()` projections
    pub currency: Currency,
    /// How long a snapshot with a real non-zero price stays fresh
    pub success_ttl: Duration,
    /// How long a failed/zero snapshot stays fresh before a retry is allowed
    pub failure_ttl: Duration,
    /// Maximum identifiers per batch call
    pub batch_cap: usize,
    /// Quiet period after the last enqueue before a pending batch is flushed
    pub debounce: Duration,
    /// Periodic flush interval for a non-empty pending batch
    pub tick: Duration,
    /// Extra delay before the rate gate slot is released after each call
    pub cooldown: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Remote service base URL (overridden in tests)
    pub base_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            currency: Currency::Eur,
            success_ttl: Duration::from_secs(60 * 60 * 24),
            failure_ttl: Duration::from_secs(60 * 5),
            batch_cap: MAX_PER_COLLECTION,
            debounce: Duration::from_millis(20),
            tick: Duration::from_secs(1),
            cooldown: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
            base_url: SCRYFALL_BASE_URL.to_string(),
        }
    }
}

impl SyncConfig {
    /// Config pointed at a different server, e.g. a mock in tests
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
