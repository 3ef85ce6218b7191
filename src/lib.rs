//! Price Sync - MTG card price synchronization and caching engine
//!
//! Fetches card prices from Scryfall while staying inside its rate limits:
//! concurrent lookups for the same card are deduplicated into one outstanding
//! fetch, distinct lookups are batched into `/cards/collection` calls, and
//! results are cached in memory with separate staleness windows for
//! successful and failed fetches.

pub mod batch;
pub mod config;
pub mod error;
pub mod price_cache;
pub mod rate_limit;
pub mod scryfall;

pub use config::{Currency, SyncConfig};
pub use error::{PriceError, Result};
pub use price_cache::{PriceSync, Pricing};
pub use scryfall::{ScryfallApi, ScryfallCard, ScryfallPrices};
