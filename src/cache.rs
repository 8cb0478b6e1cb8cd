//! In-memory price cache with a freshness window
//!
//! Holds at most one entry per symbol. Entries are overwritten on every
//! successful fetch and never evicted: the key space is the registry's fixed
//! symbol set, and old entries are the last line of defence when every
//! provider is down.

use crate::{
    clock::Clock,
    types::{ProviderKind, Symbol},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Type alias for an individual cache slot (optionally contains an entry)
type EntrySlot = Arc<RwLock<Option<CacheEntry>>>;

/// Most recently resolved price for a symbol
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub price_usd: Decimal,
    pub source: ProviderKind,
    pub observed_at: DateTime<Utc>,
}

/// Per-symbol price cache
///
/// Each symbol has its own lock, so writers of different symbols never
/// contend. The outer map is only write-locked the first time a symbol is
/// stored.
pub struct PriceCache {
    slots: RwLock<HashMap<Symbol, EntrySlot>>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl PriceCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    /// * `window` - How long after `observed_at` an entry counts as fresh
    /// * `clock` - Time source for freshness checks
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            window,
            clock,
        }
    }

    pub fn freshness_window(&self) -> Duration {
        self.window
    }

    /// Current time according to the cache's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// True if an entry observed at `observed_at` is still fresh
    pub fn is_fresh(&self, observed_at: DateTime<Utc>) -> bool {
        let age = self.now().signed_duration_since(observed_at);
        match chrono::Duration::from_std(self.window) {
            Ok(window) => age <= window,
            // Window too large to represent: everything is fresh
            Err(_) => true,
        }
    }

    async fn slot(&self, symbol: &Symbol) -> Option<EntrySlot> {
        self.slots.read().await.get(symbol).cloned()
    }

    async fn ensure_slot(&self, symbol: &Symbol) -> EntrySlot {
        if let Some(slot) = self.slot(symbol).await {
            return slot;
        }
        let mut slots = self.slots.write().await;
        let slot = slots
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(RwLock::new(None)))
            .clone();
        slot
    }

    /// Returns the entry only if it is inside the freshness window
    pub async fn get_fresh(&self, symbol: &Symbol) -> Option<CacheEntry> {
        self.get_any(symbol)
            .await
            .filter(|entry| self.is_fresh(entry.observed_at))
    }

    /// Returns the entry regardless of its age
    pub async fn get_any(&self, symbol: &Symbol) -> Option<CacheEntry> {
        let slot = self.slot(symbol).await?;
        let entry = slot.read().await;
        entry.clone()
    }

    /// Stores a price for a symbol
    ///
    /// The write is dropped if the slot already holds a newer observation,
    /// so `observed_at` never moves backwards. Returns whether the entry was
    /// written.
    pub async fn put(
        &self,
        symbol: &Symbol,
        price_usd: Decimal,
        source: ProviderKind,
        observed_at: DateTime<Utc>,
    ) -> bool {
        let slot = self.ensure_slot(symbol).await;
        let mut entry = slot.write().await;

        if let Some(current) = entry.as_ref() {
            if current.observed_at > observed_at {
                tracing::debug!(
                    symbol = %symbol,
                    current = %current.observed_at,
                    rejected = %observed_at,
                    "Ignoring out-of-order cache write"
                );
                return false;
            }
        }

        *entry = Some(CacheEntry {
            price_usd,
            source,
            observed_at,
        });
        tracing::debug!(symbol = %symbol, price_usd = %price_usd, source = %source, "Cached price");
        true
    }

    /// Copies every stored entry
    pub async fn snapshot(&self) -> HashMap<Symbol, CacheEntry> {
        let slots = self.slots.read().await;
        let mut result = HashMap::with_capacity(slots.len());

        for (symbol, slot) in slots.iter() {
            if let Some(entry) = slot.read().await.as_ref() {
                result.insert(symbol.clone(), entry.clone());
            }
        }

        result
    }
}
