//! Static adapter used in tests and examples.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ExchangeId, RawInstrumentDescriptor};
use crate::error::AdapterError;
use crate::port::adapter::ExchangeAdapter;

/// Adapter serving a fixed (but swappable) listing.
pub struct StaticAdapter {
    exchange: ExchangeId,
    listing: Mutex<Vec<RawInstrumentDescriptor>>,
}

impl StaticAdapter {
    pub fn new(exchange: impl AsRef<str>, listing: Vec<RawInstrumentDescriptor>) -> Self {
        Self {
            exchange: ExchangeId::new(exchange),
            listing: Mutex::new(listing),
        }
    }

    /// Convenience constructor: active spot descriptors with simple
    /// constraints for each (base, quote) pair.
    pub fn spot_pairs(exchange: impl AsRef<str>, pairs: &[(&str, &str)]) -> Self {
        let listing = pairs
            .iter()
            .map(|(base, quote)| spot_descriptor(base, quote))
            .collect();
        Self::new(exchange, listing)
    }

    /// Replace the served listing; the next poll sees the new data.
    pub fn set_listing(&self, listing: Vec<RawInstrumentDescriptor>) {
        *self.listing.lock() = listing;
    }
}

/// An active spot descriptor with simple constraints.
pub fn spot_descriptor(base: &str, quote: &str) -> RawInstrumentDescriptor {
    RawInstrumentDescriptor {
        native_id: format!("{base}{quote}"),
        kind: "spot".to_string(),
        base: base.to_string(),
        quote: quote.to_string(),
        settle: None,
        tick_size: Some("0.01".to_string()),
        lot_size: Some("0.001".to_string()),
        min_notional: Some("10".to_string()),
        max_order_size: None,
        multiplier: None,
        price_precision: None,
        qty_precision: None,
        status: "active".to_string(),
    }
}

#[async_trait]
impl ExchangeAdapter for StaticAdapter {
    fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    async fn list_instruments(&self) -> Result<Vec<RawInstrumentDescriptor>, AdapterError> {
        Ok(self.listing.lock().clone())
    }
}
