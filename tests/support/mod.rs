//! Shared helpers for integration tests.

use refsync::domain::RawInstrumentDescriptor;
use refsync::normalize::{normalize_listing, NormalizedListing};
use refsync::domain::ExchangeId;
use refsync::resolver::SymbolResolver;

/// An active spot descriptor with the given tick size.
pub fn spot_descriptor(base: &str, quote: &str, tick: &str) -> RawInstrumentDescriptor {
    RawInstrumentDescriptor {
        native_id: format!("{base}{quote}"),
        kind: "spot".to_string(),
        base: base.to_string(),
        quote: quote.to_string(),
        settle: None,
        tick_size: Some(tick.to_string()),
        lot_size: Some("0.001".to_string()),
        min_notional: Some("10".to_string()),
        max_order_size: None,
        multiplier: None,
        price_precision: None,
        qty_precision: None,
        status: "active".to_string(),
    }
}

/// Normalize descriptors for one exchange against a fresh resolver.
pub fn normalized(
    resolver: &SymbolResolver,
    exchange: &str,
    descriptors: Vec<RawInstrumentDescriptor>,
) -> NormalizedListing {
    normalize_listing(
        resolver,
        &ExchangeId::new(exchange),
        descriptors,
        chrono::Utc::now(),
    )
}
