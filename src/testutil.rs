//! Shared builders for unit tests.

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{
    Asset, CanonicalSymbol, ExchangeId, InstrumentRecord, TradingStatus,
};
use crate::normalize::NormalizedListing;

/// An active spot record with the given constraints.
pub fn spot_record(
    exchange: &str,
    base: &str,
    quote: &str,
    tick: &str,
    lot: &str,
) -> InstrumentRecord {
    let tick_size = Decimal::from_str(tick).unwrap();
    let lot_size = Decimal::from_str(lot).unwrap();
    InstrumentRecord {
        symbol: CanonicalSymbol::spot(Asset::new(base), Asset::new(quote)),
        exchange: ExchangeId::new(exchange),
        native_id: format!("{base}{quote}"),
        tick_size,
        lot_size,
        min_notional: Decimal::from(10),
        max_order_size: None,
        multiplier: Decimal::ONE,
        price_precision: tick_size.normalize().scale(),
        qty_precision: lot_size.normalize().scale(),
        status: TradingStatus::Active,
        source_ts: Utc::now(),
        diagnostic: None,
    }
}

/// Wrap records as a normalized listing for the exchange of the first record.
pub fn listing_of(records: Vec<InstrumentRecord>) -> NormalizedListing {
    let exchange = records
        .first()
        .map(|r| r.exchange.clone())
        .expect("listing_of needs at least one record");
    NormalizedListing {
        exchange,
        records,
        rejects: Vec::new(),
    }
}

/// A listing with no instruments, as an exchange that delisted everything
/// would return.
pub fn empty_listing(exchange: &str) -> NormalizedListing {
    NormalizedListing {
        exchange: ExchangeId::new(exchange),
        records: Vec::new(),
        rejects: Vec::new(),
    }
}
