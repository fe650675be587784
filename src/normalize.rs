//! Normalization pipeline: raw adapter listings into validated
//! [`InstrumentRecord`]s.
//!
//! Numeric fields are parsed from their string transport form straight into
//! `Decimal`; nothing here touches floating point. Records that fail numeric
//! validation are kept with `Suspended` status and a
//! [`Diagnostic::MalformedReferenceData`] instead of being dropped silently.
//! Normalizing the same raw input twice yields identical records excluding
//! the source timestamp.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::{
    Diagnostic, ExchangeId, InstrumentRecord, RawInstrumentDescriptor, TradingStatus,
};
use crate::error::ResolveError;
use crate::resolver::SymbolResolver;

/// An instrument excluded from the cycle because its identity could not be
/// resolved. Reported, never silently discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedInstrument {
    pub native_id: String,
    pub error: ResolveError,
}

/// Output of normalizing one exchange's raw listing for one poll cycle.
#[derive(Debug, Clone)]
pub struct NormalizedListing {
    pub exchange: ExchangeId,
    pub records: Vec<InstrumentRecord>,
    pub rejects: Vec<RejectedInstrument>,
}

impl NormalizedListing {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalize one adapter's raw listing.
///
/// Resolution errors exclude only the offending descriptor; everything else
/// still produces a record.
pub fn normalize_listing(
    resolver: &SymbolResolver,
    exchange: &ExchangeId,
    raw: Vec<RawInstrumentDescriptor>,
    source_ts: DateTime<Utc>,
) -> NormalizedListing {
    let mut records = Vec::with_capacity(raw.len());
    let mut rejects = Vec::new();

    for descriptor in raw {
        match resolver.resolve(exchange, &descriptor) {
            Ok(symbol) => {
                records.push(build_record(symbol, exchange, &descriptor, source_ts));
            }
            Err(error) => {
                warn!(
                    exchange = %exchange,
                    native_id = %descriptor.native_id,
                    error = %error,
                    "Instrument excluded from cycle"
                );
                rejects.push(RejectedInstrument {
                    native_id: descriptor.native_id,
                    error,
                });
            }
        }
    }

    NormalizedListing {
        exchange: exchange.clone(),
        records,
        rejects,
    }
}

fn build_record(
    symbol: crate::domain::CanonicalSymbol,
    exchange: &ExchangeId,
    raw: &RawInstrumentDescriptor,
    source_ts: DateTime<Utc>,
) -> InstrumentRecord {
    let mut faults: Vec<String> = Vec::new();

    let tick_size = parse_positive(raw.tick_size.as_deref(), "tick_size", &mut faults);
    let lot_size = parse_positive(raw.lot_size.as_deref(), "lot_size", &mut faults);
    let min_notional =
        parse_non_negative(raw.min_notional.as_deref(), "min_notional", &mut faults);
    let max_order_size = match raw.max_order_size.as_deref() {
        None => None,
        Some(s) => match Decimal::from_str(s) {
            Ok(d) if d > Decimal::ZERO => Some(d),
            _ => {
                faults.push(format!("max_order_size '{s}' not a positive decimal"));
                None
            }
        },
    };
    // Spot has no contract multiplier; perps report contract value.
    let multiplier = match raw.multiplier.as_deref() {
        None => Decimal::ONE,
        Some(s) => match Decimal::from_str(s) {
            Ok(d) if d > Decimal::ZERO => d,
            _ => {
                faults.push(format!("multiplier '{s}' not a positive decimal"));
                Decimal::ONE
            }
        },
    };

    let declared_status = TradingStatus::from_str_opt(&raw.status).unwrap_or_else(|| {
        faults.push(format!("unknown trading status '{}'", raw.status));
        TradingStatus::Suspended
    });

    let (status, diagnostic) = if faults.is_empty() {
        (declared_status, None)
    } else {
        (
            TradingStatus::Suspended,
            Some(Diagnostic::MalformedReferenceData(faults.join("; "))),
        )
    };

    let price_precision = raw
        .price_precision
        .unwrap_or_else(|| tick_size.normalize().scale());
    let qty_precision = raw
        .qty_precision
        .unwrap_or_else(|| lot_size.normalize().scale());

    InstrumentRecord {
        symbol,
        exchange: exchange.clone(),
        native_id: raw.native_id.clone(),
        tick_size,
        lot_size,
        min_notional,
        max_order_size,
        multiplier,
        price_precision,
        qty_precision,
        status,
        source_ts,
        diagnostic,
    }
}

fn parse_positive(value: Option<&str>, field: &str, faults: &mut Vec<String>) -> Decimal {
    match value {
        None => {
            faults.push(format!("{field} missing"));
            Decimal::ZERO
        }
        Some(s) => match Decimal::from_str(s) {
            Ok(d) if d > Decimal::ZERO => d,
            Ok(_) => {
                faults.push(format!("{field} '{s}' must be positive"));
                Decimal::ZERO
            }
            Err(_) => {
                faults.push(format!("{field} '{s}' is not a decimal"));
                Decimal::ZERO
            }
        },
    }
}

fn parse_non_negative(value: Option<&str>, field: &str, faults: &mut Vec<String>) -> Decimal {
    match value {
        // Venues without a notional floor simply report none.
        None => Decimal::ZERO,
        Some(s) => match Decimal::from_str(s) {
            Ok(d) if d >= Decimal::ZERO => d,
            Ok(_) => {
                faults.push(format!("{field} '{s}' must be non-negative"));
                Decimal::ZERO
            }
            Err(_) => {
                faults.push(format!("{field} '{s}' is not a decimal"));
                Decimal::ZERO
            }
        },
    }
}
