//! Instrument records and the raw descriptors adapters produce.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::symbol::{CanonicalSymbol, ExchangeId};

/// Trading status of one (symbol, exchange) listing.
///
/// Delisted records are retained in the store, never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStatus {
    Active,
    Suspended,
    Delisted,
}

impl TradingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Delisted => "delisted",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "delisted" => Some(Self::Delisted),
            _ => None,
        }
    }
}

impl std::fmt::Display for TradingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic attached to a record that failed numeric validation.
///
/// Malformed upstream data suspends the instrument instead of silently
/// dropping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum Diagnostic {
    MalformedReferenceData(String),
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedReferenceData(detail) => {
                write!(f, "malformed reference data: {detail}")
            }
        }
    }
}

/// Raw, exchange-native instrument descriptor as returned by an adapter.
///
/// Numeric constraint fields stay strings on this boundary so nothing passes
/// through floating point before the normalization pipeline parses them into
/// decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInstrumentDescriptor {
    /// Exchange-native identifier, e.g. `BTCUSDT` or `BTC-USDT-SWAP`.
    pub native_id: String,
    /// Normalized kind token: `spot`, `perp_linear`, `perp_inverse`, or the
    /// exchange's own token for anything else (rejected by the resolver).
    pub kind: String,
    pub base: String,
    pub quote: String,
    /// Settlement currency for perpetuals, when the exchange reports one.
    pub settle: Option<String>,
    pub tick_size: Option<String>,
    pub lot_size: Option<String>,
    pub min_notional: Option<String>,
    pub max_order_size: Option<String>,
    /// Contract multiplier; adapters leave `None` for spot (implied 1).
    pub multiplier: Option<String>,
    pub price_precision: Option<u32>,
    pub qty_precision: Option<u32>,
    /// Normalized status token: `active`, `suspended` or `delisted`.
    pub status: String,
}

/// Validated per-(symbol, exchange) reference data.
///
/// Records are immutable once built; a later poll cycle supersedes them with
/// a new generation instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentRecord {
    pub symbol: CanonicalSymbol,
    pub exchange: ExchangeId,
    pub native_id: String,
    /// Minimum price increment. Positive for active records.
    pub tick_size: Decimal,
    /// Minimum quantity increment (step size). Positive for active records.
    pub lot_size: Decimal,
    /// Minimum order notional; zero when the venue does not enforce one.
    pub min_notional: Decimal,
    pub max_order_size: Option<Decimal>,
    /// Contract multiplier; 1 for spot.
    pub multiplier: Decimal,
    pub price_precision: u32,
    pub qty_precision: u32,
    pub status: TradingStatus,
    pub source_ts: DateTime<Utc>,
    pub diagnostic: Option<Diagnostic>,
}

impl InstrumentRecord {
    /// A delisted copy of this record, stamped with the delisting time.
    pub fn delisted(&self, at: DateTime<Utc>) -> Self {
        Self {
            status: TradingStatus::Delisted,
            source_ts: at,
            diagnostic: None,
            ..self.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TradingStatus::Active
    }

    /// Equality ignoring the source timestamp. Normalization idempotence and
    /// the reconciliation diff are defined over this.
    pub fn same_constraints(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.exchange == other.exchange
            && self.native_id == other.native_id
            && self.tick_size == other.tick_size
            && self.lot_size == other.lot_size
            && self.min_notional == other.min_notional
            && self.max_order_size == other.max_order_size
            && self.multiplier == other.multiplier
            && self.price_precision == other.price_precision
            && self.qty_precision == other.qty_precision
            && self.status == other.status
            && self.diagnostic == other.diagnostic
    }
}
