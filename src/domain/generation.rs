//! Generations: atomically visible snapshots of the whole reference-data set.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::instrument::InstrumentRecord;
use super::symbol::{CanonicalSymbol, ExchangeId};

/// Strictly monotonically increasing snapshot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationId(pub u64);

impl GenerationId {
    pub const GENESIS: GenerationId = GenerationId(0);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of one record within a generation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub symbol: CanonicalSymbol,
    pub exchange: ExchangeId,
}

impl RecordKey {
    pub fn new(symbol: CanonicalSymbol, exchange: ExchangeId) -> Self {
        Self { symbol, exchange }
    }
}

/// Map of records as held by one generation. Records are `Arc`-shared with
/// the previous generation where unchanged, so copying a generation is cheap.
pub type RecordMap = BTreeMap<RecordKey, Arc<InstrumentRecord>>;

/// One immutable, fully-formed version of the reference-data set.
///
/// Exactly one generation is active at any instant; readers always observe a
/// whole generation, never a mix of two.
#[derive(Debug, Clone)]
pub struct Generation {
    pub id: GenerationId,
    pub created_at: DateTime<Utc>,
    pub records: RecordMap,
}

impl Generation {
    /// The empty generation a store starts from before the first commit.
    pub fn genesis() -> Self {
        Self {
            id: GenerationId::GENESIS,
            created_at: Utc::now(),
            records: RecordMap::new(),
        }
    }

    pub fn get(&self, symbol: &CanonicalSymbol, exchange: &ExchangeId) -> Option<&Arc<InstrumentRecord>> {
        self.records.get(&RecordKey {
            symbol: symbol.clone(),
            exchange: exchange.clone(),
        })
    }

    /// All records contributed by one exchange.
    pub fn exchange_slice(&self, exchange: &ExchangeId) -> impl Iterator<Item = &Arc<InstrumentRecord>> {
        // Cloned so the iterator borrows only the generation.
        let exchange = exchange.clone();
        self.records.values().filter(move |r| r.exchange == exchange)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
