//! Database row types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{canonical_symbols, generations, instrument_records};

/// Database row for a canonical symbol.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = canonical_symbols)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CanonicalSymbolRow {
    pub id: String,
    pub base: String,
    pub quote: String,
    pub kind: String,
    pub designator: Option<String>,
}

/// Database row for a generation.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = generations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GenerationRow {
    pub id: i64,
    pub created_at: String,
    pub active: bool,
}

/// Database row for an instrument record. Decimals are stored as text to
/// round-trip exactly.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = instrument_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstrumentRecordRow {
    pub generation_id: i64,
    pub canonical_symbol_id: String,
    pub exchange: String,
    pub native_id: String,
    pub tick_size: String,
    pub lot_size: String,
    pub min_notional: String,
    pub max_order_size: Option<String>,
    pub multiplier: String,
    pub price_precision: i32,
    pub qty_precision: i32,
    pub status: String,
    pub source_ts: String,
    pub diagnostic: Option<String>,
}
