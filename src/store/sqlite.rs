//! Durable generation store backed by SQLite through Diesel.
//!
//! Each commit is one transaction: insert the new generation's rows, flip
//! exactly one `active` flag. A crash mid-commit rolls the transaction back
//! and leaves the previous generation fully active. The in-memory arena
//! serves all reads; SQLite is only touched on commit, prune and startup.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::info;

use super::db::model::{CanonicalSymbolRow, GenerationRow, InstrumentRecordRow};
use super::db::schema::{canonical_symbols, generations, instrument_records};
use super::db::DbPool;
use super::memory::MemoryStore;
use crate::domain::{
    Asset, CanonicalSymbol, Diagnostic, ExchangeId, Generation, GenerationId, InstrumentKind,
    InstrumentRecord, RecordKey, RecordMap, TradingStatus,
};
use crate::error::StoreError;
use crate::port::store::{GenerationStore, RetentionPolicy};

/// SQLite-backed generation store.
pub struct SqliteStore {
    mem: MemoryStore,
    pool: DbPool,
    /// Serializes durable commits; reads never take this.
    commit_guard: Mutex<()>,
}

impl SqliteStore {
    /// Open the store, restoring the last active generation if one was
    /// persisted.
    pub fn open(pool: DbPool, retention: RetentionPolicy) -> Result<Self, StoreError> {
        let mem = match Self::load_active(&pool)? {
            Some(restored) => {
                info!(
                    generation = %restored.id,
                    records = restored.len(),
                    "Restored active generation from database"
                );
                MemoryStore::with_restored(retention, restored)
            }
            None => MemoryStore::new(retention),
        };

        Ok(Self {
            mem,
            pool,
            commit_guard: Mutex::new(()),
        })
    }

    fn load_active(pool: &DbPool) -> Result<Option<Generation>, StoreError> {
        let mut conn = pool.get().map_err(|e| StoreError::Connection(e.to_string()))?;

        let active: Option<GenerationRow> = generations::table
            .filter(generations::active.eq(true))
            .first(&mut conn)
            .optional()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(generation_row) = active else {
            return Ok(None);
        };

        let rows: Vec<(InstrumentRecordRow, CanonicalSymbolRow)> = instrument_records::table
            .inner_join(
                canonical_symbols::table
                    .on(instrument_records::canonical_symbol_id.eq(canonical_symbols::id)),
            )
            .filter(instrument_records::generation_id.eq(generation_row.id))
            .load(&mut conn)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = RecordMap::new();
        for (record_row, symbol_row) in rows {
            let record = from_rows(record_row, symbol_row)?;
            records.insert(
                RecordKey::new(record.symbol.clone(), record.exchange.clone()),
                Arc::new(record),
            );
        }

        Ok(Some(Generation {
            id: GenerationId(generation_row.id as u64),
            created_at: parse_ts(&generation_row.created_at)?,
            records,
        }))
    }

    fn persist(&self, generation: &Generation) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let generation_row = GenerationRow {
            id: generation.id.as_u64() as i64,
            created_at: generation.created_at.to_rfc3339(),
            active: true,
        };

        let symbol_rows: Vec<CanonicalSymbolRow> = generation
            .records
            .values()
            .map(|r| symbol_row(&r.symbol))
            .collect();
        let record_rows: Vec<InstrumentRecordRow> = generation
            .records
            .values()
            .map(|r| to_row(generation.id, r))
            .collect::<Result<_, _>>()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            for row in &symbol_rows {
                diesel::replace_into(canonical_symbols::table)
                    .values(row)
                    .execute(conn)?;
            }
            diesel::insert_into(generations::table)
                .values(&generation_row)
                .execute(conn)?;
            diesel::insert_into(instrument_records::table)
                .values(&record_rows)
                .execute(conn)?;
            // Exactly one active flag flips within the same transaction.
            diesel::update(
                generations::table
                    .filter(generations::active.eq(true))
                    .filter(generations::id.ne(generation_row.id)),
            )
            .set(generations::active.eq(false))
            .execute(conn)?;
            Ok(())
        })
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl GenerationStore for SqliteStore {
    fn active(&self) -> Arc<Generation> {
        self.mem.active()
    }

    fn read(&self, id: GenerationId) -> Option<Arc<Generation>> {
        self.mem.read(id)
    }

    fn commit(
        &self,
        expected_parent: GenerationId,
        records: RecordMap,
    ) -> Result<Arc<Generation>, StoreError> {
        let _guard = self.commit_guard.lock();

        let active = self.mem.active();
        if active.id != expected_parent {
            return Err(StoreError::Conflict {
                expected: expected_parent,
                actual: active.id,
            });
        }

        let generation = Generation {
            id: active.id.next(),
            created_at: Utc::now(),
            records,
        };

        // Durability first: if the transaction fails or the process dies the
        // in-memory active pointer still names the parent.
        self.persist(&generation)?;
        self.mem.install(expected_parent, generation)
    }

    fn prune(&self) -> usize {
        // Same guard as commit: between a commit's persist and its install
        // the new generation has rows in SQLite but is not yet in
        // `retained_ids`, and an unguarded delete would strip them.
        let _guard = self.commit_guard.lock();

        let pruned = self.mem.prune();
        if pruned == 0 {
            return 0;
        }

        let retained: Vec<i64> = self
            .mem
            .retained_ids()
            .into_iter()
            .map(|id| id.as_u64() as i64)
            .collect();

        let Ok(mut conn) = self.pool.get() else {
            return pruned;
        };
        // Rows for collected generations go too; failures here only delay GC
        // until the next prune.
        let _ = diesel::delete(
            instrument_records::table
                .filter(instrument_records::generation_id.ne_all(&retained)),
        )
        .execute(&mut conn);
        let _ = diesel::delete(
            generations::table
                .filter(generations::id.ne_all(&retained))
                .filter(generations::active.eq(false)),
        )
        .execute(&mut conn);

        pruned
    }
}

fn symbol_row(symbol: &CanonicalSymbol) -> CanonicalSymbolRow {
    CanonicalSymbolRow {
        id: symbol.to_string(),
        base: symbol.base.as_str().to_string(),
        quote: symbol.quote.as_str().to_string(),
        kind: symbol.kind.as_token().to_string(),
        designator: symbol.designator.as_ref().map(|a| a.as_str().to_string()),
    }
}

fn to_row(
    generation: GenerationId,
    record: &InstrumentRecord,
) -> Result<InstrumentRecordRow, StoreError> {
    let diagnostic = record
        .diagnostic
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(InstrumentRecordRow {
        generation_id: generation.as_u64() as i64,
        canonical_symbol_id: record.symbol.to_string(),
        exchange: record.exchange.as_str().to_string(),
        native_id: record.native_id.clone(),
        tick_size: record.tick_size.to_string(),
        lot_size: record.lot_size.to_string(),
        min_notional: record.min_notional.to_string(),
        max_order_size: record.max_order_size.map(|d| d.to_string()),
        multiplier: record.multiplier.to_string(),
        price_precision: record.price_precision as i32,
        qty_precision: record.qty_precision as i32,
        status: record.status.as_str().to_string(),
        source_ts: record.source_ts.to_rfc3339(),
        diagnostic,
    })
}

fn from_rows(
    row: InstrumentRecordRow,
    symbol: CanonicalSymbolRow,
) -> Result<InstrumentRecord, StoreError> {
    let kind = InstrumentKind::from_token(&symbol.kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown kind '{}'", symbol.kind)))?;
    let status = TradingStatus::from_str_opt(&row.status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{}'", row.status)))?;
    let diagnostic: Option<Diagnostic> = row
        .diagnostic
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(InstrumentRecord {
        symbol: CanonicalSymbol {
            base: Asset::new(&symbol.base),
            quote: Asset::new(&symbol.quote),
            kind,
            designator: symbol.designator.as_deref().map(Asset::new),
        },
        exchange: ExchangeId::new(&row.exchange),
        native_id: row.native_id,
        tick_size: parse_decimal(&row.tick_size, "tick_size")?,
        lot_size: parse_decimal(&row.lot_size, "lot_size")?,
        min_notional: parse_decimal(&row.min_notional, "min_notional")?,
        max_order_size: row
            .max_order_size
            .as_deref()
            .map(|s| parse_decimal(s, "max_order_size"))
            .transpose()?,
        multiplier: parse_decimal(&row.multiplier, "multiplier")?,
        price_precision: row.price_precision as u32,
        qty_precision: row.qty_precision as u32,
        status,
        source_ts: parse_ts(&row.source_ts)?,
        diagnostic,
    })
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(s).map_err(|_| StoreError::Corrupt(format!("{field} '{s}' is not a decimal")))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{s}': {e}")))
}
