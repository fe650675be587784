//! Reconciliation engine.
//!
//! Merges one exchange's freshly normalized records into a new generation
//! built from the current active one. Only that exchange's slice is
//! replaced; other exchanges' records carry over untouched until their own
//! poll cycles supersede them. Instruments the exchange stopped listing are
//! marked `Delisted`, never removed. Commits race-check against the parent
//! generation and rebase on conflict instead of overwriting.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::{
    ChangeEvent, ChangeField, ExchangeId, Generation, GenerationId, InstrumentRecord, RecordKey,
    TradingStatus,
};
use crate::error::{Error, Result, StoreError};
use crate::normalize::NormalizedListing;
use crate::notify::{Event, NotifierRegistry};
use crate::port::store::GenerationStore;

/// Result of one reconciliation cycle.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// A new generation was committed.
    Committed {
        generation: Arc<Generation>,
        changes: Vec<ChangeEvent>,
    },
    /// The listing matched the active generation; no write happened and the
    /// generation number did not advance.
    Unchanged { generation: GenerationId },
}

impl ReconcileOutcome {
    pub fn generation_id(&self) -> GenerationId {
        match self {
            Self::Committed { generation, .. } => generation.id,
            Self::Unchanged { generation } => *generation,
        }
    }
}

pub struct Reconciler<S> {
    store: Arc<S>,
    notifiers: Arc<NotifierRegistry>,
    /// Rebase attempts before a cycle gives up on a commit race.
    max_commit_attempts: u32,
}

impl<S: GenerationStore> Reconciler<S> {
    pub fn new(store: Arc<S>, notifiers: Arc<NotifierRegistry>) -> Self {
        Self {
            store,
            notifiers,
            max_commit_attempts: 4,
        }
    }

    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Reconcile one exchange's poll cycle into a new generation.
    ///
    /// With `forced` set a commit happens even when the diff is empty,
    /// refreshing source timestamps at the cost of a generation number.
    pub fn reconcile(
        &self,
        listing: &NormalizedListing,
        forced: bool,
    ) -> Result<ReconcileOutcome> {
        let exchange = &listing.exchange;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let active = self.store.active();
            let (records, changes) = merge_exchange_slice(&active, exchange, listing);

            if changes.is_empty() && !forced {
                debug!(exchange = %exchange, generation = %active.id, "No changes; skipping commit");
                return Ok(ReconcileOutcome::Unchanged {
                    generation: active.id,
                });
            }

            match self.store.commit(active.id, records) {
                Ok(generation) => {
                    let changes = stamp_generation(changes, generation.id);
                    self.notifiers.notify_all(&Event::GenerationCommitted {
                        generation: generation.id,
                        exchange: exchange.clone(),
                        records: generation.len(),
                        changes: changes.len(),
                    });
                    if !changes.is_empty() {
                        self.notifiers.notify_all(&Event::Changes(changes.clone()));
                    }
                    self.store.prune();
                    return Ok(ReconcileOutcome::Committed {
                        generation,
                        changes,
                    });
                }
                // Another exchange's commit landed first. Rebase on the new
                // active generation so neither exchange's records are lost.
                Err(StoreError::Conflict { expected, actual }) => {
                    if attempt >= self.max_commit_attempts {
                        return Err(Error::CommitRetriesExhausted {
                            exchange: exchange.to_string(),
                            attempts: attempt,
                        });
                    }
                    warn!(
                        exchange = %exchange,
                        expected = %expected,
                        actual = %actual,
                        attempt,
                        "Commit conflict; rebasing"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}

/// Build the successor record map: the active generation with `exchange`'s
/// slice replaced by the new listing, plus the diff that replacement causes.
/// Change events carry a placeholder generation id until the commit assigns
/// the real one.
fn merge_exchange_slice(
    active: &Generation,
    exchange: &ExchangeId,
    listing: &NormalizedListing,
) -> (crate::domain::RecordMap, Vec<ChangeEvent>) {
    let mut records = active.records.clone();
    let mut changes = Vec::new();

    let mut seen: std::collections::BTreeSet<RecordKey> = std::collections::BTreeSet::new();

    for record in &listing.records {
        let key = RecordKey::new(record.symbol.clone(), record.exchange.clone());
        seen.insert(key.clone());

        match active.records.get(&key) {
            None => {
                changes.push(listed_event(record));
                records.insert(key, Arc::new(record.clone()));
            }
            Some(previous) => {
                if previous.same_constraints(record) {
                    // Unchanged records keep the previous Arc so their
                    // source_ts reflects the last actual change.
                    continue;
                }
                changes.extend(diff_records(previous, record));
                records.insert(key, Arc::new(record.clone()));
            }
        }
    }

    // Anything this exchange listed before but not now is delisted in place.
    let now = Utc::now();
    for (key, previous) in active.records.iter() {
        if &previous.exchange != exchange || seen.contains(key) {
            continue;
        }
        if previous.status == TradingStatus::Delisted {
            continue;
        }
        let delisted = previous.delisted(now);
        changes.push(ChangeEvent {
            symbol: previous.symbol.clone(),
            exchange: previous.exchange.clone(),
            field: ChangeField::Status,
            old: Some(previous.status.to_string()),
            new: Some(TradingStatus::Delisted.to_string()),
            generation: GenerationId::GENESIS,
        });
        records.insert(key.clone(), Arc::new(delisted));
    }

    (records, changes)
}

fn listed_event(record: &InstrumentRecord) -> ChangeEvent {
    ChangeEvent {
        symbol: record.symbol.clone(),
        exchange: record.exchange.clone(),
        field: ChangeField::Listed,
        old: None,
        new: Some(record.status.to_string()),
        generation: GenerationId::GENESIS,
    }
}

fn diff_records(old: &InstrumentRecord, new: &InstrumentRecord) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();
    let mut push = |field: ChangeField, old_val: Option<String>, new_val: Option<String>| {
        if old_val != new_val {
            changes.push(ChangeEvent {
                symbol: new.symbol.clone(),
                exchange: new.exchange.clone(),
                field,
                old: old_val,
                new: new_val,
                generation: GenerationId::GENESIS,
            });
        }
    };

    push(
        ChangeField::TickSize,
        Some(old.tick_size.to_string()),
        Some(new.tick_size.to_string()),
    );
    push(
        ChangeField::LotSize,
        Some(old.lot_size.to_string()),
        Some(new.lot_size.to_string()),
    );
    push(
        ChangeField::MinNotional,
        Some(old.min_notional.to_string()),
        Some(new.min_notional.to_string()),
    );
    push(
        ChangeField::MaxOrderSize,
        old.max_order_size.map(|d| d.to_string()),
        new.max_order_size.map(|d| d.to_string()),
    );
    push(
        ChangeField::Multiplier,
        Some(old.multiplier.to_string()),
        Some(new.multiplier.to_string()),
    );
    push(
        ChangeField::Status,
        Some(old.status.to_string()),
        Some(new.status.to_string()),
    );
    changes
}

fn stamp_generation(mut changes: Vec<ChangeEvent>, generation: GenerationId) -> Vec<ChangeEvent> {
    for change in &mut changes {
        change.generation = generation;
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testutil::{listing_of, spot_record};

    fn reconciler() -> Reconciler<MemoryStore> {
        Reconciler::new(
            Arc::new(MemoryStore::default()),
            Arc::new(NotifierRegistry::new()),
        )
    }

    #[test]
    fn first_cycle_lists_everything() {
        let engine = reconciler();
        let listing = listing_of(vec![
            spot_record("binance", "BTC", "USDT", "0.01", "0.001"),
            spot_record("binance", "ETH", "USDT", "0.01", "0.01"),
        ]);

        let outcome = engine.reconcile(&listing, false).unwrap();
        let ReconcileOutcome::Committed { generation, changes } = outcome else {
            panic!("expected commit");
        };
        assert_eq!(generation.id, GenerationId(1));
        assert_eq!(generation.len(), 2);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.field == ChangeField::Listed));
        assert!(changes.iter().all(|c| c.generation == GenerationId(1)));
    }

    #[test]
    fn identical_cycle_skips_commit() {
        let engine = reconciler();
        let listing = listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]);

        engine.reconcile(&listing, false).unwrap();
        let outcome = engine.reconcile(&listing, false).unwrap();
        assert!(matches!(
            outcome,
            ReconcileOutcome::Unchanged {
                generation: GenerationId(1)
            }
        ));
        assert_eq!(engine.store().active().id, GenerationId(1));
    }

    #[test]
    fn forced_refresh_commits_without_changes() {
        let engine = reconciler();
        let listing = listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]);

        engine.reconcile(&listing, false).unwrap();
        let outcome = engine.reconcile(&listing, true).unwrap();
        assert_eq!(outcome.generation_id(), GenerationId(2));
    }

    #[test]
    fn constraint_change_produces_field_event() {
        let engine = reconciler();
        engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]),
                false,
            )
            .unwrap();

        let outcome = engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.10", "0.001")]),
                false,
            )
            .unwrap();
        let ReconcileOutcome::Committed { changes, .. } = outcome else {
            panic!("expected commit");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, ChangeField::TickSize);
        assert_eq!(changes[0].old.as_deref(), Some("0.01"));
        assert_eq!(changes[0].new.as_deref(), Some("0.10"));
    }

    #[test]
    fn vanished_instrument_is_delisted_not_removed() {
        let engine = reconciler();
        engine
            .reconcile(
                &listing_of(vec![
                    spot_record("binance", "BTC", "USDT", "0.01", "0.001"),
                    spot_record("binance", "ETH", "USDT", "0.01", "0.01"),
                ]),
                false,
            )
            .unwrap();

        let outcome = engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]),
                false,
            )
            .unwrap();
        let ReconcileOutcome::Committed { generation, changes } = outcome else {
            panic!("expected commit");
        };

        // ETH record still present, flagged delisted.
        assert_eq!(generation.len(), 2);
        let eth = generation
            .records
            .values()
            .find(|r| r.symbol.base.as_str() == "ETH")
            .unwrap();
        assert_eq!(eth.status, TradingStatus::Delisted);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, ChangeField::Status);

        // A later cycle without it again is a no-op: already delisted.
        let outcome = engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]),
                false,
            )
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
    }

    #[test]
    fn other_exchanges_records_carry_over() {
        let engine = reconciler();
        engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]),
                false,
            )
            .unwrap();
        engine
            .reconcile(
                &listing_of(vec![spot_record("okx", "BTC", "USDT", "0.1", "0.0001")]),
                false,
            )
            .unwrap();

        let active = engine.store().active();
        assert_eq!(active.len(), 2);

        // Conflicting tick values across exchanges are both kept; no
        // arbitration happens here.
        let binance = ExchangeId::new("binance");
        let okx = ExchangeId::new("okx");
        let symbol = active.records.keys().next().unwrap().symbol.clone();
        assert_eq!(
            active.get(&symbol, &binance).unwrap().tick_size.to_string(),
            "0.01"
        );
        assert_eq!(active.get(&symbol, &okx).unwrap().tick_size.to_string(), "0.1");
    }

    #[test]
    fn empty_listing_delists_the_whole_exchange_slice() {
        let engine = reconciler();
        engine
            .reconcile(
                &listing_of(vec![spot_record("binance", "BTC", "USDT", "0.01", "0.001")]),
                false,
            )
            .unwrap();

        let outcome = engine
            .reconcile(&crate::testutil::empty_listing("binance"), false)
            .unwrap();
        let ReconcileOutcome::Committed { generation, .. } = outcome else {
            panic!("expected commit");
        };
        assert_eq!(generation.len(), 1);
        assert_eq!(
            generation.records.values().next().unwrap().status,
            TradingStatus::Delisted
        );
    }
}
