//! Validation/query API: the read path used by order-construction logic.
//!
//! Every call fetches the active generation once up front, so a concurrent
//! commit can never tear a read. All arithmetic is exact decimal; a price is
//! valid only when it is an exact multiple of the tick size, a quantity only
//! when it is an exact multiple of the lot size.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{
    CanonicalSymbol, ExchangeId, Generation, InstrumentKind, InstrumentRecord, TradingStatus,
};
use crate::port::store::GenerationStore;

/// Why a candidate order was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderViolation {
    TickSize { price: Decimal, tick_size: Decimal },
    LotSize { quantity: Decimal, lot_size: Decimal },
    BelowMinNotional { notional: Decimal, min_notional: Decimal },
    AboveMaxOrderSize { quantity: Decimal, max_order_size: Decimal },
    InstrumentNotActive { status: TradingStatus },
}

impl std::fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TickSize { price, tick_size } => {
                write!(f, "price {price} is not a multiple of tick size {tick_size}")
            }
            Self::LotSize { quantity, lot_size } => {
                write!(f, "quantity {quantity} is not a multiple of lot size {lot_size}")
            }
            Self::BelowMinNotional { notional, min_notional } => {
                write!(f, "notional {notional} below minimum {min_notional}")
            }
            Self::AboveMaxOrderSize { quantity, max_order_size } => {
                write!(f, "quantity {quantity} above maximum order size {max_order_size}")
            }
            Self::InstrumentNotActive { status } => {
                write!(f, "instrument is not active ({status})")
            }
        }
    }
}

/// Result of validating a candidate order. Violations are data returned to
/// the caller, never a process fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCheck {
    Ok { notional: Decimal },
    Violation(OrderViolation),
    /// No record for this (symbol, exchange) in the active generation.
    NotFound,
}

impl OrderCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Read handle over a generation store.
pub struct QueryApi<S> {
    store: Arc<S>,
}

impl<S: GenerationStore> QueryApi<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The active generation snapshot this call would read from.
    pub fn snapshot(&self) -> Arc<Generation> {
        self.store.active()
    }

    /// Current record for a (symbol, exchange) pair.
    pub fn get_instrument(
        &self,
        symbol: &CanonicalSymbol,
        exchange: &ExchangeId,
    ) -> Option<Arc<InstrumentRecord>> {
        self.store.active().get(symbol, exchange).cloned()
    }

    /// Validate a candidate order against the instrument's constraints.
    pub fn validate_order(
        &self,
        symbol: &CanonicalSymbol,
        exchange: &ExchangeId,
        price: Decimal,
        quantity: Decimal,
    ) -> OrderCheck {
        // One snapshot for the whole call; a commit in flight cannot tear it.
        let generation = self.store.active();
        let Some(record) = generation.get(symbol, exchange) else {
            return OrderCheck::NotFound;
        };
        validate_against(record, price, quantity)
    }

    /// Round a price down to the instrument's tick grid.
    pub fn round_price(
        &self,
        symbol: &CanonicalSymbol,
        exchange: &ExchangeId,
        price: Decimal,
    ) -> Option<Decimal> {
        let record = self.get_instrument(symbol, exchange)?;
        Some(floor_to_increment(price, record.tick_size))
    }

    /// Round a quantity down to the instrument's lot grid.
    pub fn round_quantity(
        &self,
        symbol: &CanonicalSymbol,
        exchange: &ExchangeId,
        quantity: Decimal,
    ) -> Option<Decimal> {
        let record = self.get_instrument(symbol, exchange)?;
        Some(floor_to_increment(quantity, record.lot_size))
    }
}

/// Constraint checks against one record, in fixed order: status, tick, lot,
/// max size, then notional.
pub fn validate_against(record: &InstrumentRecord, price: Decimal, quantity: Decimal) -> OrderCheck {
    if !record.is_active() {
        return OrderCheck::Violation(OrderViolation::InstrumentNotActive {
            status: record.status,
        });
    }

    if price <= Decimal::ZERO || !is_multiple_of(price, record.tick_size) {
        return OrderCheck::Violation(OrderViolation::TickSize {
            price,
            tick_size: record.tick_size,
        });
    }

    if quantity <= Decimal::ZERO || !is_multiple_of(quantity, record.lot_size) {
        return OrderCheck::Violation(OrderViolation::LotSize {
            quantity,
            lot_size: record.lot_size,
        });
    }

    if let Some(max) = record.max_order_size {
        if quantity > max {
            return OrderCheck::Violation(OrderViolation::AboveMaxOrderSize {
                quantity,
                max_order_size: max,
            });
        }
    }

    let notional = notional_of(record, price, quantity);
    if notional < record.min_notional {
        return OrderCheck::Violation(OrderViolation::BelowMinNotional {
            notional,
            min_notional: record.min_notional,
        });
    }

    OrderCheck::Ok { notional }
}

/// Order notional in the instrument's quote units.
///
/// Inverse perpetual contracts have a fixed face value per contract, so their
/// notional is quantity x multiplier and the price cancels out; spot and
/// linear contracts are price x quantity x multiplier.
pub fn notional_of(record: &InstrumentRecord, price: Decimal, quantity: Decimal) -> Decimal {
    match record.symbol.kind {
        InstrumentKind::PerpInverse => quantity * record.multiplier,
        _ => price * quantity * record.multiplier,
    }
}

fn is_multiple_of(value: Decimal, increment: Decimal) -> bool {
    if increment <= Decimal::ZERO {
        return false;
    }
    (value % increment).is_zero()
}

fn floor_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    (value / increment).floor() * increment
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testutil::spot_record;

    fn record_with(tick: &str, lot: &str, min_notional: Decimal) -> InstrumentRecord {
        let mut record = spot_record("binance", "BTC", "USDT", tick, lot);
        record.min_notional = min_notional;
        record
    }

    #[test]
    fn price_off_tick_grid_is_rejected() {
        let record = record_with("0.5", "0.1", dec!(0));
        assert_eq!(
            validate_against(&record, dec!(10.3), dec!(1)),
            OrderCheck::Violation(OrderViolation::TickSize {
                price: dec!(10.3),
                tick_size: dec!(0.5),
            })
        );
        assert!(validate_against(&record, dec!(10.5), dec!(1)).is_ok());
    }

    #[test]
    fn quantity_off_lot_grid_is_rejected() {
        let record = record_with("0.5", "0.1", dec!(0));
        assert!(matches!(
            validate_against(&record, dec!(10.5), dec!(0.15)),
            OrderCheck::Violation(OrderViolation::LotSize { .. })
        ));
    }

    #[test]
    fn notional_floor_applies() {
        let record = record_with("0.5", "1", dec!(10));
        // price 2 x qty 1 = 2 < 10
        assert!(matches!(
            validate_against(&record, dec!(2), dec!(1)),
            OrderCheck::Violation(OrderViolation::BelowMinNotional { .. })
        ));
        // price 2 x qty 6 = 12 >= 10
        assert_eq!(
            validate_against(&record, dec!(2), dec!(6)),
            OrderCheck::Ok { notional: dec!(12) }
        );
    }

    #[test]
    fn max_order_size_applies() {
        let mut record = record_with("0.5", "1", dec!(0));
        record.max_order_size = Some(dec!(100));
        assert!(matches!(
            validate_against(&record, dec!(10), dec!(101)),
            OrderCheck::Violation(OrderViolation::AboveMaxOrderSize { .. })
        ));
        assert!(validate_against(&record, dec!(10), dec!(100)).is_ok());
    }

    #[test]
    fn inactive_instrument_rejects_before_other_checks() {
        let mut record = record_with("0.5", "1", dec!(0));
        record.status = TradingStatus::Suspended;
        assert_eq!(
            validate_against(&record, dec!(10.3), dec!(0.15)),
            OrderCheck::Violation(OrderViolation::InstrumentNotActive {
                status: TradingStatus::Suspended,
            })
        );
    }

    #[test]
    fn non_positive_inputs_are_grid_violations() {
        let record = record_with("0.5", "1", dec!(0));
        assert!(matches!(
            validate_against(&record, dec!(0), dec!(1)),
            OrderCheck::Violation(OrderViolation::TickSize { .. })
        ));
        assert!(matches!(
            validate_against(&record, dec!(10), dec!(-1)),
            OrderCheck::Violation(OrderViolation::LotSize { .. })
        ));
    }

    #[test]
    fn inverse_perp_notional_ignores_price() {
        use crate::domain::{Asset, CanonicalSymbol, InstrumentKind};

        let mut record = record_with("0.5", "1", dec!(0));
        record.symbol = CanonicalSymbol::perp(
            Asset::new("BTC"),
            Asset::new("USD"),
            InstrumentKind::PerpInverse,
            Asset::new("BTC"),
        );
        record.multiplier = dec!(100); // 100 USD face value per contract

        assert_eq!(notional_of(&record, dec!(50000), dec!(3)), dec!(300));
        assert_eq!(notional_of(&record, dec!(20000), dec!(3)), dec!(300));
    }

    #[test]
    fn rounding_floors_to_grid() {
        assert_eq!(floor_to_increment(dec!(10.34), dec!(0.5)), dec!(10.0));
        assert_eq!(floor_to_increment(dec!(10.5), dec!(0.5)), dec!(10.5));
        assert_eq!(floor_to_increment(dec!(0.0019), dec!(0.001)), dec!(0.001));
    }
}
