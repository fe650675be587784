//! Change events derived by the reconciliation diff.

use super::generation::GenerationId;
use super::symbol::{CanonicalSymbol, ExchangeId};

/// Field of an [`crate::domain::InstrumentRecord`] that changed between
/// generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeField {
    /// The (symbol, exchange) listing appeared for the first time.
    Listed,
    TickSize,
    LotSize,
    MinNotional,
    MaxOrderSize,
    Multiplier,
    Status,
}

impl ChangeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listed => "listed",
            Self::TickSize => "tick_size",
            Self::LotSize => "lot_size",
            Self::MinNotional => "min_notional",
            Self::MaxOrderSize => "max_order_size",
            Self::Multiplier => "multiplier",
            Self::Status => "status",
        }
    }
}

impl std::fmt::Display for ChangeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited field change, produced by the reconciliation diff and emitted
/// through the notifier boundary. Derived data; the record sets themselves are
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub symbol: CanonicalSymbol,
    pub exchange: ExchangeId,
    pub field: ChangeField,
    pub old: Option<String>,
    pub new: Option<String>,
    /// Generation in which the new value became active.
    pub generation: GenerationId,
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[gen {}] {}@{} {}: {} -> {}",
            self.generation,
            self.symbol,
            self.exchange,
            self.field,
            self.old.as_deref().unwrap_or("-"),
            self.new.as_deref().unwrap_or("-"),
        )
    }
}
