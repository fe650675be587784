//! Exchange-agnostic domain types: canonical symbology, instrument records,
//! generations and change events.

pub mod change;
pub mod generation;
pub mod instrument;
pub mod symbol;

pub use change::{ChangeEvent, ChangeField};
pub use generation::{Generation, GenerationId, RecordKey, RecordMap};
pub use instrument::{Diagnostic, InstrumentRecord, RawInstrumentDescriptor, TradingStatus};
pub use symbol::{Asset, CanonicalSymbol, ExchangeId, InstrumentKind, UnderlyingPair};
