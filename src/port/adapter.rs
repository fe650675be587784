//! Exchange adapter port.
//!
//! An adapter speaks one exchange's reference-data API and returns raw,
//! exchange-native instrument descriptors. Numeric fields stay strings on
//! this boundary; parsing happens in the normalization pipeline.

use async_trait::async_trait;

use crate::domain::{ExchangeId, RawInstrumentDescriptor};
use crate::error::AdapterError;

/// Per-exchange reference-data client.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// The exchange this adapter speaks for.
    fn exchange(&self) -> &ExchangeId;

    /// Fetch the exchange's full instrument listing.
    ///
    /// Failures are typed so the scheduler can retry transport problems and
    /// surface persistent ones as a stale source.
    async fn list_instruments(&self) -> Result<Vec<RawInstrumentDescriptor>, AdapterError>;
}
