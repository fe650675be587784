//! Canonical symbol resolution.
//!
//! Maps an exchange-native instrument identifier plus declared kind to a
//! stable [`CanonicalSymbol`]. Resolution is deterministic and
//! order-independent: the same input resolves to the same symbol from any
//! exchange, in any order. A spot pair and a perpetual on the same base/quote
//! always receive distinct identities.

use dashmap::DashMap;

use crate::domain::{
    Asset, CanonicalSymbol, ExchangeId, InstrumentKind, RawInstrumentDescriptor,
};
use crate::error::ResolveError;

/// One registered exchange listing: native id to canonical symbol, unique per
/// exchange within a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeListing {
    pub exchange: ExchangeId,
    pub native_id: String,
    pub symbol: CanonicalSymbol,
}

/// Thread-safe canonical symbol registry.
///
/// Shared by all per-exchange pollers; resolution is a pure lookup/insert and
/// never persists instrument records.
#[derive(Debug, Default)]
pub struct SymbolResolver {
    /// (exchange, native id, kind) -> resolved symbol. Kind is part of the
    /// key: Binance reuses the same native symbol string for spot and the
    /// USDT-margined perpetual, and both listings are legitimate.
    listings: DashMap<(ExchangeId, String, InstrumentKind), CanonicalSymbol>,
    /// All canonical symbols ever registered, keyed by identity.
    symbols: DashMap<CanonicalSymbol, ()>,
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw descriptor to its canonical symbol, registering the
    /// symbol and listing on first sight.
    pub fn resolve(
        &self,
        exchange: &ExchangeId,
        raw: &RawInstrumentDescriptor,
    ) -> Result<CanonicalSymbol, ResolveError> {
        let kind = InstrumentKind::from_token(&raw.kind).ok_or_else(|| {
            ResolveError::UnsupportedKind {
                native_id: raw.native_id.clone(),
                kind: raw.kind.clone(),
            }
        })?;

        let base = Asset::new(&raw.base);
        let quote = Asset::new(&raw.quote);
        let designator = match kind {
            InstrumentKind::Spot => None,
            _ => raw
                .settle
                .as_deref()
                .map(Asset::new)
                .or_else(|| CanonicalSymbol::default_settle(&base, &quote, kind)),
        };

        let symbol = CanonicalSymbol {
            base,
            quote,
            kind,
            designator,
        };

        let listing_key = (exchange.clone(), raw.native_id.clone(), kind);
        if let Some(existing) = self.listings.get(&listing_key) {
            // The same (native id, kind) implying a different base/quote/
            // designator is the exact bug class canonical resolution exists
            // to catch.
            if *existing != symbol {
                return Err(ResolveError::AmbiguousMapping {
                    exchange: exchange.to_string(),
                    native_id: raw.native_id.clone(),
                    existing: existing.to_string(),
                    incoming: symbol.to_string(),
                });
            }
            return Ok(symbol);
        }

        self.symbols.entry(symbol.clone()).or_insert(());
        self.listings.insert(listing_key, symbol.clone());
        Ok(symbol)
    }

    /// Number of distinct canonical symbols registered so far.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// All listings registered for one exchange.
    pub fn listings_for(&self, exchange: &ExchangeId) -> Vec<ExchangeListing> {
        self.listings
            .iter()
            .filter(|entry| &entry.key().0 == exchange)
            .map(|entry| ExchangeListing {
                exchange: entry.key().0.clone(),
                native_id: entry.key().1.clone(),
                symbol: entry.value().clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(native_id: &str, kind: &str, base: &str, quote: &str) -> RawInstrumentDescriptor {
        RawInstrumentDescriptor {
            native_id: native_id.to_string(),
            kind: kind.to_string(),
            base: base.to_string(),
            quote: quote.to_string(),
            settle: None,
            tick_size: Some("0.01".to_string()),
            lot_size: Some("0.001".to_string()),
            min_notional: Some("10".to_string()),
            max_order_size: None,
            multiplier: None,
            price_precision: None,
            qty_precision: None,
            status: "active".to_string(),
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = SymbolResolver::new();
        let binance = ExchangeId::new("binance");
        let descriptor = raw("BTCUSDT", "spot", "BTC", "USDT");

        let a = resolver.resolve(&binance, &descriptor).unwrap();
        let b = resolver.resolve(&binance, &descriptor).unwrap();
        assert_eq!(a, b);
        assert_eq!(resolver.symbol_count(), 1);
    }

    #[test]
    fn same_symbol_across_exchanges() {
        let resolver = SymbolResolver::new();
        let a = resolver
            .resolve(&ExchangeId::new("binance"), &raw("BTCUSDT", "spot", "BTC", "USDT"))
            .unwrap();
        let b = resolver
            .resolve(&ExchangeId::new("okx"), &raw("BTC-USDT", "spot", "BTC", "USDT"))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(resolver.symbol_count(), 1);
    }

    #[test]
    fn spot_and_perp_resolve_to_distinct_symbols() {
        let resolver = SymbolResolver::new();
        let okx = ExchangeId::new("okx");

        let spot = resolver
            .resolve(&okx, &raw("BTC-USDT", "spot", "BTC", "USDT"))
            .unwrap();
        let perp = resolver
            .resolve(&okx, &raw("BTC-USDT-SWAP", "perp_linear", "BTC", "USDT"))
            .unwrap();

        assert_ne!(spot, perp);
        assert_eq!(spot.underlying(), perp.underlying());
        assert_eq!(resolver.symbol_count(), 2);
    }

    #[test]
    fn unsupported_kind_is_rejected() {
        let resolver = SymbolResolver::new();
        let err = resolver
            .resolve(&ExchangeId::new("okx"), &raw("BTC-USD-240927", "futures", "BTC", "USD"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedKind { .. }));
    }

    #[test]
    fn same_native_id_across_kinds_resolves_to_both_symbols() {
        // Binance names the spot pair and the USDT-margined perpetual both
        // "BTCUSDT"; the two listings must coexist.
        let resolver = SymbolResolver::new();
        let exchange = ExchangeId::new("binance");

        let spot = resolver
            .resolve(&exchange, &raw("BTCUSDT", "spot", "BTC", "USDT"))
            .unwrap();
        let perp = resolver
            .resolve(&exchange, &raw("BTCUSDT", "perp_linear", "BTC", "USDT"))
            .unwrap();

        assert_ne!(spot, perp);
        assert_eq!(spot.kind, InstrumentKind::Spot);
        assert_eq!(perp.kind, InstrumentKind::PerpLinear);
        assert_eq!(resolver.symbol_count(), 2);

        // Re-resolving either listing stays stable.
        assert_eq!(
            resolver
                .resolve(&exchange, &raw("BTCUSDT", "spot", "BTC", "USDT"))
                .unwrap(),
            spot
        );
    }

    #[test]
    fn conflicting_identity_for_same_listing_is_ambiguous() {
        let resolver = SymbolResolver::new();
        let exchange = ExchangeId::new("binance");

        resolver
            .resolve(&exchange, &raw("BTCUSDT", "spot", "BTC", "USDT"))
            .unwrap();
        // Same (native id, kind) suddenly implying a different quote.
        let err = resolver
            .resolve(&exchange, &raw("BTCUSDT", "spot", "BTC", "USDC"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::AmbiguousMapping { .. }));
    }

    #[test]
    fn explicit_settle_overrides_default() {
        let resolver = SymbolResolver::new();
        let mut descriptor = raw("ETH-USD-SWAP", "perp_inverse", "ETH", "USD");
        descriptor.settle = Some("ETH".to_string());

        let symbol = resolver
            .resolve(&ExchangeId::new("okx"), &descriptor)
            .unwrap();
        assert_eq!(symbol.designator, Some(Asset::new("ETH")));
        assert_eq!(symbol.kind, InstrumentKind::PerpInverse);
    }

    #[test]
    fn listings_are_tracked_per_exchange() {
        let resolver = SymbolResolver::new();
        let binance = ExchangeId::new("binance");
        let okx = ExchangeId::new("okx");

        resolver.resolve(&binance, &raw("BTCUSDT", "spot", "BTC", "USDT")).unwrap();
        resolver.resolve(&binance, &raw("ETHUSDT", "spot", "ETH", "USDT")).unwrap();
        resolver.resolve(&okx, &raw("BTC-USDT", "spot", "BTC", "USDT")).unwrap();

        assert_eq!(resolver.listings_for(&binance).len(), 2);
        assert_eq!(resolver.listings_for(&okx).len(), 1);
    }
}
