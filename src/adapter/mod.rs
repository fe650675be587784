//! Concrete exchange adapters.

pub mod binance;
pub mod fixture;
pub mod okx;

pub use binance::BinanceAdapter;
pub use fixture::StaticAdapter;
pub use okx::OkxAdapter;

/// An optional allowlist of exchange-native symbols.
///
/// Identifiers are compared with separators stripped so `BTC-USDT` on one
/// exchange and `BTCUSDT` on another match the same entry.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    normalized: Vec<String>,
}

impl SymbolFilter {
    /// Build from configured symbol names. An empty list admits everything.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            normalized: symbols
                .into_iter()
                .map(|s| normalize_native(s.as_ref()))
                .collect(),
        }
    }

    pub fn admits(&self, native_id: &str) -> bool {
        self.normalized.is_empty() || self.normalized.contains(&normalize_native(native_id))
    }
}

fn normalize_native(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}
