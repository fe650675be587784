//! Canonical symbology.
//!
//! A [`CanonicalSymbol`] is the system's internal, exchange-independent
//! identity for one tradable instrument. A spot pair and a perpetual on the
//! same base/quote are always distinct symbols; they share an
//! [`UnderlyingPair`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// An asset code such as `BTC` or `USDT`. Always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Asset(String);

impl Asset {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a configured exchange. Always stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument kind. Only spot and linear/inverse perpetuals are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Spot,
    PerpLinear,
    PerpInverse,
}

impl InstrumentKind {
    /// Parse the normalized kind token adapters emit.
    ///
    /// Returns `None` for kinds outside the supported set (dated futures,
    /// options, ...); the resolver turns that into an `UnsupportedKind` error.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "spot" => Some(Self::Spot),
            "perp_linear" | "linear" => Some(Self::PerpLinear),
            "perp_inverse" | "inverse" => Some(Self::PerpInverse),
            _ => None,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::PerpLinear => "perp_linear",
            Self::PerpInverse => "perp_inverse",
        }
    }

    pub fn is_perp(&self) -> bool {
        matches!(self, Self::PerpLinear | Self::PerpInverse)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

/// The base/quote pair shared by a spot instrument and any perpetuals on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnderlyingPair {
    pub base: Asset,
    pub quote: Asset,
}

impl fmt::Display for UnderlyingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Exchange-independent instrument identity.
///
/// `(base, quote, kind, designator)` uniquely determines one symbol. The
/// designator is the settlement currency for perpetuals and `None` for spot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalSymbol {
    pub base: Asset,
    pub quote: Asset,
    pub kind: InstrumentKind,
    pub designator: Option<Asset>,
}

impl CanonicalSymbol {
    pub fn spot(base: Asset, quote: Asset) -> Self {
        Self {
            base,
            quote,
            kind: InstrumentKind::Spot,
            designator: None,
        }
    }

    pub fn perp(base: Asset, quote: Asset, kind: InstrumentKind, settle: Asset) -> Self {
        debug_assert!(kind.is_perp());
        Self {
            base,
            quote,
            kind,
            designator: Some(settle),
        }
    }

    /// The underlying pair shared by every kind on this base/quote.
    pub fn underlying(&self) -> UnderlyingPair {
        UnderlyingPair {
            base: self.base.clone(),
            quote: self.quote.clone(),
        }
    }

    /// Default settlement asset for a kind: linear perps settle in the quote,
    /// inverse perps in the base.
    pub fn default_settle(base: &Asset, quote: &Asset, kind: InstrumentKind) -> Option<Asset> {
        match kind {
            InstrumentKind::Spot => None,
            InstrumentKind::PerpLinear => Some(quote.clone()),
            InstrumentKind::PerpInverse => Some(base.clone()),
        }
    }
}

impl fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InstrumentKind::Spot => write!(f, "{}-{}", self.base, self.quote),
            InstrumentKind::PerpLinear => {
                write!(f, "{}-{}-PERP", self.base, self.quote)?;
                self.fmt_designator(f, &self.quote)
            }
            InstrumentKind::PerpInverse => {
                write!(f, "{}-{}-IPERP", self.base, self.quote)?;
                self.fmt_designator(f, &self.base)
            }
        }
    }
}

impl CanonicalSymbol {
    // The designator suffix only appears when it differs from the kind's
    // default settlement asset, keeping common symbols short.
    fn fmt_designator(&self, f: &mut fmt::Formatter<'_>, default: &Asset) -> fmt::Result {
        match &self.designator {
            Some(d) if d != default => write!(f, ".{d}"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_normalizes_case() {
        assert_eq!(Asset::new(" btc ").as_str(), "BTC");
        assert_eq!(ExchangeId::new("Binance").as_str(), "binance");
    }

    #[test]
    fn kind_token_roundtrip() {
        for kind in [
            InstrumentKind::Spot,
            InstrumentKind::PerpLinear,
            InstrumentKind::PerpInverse,
        ] {
            assert_eq!(InstrumentKind::from_token(kind.as_token()), Some(kind));
        }
        assert_eq!(InstrumentKind::from_token("futures"), None);
        assert_eq!(InstrumentKind::from_token("option"), None);
    }

    #[test]
    fn spot_and_perp_are_distinct_identities() {
        let base = Asset::new("BTC");
        let quote = Asset::new("USDT");
        let spot = CanonicalSymbol::spot(base.clone(), quote.clone());
        let perp = CanonicalSymbol::perp(
            base.clone(),
            quote.clone(),
            InstrumentKind::PerpLinear,
            quote.clone(),
        );

        assert_ne!(spot, perp);
        assert_eq!(spot.underlying(), perp.underlying());
    }

    #[test]
    fn display_formats() {
        let btc = Asset::new("BTC");
        let usdt = Asset::new("USDT");
        let usd = Asset::new("USD");

        let spot = CanonicalSymbol::spot(btc.clone(), usdt.clone());
        assert_eq!(spot.to_string(), "BTC-USDT");

        let linear =
            CanonicalSymbol::perp(btc.clone(), usdt.clone(), InstrumentKind::PerpLinear, usdt);
        assert_eq!(linear.to_string(), "BTC-USDT-PERP");

        let inverse =
            CanonicalSymbol::perp(btc.clone(), usd.clone(), InstrumentKind::PerpInverse, btc);
        assert_eq!(inverse.to_string(), "BTC-USD-IPERP");

        // Off-default settlement is made visible.
        let odd = CanonicalSymbol::perp(
            Asset::new("ETH"),
            Asset::new("USD"),
            InstrumentKind::PerpLinear,
            Asset::new("USDC"),
        );
        assert_eq!(odd.to_string(), "ETH-USD-PERP.USDC");
    }
}
