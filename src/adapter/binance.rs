//! Binance reference-data adapter.
//!
//! Reads `exchangeInfo` from the spot API and the USD(T)-margined futures
//! API. Constraint values are taken from the symbol filter list
//! (`PRICE_FILTER`, `LOT_SIZE`, `NOTIONAL`/`MIN_NOTIONAL`) and passed through
//! as strings.

use async_trait::async_trait;
use serde::Deserialize;

use super::SymbolFilter;
use crate::domain::{ExchangeId, RawInstrumentDescriptor};
use crate::error::AdapterError;
use crate::port::adapter::ExchangeAdapter;

pub const SPOT_URL: &str = "https://api.binance.com/api/v3/exchangeInfo";
pub const FUTURES_URL: &str = "https://fapi.binance.com/fapi/v1/exchangeInfo";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    /// Futures only; spot omits it.
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    price_precision: Option<u32>,
    #[serde(default)]
    quantity_precision: Option<u32>,
    filters: Vec<Filter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum Filter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price { tick_size: String },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    Lot {
        step_size: String,
        #[serde(default)]
        max_qty: Option<String>,
    },
    // Spot and futures spell the notional floor differently.
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { notional: String },
    #[serde(other)]
    Other,
}

/// Binance adapter covering spot and linear perpetuals.
pub struct BinanceAdapter {
    exchange: ExchangeId,
    client: reqwest::Client,
    spot_url: String,
    futures_url: String,
    filter: SymbolFilter,
}

impl BinanceAdapter {
    pub fn new(client: reqwest::Client, filter: SymbolFilter) -> Self {
        Self::with_urls(client, filter, SPOT_URL, FUTURES_URL)
    }

    pub fn with_urls(
        client: reqwest::Client,
        filter: SymbolFilter,
        spot_url: impl Into<String>,
        futures_url: impl Into<String>,
    ) -> Self {
        Self {
            exchange: ExchangeId::new("binance"),
            client,
            spot_url: spot_url.into(),
            futures_url: futures_url.into(),
            filter,
        }
    }

    async fn fetch(&self, url: &str) -> Result<ExchangeInfo, AdapterError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AdapterError::from_http)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited);
        }
        let response = response
            .error_for_status()
            .map_err(AdapterError::from_http)?;

        response
            .json::<ExchangeInfo>()
            .await
            .map_err(|e| AdapterError::MalformedResponse(e.to_string()))
    }

    fn descriptors(&self, info: ExchangeInfo, perp: bool) -> Vec<RawInstrumentDescriptor> {
        info.symbols
            .into_iter()
            .filter(|s| {
                self.filter
                    .admits(&format!("{}{}", s.base_asset, s.quote_asset))
            })
            .filter_map(|s| descriptor_from(s, perp))
            .collect()
    }
}

fn descriptor_from(symbol: SymbolInfo, perp: bool) -> Option<RawInstrumentDescriptor> {
    let kind = if perp {
        // Dated futures share the endpoint; only perpetuals are supported
        // and anything else keeps its native token for the resolver to
        // reject visibly.
        match symbol.contract_type.as_deref() {
            Some("PERPETUAL") => "perp_linear".to_string(),
            Some(other) => other.to_lowercase(),
            None => return None,
        }
    } else {
        "spot".to_string()
    };

    let mut tick_size = None;
    let mut lot_size = None;
    let mut max_order_size = None;
    let mut min_notional = None;

    for filter in symbol.filters {
        match filter {
            Filter::Price { tick_size: t } => tick_size = Some(t),
            Filter::Lot { step_size, max_qty } => {
                lot_size = Some(step_size);
                max_order_size = max_qty;
            }
            Filter::Notional { min_notional: m } | Filter::MinNotional { notional: m } => {
                min_notional = Some(m);
            }
            Filter::Other => {}
        }
    }

    // Only terminal statuses delist; anything unrecognized (pre-listing
    // states, new status tokens) suspends so trading is blocked without
    // declaring the instrument gone.
    let status = match symbol.status.as_str() {
        "TRADING" => "active",
        "CLOSE" | "DELIVERED" | "DELISTED" => "delisted",
        _ => "suspended",
    };

    Some(RawInstrumentDescriptor {
        native_id: symbol.symbol,
        kind,
        base: symbol.base_asset,
        quote: symbol.quote_asset,
        settle: None,
        tick_size,
        lot_size,
        min_notional,
        max_order_size,
        multiplier: None,
        price_precision: symbol.price_precision,
        qty_precision: symbol.quantity_precision,
        status: status.to_string(),
    })
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    async fn list_instruments(&self) -> Result<Vec<RawInstrumentDescriptor>, AdapterError> {
        let spot = self.fetch(&self.spot_url).await?;
        let futures = self.fetch(&self.futures_url).await?;

        let mut out = self.descriptors(spot, false);
        out.extend(self.descriptors(futures, true));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOT_PAYLOAD: &str = r#"{
        "symbols": [
            {
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.01000000", "minPrice": "0.01"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.00001000", "maxQty": "9000.00000000"},
                    {"filterType": "NOTIONAL", "minNotional": "5.00000000"},
                    {"filterType": "ICEBERG_PARTS", "limit": 10}
                ]
            },
            {
                "symbol": "ETHUSDT",
                "status": "BREAK",
                "baseAsset": "ETH",
                "quoteAsset": "USDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.0001"}
                ]
            }
        ]
    }"#;

    const FUTURES_PAYLOAD: &str = r#"{
        "symbols": [
            {
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "contractType": "PERPETUAL",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "pricePrecision": 2,
                "quantityPrecision": 3,
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.001", "maxQty": "1000"},
                    {"filterType": "MIN_NOTIONAL", "notional": "100"}
                ]
            },
            {
                "symbol": "BTCUSDT_260626",
                "status": "TRADING",
                "contractType": "CURRENT_QUARTER",
                "baseAsset": "BTC",
                "quoteAsset": "USDT",
                "filters": []
            }
        ]
    }"#;

    fn adapter() -> BinanceAdapter {
        BinanceAdapter::new(reqwest::Client::new(), SymbolFilter::default())
    }

    #[test]
    fn spot_payload_parses_filters() {
        let info: ExchangeInfo = serde_json::from_str(SPOT_PAYLOAD).unwrap();
        let descriptors = adapter().descriptors(info, false);

        assert_eq!(descriptors.len(), 2);
        let btc = &descriptors[0];
        assert_eq!(btc.native_id, "BTCUSDT");
        assert_eq!(btc.kind, "spot");
        assert_eq!(btc.tick_size.as_deref(), Some("0.01000000"));
        assert_eq!(btc.lot_size.as_deref(), Some("0.00001000"));
        assert_eq!(btc.min_notional.as_deref(), Some("5.00000000"));
        assert_eq!(btc.max_order_size.as_deref(), Some("9000.00000000"));
        assert_eq!(btc.status, "active");

        // BREAK maps to suspended.
        assert_eq!(descriptors[1].status, "suspended");
    }

    #[test]
    fn futures_payload_keeps_only_perpetuals_as_supported_kind() {
        let info: ExchangeInfo = serde_json::from_str(FUTURES_PAYLOAD).unwrap();
        let descriptors = adapter().descriptors(info, true);

        assert_eq!(descriptors.len(), 2);
        let perp = &descriptors[0];
        assert_eq!(perp.kind, "perp_linear");
        assert_eq!(perp.min_notional.as_deref(), Some("100"));
        assert_eq!(perp.price_precision, Some(2));
        assert_eq!(perp.qty_precision, Some(3));

        // Dated future keeps its native kind token; the resolver rejects it
        // as unsupported rather than the adapter dropping it silently.
        assert_eq!(descriptors[1].kind, "current_quarter");
    }

    #[test]
    fn pre_listing_status_suspends_rather_than_delists() {
        const PAYLOAD: &str = r#"{
            "symbols": [
                {
                    "symbol": "SOLUSDT",
                    "status": "PENDING_TRADING",
                    "baseAsset": "SOL",
                    "quoteAsset": "USDT",
                    "filters": [
                        {"filterType": "PRICE_FILTER", "tickSize": "0.001"},
                        {"filterType": "LOT_SIZE", "stepSize": "0.01"}
                    ]
                },
                {
                    "symbol": "LUNAUSDT",
                    "status": "CLOSE",
                    "baseAsset": "LUNA",
                    "quoteAsset": "USDT",
                    "filters": []
                }
            ]
        }"#;

        let info: ExchangeInfo = serde_json::from_str(PAYLOAD).unwrap();
        let descriptors = adapter().descriptors(info, false);
        assert_eq!(descriptors[0].status, "suspended");
        assert_eq!(descriptors[1].status, "delisted");
    }

    #[test]
    fn allowlist_filters_by_base_quote() {
        let info: ExchangeInfo = serde_json::from_str(SPOT_PAYLOAD).unwrap();
        let adapter =
            BinanceAdapter::new(reqwest::Client::new(), SymbolFilter::new(["BTCUSDT"]));
        let descriptors = adapter.descriptors(info, false);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].native_id, "BTCUSDT");
    }
}
