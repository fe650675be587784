//! OKX reference-data adapter.
//!
//! Reads `/api/v5/public/instruments` for `SPOT` and `SWAP`. Swap contract
//! direction comes from `ctType` (`linear`/`inverse`); the base/quote of a
//! swap is parsed from its underlying (`uly`) since `baseCcy`/`quoteCcy` are
//! only populated for spot.

use async_trait::async_trait;
use serde::Deserialize;

use super::SymbolFilter;
use crate::domain::{ExchangeId, RawInstrumentDescriptor};
use crate::error::AdapterError;
use crate::port::adapter::ExchangeAdapter;

pub const BASE_URL: &str = "https://www.okx.com";

#[derive(Debug, Deserialize)]
struct Response {
    code: String,
    #[serde(default)]
    msg: String,
    data: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    inst_id: String,
    inst_type: String,
    #[serde(default)]
    base_ccy: String,
    #[serde(default)]
    quote_ccy: String,
    #[serde(default)]
    settle_ccy: String,
    #[serde(default)]
    ct_val: String,
    #[serde(default)]
    ct_type: String,
    #[serde(default)]
    uly: String,
    tick_sz: String,
    lot_sz: String,
    #[serde(default)]
    max_lmt_sz: String,
    state: String,
}

/// OKX adapter covering spot and linear/inverse perpetual swaps.
pub struct OkxAdapter {
    exchange: ExchangeId,
    client: reqwest::Client,
    base_url: String,
    filter: SymbolFilter,
}

impl OkxAdapter {
    pub fn new(client: reqwest::Client, filter: SymbolFilter) -> Self {
        Self::with_base_url(client, filter, BASE_URL)
    }

    pub fn with_base_url(
        client: reqwest::Client,
        filter: SymbolFilter,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            exchange: ExchangeId::new("okx"),
            client,
            base_url: base_url.into(),
            filter,
        }
    }

    async fn fetch(&self, inst_type: &str) -> Result<Vec<Instrument>, AdapterError> {
        let url = format!(
            "{}/api/v5/public/instruments?instType={inst_type}",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AdapterError::from_http)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited);
        }
        let response = response
            .error_for_status()
            .map_err(AdapterError::from_http)?;

        let body: Response = response
            .json()
            .await
            .map_err(|e| AdapterError::MalformedResponse(e.to_string()))?;

        // OKX wraps errors in a 200 response with a non-zero code.
        if body.code != "0" {
            return Err(AdapterError::MalformedResponse(format!(
                "okx error code {}: {}",
                body.code, body.msg
            )));
        }

        Ok(body.data)
    }

    fn descriptors(&self, instruments: Vec<Instrument>) -> Vec<RawInstrumentDescriptor> {
        instruments
            .into_iter()
            .filter_map(descriptor_from)
            .filter(|d| self.filter.admits(&format!("{}{}", d.base, d.quote)))
            .collect()
    }
}

fn descriptor_from(inst: Instrument) -> Option<RawInstrumentDescriptor> {
    let (kind, base, quote, multiplier) = match inst.inst_type.as_str() {
        "SPOT" => (
            "spot".to_string(),
            inst.base_ccy.clone(),
            inst.quote_ccy.clone(),
            None,
        ),
        "SWAP" => {
            // Underlying is `BASE-QUOTE`.
            let (base, quote) = inst.uly.split_once('-')?;
            let kind = match inst.ct_type.as_str() {
                "linear" => "perp_linear".to_string(),
                "inverse" => "perp_inverse".to_string(),
                other => other.to_string(),
            };
            let multiplier = (!inst.ct_val.is_empty()).then(|| inst.ct_val.clone());
            (kind, base.to_string(), quote.to_string(), multiplier)
        }
        // Dated futures and options are fetched by other instType values we
        // never request.
        _ => return None,
    };

    let status = match inst.state.as_str() {
        "live" => "active",
        "suspend" | "preopen" | "test" => "suspended",
        _ => "delisted",
    };

    Some(RawInstrumentDescriptor {
        native_id: inst.inst_id,
        kind,
        base,
        quote,
        settle: (!inst.settle_ccy.is_empty()).then(|| inst.settle_ccy.clone()),
        tick_size: Some(inst.tick_sz),
        lot_size: Some(inst.lot_sz),
        // OKX enforces a minimum size in units, not a notional floor.
        min_notional: None,
        max_order_size: (!inst.max_lmt_sz.is_empty()).then(|| inst.max_lmt_sz.clone()),
        multiplier,
        price_precision: None,
        qty_precision: None,
        status: status.to_string(),
    })
}

#[async_trait]
impl ExchangeAdapter for OkxAdapter {
    fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    async fn list_instruments(&self) -> Result<Vec<RawInstrumentDescriptor>, AdapterError> {
        let spot = self.fetch("SPOT").await?;
        let swaps = self.fetch("SWAP").await?;

        let mut out = self.descriptors(spot);
        out.extend(self.descriptors(swaps));
        Ok(out)
    }
}
