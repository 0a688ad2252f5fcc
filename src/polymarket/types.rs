use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Side, Trade};

// ---------------------------------------------------------------------------
// Trade (Data API)
// ---------------------------------------------------------------------------

/// Raw trade entry from the Data API. Everything is optional and several
/// fields go by more than one name depending on the API version; `to_trade`
/// flattens it into the domain type.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiTrade {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, alias = "token_id")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub is_buy: Option<bool>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "amount")]
    pub size: Option<Decimal>,
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default, alias = "tx_hash")]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub log_index: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, alias = "market_slug")]
    pub slug: Option<String>,
}

impl ApiTrade {
    /// Flatten to the domain `Trade`. Returns None when the entry cannot be
    /// mirrored at all (no recognizable side, or no token to trade).
    pub fn to_trade(&self) -> Option<Trade> {
        let side = match self.side.as_deref() {
            Some(s) => Side::from_api_str(s),
            None => self.is_buy.map(|b| if b { Side::Buy } else { Side::Sell }),
        }?;

        let token_id = self.asset_id.clone().filter(|t| !t.is_empty())?;

        Some(Trade {
            trade_id: self
                .id
                .as_ref()
                .map(json_to_string)
                .filter(|s| !s.is_empty()),
            token_id,
            side,
            price: self.price.unwrap_or(Decimal::ZERO),
            size: self.size.unwrap_or(Decimal::ZERO),
            timestamp: parse_timestamp_secs(self.timestamp.as_ref()).unwrap_or(0),
            tx_hash: self.transaction_hash.clone().unwrap_or_default(),
            log_index: self.log_index.unwrap_or(0),
            market_title: self
                .title
                .clone()
                .or_else(|| self.market.clone())
                .unwrap_or_else(|| "Unknown market".into()),
            market_slug: self.slug.clone(),
        })
    }
}

/// The trades endpoint answers either with a bare array or with the array
/// wrapped in `{"data": [...]}` depending on API version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TradesResponse {
    Bare(Vec<ApiTrade>),
    Wrapped { data: Vec<ApiTrade> },
}

impl TradesResponse {
    pub fn into_trades(self) -> Vec<ApiTrade> {
        match self {
            TradesResponse::Bare(t) => t,
            TradesResponse::Wrapped { data } => data,
        }
    }
}

/// Seconds-since-epoch from whatever the API sent: integer, integer-valued
/// string (either may be in milliseconds), or RFC 3339 text.
pub fn parse_timestamp_secs(ts: Option<&serde_json::Value>) -> Option<i64> {
    fn from_i64(raw: i64) -> i64 {
        // >1e12 means milliseconds
        if raw > 1_000_000_000_000 {
            raw / 1000
        } else {
            raw
        }
    }

    ts.and_then(|t| match t {
        serde_json::Value::Number(n) => n.as_i64().map(from_i64),
        serde_json::Value::String(s) => {
            if let Ok(raw) = s.parse::<i64>() {
                return Some(from_i64(raw));
            }
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp())
        }
        _ => None,
    })
}

fn json_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Order Book (CLOB API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiOrderBookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiOrderBook {
    pub market: Option<String>,
    pub asset_id: Option<String>,
    #[serde(default)]
    pub bids: Vec<ApiOrderBookLevel>,
    #[serde(default)]
    pub asks: Vec<ApiOrderBookLevel>,
    pub hash: Option<String>,
    pub timestamp: Option<String>,
}

impl ApiOrderBook {
    /// Highest positive bid. Level ordering varies by API version, so scan
    /// rather than trust `bids[0]`.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids
            .iter()
            .map(|l| l.price)
            .filter(|p| *p > Decimal::ZERO)
            .max()
    }
}
