use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Side;

// ---------------------------------------------------------------------------
// Trade: one observed source-wallet fill
// ---------------------------------------------------------------------------

/// A trade observed on a source wallet, immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Venue-assigned id; sometimes absent, never used for ordering.
    pub trade_id: Option<String>,
    /// Outcome token that was traded.
    pub token_id: String,
    pub side: Side,
    /// Share price in (0, 1).
    pub price: Decimal,
    /// Shares transacted.
    pub size: Decimal,
    /// Unix seconds; primary ordering key.
    pub timestamp: i64,
    /// On-chain transaction; secondary ordering key.
    pub tx_hash: String,
    /// Position within the transaction, 0 when the feed omits it.
    pub log_index: i64,
    pub market_title: String,
    pub market_slug: Option<String>,
}

impl Trade {
    /// Economic value of the fill in quote currency (USDC).
    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }

    pub fn position(&self) -> TradePosition {
        TradePosition {
            timestamp: self.timestamp,
            tx_hash: self.tx_hash.clone(),
            log_index: self.log_index,
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: side={} size={} price={} tx={} ts={}",
            self.side,
            self.size,
            self.price,
            self.tx_hash.get(..10).unwrap_or(&self.tx_hash),
            self.timestamp,
        )
    }
}

// ---------------------------------------------------------------------------
// TradePosition: the durable cursor value
// ---------------------------------------------------------------------------

/// Where a subscription stands in a source wallet's trade stream: the
/// position of the last trade successfully mirrored.
///
/// The derived `Ord` compares `timestamp`, then `tx_hash` lexicographically,
/// then `log_index`. Hash comparison carries no temporal meaning but breaks
/// same-second ties deterministically, which is all the dedup filter needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradePosition {
    pub timestamp: i64,
    pub tx_hash: String,
    pub log_index: i64,
}

impl TradePosition {
    pub fn new(timestamp: i64, tx_hash: impl Into<String>, log_index: i64) -> Self {
        Self {
            timestamp,
            tx_hash: tx_hash.into(),
            log_index,
        }
    }

    /// Start-of-stream marker: every real trade sorts after it.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Cursor for "copy from this moment forward": trades before `now_secs`
    /// (and the empty-hash marker itself) are considered already seen. A
    /// same-second trade carries a real tx hash, sorts after the marker,
    /// and is picked up.
    pub fn at_time(now_secs: i64) -> Self {
        Self {
            timestamp: now_secs,
            tx_hash: String::new(),
            log_index: 0,
        }
    }
}

impl fmt::Display for TradePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.timestamp,
            self.tx_hash.get(..10).unwrap_or(&self.tx_hash),
            self.log_index
        )
    }
}
