use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradePosition;

/// One (subscriber, source wallet) copy relationship.
///
/// Uniquely keyed by `(subscriber_id, source_wallet)`; the wallet is held
/// lower-cased so identity comparisons are case-insensitive. The registry
/// owns these rows; the poll loop only ever works on snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopySubscription {
    /// Subscriber identity; doubles as their notification chat id.
    pub subscriber_id: i64,
    pub source_wallet: String,
    pub display_name: String,
    /// Multiplier applied to source notional, positive and typically <= 1.
    pub scale_factor: Decimal,
    pub enabled: bool,
    /// Unix seconds at subscribe time.
    pub created_at: i64,
    /// Last trade successfully mirrored for this pair.
    pub cursor: TradePosition,
}

impl CopySubscription {
    /// Fresh subscription copying from `now_secs` forward. The cursor starts
    /// at the subscribe instant so the visible fetch window is never
    /// replayed as a backlog.
    pub fn new(
        subscriber_id: i64,
        source_wallet: &str,
        display_name: &str,
        scale_factor: Decimal,
        now_secs: i64,
    ) -> Self {
        Self {
            subscriber_id,
            source_wallet: source_wallet.trim().to_lowercase(),
            display_name: display_name.to_string(),
            scale_factor,
            enabled: true,
            created_at: now_secs,
            cursor: TradePosition::at_time(now_secs),
        }
    }
}
