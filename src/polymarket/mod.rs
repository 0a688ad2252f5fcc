pub mod data_client;
pub mod session;
pub mod types;

pub use data_client::DataClient;
pub use session::{ApiCredentials, ClobSession, StaticSessionResolver};
pub use types::{ApiOrderBook, ApiTrade};

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{Side, Trade};

// ---------------------------------------------------------------------------
// Exchange seams
//
// The poll loop and the mirror executor only ever talk to these traits; the
// REST clients below implement them for production and the tests substitute
// recorders.
// ---------------------------------------------------------------------------

/// Read side of the exchange: recent fills for any wallet.
#[async_trait]
pub trait TradeFeed: Send + Sync {
    /// Newest-first, best-effort up to `limit` entries. Transport errors and
    /// unparseable batches surface as an empty list (logged by the
    /// implementation), so a flaky feed looks like a quiet wallet for one
    /// cycle rather than an error to handle.
    async fn recent_trades(&self, wallet: &str, limit: u32) -> Vec<Trade>;
}

/// One subscriber's authenticated trading surface.
#[async_trait]
pub trait TradingSession: Send + Sync {
    /// Best bid for an outcome token, None when the book has no bids.
    async fn best_bid(&self, token_id: &str) -> anyhow::Result<Option<Decimal>>;

    /// Submit a fill-or-kill market order. `amount` is quote currency (USDC)
    /// for BUY and shares for SELL. Rejection and transport failure are both
    /// `Err`; `Ok` means the venue acknowledged a fill.
    async fn submit_market_order(
        &self,
        token_id: &str,
        side: Side,
        amount: Decimal,
    ) -> anyhow::Result<()>;
}

/// Maps a subscriber identity to their own trading session, if they have a
/// linked account.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, subscriber_id: i64) -> Option<Arc<dyn TradingSession>>;
}
