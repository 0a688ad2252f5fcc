use std::sync::Arc;

use metrics::counter;
use rust_decimal::Decimal;

use crate::models::{CopySubscription, MirrorResult, Side, Trade};
use crate::polymarket::SessionResolver;

/// Replicates one source trade into one subscriber's account at the
/// subscription's scale factor.
///
/// One order-placement call per attempt, no internal retries: a failed
/// mirror leaves the cursor behind and the next poll cycle re-presents the
/// same trade.
pub struct MirrorExecutor {
    resolver: Arc<dyn SessionResolver>,
    min_notional: Decimal,
    dry_run: bool,
}

impl MirrorExecutor {
    pub fn new(resolver: Arc<dyn SessionResolver>, min_notional: Decimal, dry_run: bool) -> Self {
        Self {
            resolver,
            min_notional,
            dry_run,
        }
    }

    /// Attempt one mirror:
    /// 1. Scale the source notional by the subscription factor
    /// 2. Below the minimum viable order, skip (counts as success)
    /// 3. In dry-run, report the mirror executed without touching the venue
    /// 4. Resolve the subscriber's trading session
    /// 5. BUY spends the scaled notional in quote currency
    /// 6. SELL converts the scaled notional to shares at the best bid
    pub async fn mirror(&self, subscription: &CopySubscription, trade: &Trade) -> MirrorResult {
        // 1. Scale
        let scaled_notional = trade.notional() * subscription.scale_factor;

        // 2. Minimum-notional floor. Checked before session resolution so a
        //    dust trade never stalls a subscriber with a broken account.
        if scaled_notional < self.min_notional {
            counter!("mirrors_skipped").increment(1);
            tracing::info!(
                subscriber = subscription.subscriber_id,
                wallet = %subscription.source_wallet,
                scaled = %scaled_notional,
                floor = %self.min_notional,
                "Scaled notional below minimum, skipping mirror"
            );
            return MirrorResult::skipped(
                trade,
                subscription,
                format!(
                    "scaled notional {} below minimum {}",
                    scaled_notional.round_dp(4),
                    self.min_notional
                ),
            );
        }

        // 3. Dry-run rehearses against the live feed with no sessions
        //    configured, so it must short-circuit before resolution. SELLs
        //    report the scaled notional; the bid conversion needs a session.
        if self.dry_run {
            counter!("mirrors_executed").increment(1);
            tracing::info!(
                subscriber = subscription.subscriber_id,
                token = %trade.token_id,
                side = %trade.side,
                notional = %scaled_notional,
                "[DRY-RUN] Would submit market order"
            );
            return MirrorResult::executed(trade, subscription, scaled_notional);
        }

        // 4. Resolve the subscriber's own session
        let session = match self.resolver.resolve(subscription.subscriber_id).await {
            Some(s) => s,
            None => {
                counter!("mirrors_failed").increment(1);
                tracing::warn!(
                    subscriber = subscription.subscriber_id,
                    wallet = %subscription.source_wallet,
                    "No trading session for subscriber"
                );
                return MirrorResult::failed(trade, subscription, "client not available");
            }
        };

        // 5/6. BUY is denominated in quote currency, SELL in shares
        let amount = match trade.side {
            Side::Buy => scaled_notional,
            Side::Sell => {
                let bid = match session.best_bid(&trade.token_id).await {
                    Ok(Some(b)) if b > Decimal::ZERO => b,
                    Ok(_) => {
                        counter!("mirrors_failed").increment(1);
                        return MirrorResult::failed(
                            trade,
                            subscription,
                            format!("no bid available for token {}", trade.token_id),
                        );
                    }
                    Err(e) => {
                        counter!("mirrors_failed").increment(1);
                        return MirrorResult::failed(
                            trade,
                            subscription,
                            format!("best bid lookup failed: {e}"),
                        );
                    }
                };
                scaled_notional / bid
            }
        };

        // 7. Submission errors fail the mirror; the cursor stays put
        match session
            .submit_market_order(&trade.token_id, trade.side, amount)
            .await
        {
            Ok(()) => {
                counter!("mirrors_executed").increment(1);
                tracing::info!(
                    subscriber = subscription.subscriber_id,
                    wallet = %subscription.source_wallet,
                    side = %trade.side,
                    notional = %scaled_notional,
                    amount = %amount,
                    "Mirror executed"
                );
                MirrorResult::executed(trade, subscription, scaled_notional)
            }
            Err(e) => {
                counter!("mirrors_failed").increment(1);
                tracing::error!(
                    subscriber = subscription.subscriber_id,
                    wallet = %subscription.source_wallet,
                    side = %trade.side,
                    error = %e,
                    "Mirror submission failed"
                );
                MirrorResult::failed(trade, subscription, e.to_string())
            }
        }
    }
}
