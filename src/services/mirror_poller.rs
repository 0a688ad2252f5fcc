use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use metrics::{counter, gauge, histogram};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::db::subscription_repo;
use crate::execution::{select_new, MirrorExecutor};
use crate::models::{CopySubscription, MirrorOutcome, Trade};
use crate::polymarket::TradeFeed;
use crate::services::notifier::{self, Notifier};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Floor on inter-cycle sleep so a slow sweep never busy-loops.
    pub min_sleep: Duration,
    pub fetch_limit: u32,
    pub heartbeat_interval: Duration,
}

/// Counts from one sweep over all enabled subscriptions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepStats {
    pub subscriptions: usize,
    pub wallets: usize,
    pub trades_fetched: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Poll source wallets and mirror new trades into subscriber accounts.
///
/// Flow, once per cycle:
/// 1. Snapshot enabled subscriptions and group them by source wallet
/// 2. Fetch each distinct wallet's recent trades once
/// 3. Per subscription, replay trades past its cursor oldest-first
/// 4. Persist the cursor after every successful mirror
/// 5. Sleep `max(min_sleep, interval - elapsed)` to hold the cadence
///
/// Failures inside one wallet or one subscription never escape the loop.
pub async fn run_mirror_poller(
    pool: SqlitePool,
    feed: Arc<dyn TradeFeed>,
    executor: MirrorExecutor,
    notifier: Option<Arc<dyn Notifier>>,
    config: PollerConfig,
    pause_flag: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        fetch_limit = config.fetch_limit,
        "Mirror poller started"
    );

    let mut cycles: u64 = 0;
    let mut last_heartbeat = Instant::now();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let started = Instant::now();

        if pause_flag.load(Ordering::Relaxed) {
            tracing::debug!("Mirror poller paused, skipping cycle");
        } else {
            match sweep(
                &pool,
                feed.as_ref(),
                &executor,
                notifier.as_deref(),
                config.fetch_limit,
                Some(&shutdown_rx),
            )
            .await
            {
                Ok(stats) => {
                    cycles += 1;
                    counter!("poll_cycles_total").increment(1);
                    histogram!("sweep_duration_seconds").record(started.elapsed().as_secs_f64());
                    if stats.executed + stats.skipped + stats.failed > 0 {
                        tracing::info!(
                            wallets = stats.wallets,
                            executed = stats.executed,
                            skipped = stats.skipped,
                            failed = stats.failed,
                            "Mirror sweep completed"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Mirror sweep failed");
                }
            }
        }

        if let Some(n) = &notifier {
            if last_heartbeat.elapsed() >= config.heartbeat_interval {
                let enabled = subscription_repo::list_enabled(&pool)
                    .await
                    .map(|subs| subs.len())
                    .unwrap_or(0);
                n.notify_ops(&notifier::format_heartbeat(cycles, enabled)).await;
                counter!("heartbeats_sent").increment(1);
                last_heartbeat = Instant::now();
            }
        }

        let sleep_for = config
            .interval
            .saturating_sub(started.elapsed())
            .max(config.min_sleep);

        tokio::select! {
            _ = sleep(sleep_for) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!(cycles, "Mirror poller stopped");
}

/// One full pass over every enabled subscription.
///
/// Public so the cycle semantics can be driven directly in tests. When
/// `shutdown` flips mid-sweep the in-flight mirror attempt completes and the
/// remainder of the sweep is abandoned.
pub async fn sweep(
    pool: &SqlitePool,
    feed: &dyn TradeFeed,
    executor: &MirrorExecutor,
    notifier: Option<&dyn Notifier>,
    fetch_limit: u32,
    shutdown: Option<&watch::Receiver<bool>>,
) -> anyhow::Result<SweepStats> {
    let mut stats = SweepStats::default();

    // 1. Snapshot enabled subscriptions, grouped by source wallet so a
    //    wallet copied by many subscribers is fetched once
    let subscriptions = subscription_repo::list_enabled(pool).await?;
    gauge!("enabled_subscriptions").set(subscriptions.len() as f64);
    stats.subscriptions = subscriptions.len();

    if subscriptions.is_empty() {
        return Ok(stats);
    }

    let mut groups: HashMap<String, Vec<CopySubscription>> = HashMap::new();
    for sub in subscriptions {
        groups.entry(sub.source_wallet.clone()).or_default().push(sub);
    }
    stats.wallets = groups.len();

    // 2. Fetch distinct wallets concurrently; wallets are independent
    let wallets: Vec<String> = groups.keys().cloned().collect();
    let batches = join_all(
        wallets
            .iter()
            .map(|wallet| feed.recent_trades(wallet, fetch_limit)),
    )
    .await;

    let mut trades_by_wallet: HashMap<String, Vec<Trade>> =
        wallets.into_iter().zip(batches).collect();

    stats.trades_fetched = trades_by_wallet.values().map(Vec::len).sum();
    counter!("trades_fetched_total").increment(stats.trades_fetched as u64);

    // 3. Replay per subscription, oldest-first
    for (wallet, subs) in groups {
        let batch = match trades_by_wallet.remove(&wallet) {
            Some(b) => b,
            None => continue,
        };

        for sub in subs {
            process_subscription(pool, executor, notifier, &sub, &batch, shutdown, &mut stats)
                .await;

            if shutdown_requested(shutdown) {
                tracing::info!("Shutdown requested, abandoning sweep");
                return Ok(stats);
            }
        }
    }

    Ok(stats)
}

/// Mirror every trade past `sub`'s cursor, advancing the cursor after each
/// success. Stops at the first failure so the failed trade and everything
/// behind it are re-presented next cycle in order. Also stops when the
/// store rejects a cursor write: the subscription was reset or removed
/// mid-sweep and this snapshot no longer speaks for it.
async fn process_subscription(
    pool: &SqlitePool,
    executor: &MirrorExecutor,
    notifier: Option<&dyn Notifier>,
    sub: &CopySubscription,
    batch: &[Trade],
    shutdown: Option<&watch::Receiver<bool>>,
    stats: &mut SweepStats,
) {
    let fresh = select_new(batch, &sub.cursor);
    if fresh.is_empty() {
        return;
    }

    tracing::info!(
        subscriber = sub.subscriber_id,
        wallet = %sub.source_wallet,
        new_trades = fresh.len(),
        "New source trades detected"
    );

    for trade in fresh {
        let result = executor.mirror(sub, trade).await;

        match &result.outcome {
            MirrorOutcome::Executed { .. } => stats.executed += 1,
            MirrorOutcome::Skipped { .. } => stats.skipped += 1,
            MirrorOutcome::Failed { .. } => stats.failed += 1,
        }

        let mut snapshot_stale = false;
        if result.success() {
            // 4. Persist immediately; a later crash must never lose a
            //    confirmed mirror. A failed write leaves durable state
            //    behind memory until the next successful write, which on
            //    restart means the trade may mirror twice. A rejected write
            //    means the stored cursor moved ahead concurrently (a
            //    re-subscribe reseeds it at now, an unsubscribe removes it);
            //    the rest of this backlog no longer belongs to the snapshot.
            let position = trade.position();
            match subscription_repo::set_cursor(
                pool,
                sub.subscriber_id,
                &sub.source_wallet,
                &position,
            )
            .await
            {
                Ok(true) => {}
                Ok(false) => {
                    snapshot_stale = true;
                    counter!("cursor_writes_superseded").increment(1);
                    tracing::warn!(
                        subscriber = sub.subscriber_id,
                        wallet = %sub.source_wallet,
                        position = %position,
                        "Cursor write superseded by a concurrent reset, abandoning replay"
                    );
                }
                Err(e) => {
                    counter!("cursor_persist_failures").increment(1);
                    tracing::error!(
                        error = %e,
                        subscriber = sub.subscriber_id,
                        wallet = %sub.source_wallet,
                        position = %position,
                        "Cursor persist failed"
                    );
                }
            }
        }

        if let Some(n) = notifier {
            n.notify_subscriber(sub.subscriber_id, &notifier::format_mirror_result(&result))
                .await;
        }

        if snapshot_stale {
            return;
        }

        if !result.success() {
            tracing::warn!(
                subscriber = sub.subscriber_id,
                wallet = %sub.source_wallet,
                error = result.error_text().unwrap_or("unknown"),
                "Mirror failed, deferring remaining trades to next cycle"
            );
            return;
        }

        if shutdown_requested(shutdown) {
            return;
        }
    }
}

fn shutdown_requested(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.map(|rx| *rx.borrow()).unwrap_or(false)
}
