use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};

use crate::models::{CopySubscription, TradePosition};

/// Raw `subscriptions` row. Decimals cross the SQLite boundary as TEXT.
#[derive(FromRow)]
struct SubscriptionRow {
    subscriber_id: i64,
    source_wallet: String,
    display_name: String,
    scale_factor: String,
    enabled: bool,
    created_at: i64,
    last_seen_ts: i64,
    last_seen_tx: String,
    last_seen_li: i64,
}

impl SubscriptionRow {
    fn into_subscription(self) -> anyhow::Result<CopySubscription> {
        let scale_factor = Decimal::from_str(&self.scale_factor)
            .with_context(|| format!("bad scale_factor '{}' in store", self.scale_factor))?;

        Ok(CopySubscription {
            subscriber_id: self.subscriber_id,
            source_wallet: self.source_wallet,
            display_name: self.display_name,
            scale_factor,
            enabled: self.enabled,
            created_at: self.created_at,
            cursor: TradePosition::new(self.last_seen_ts, self.last_seen_tx, self.last_seen_li),
        })
    }
}

fn normalize_wallet(wallet: &str) -> String {
    wallet.trim().to_lowercase()
}

/// Create or overwrite the (subscriber, wallet) pair. Last write wins on
/// name and scale; the cursor restarts at the subscribe instant either way,
/// so a re-subscribe copies from now forward instead of replaying history.
/// `created_at` keeps the first subscribe time.
pub async fn subscribe(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    display_name: &str,
    scale_factor: Decimal,
) -> anyhow::Result<CopySubscription> {
    let sub = CopySubscription::new(
        subscriber_id,
        wallet,
        display_name,
        scale_factor,
        chrono::Utc::now().timestamp(),
    );

    let row = sqlx::query_as::<_, SubscriptionRow>(
        r#"
        INSERT INTO subscriptions
            (subscriber_id, source_wallet, display_name, scale_factor, enabled,
             created_at, last_seen_ts, last_seen_tx, last_seen_li)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (subscriber_id, source_wallet) DO UPDATE SET
            display_name = excluded.display_name,
            scale_factor = excluded.scale_factor,
            enabled = 1,
            last_seen_ts = excluded.last_seen_ts,
            last_seen_tx = excluded.last_seen_tx,
            last_seen_li = excluded.last_seen_li
        RETURNING *
        "#,
    )
    .bind(sub.subscriber_id)
    .bind(&sub.source_wallet)
    .bind(&sub.display_name)
    .bind(sub.scale_factor.to_string())
    .bind(sub.enabled)
    .bind(sub.created_at)
    .bind(sub.cursor.timestamp)
    .bind(&sub.cursor.tx_hash)
    .bind(sub.cursor.log_index)
    .fetch_one(pool)
    .await?;

    row.into_subscription()
}

/// Remove the pair. Returns false when it did not exist.
pub async fn unsubscribe(pool: &SqlitePool, subscriber_id: i64, wallet: &str) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "DELETE FROM subscriptions WHERE subscriber_id = ? AND source_wallet = ?",
    )
    .bind(subscriber_id)
    .bind(normalize_wallet(wallet))
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

pub async fn get(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
) -> anyhow::Result<Option<CopySubscription>> {
    let row = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE subscriber_id = ? AND source_wallet = ?",
    )
    .bind(subscriber_id)
    .bind(normalize_wallet(wallet))
    .fetch_optional(pool)
    .await?;

    row.map(SubscriptionRow::into_subscription).transpose()
}

/// All subscriptions for one subscriber, oldest first.
pub async fn list_for_subscriber(
    pool: &SqlitePool,
    subscriber_id: i64,
) -> anyhow::Result<Vec<CopySubscription>> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE subscriber_id = ? ORDER BY created_at",
    )
    .bind(subscriber_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(SubscriptionRow::into_subscription)
        .collect()
}

/// Full registry enumeration.
pub async fn list_all(pool: &SqlitePool) -> anyhow::Result<Vec<CopySubscription>> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions ORDER BY subscriber_id, created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(SubscriptionRow::into_subscription)
        .collect()
}

/// The sweep's working set: every enabled subscription.
pub async fn list_enabled(pool: &SqlitePool) -> anyhow::Result<Vec<CopySubscription>> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT * FROM subscriptions WHERE enabled = 1 ORDER BY subscriber_id, created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(SubscriptionRow::into_subscription)
        .collect()
}

/// Pause or resume copying. The cursor is left untouched, so a resumed
/// subscription picks up from where it froze.
pub async fn set_enabled(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    enabled: bool,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE subscriptions SET enabled = ? WHERE subscriber_id = ? AND source_wallet = ?",
    )
    .bind(enabled)
    .bind(subscriber_id)
    .bind(normalize_wallet(wallet))
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

pub async fn set_scale(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    scale_factor: Decimal,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE subscriptions SET scale_factor = ? WHERE subscriber_id = ? AND source_wallet = ?",
    )
    .bind(scale_factor.to_string())
    .bind(subscriber_id)
    .bind(normalize_wallet(wallet))
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

/// Persist the cursor for one pair. Called with the just-mirrored trade's
/// position after every confirmed success.
///
/// The update only applies when the stored cursor is strictly behind the new
/// position under the (timestamp, tx_hash, log_index) order. The sweep is
/// not the only cursor writer: a concurrent re-subscribe reseeds the cursor
/// at now, and a sweep still replaying its pre-reset snapshot must not drag
/// it back. Returns false when nothing advanced, either because the pair is
/// gone or because the stored cursor is already at or past `cursor`.
pub async fn set_cursor(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    cursor: &TradePosition,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE subscriptions
        SET last_seen_ts = ?1, last_seen_tx = ?2, last_seen_li = ?3
        WHERE subscriber_id = ?4 AND source_wallet = ?5
          AND (last_seen_ts < ?1
               OR (last_seen_ts = ?1 AND last_seen_tx < ?2)
               OR (last_seen_ts = ?1 AND last_seen_tx = ?2 AND last_seen_li < ?3))
        "#,
    )
    .bind(cursor.timestamp)
    .bind(&cursor.tx_hash)
    .bind(cursor.log_index)
    .bind(subscriber_id)
    .bind(normalize_wallet(wallet))
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}
