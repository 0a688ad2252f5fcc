use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use copybot::config::AppConfig;
use copybot::db::subscription_repo;
use copybot::models::{CopySubscription, Side, Trade, TradePosition};
use copybot::polymarket::{SessionResolver, TradeFeed, TradingSession};
use copybot::services::Notifier;

/// Fresh in-memory database with the schema applied.
#[allow(dead_code)]
pub async fn setup_test_db() -> SqlitePool {
    copybot::db::init_pool_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

/// Minimal config for tests; nothing external is reachable.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_path: ":memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        poll_interval_secs: 1,
        min_sleep_ms: 10,
        trade_fetch_limit: 50,
        min_mirror_notional: Decimal::ONE,
        heartbeat_interval_secs: 600,
        data_api_url: "http://localhost:0".into(),
        clob_api_url: "http://localhost:0".into(),
        http_timeout_secs: 1,
        mirror_enabled: false,
        mirror_dry_run: true,
        sessions_file: None,
        telegram_api_url: "http://localhost:0".into(),
        telegram_bot_token: None,
        telegram_ops_chat_id: None,
        notifications_enabled: false,
        api_token: None,
    }
}

/// Write the stored cursor directly, bypassing the monotonic guard in
/// `subscription_repo::set_cursor`. Fixtures use this to stage arbitrary
/// stored state, including state behind the current cursor.
#[allow(dead_code)]
pub async fn force_cursor(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    cursor: &TradePosition,
) {
    sqlx::query(
        "UPDATE subscriptions SET last_seen_ts = ?, last_seen_tx = ?, last_seen_li = ? \
         WHERE subscriber_id = ? AND source_wallet = ?",
    )
    .bind(cursor.timestamp)
    .bind(&cursor.tx_hash)
    .bind(cursor.log_index)
    .bind(subscriber_id)
    .bind(wallet.trim().to_lowercase())
    .execute(pool)
    .await
    .expect("Failed to force cursor");
}

/// Subscribe and rewind the cursor to zero so fixture trades are visible.
#[allow(dead_code)]
pub async fn seed_subscription(
    pool: &SqlitePool,
    subscriber_id: i64,
    wallet: &str,
    scale: Decimal,
) -> CopySubscription {
    let sub = subscription_repo::subscribe(pool, subscriber_id, wallet, wallet, scale)
        .await
        .expect("Failed to seed subscription");

    force_cursor(pool, subscriber_id, wallet, &TradePosition::zero()).await;

    CopySubscription {
        cursor: TradePosition::zero(),
        ..sub
    }
}

#[allow(dead_code)]
pub fn make_trade(ts: i64, tx: &str, side: Side, price: &str, size: &str) -> Trade {
    Trade {
        trade_id: None,
        token_id: "token-1".to_string(),
        side,
        price: price.parse().expect("bad price"),
        size: size.parse().expect("bad size"),
        timestamp: ts,
        tx_hash: tx.to_string(),
        log_index: 0,
        market_title: "Test market".to_string(),
        market_slug: None,
    }
}

// ---------------------------------------------------------------------------
// Fakes for the exchange-facing seams
// ---------------------------------------------------------------------------

/// Canned per-wallet batches; records every fetch.
#[allow(dead_code)]
pub struct FakeFeed {
    batches: Mutex<HashMap<String, Vec<Trade>>>,
    pub fetched: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeFeed {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(HashMap::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn set_trades(&self, wallet: &str, trades: Vec<Trade>) {
        self.batches
            .lock()
            .unwrap()
            .insert(wallet.to_string(), trades);
    }

    pub fn fetch_count(&self, wallet: &str) -> usize {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.as_str() == wallet)
            .count()
    }
}

#[async_trait]
impl TradeFeed for FakeFeed {
    async fn recent_trades(&self, wallet: &str, _limit: u32) -> Vec<Trade> {
        self.fetched.lock().unwrap().push(wallet.to_string());
        self.batches
            .lock()
            .unwrap()
            .get(wallet)
            .cloned()
            .unwrap_or_default()
    }
}

/// Accepts or rejects orders; records every submission.
#[allow(dead_code)]
pub struct FakeSession {
    pub bid: Mutex<Option<Decimal>>,
    pub submit_error: Mutex<Option<String>>,
    pub orders: Mutex<Vec<(String, Side, Decimal)>>,
}

#[allow(dead_code)]
impl FakeSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bid: Mutex::new(None),
            submit_error: Mutex::new(None),
            orders: Mutex::new(Vec::new()),
        })
    }

    pub fn set_bid(&self, bid: Option<Decimal>) {
        *self.bid.lock().unwrap() = bid;
    }

    pub fn fail_submissions(&self, error: Option<&str>) {
        *self.submit_error.lock().unwrap() = error.map(String::from);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl TradingSession for FakeSession {
    async fn best_bid(&self, _token_id: &str) -> anyhow::Result<Option<Decimal>> {
        Ok(*self.bid.lock().unwrap())
    }

    async fn submit_market_order(
        &self,
        token_id: &str,
        side: Side,
        amount: Decimal,
    ) -> anyhow::Result<()> {
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            anyhow::bail!("{err}");
        }
        self.orders
            .lock()
            .unwrap()
            .push((token_id.to_string(), side, amount));
        Ok(())
    }
}

#[allow(dead_code)]
pub struct FakeResolver {
    sessions: Mutex<HashMap<i64, Arc<FakeSession>>>,
}

#[allow(dead_code)]
impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn add(&self, subscriber_id: i64, session: Arc<FakeSession>) {
        self.sessions.lock().unwrap().insert(subscriber_id, session);
    }
}

#[async_trait]
impl SessionResolver for FakeResolver {
    async fn resolve(&self, subscriber_id: i64) -> Option<Arc<dyn TradingSession>> {
        self.sessions
            .lock()
            .unwrap()
            .get(&subscriber_id)
            .cloned()
            .map(|s| s as Arc<dyn TradingSession>)
    }
}

/// Captures notifications instead of delivering them.
#[allow(dead_code)]
pub struct RecordingNotifier {
    pub subscriber_messages: Mutex<Vec<(i64, String)>>,
    pub ops_messages: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscriber_messages: Mutex::new(Vec::new()),
            ops_messages: Mutex::new(Vec::new()),
        })
    }

    pub fn messages_for(&self, subscriber_id: i64) -> Vec<String> {
        self.subscriber_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == subscriber_id)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_subscriber(&self, subscriber_id: i64, message: &str) {
        self.subscriber_messages
            .lock()
            .unwrap()
            .push((subscriber_id, message.to_string()));
    }

    async fn notify_ops(&self, message: &str) {
        self.ops_messages.lock().unwrap().push(message.to_string());
    }
}
