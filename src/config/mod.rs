use rust_decimal::Decimal;
use std::env;

use crate::polymarket::data_client::DATA_API_BASE;
use crate::polymarket::session::CLOB_API_BASE;
use crate::services::notifier::TELEGRAM_API_BASE;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub host: String,
    pub port: u16,

    // Poll loop
    pub poll_interval_secs: u64,
    pub min_sleep_ms: u64,
    pub trade_fetch_limit: u32,
    pub min_mirror_notional: Decimal,
    pub heartbeat_interval_secs: u64,

    // Exchange endpoints
    pub data_api_url: String,
    pub clob_api_url: String,
    pub http_timeout_secs: u64,

    // Mirroring
    pub mirror_enabled: bool,
    pub mirror_dry_run: bool,
    pub sessions_file: Option<String>,

    // Notifications
    pub telegram_api_url: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_ops_chat_id: Option<String>,
    pub notifications_enabled: bool,

    // Admin API auth (unset leaves mutating routes open, for local use)
    pub api_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "copybot.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            min_sleep_ms: env::var("MIN_SLEEP_MS")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .unwrap_or(100),
            trade_fetch_limit: env::var("TRADE_FETCH_LIMIT")
                .unwrap_or_else(|_| "50".into())
                .parse()
                .unwrap_or(50),
            min_mirror_notional: env::var("MIN_MIRROR_NOTIONAL")
                .unwrap_or_else(|_| "1.0".into())
                .parse()
                .unwrap_or(Decimal::ONE),
            heartbeat_interval_secs: env::var("HEARTBEAT_INTERVAL_SECS")
                .unwrap_or_else(|_| "600".into())
                .parse()
                .unwrap_or(600),

            data_api_url: env::var("DATA_API_URL").unwrap_or_else(|_| DATA_API_BASE.into()),
            clob_api_url: env::var("CLOB_API_URL").unwrap_or_else(|_| CLOB_API_BASE.into()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),

            mirror_enabled: env::var("MIRROR_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            mirror_dry_run: env::var("MIRROR_DRY_RUN")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            sessions_file: env::var("SESSIONS_FILE").ok(),

            telegram_api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| TELEGRAM_API_BASE.into()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_ops_chat_id: env::var("TELEGRAM_OPS_CHAT_ID").ok(),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),

            api_token: env::var("API_TOKEN").ok(),
        })
    }

    /// Returns true if Telegram delivery is configured and enabled.
    pub fn has_telegram(&self) -> bool {
        self.notifications_enabled
            && self.telegram_bot_token.is_some()
            && self.telegram_ops_chat_id.is_some()
    }
}
