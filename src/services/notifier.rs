use async_trait::async_trait;
use serde_json::json;

use crate::models::{MirrorOutcome, MirrorResult};

/// Delivery surface for mirror outcomes and liveness heartbeats.
///
/// Delivery is best-effort and decoupled from the cursor/mirror path:
/// implementations log failures and never propagate them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Message to one subscriber; the subscriber id doubles as the chat id.
    async fn notify_subscriber(&self, subscriber_id: i64, message: &str);

    /// Message to the operations channel.
    async fn notify_ops(&self, message: &str);
}

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram notification service. Failures are logged but never block the
/// main flow.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    ops_chat_id: String,
}

impl TelegramNotifier {
    /// `http` is the shared client and carries the request timeout; sends
    /// are awaited inside the poll loop, so a hung call would stall polling
    /// and cursor advance with it.
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        bot_token: String,
        ops_chat_id: String,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            bot_token,
            ops_chat_id,
        }
    }

    async fn send_to(&self, chat_id: &str, message: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let body = json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        chat_id,
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, chat_id, "Failed to send Telegram notification");
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_subscriber(&self, subscriber_id: i64, message: &str) {
        self.send_to(&subscriber_id.to_string(), message).await;
    }

    async fn notify_ops(&self, message: &str) {
        self.send_to(&self.ops_chat_id, message).await;
    }
}

fn short_hex(value: &str) -> String {
    if value.len() <= 10 {
        return value.to_string();
    }
    match (value.get(..6), value.get(value.len() - 4..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        // A cut landed inside a multi-byte character; the value is not the
        // plain hex the venue normally sends, show it whole
        _ => value.to_string(),
    }
}

fn format_utc(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Format one mirror outcome for the subscriber's chat.
pub fn format_mirror_result(result: &MirrorResult) -> String {
    let sub = &result.subscription;
    let trade = &result.trade;

    let header = match &result.outcome {
        MirrorOutcome::Executed { .. } => "*Mirror Executed*",
        MirrorOutcome::Skipped { .. } => "*Mirror Skipped*",
        MirrorOutcome::Failed { .. } => "*Mirror Failed*",
    };
    let status = match &result.outcome {
        MirrorOutcome::Executed { notional } => {
            format!("Mirrored: ${:.2} USDC", notional)
        }
        MirrorOutcome::Skipped { reason } => format!("Skipped: {}", reason),
        MirrorOutcome::Failed { error } => format!("Failed: {}", error),
    };

    format!(
        "{}\nSource: `{}` ({})\nSide: {} {} @ {}\n{}\nMarket: {}\nToken: `{}`\nTx: `{}`\nTime: {}",
        header,
        short_hex(&sub.source_wallet),
        sub.display_name,
        trade.side,
        trade.size,
        trade.price,
        status,
        trade.market_title,
        trade.token_id.get(..16).unwrap_or(&trade.token_id),
        short_hex(&trade.tx_hash),
        format_utc(trade.timestamp),
    )
}

/// Format the periodic liveness heartbeat for the ops channel.
pub fn format_heartbeat(cycles: u64, enabled_subscriptions: usize) -> String {
    format!(
        "*Copybot Heartbeat*\nCycles completed: {}\nEnabled subscriptions: {}",
        cycles, enabled_subscriptions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CopySubscription, Side, Trade};
    use rust_decimal::Decimal;

    fn result_fixture(outcome_notional: Option<Decimal>) -> MirrorResult {
        let trade = Trade {
            trade_id: None,
            token_id: "tok".into(),
            side: Side::Buy,
            price: Decimal::new(10, 2),
            size: Decimal::from(1000),
            timestamp: 1_700_000_000,
            tx_hash: "0xabc".into(),
            log_index: 0,
            market_title: "Will it rain tomorrow?".into(),
            market_slug: None,
        };
        let sub = CopySubscription::new(
            42,
            "0x1234567890abcdef1234567890abcdef12345678",
            "rainman",
            Decimal::ONE,
            0,
        );
        match outcome_notional {
            Some(n) => MirrorResult::executed(&trade, &sub, n),
            None => MirrorResult::failed(&trade, &sub, "client not available"),
        }
    }

    #[test]
    fn executed_message_carries_notional_and_market() {
        let msg = format_mirror_result(&result_fixture(Some(Decimal::from(25))));
        assert!(msg.contains("*Mirror Executed*"));
        assert!(msg.contains("$25.00 USDC"));
        assert!(msg.contains("Will it rain tomorrow?"));
        assert!(msg.contains("0x1234...5678"));
        assert!(msg.contains("rainman"));
        assert!(msg.contains("BUY 1000 @ 0.10"));
        assert!(msg.contains("2023-11-14 22:13:20 UTC"));
    }

    #[test]
    fn failed_message_carries_error() {
        let msg = format_mirror_result(&result_fixture(None));
        assert!(msg.contains("*Mirror Failed*"));
        assert!(msg.contains("client not available"));
    }

    #[test]
    fn heartbeat_reports_counts() {
        let msg = format_heartbeat(42, 3);
        assert!(msg.contains("42"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn short_values_are_left_alone() {
        assert_eq!(short_hex("0xabc"), "0xabc");
    }

    #[test]
    fn short_hex_tolerates_multibyte_input() {
        // Seven ASCII bytes then two 3-byte characters: the tail cut at
        // len - 4 lands mid-character
        let odd = "aaaaaaa€€";
        assert_eq!(short_hex(odd), odd);
        assert_eq!(short_hex("0x1234567890abcdef"), "0x1234...cdef");
    }

    #[test]
    fn formatting_survives_multibyte_venue_strings() {
        let mut result = result_fixture(Some(Decimal::from(25)));
        result.trade.tx_hash = "aaaaaaa€€".into();
        result.trade.token_id = "€€€€€€".into();

        let msg = format_mirror_result(&result);
        assert!(msg.contains("aaaaaaa€€"));
        assert!(msg.contains("€€€€€€"));
    }

    #[tokio::test]
    async fn sends_are_bounded_by_the_client_timeout() {
        // A listener that accepts connections and never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let notifier =
            TelegramNotifier::new(http, format!("http://{addr}"), "token".into(), "1".into());

        let bounded = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            notifier.notify_ops("ping"),
        )
        .await;
        assert!(bounded.is_ok(), "notify must return once the timeout fires");
    }
}
