use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::types::{ApiTrade, TradesResponse};
use super::TradeFeed;
use crate::models::Trade;

pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Public Data API client. Unauthenticated; used to watch source wallets.
#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Recent trades for a wallet, newest first.
    pub async fn get_user_trades(
        &self,
        wallet: &str,
        limit: u32,
    ) -> Result<Vec<ApiTrade>, DataClientError> {
        let url = format!("{}/trades", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("user", wallet.to_lowercase().as_str())])
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        let parsed: TradesResponse = serde_json::from_value(body)
            .map_err(|e| DataClientError::Unexpected(e.to_string()))?;

        Ok(parsed.into_trades())
    }
}

#[async_trait]
impl TradeFeed for DataClient {
    async fn recent_trades(&self, wallet: &str, limit: u32) -> Vec<Trade> {
        let raw = match self.get_user_trades(wallet, limit).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(wallet = %wallet, error = %e, "Trade fetch failed; treating as empty batch");
                return Vec::new();
            }
        };

        let total = raw.len();
        let trades: Vec<Trade> = raw.iter().filter_map(ApiTrade::to_trade).collect();

        if trades.len() < total {
            tracing::warn!(
                wallet = %wallet,
                dropped = total - trades.len(),
                "Dropped unparseable trade entries from feed"
            );
        }

        trades
    }
}
