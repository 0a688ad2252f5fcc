use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE as BASE64_URL_SAFE},
    Engine,
};
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;

use super::types::ApiOrderBook;
use super::{SessionResolver, TradingSession};
use crate::models::Side;

pub const CLOB_API_BASE: &str = "https://clob.polymarket.com";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base64 secret: {0}")]
    InvalidSecret(#[from] base64::DecodeError),

    #[error("HMAC computation failed: {0}")]
    Hmac(String),

    #[error("order rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl ApiCredentials {
    /// HMAC-SHA256 signature for the CLOB API.
    ///
    /// message = `{timestamp}{method}{path}{body}`; the secret is
    /// base64-decoded before use (URL-safe alphabet, standard as fallback).
    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<String, SessionError> {
        let secret_bytes = BASE64_URL_SAFE
            .decode(&self.api_secret)
            .or_else(|_| BASE64.decode(&self.api_secret))?;

        let message = format!("{timestamp}{method}{path}{body}");

        let mut mac = HmacSha256::new_from_slice(&secret_bytes)
            .map_err(|e| SessionError::Hmac(e.to_string()))?;

        mac.update(message.as_bytes());
        let result = mac.finalize();

        Ok(BASE64.encode(result.into_bytes()))
    }
}

// ---------------------------------------------------------------------------
// ClobSession: one subscriber's authenticated CLOB surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClobSession {
    http: Client,
    credentials: ApiCredentials,
    base_url: String,
}

impl ClobSession {
    pub fn new(http: Client, credentials: ApiCredentials, base_url: impl Into<String>) -> Self {
        Self {
            http,
            credentials,
            base_url: base_url.into(),
        }
    }

    /// Build a request carrying the L2 auth headers for `path`.
    fn authenticated(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &str,
    ) -> Result<RequestBuilder, SessionError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self
            .credentials
            .sign(&timestamp, method.as_str(), path, body)?;

        let url = format!("{}{}", self.base_url, path);
        let req = self
            .http
            .request(method, &url)
            .header("POLY-API-KEY", &self.credentials.api_key)
            .header("POLY-SIGNATURE", signature)
            .header("POLY-TIMESTAMP", &timestamp)
            .header("POLY-PASSPHRASE", &self.credentials.passphrase);

        Ok(req)
    }

    pub async fn get_order_book(&self, token_id: &str) -> Result<ApiOrderBook, SessionError> {
        let path = format!("/book?token_id={token_id}");
        let resp = self
            .authenticated(reqwest::Method::GET, &path, "")?
            .send()
            .await?
            .error_for_status()?;

        let book: ApiOrderBook = resp.json().await?;
        Ok(book)
    }

    async fn post_market_order(
        &self,
        token_id: &str,
        side: Side,
        amount: Decimal,
    ) -> Result<(), SessionError> {
        let payload = json!({
            "token_id": token_id,
            "side": side,
            "amount": amount,
            "order_type": "FOK",
        });
        let body = payload.to_string();

        let resp = self
            .authenticated(reqwest::Method::POST, "/order", &body)?
            .body(body)
            .header("Content-Type", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let ack: serde_json::Value = resp.json().await?;
        parse_order_ack(&ack).map_err(SessionError::Rejected)?;

        tracing::info!(
            token = %token_id,
            side = %side,
            amount = %amount,
            "CLOB order accepted"
        );
        Ok(())
    }
}

#[async_trait]
impl TradingSession for ClobSession {
    async fn best_bid(&self, token_id: &str) -> anyhow::Result<Option<Decimal>> {
        let book = self.get_order_book(token_id).await?;
        Ok(book.best_bid())
    }

    async fn submit_market_order(
        &self,
        token_id: &str,
        side: Side,
        amount: Decimal,
    ) -> anyhow::Result<()> {
        self.post_market_order(token_id, side, amount).await?;
        Ok(())
    }
}

/// Interpret an order-placement response. Shapes vary across API versions:
/// any explicit success indicator counts; a cancelled status means the FOK
/// order did not fill.
pub fn parse_order_ack(resp: &serde_json::Value) -> Result<(), String> {
    if resp.get("success").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(());
    }

    let order_id = resp.get("orderID").or_else(|| resp.get("order_id"));
    if let Some(id) = order_id {
        let present = match id {
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Null => false,
            _ => true,
        };
        if present {
            return Ok(());
        }
    }

    match resp.get("status").and_then(|v| v.as_str()) {
        Some("matched") | Some("filled") => return Ok(()),
        Some("cancelled") => return Err("order not filled (FOK cancelled)".into()),
        _ => {}
    }

    if let Some(err) = resp
        .get("errorMsg")
        .or_else(|| resp.get("error"))
        .and_then(|v| v.as_str())
    {
        if !err.is_empty() {
            return Err(err.to_string());
        }
    }

    Err(format!("unrecognized order response: {resp}"))
}

// ---------------------------------------------------------------------------
// StaticSessionResolver: sessions file -> per-subscriber sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SessionFileEntry {
    subscriber_id: i64,
    #[serde(flatten)]
    credentials: ApiCredentials,
}

/// Resolver backed by a JSON credentials file loaded at startup:
/// `[{"subscriber_id": ..., "api_key": ..., "api_secret": ..., "passphrase": ...}]`.
/// Subscribers without an entry have no session and their mirrors fail with
/// "client not available" until one is added.
pub struct StaticSessionResolver {
    sessions: HashMap<i64, Arc<ClobSession>>,
}

impl StaticSessionResolver {
    pub fn empty() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        http: Client,
        base_url: &str,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sessions file {}", path.display()))?;
        let entries: Vec<SessionFileEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse sessions file {}", path.display()))?;

        let sessions = entries
            .into_iter()
            .map(|e| {
                let session = ClobSession::new(http.clone(), e.credentials, base_url);
                (e.subscriber_id, Arc::new(session))
            })
            .collect::<HashMap<_, _>>();

        tracing::info!(count = sessions.len(), "Loaded subscriber trading sessions");
        Ok(Self { sessions })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve(&self, subscriber_id: i64) -> Option<Arc<dyn TradingSession>> {
        self.sessions
            .get(&subscriber_id)
            .map(|s| s.clone() as Arc<dyn TradingSession>)
    }
}
