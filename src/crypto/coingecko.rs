//! CoinGecko market-data client.
//!
//! Pulls price, supply, volume, and market cap for one coin. Accepts
//! friendly inputs ("btc", "ZEC") and resolves them to CoinGecko ids
//! through a static alias table.
//!
//! API: `https://api.coingecko.com/api/v3`
//! Auth: optional `x-cg-demo-api-key` header (free tier).
//! Rate limit: ~30 calls/minute without a key.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::types::CoinSnapshot;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Friendly input → CoinGecko id. Unlisted inputs pass through
/// lowercased, since many CoinGecko ids are just the coin name.
const COIN_ALIASES: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("bch", "bitcoin-cash"),
    ("bitcoincash", "bitcoin-cash"),
    ("eth", "ethereum"),
    ("matic", "polygon"),
    ("ada", "cardano"),
    ("sol", "solana"),
    ("dot", "polkadot"),
    ("zec", "zcash"),
    ("xmr", "monero"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
    ("usdcoin", "usd-coin"),
    ("bnb", "binancecoin"),
    ("uni", "uniswap"),
    ("doge", "dogecoin"),
    ("shib", "shiba-inu"),
    ("shibainu", "shiba-inu"),
    ("xrp", "ripple"),
    ("ltc", "litecoin"),
];

/// Resolve user input to a CoinGecko coin id.
pub fn resolve_coin_id(input: &str) -> String {
    let normalized = input.to_lowercase().trim().to_string();
    COIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, id)| id.to_string())
        .unwrap_or(normalized)
}

// ---------------------------------------------------------------------------
// API response types (CoinGecko JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CoinResponse {
    name: String,
    symbol: String,
    market_data: MarketData,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: HashMap<String, f64>,
    #[serde(default)]
    circulating_supply: Option<f64>,
    #[serde(default)]
    total_supply: Option<f64>,
    #[serde(default)]
    max_supply: Option<f64>,
    #[serde(default)]
    total_volume: HashMap<String, f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// CoinGecko API client.
pub struct CoinGeckoClient {
    http: Client,
    /// Free-tier demo key; reads work without one at a lower rate limit.
    api_key: Option<SecretString>,
}

impl CoinGeckoClient {
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("OUVC/0.1.0")
            .build()
            .context("Failed to build HTTP client for CoinGecko")?;
        Ok(Self { http, api_key })
    }

    /// Fetch a market snapshot for one coin. `value_locked` is left
    /// empty; the screener layer fills it from DeFiLlama or estimates.
    pub async fn coin_snapshot(&self, coin_input: &str) -> Result<CoinSnapshot> {
        let coin_id = resolve_coin_id(coin_input);
        let url = format!("{BASE_URL}/coins/{coin_id}");
        debug!(url = %url, "CoinGecko request");

        let mut req = self.http.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("x-cg-demo-api-key", key.expose_secret());
        }

        let resp = req.send().await.context("CoinGecko API request failed")?;

        match resp.status() {
            reqwest::StatusCode::FORBIDDEN => anyhow::bail!(
                "CoinGecko API access denied — set COINGECKO_API_KEY \
                 (free keys at https://www.coingecko.com/en/api)"
            ),
            reqwest::StatusCode::NOT_FOUND => {
                anyhow::bail!("Coin '{coin_id}' not found on CoinGecko")
            }
            status if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("CoinGecko API error {status}: {body}");
            }
            _ => {}
        }

        let coin: CoinResponse = resp
            .json()
            .await
            .context("Failed to parse CoinGecko coin response")?;

        let usd = |map: &HashMap<String, f64>| map.get("usd").copied().unwrap_or(0.0);

        Ok(CoinSnapshot {
            name: coin.name,
            symbol: coin.symbol.to_uppercase(),
            price: usd(&coin.market_data.current_price),
            circulating_supply: coin.market_data.circulating_supply.unwrap_or(0.0),
            total_supply: coin.market_data.total_supply,
            max_supply: coin.market_data.max_supply,
            volume_24h: usd(&coin.market_data.total_volume),
            market_cap: usd(&coin.market_data.market_cap),
            price_change_24h: coin.market_data.price_change_percentage_24h,
            value_locked: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
