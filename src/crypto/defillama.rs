//! DeFiLlama TVL client.
//!
//! Fetches total value locked for a protocol. The `/tvl/{slug}`
//! endpoint returns a bare number; `/protocol/{slug}` returns full
//! metadata. User-friendly protocol names resolve through a static
//! slug table.
//!
//! API: `https://api.llama.fi`
//! Auth: none.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const BASE_URL: &str = "https://api.llama.fi";

/// User-friendly name → DeFiLlama slug. Unlisted names pass through
/// lowercased.
const PROTOCOL_SLUGS: &[(&str, &str)] = &[
    // Layer 1s with DeFi ecosystems
    ("eth", "ethereum"),
    ("btc", "bitcoin"),
    ("sol", "solana"),
    ("ada", "cardano"),
    ("avax", "avalanche"),
    ("dot", "polkadot"),
    ("matic", "polygon"),
    ("atom", "cosmos"),
    ("algo", "algorand"),
    ("xtz", "tezos"),
    ("near protocol", "near"),
    ("ftm", "fantom"),
    ("one", "harmony"),
    ("elrond", "multiversx"),
    ("egld", "multiversx"),
    ("zil", "zilliqa"),
    // Major DeFi protocols
    ("maker", "makerdao"),
    ("sushiswap", "sushi"),
    ("yearn", "yearn-finance"),
    ("convex", "convex-finance"),
    ("rocket pool", "rocket-pool"),
    // Privacy coins (may not carry TVL)
    ("zec", "zcash"),
    ("xmr", "monero"),
    // Oracles
    ("link", "chainlink"),
];

/// Resolve a protocol name to its DeFiLlama slug.
pub fn resolve_protocol_slug(name: &str) -> String {
    let normalized = name.to_lowercase().trim().to_string();
    PROTOCOL_SLUGS
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, slug)| slug.to_string())
        .unwrap_or(normalized)
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// Subset of `/protocol/{slug}` metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolInfo {
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub mcap: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DeFiLlama API client.
pub struct DefiLlamaClient {
    http: Client,
}

impl DefiLlamaClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("OUVC/0.1.0")
            .build()
            .context("Failed to build HTTP client for DeFiLlama")?;
        Ok(Self { http })
    }

    /// TVL in USD for a protocol, or `None` when DeFiLlama doesn't
    /// track it. Network failures are errors; an unknown protocol is
    /// an expected absence.
    pub async fn tvl(&self, protocol_name: &str) -> Result<Option<f64>> {
        let slug = resolve_protocol_slug(protocol_name);
        let url = format!("{BASE_URL}/tvl/{slug}");
        debug!(url = %url, "DeFiLlama TVL request");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DeFiLlama API request failed")?;

        if !resp.status().is_success() {
            debug!(slug = %slug, status = %resp.status(), "No TVL for protocol");
            return Ok(None);
        }

        // The endpoint body is a bare number.
        let body = resp.text().await.context("Failed to read DeFiLlama response")?;
        match body.trim().parse::<f64>() {
            Ok(tvl) => Ok(Some(tvl)),
            Err(_) => {
                debug!(slug = %slug, body = %body.chars().take(80).collect::<String>(), "Unparseable TVL body");
                Ok(None)
            }
        }
    }

    /// Protocol metadata, or `None` for unknown protocols.
    pub async fn protocol_info(&self, protocol_name: &str) -> Result<Option<ProtocolInfo>> {
        let slug = resolve_protocol_slug(protocol_name);
        let url = format!("{BASE_URL}/protocol/{slug}");
        debug!(url = %url, "DeFiLlama protocol request");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("DeFiLlama API request failed")?;

        if !resp.status().is_success() {
            return Ok(None);
        }

        let info: ProtocolInfo = resp
            .json()
            .await
            .context("Failed to parse DeFiLlama protocol response")?;
        Ok(Some(info))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_resolution() {
        assert_eq!(resolve_protocol_slug("ETH"), "ethereum");
        assert_eq!(resolve_protocol_slug("maker"), "makerdao");
        assert_eq!(resolve_protocol_slug("Rocket Pool"), "rocket-pool");
        assert_eq!(resolve_protocol_slug("egld"), "multiversx");
    }

    #[test]
    fn test_unlisted_slug_passes_through() {
        assert_eq!(resolve_protocol_slug("aave"), "aave");
        assert_eq!(resolve_protocol_slug("Uniswap"), "uniswap");
    }

    #[test]
    fn test_protocol_info_parses() {
        let json = r#"{
            "name": "Lido",
            "symbol": "LDO",
            "category": "Liquid Staking",
            "chains": ["Ethereum", "Solana"],
            "mcap": 1500000000.0,
            "description": "Liquid staking protocol"
        }"#;
        let info: ProtocolInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "Lido");
        assert_eq!(info.chains.len(), 2);
    }

    #[test]
    fn test_protocol_info_tolerates_missing_fields() {
        let json = r#"{"name": "Unknown"}"#;
        let info: ProtocolInfo = serde_json::from_str(json).unwrap();
        assert!(info.symbol.is_none());
        assert!(info.chains.is_empty());
    }

    #[test]
    fn test_bare_number_body_parses() {
        assert_eq!("1600000000.5".trim().parse::<f64>().unwrap(), 1_600_000_000.5);
        assert!("{\"error\":\"x\"}".trim().parse::<f64>().is_err());
    }
}
