//! Crypto screening — CoinGecko market data, DeFiLlama TVL, and the
//! undervalued test.

pub mod coingecko;
pub mod defillama;
pub mod screen;

use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{CoinSnapshot, WhitepaperInputs};
use coingecko::CoinGeckoClient;
use defillama::DefiLlamaClient;
use screen::{undervalued_test, CryptoScreenReport, ScreenConfig};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// TVL estimation used when DeFiLlama has no figure: fraction of
/// market cap typically locked, per coin, with a conservative default
/// for unknowns. The table is configuration so it can be retuned.
#[derive(Debug, Clone)]
pub struct TvlFallback {
    /// coin name/symbol (lowercase) → fraction of market cap locked.
    pub multipliers: HashMap<String, f64>,
    pub default_multiplier: f64,
}

impl Default for TvlFallback {
    fn default() -> Self {
        let entries = [
            // Privacy coins, shielded/private share
            ("zcash", 0.05),
            ("monero", 0.80),
            // Staking-heavy platforms
            ("ethereum", 0.25),
            ("cardano", 0.65),
            ("solana", 0.70),
            ("polkadot", 0.55),
            ("avalanche", 0.60),
            ("algorand", 0.65),
            ("tezos", 0.70),
            ("cosmos", 0.65),
            ("near", 0.60),
            ("fantom", 0.50),
            ("harmony", 0.45),
            ("multiversx", 0.60),
            ("zilliqa", 0.50),
            // Layer 2s
            ("polygon", 0.30),
            ("arbitrum", 0.20),
            ("optimism", 0.20),
            // Long-term holder estimate
            ("bitcoin", 0.50),
            // Oracles & infrastructure
            ("chainlink", 0.40),
            ("theta", 0.45),
            ("vechain", 0.35),
            ("hedera", 0.40),
        ];
        Self {
            multipliers: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            default_multiplier: 0.10,
        }
    }
}

impl TvlFallback {
    /// Estimate value locked from market cap, matching on coin name or
    /// symbol.
    pub fn estimate(&self, snapshot: &CoinSnapshot) -> f64 {
        let name = snapshot.name.to_lowercase();
        let symbol = snapshot.symbol.to_lowercase();

        let multiplier = self
            .multipliers
            .iter()
            .find(|(key, _)| name.contains(key.as_str()) || **key == symbol)
            .map(|(_, m)| *m)
            .unwrap_or(self.default_multiplier);

        snapshot.market_cap * multiplier
    }
}

// ---------------------------------------------------------------------------
// Screener
// ---------------------------------------------------------------------------

/// Composes market data, TVL lookup, and the undervalued test.
pub struct CoinScreener {
    coingecko: CoinGeckoClient,
    defillama: DefiLlamaClient,
    screen_config: ScreenConfig,
    tvl_fallback: TvlFallback,
}

impl CoinScreener {
    pub fn new(
        coingecko: CoinGeckoClient,
        defillama: DefiLlamaClient,
        screen_config: ScreenConfig,
        tvl_fallback: TvlFallback,
    ) -> Self {
        Self {
            coingecko,
            defillama,
            screen_config,
            tvl_fallback,
        }
    }

    /// Fetch a snapshot with value-locked attached: DeFiLlama when
    /// tracked, the market-cap fallback estimate otherwise.
    pub async fn snapshot_with_tvl(&self, coin_input: &str) -> Result<CoinSnapshot> {
        let mut snapshot = self.coingecko.coin_snapshot(coin_input).await?;

        snapshot.value_locked = match self.defillama.tvl(coin_input).await {
            Ok(Some(tvl)) if tvl > 0.0 => {
                debug!(coin = %snapshot.name, tvl, "TVL from DeFiLlama");
                Some(tvl)
            }
            _ => {
                let estimated = self.tvl_fallback.estimate(&snapshot);
                debug!(coin = %snapshot.name, estimated, "TVL estimated from market cap");
                Some(estimated)
            }
        };

        Ok(snapshot)
    }

    /// Run the full screen for one coin.
    ///
    /// `value_locked_override` takes precedence over fetched TVL — it
    /// carries the user's own whitepaper figure.
    pub async fn screen(
        &self,
        coin_input: &str,
        new_coins_per_year: f64,
        value_locked_override: Option<f64>,
    ) -> Result<CryptoScreenReport> {
        let snapshot = self.snapshot_with_tvl(coin_input).await?;

        let inputs = WhitepaperInputs {
            new_coins_per_year,
            value_locked_usd: value_locked_override
                .or(snapshot.value_locked)
                .unwrap_or(0.0),
        };

        let report = undervalued_test(&snapshot, &inputs, &self.screen_config);
        info!(
            coin = %report.coin_name,
            verdict = %report.verdict,
            "Crypto screen complete"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
