//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Every section and field
//! has a default, so a partial (or missing) file still yields a
//! working demo-mode configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::crypto::screen::ScreenConfig;
use crate::valuation::comparables::SelectorConfig;
use crate::valuation::estimator::EstimatorConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub screener: ScreenerConfig,
    pub listings: ListingsConfig,
    pub crypto: CryptoConfig,
    pub dashboard: DashboardConfig,
}

/// Comparable-selection and estimator tuning.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScreenerConfig {
    pub max_distance_km: f64,
    pub max_results: usize,
    pub rooms_tolerance: u32,
    pub area_ratio_min: f64,
    pub area_ratio_max: f64,
    pub price_ratio_min: f64,
    pub price_ratio_max: f64,
    pub min_comparables: usize,
    pub amenity_clamp_min: f64,
    pub amenity_clamp_max: f64,
    pub verified_premium: f64,
    pub outlier_z_threshold: f64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        let selector = SelectorConfig::default();
        let estimator = EstimatorConfig::default();
        Self {
            max_distance_km: selector.max_distance_km,
            max_results: selector.max_results,
            rooms_tolerance: selector.rooms_tolerance,
            area_ratio_min: selector.area_ratio_min,
            area_ratio_max: selector.area_ratio_max,
            price_ratio_min: selector.price_ratio_min,
            price_ratio_max: selector.price_ratio_max,
            min_comparables: selector.min_comparables,
            amenity_clamp_min: estimator.amenity_clamp_min,
            amenity_clamp_max: estimator.amenity_clamp_max,
            verified_premium: estimator.verified_premium,
            outlier_z_threshold: estimator.outlier_z_threshold,
        }
    }
}

impl ScreenerConfig {
    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            max_distance_km: self.max_distance_km,
            max_results: self.max_results,
            rooms_tolerance: self.rooms_tolerance,
            area_ratio_min: self.area_ratio_min,
            area_ratio_max: self.area_ratio_max,
            price_ratio_min: self.price_ratio_min,
            price_ratio_max: self.price_ratio_max,
            min_comparables: self.min_comparables,
        }
    }

    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            amenity_clamp_min: self.amenity_clamp_min,
            amenity_clamp_max: self.amenity_clamp_max,
            verified_premium: self.verified_premium,
            outlier_z_threshold: self.outlier_z_threshold,
        }
    }
}

/// Listing source selection and credentials.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListingsConfig {
    /// Env var carrying the Bayut RapidAPI key. When unset (or the var
    /// is empty), the demo source is used.
    pub api_key_env: String,
    /// Pages fetched per search.
    pub max_pages: u32,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "BAYUT_API_KEY".to_string(),
            max_pages: 2,
        }
    }
}

/// Crypto data source and screening thresholds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CryptoConfig {
    /// Env var carrying the optional CoinGecko demo key.
    pub coingecko_key_env: String,
    pub high_inflation_pct: f64,
    pub medium_inflation_pct: f64,
    pub undervalued_ratio: f64,
    pub fair_value_ratio: f64,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        let screen = ScreenConfig::default();
        Self {
            coingecko_key_env: "COINGECKO_API_KEY".to_string(),
            high_inflation_pct: screen.high_inflation_pct,
            medium_inflation_pct: screen.medium_inflation_pct,
            undervalued_ratio: screen.undervalued_ratio,
            fair_value_ratio: screen.fair_value_ratio,
        }
    }
}

impl CryptoConfig {
    pub fn screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            high_inflation_pct: self.high_inflation_pct,
            medium_inflation_pct: self.medium_inflation_pct,
            undervalued_ratio: self.undervalued_ratio,
            fair_value_ratio: self.fair_value_ratio,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults (demo mode); a malformed file is an error.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
