//! Valuation signals.
//!
//! Classifies the asking-price-to-estimate ratio and the projected
//! rental yield into discrete signals and an overall verdict, with
//! human-readable key factors. Yield benchmarks per neighborhood are
//! caller-supplied configuration.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::types::Confidence;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Expected gross-yield range for a neighborhood, in percent.
#[derive(Debug, Clone, Copy)]
pub struct YieldBenchmark {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Asking/estimate ratio below which a listing is undervalued.
    pub undervalued_ratio: f64,
    /// Asking/estimate ratio above which a listing is overvalued.
    pub overvalued_ratio: f64,
    /// Yield must exceed benchmark × this to rate as attractive.
    pub yield_attractive_mult: f64,
    /// Yield below benchmark × this rates as low.
    pub yield_low_mult: f64,
    /// neighborhood slug → expected yield range.
    pub yield_benchmarks: HashMap<String, YieldBenchmark>,
    /// Benchmark average used for neighborhoods with no entry.
    pub default_yield_avg: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        let yields = [
            ("dubai-marina", YieldBenchmark { min: 5.5, avg: 6.8, max: 8.2 }),
            ("downtown-dubai", YieldBenchmark { min: 4.5, avg: 5.8, max: 7.0 }),
            ("jbr", YieldBenchmark { min: 5.0, avg: 6.5, max: 7.8 }),
            ("palm-jumeirah", YieldBenchmark { min: 4.0, avg: 5.2, max: 6.5 }),
            ("business-bay", YieldBenchmark { min: 6.0, avg: 7.5, max: 9.0 }),
            ("jvc", YieldBenchmark { min: 6.5, avg: 8.0, max: 9.5 }),
            ("sports-city", YieldBenchmark { min: 7.0, avg: 8.5, max: 10.0 }),
            ("discovery-gardens", YieldBenchmark { min: 7.5, avg: 9.0, max: 11.0 }),
        ];

        Self {
            undervalued_ratio: 0.90,
            overvalued_ratio: 1.10,
            yield_attractive_mult: 1.1,
            yield_low_mult: 0.9,
            yield_benchmarks: yields
                .into_iter()
                .map(|(slug, b)| (slug.to_string(), b))
                .collect(),
            default_yield_avg: 6.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Signal types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSignal {
    Undervalued,
    Neutral,
    Overvalued,
}

impl fmt::Display for PriceSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSignal::Undervalued => write!(f, "undervalued"),
            PriceSignal::Neutral => write!(f, "neutral"),
            PriceSignal::Overvalued => write!(f, "overvalued"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldSignal {
    Attractive,
    Neutral,
    Low,
}

impl fmt::Display for YieldSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldSignal::Attractive => write!(f, "attractive"),
            YieldSignal::Neutral => write!(f, "neutral"),
            YieldSignal::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongBuy,
    Buy,
    Hold,
    Avoid,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::StrongBuy => write!(f, "STRONG BUY"),
            Verdict::Buy => write!(f, "BUY"),
            Verdict::Hold => write!(f, "HOLD"),
            Verdict::Avoid => write!(f, "AVOID"),
        }
    }
}

/// Complete signal set for one analyzed property.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationSignals {
    pub price_signal: PriceSignal,
    pub yield_signal: YieldSignal,
    pub verdict: Verdict,
    pub confidence: Confidence,
    /// Asking price divided by estimated value.
    pub price_to_estimate_ratio: f64,
    pub key_factors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Access the signal configuration.
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Classify an analyzed property.
    ///
    /// `gross_yield_pct` is `None` when no rental estimate was
    /// possible; the yield signal stays neutral in that case.
    pub fn generate(
        &self,
        asking_price: f64,
        estimated_value: f64,
        gross_yield_pct: Option<f64>,
        neighborhood_slug: Option<&str>,
        confidence: Confidence,
    ) -> ValuationSignals {
        let ratio = asking_price / estimated_value;
        let mut key_factors = Vec::new();

        let price_signal = if ratio < self.config.undervalued_ratio {
            key_factors.push(format!("Priced {:.1}% below estimate", (1.0 - ratio) * 100.0));
            PriceSignal::Undervalued
        } else if ratio > self.config.overvalued_ratio {
            key_factors.push(format!("Priced {:.1}% above estimate", (ratio - 1.0) * 100.0));
            PriceSignal::Overvalued
        } else {
            PriceSignal::Neutral
        };

        let benchmark = neighborhood_slug
            .and_then(|slug| self.config.yield_benchmarks.get(slug))
            .map(|b| b.avg)
            .unwrap_or(self.config.default_yield_avg);

        let yield_signal = match gross_yield_pct {
            Some(y) if y > benchmark * self.config.yield_attractive_mult => {
                key_factors.push(format!(
                    "Yield {y:.1}% above the {benchmark:.1}% area average"
                ));
                YieldSignal::Attractive
            }
            Some(y) if y < benchmark * self.config.yield_low_mult => {
                key_factors.push("Yield below area average".to_string());
                YieldSignal::Low
            }
            _ => YieldSignal::Neutral,
        };

        let verdict = match (price_signal, yield_signal) {
            (PriceSignal::Undervalued, YieldSignal::Attractive) => Verdict::StrongBuy,
            (PriceSignal::Undervalued, _) | (_, YieldSignal::Attractive) => Verdict::Buy,
            (PriceSignal::Overvalued, _) | (_, YieldSignal::Low) => Verdict::Avoid,
            _ => Verdict::Hold,
        };

        ValuationSignals {
            price_signal,
            yield_signal,
            verdict,
            confidence,
            price_to_estimate_ratio: ratio,
            key_factors,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
