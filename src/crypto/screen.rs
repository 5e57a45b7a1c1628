//! The 60-second undervalued test.
//!
//! Quick cryptocurrency screen from three numbers: inflation rate
//! (new coins per year over circulating supply), fully-diluted market
//! cap, and the FDMC to value-locked ratio. Each is classified into a
//! signal and the signals combine into an overall verdict.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::types::{CoinSnapshot, WhitepaperInputs};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Classification thresholds.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Annual inflation above this is high (percent).
    pub high_inflation_pct: f64,
    /// Annual inflation above this is medium (percent).
    pub medium_inflation_pct: f64,
    /// FDMC/value-locked below this is undervalued.
    pub undervalued_ratio: f64,
    /// FDMC/value-locked below this is fair value; above, overvalued.
    pub fair_value_ratio: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            high_inflation_pct: 10.0,
            medium_inflation_pct: 3.0,
            undervalued_ratio: 3.0,
            fair_value_ratio: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Signals & verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InflationSignal {
    Low,
    Medium,
    High,
}

impl fmt::Display for InflationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InflationSignal::Low => write!(f, "low_inflation"),
            InflationSignal::Medium => write!(f, "medium_inflation"),
            InflationSignal::High => write!(f, "high_inflation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSignal {
    Undervalued,
    FairValue,
    Overvalued,
    InsufficientData,
}

impl fmt::Display for ValuationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuationSignal::Undervalued => write!(f, "undervalued"),
            ValuationSignal::FairValue => write!(f, "fair_value"),
            ValuationSignal::Overvalued => write!(f, "overvalued"),
            ValuationSignal::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoVerdict {
    StrongBuy,
    Buy,
    Hold,
    HoldMonitor,
    AvoidOvervalued,
    AvoidHighInflation,
    InsufficientData,
}

impl fmt::Display for CryptoVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoVerdict::StrongBuy => write!(f, "STRONG BUY"),
            CryptoVerdict::Buy => write!(f, "BUY"),
            CryptoVerdict::Hold => write!(f, "HOLD"),
            CryptoVerdict::HoldMonitor => write!(f, "HOLD - Monitor"),
            CryptoVerdict::AvoidOvervalued => write!(f, "AVOID - Overvalued"),
            CryptoVerdict::AvoidHighInflation => write!(f, "AVOID - High Inflation"),
            CryptoVerdict::InsufficientData => write!(f, "INSUFFICIENT DATA"),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Result of the undervalued test for one coin.
#[derive(Debug, Clone, Serialize)]
pub struct CryptoScreenReport {
    pub coin_name: String,
    pub symbol: String,
    pub price: f64,
    pub circulating_supply: f64,
    pub max_supply: Option<f64>,
    /// Annual inflation in percent.
    pub inflation_rate: f64,
    /// Fully-diluted market cap; absent without a supply cap.
    pub fdmc: Option<f64>,
    pub value_locked: f64,
    /// FDMC / value locked; absent when either input is missing.
    pub value_ratio: Option<f64>,
    pub inflation_signal: InflationSignal,
    pub valuation_signal: ValuationSignal,
    pub verdict: CryptoVerdict,
    pub reasoning: Vec<String>,
}

impl fmt::Display for CryptoScreenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.coin_name, self.symbol)?;
        writeln!(f, "Price: ${:.2}", self.price)?;
        writeln!(f, "Inflation rate: {:.2}%", self.inflation_rate)?;
        if let Some(fdmc) = self.fdmc {
            writeln!(f, "FDMC: ${fdmc:.0}")?;
        }
        writeln!(f, "Value locked: ${:.0}", self.value_locked)?;
        if let Some(ratio) = self.value_ratio {
            writeln!(f, "FDMC/Value ratio: {ratio:.2}x")?;
        }
        writeln!(f, "Verdict: {}", self.verdict)?;
        for reason in &self.reasoning {
            writeln!(f, "  - {reason}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Screen
// ---------------------------------------------------------------------------

/// Run the undervalued test against a market snapshot and the manually
/// supplied whitepaper metrics. Pure — a missing ratio is a signal, not
/// an error.
pub fn undervalued_test(
    snapshot: &CoinSnapshot,
    inputs: &WhitepaperInputs,
    config: &ScreenConfig,
) -> CryptoScreenReport {
    let inflation_rate = if snapshot.circulating_supply > 0.0 {
        inputs.new_coins_per_year / snapshot.circulating_supply * 100.0
    } else {
        0.0
    };

    let fdmc = snapshot.diluted_supply().map(|supply| snapshot.price * supply);

    let value_ratio = match fdmc {
        Some(fdmc) if inputs.value_locked_usd > 0.0 => Some(fdmc / inputs.value_locked_usd),
        _ => None,
    };

    let inflation_signal = classify_inflation(inflation_rate, config);
    let valuation_signal = classify_valuation(value_ratio, config);
    let verdict = determine_verdict(inflation_signal, valuation_signal);

    debug!(
        coin = %snapshot.name,
        inflation = format!("{inflation_rate:.2}%"),
        ratio = ?value_ratio,
        verdict = %verdict,
        "Undervalued test complete"
    );

    CryptoScreenReport {
        coin_name: snapshot.name.clone(),
        symbol: snapshot.symbol.clone(),
        price: snapshot.price,
        circulating_supply: snapshot.circulating_supply,
        max_supply: snapshot.diluted_supply(),
        inflation_rate,
        fdmc,
        value_locked: inputs.value_locked_usd,
        value_ratio,
        inflation_signal,
        valuation_signal,
        verdict,
        reasoning: reasoning(inflation_signal, valuation_signal, inflation_rate, value_ratio),
    }
}

fn classify_inflation(rate_pct: f64, config: &ScreenConfig) -> InflationSignal {
    if rate_pct > config.high_inflation_pct {
        InflationSignal::High
    } else if rate_pct > config.medium_inflation_pct {
        InflationSignal::Medium
    } else {
        InflationSignal::Low
    }
}

fn classify_valuation(ratio: Option<f64>, config: &ScreenConfig) -> ValuationSignal {
    match ratio {
        None => ValuationSignal::InsufficientData,
        Some(r) if r < config.undervalued_ratio => ValuationSignal::Undervalued,
        Some(r) if r < config.fair_value_ratio => ValuationSignal::FairValue,
        Some(_) => ValuationSignal::Overvalued,
    }
}

fn determine_verdict(inflation: InflationSignal, valuation: ValuationSignal) -> CryptoVerdict {
    if inflation == InflationSignal::High {
        return CryptoVerdict::AvoidHighInflation;
    }
    match (valuation, inflation) {
        (ValuationSignal::InsufficientData, _) => CryptoVerdict::InsufficientData,
        (ValuationSignal::Undervalued, InflationSignal::Low) => CryptoVerdict::StrongBuy,
        (ValuationSignal::Undervalued, _) => CryptoVerdict::Buy,
        (ValuationSignal::FairValue, InflationSignal::Low) => CryptoVerdict::Hold,
        (ValuationSignal::Overvalued, _) => CryptoVerdict::AvoidOvervalued,
        _ => CryptoVerdict::HoldMonitor,
    }
}

fn reasoning(
    inflation: InflationSignal,
    valuation: ValuationSignal,
    inflation_rate: f64,
    value_ratio: Option<f64>,
) -> Vec<String> {
    let mut reasons = Vec::new();

    match inflation {
        InflationSignal::Low => {
            reasons.push(format!("Low inflation rate ({inflation_rate:.1}%) indicates scarcity"))
        }
        InflationSignal::Medium => reasons.push(format!(
            "Moderate inflation rate ({inflation_rate:.1}%) - acceptable but monitor"
        )),
        InflationSignal::High => reasons.push(format!(
            "High inflation rate ({inflation_rate:.1}%) reduces scarcity value"
        )),
    }

    if let Some(ratio) = value_ratio {
        match valuation {
            ValuationSignal::Undervalued => {
                reasons.push(format!("FDMC/Value ratio of {ratio:.1}x suggests undervaluation"))
            }
            ValuationSignal::FairValue => {
                reasons.push(format!("FDMC/Value ratio of {ratio:.1}x indicates fair pricing"))
            }
            ValuationSignal::Overvalued => {
                reasons.push(format!("FDMC/Value ratio of {ratio:.1}x suggests overvaluation"))
            }
            ValuationSignal::InsufficientData => {}
        }
    }

    reasons
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
