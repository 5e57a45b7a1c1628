//! Valuation engine — comparable selection, estimation, rent, signals.

pub mod comparables;
pub mod estimator;
pub mod rental;
pub mod signals;

use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::types::{ListingRecord, OuvcError};
use comparables::ComparableSelector;
use estimator::{ValuationEstimate, ValuationEstimator};
use rental::{RentalEstimate, RentalEstimator};
use signals::{SignalGenerator, ValuationSignals};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Full analysis of one target property.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyAnalysis {
    pub target_id: String,
    pub asking_price: f64,
    pub estimate: ValuationEstimate,
    /// ±10% band around the estimate.
    pub confidence_low: f64,
    pub confidence_high: f64,
    /// Absent when no rental estimate was possible for the target.
    pub rental: Option<RentalEstimate>,
    pub gross_yield_pct: Option<f64>,
    pub signals: ValuationSignals,
    pub comparable_count: usize,
    /// Absent when the outlier test had too few samples.
    pub is_outlier: Option<bool>,
}

impl fmt::Display for PropertyAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Estimated value: {:.0}", self.estimate.estimated_value)?;
        writeln!(
            f,
            "Confidence range: {:.0} – {:.0}",
            self.confidence_low, self.confidence_high
        )?;
        writeln!(
            f,
            "Price vs estimate: {:.2}x ({})",
            self.signals.price_to_estimate_ratio, self.signals.price_signal
        )?;
        if let Some(y) = self.gross_yield_pct {
            writeln!(f, "Expected rental yield: {y:.2}% ({})", self.signals.yield_signal)?;
        }
        writeln!(f, "Comparable properties: {}", self.comparable_count)?;
        if self.is_outlier == Some(true) {
            writeln!(f, "Note: target price-per-area is a statistical outlier")?;
        }
        writeln!(f, "Verdict: {} (confidence: {})", self.signals.verdict, self.signals.confidence)?;
        for factor in &self.signals.key_factors {
            writeln!(f, "  - {factor}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipelines comparable selection → valuation → rent → signals.
///
/// Pure and synchronous: each call operates on the caller-supplied
/// target and pool, with no shared state between invocations.
pub struct ValuationPipeline {
    selector: ComparableSelector,
    estimator: ValuationEstimator,
    rental: RentalEstimator,
    signals: SignalGenerator,
}

impl ValuationPipeline {
    pub fn new(
        selector: ComparableSelector,
        estimator: ValuationEstimator,
        rental: RentalEstimator,
        signals: SignalGenerator,
    ) -> Self {
        Self {
            selector,
            estimator,
            rental,
            signals,
        }
    }

    /// Analyze a target against a pool of candidate listings.
    ///
    /// Selection degrades gracefully to fewer comparables; estimation
    /// fails hard (`InsufficientData`) when nothing usable survives.
    /// Rental estimation and the outlier test are best-effort: their
    /// absence is reported as `None`, not an error.
    pub fn analyze(
        &self,
        target: &ListingRecord,
        pool: &[ListingRecord],
    ) -> Result<PropertyAnalysis, OuvcError> {
        let comps = self.selector.select(target, pool)?;
        info!(
            target_id = %target.id,
            pool = pool.len(),
            comparables = comps.len(),
            "Comparables selected"
        );

        if comps.len() < self.selector.config().min_comparables {
            warn!(
                comparables = comps.len(),
                minimum = self.selector.config().min_comparables,
                "Below minimum comparable count — estimate will be low-confidence"
            );
        }

        let estimate = self.estimator.estimate(target, &comps)?;

        let rental = match self.rental.estimate(target) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "No rental estimate for target");
                None
            }
        };
        let gross_yield_pct = rental
            .as_ref()
            .and_then(|r| r.gross_yield_pct(estimate.estimated_value));

        let is_outlier = self.estimator.is_outlier(target, &comps).ok();

        let signals = self.signals.generate(
            target.price,
            estimate.estimated_value,
            gross_yield_pct,
            target.neighborhood().map(|l| l.slug.as_str()),
            estimate.confidence,
        );

        info!(
            target_id = %target.id,
            estimate = format!("{:.0}", estimate.estimated_value),
            verdict = %signals.verdict,
            confidence = %signals.confidence,
            "Analysis complete"
        );

        Ok(PropertyAnalysis {
            target_id: target.id.clone(),
            asking_price: target.price,
            confidence_low: estimate.estimated_value * 0.9,
            confidence_high: estimate.estimated_value * 1.1,
            rental,
            gross_yield_pct,
            signals,
            comparable_count: comps.len(),
            is_outlier,
            estimate,
        })
    }
}

impl Default for ValuationPipeline {
    fn default() -> Self {
        Self::new(
            ComparableSelector::new(Default::default()),
            ValuationEstimator::new(Default::default()),
            RentalEstimator::new(Default::default()),
            SignalGenerator::new(Default::default()),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn make_comp(id: &str, price: f64, area: f64) -> ListingRecord {
        let mut rec = ListingRecord::sample();
        rec.id = id.to_string();
        rec.price = price;
        rec.area = Some(area);
        rec
    }

    fn make_pool(n: usize, ppa: f64) -> Vec<ListingRecord> {
        (0..n)
            .map(|i| make_comp(&format!("P{i}"), ppa * 1100.0, 1100.0))
            .collect()
    }

    fn make_target(price: f64) -> ListingRecord {
        let mut rec = ListingRecord::sample();
        rec.id = "TARGET".to_string();
        rec.price = price;
        rec.area = Some(1000.0);
        rec
    }

    #[test]
    fn test_full_analysis_flat_market() {
        let pipeline = ValuationPipeline::default();
        // 6 comps at 1500/unit; target asks 2.0M on ~1.53M estimate.
        let pool = make_pool(6, 1500.0);
        let analysis = pipeline.analyze(&make_target(2_000_000.0), &pool).unwrap();

        assert_eq!(analysis.comparable_count, 6);
        assert_eq!(analysis.estimate.confidence, Confidence::Medium);
        // median 1500 × 1000 area × 1.02 verified premium, amenity
        // factor 1.0 (identical sets).
        assert!((analysis.estimate.estimated_value - 1_530_000.0).abs() < 1.0);
        assert_eq!(analysis.signals.price_signal, signals::PriceSignal::Overvalued);
        assert!(analysis.rental.is_some());
        assert!(analysis.gross_yield_pct.is_some());
        // A zero-spread pool flags any deviating target.
        assert_eq!(analysis.is_outlier, Some(true));
    }

    #[test]
    fn test_small_pool_is_low_confidence() {
        let pipeline = ValuationPipeline::default();
        let pool = make_pool(3, 2000.0);
        let analysis = pipeline.analyze(&make_target(2_000_000.0), &pool).unwrap();
        assert_eq!(analysis.comparable_count, 3);
        assert_eq!(analysis.estimate.confidence, Confidence::Low);
    }

    #[test]
    fn test_empty_pool_fails_with_insufficient_data() {
        let pipeline = ValuationPipeline::default();
        let err = pipeline.analyze(&make_target(2_000_000.0), &[]).unwrap_err();
        assert!(matches!(err, OuvcError::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_target_propagates() {
        let pipeline = ValuationPipeline::default();
        let mut target = make_target(2_000_000.0);
        target.area = None;
        let err = pipeline.analyze(&target, &make_pool(6, 2000.0)).unwrap_err();
        assert!(matches!(err, OuvcError::InvalidTarget(_)));
    }

    #[test]
    fn test_outlier_none_with_single_comp() {
        let pipeline = ValuationPipeline::default();
        let pool = make_pool(1, 2000.0);
        let analysis = pipeline.analyze(&make_target(2_000_000.0), &pool).unwrap();
        assert_eq!(analysis.is_outlier, None);
    }

    #[test]
    fn test_confidence_band_is_ten_percent() {
        let pipeline = ValuationPipeline::default();
        let analysis = pipeline
            .analyze(&make_target(2_000_000.0), &make_pool(6, 2000.0))
            .unwrap();
        let est = analysis.estimate.estimated_value;
        assert!((analysis.confidence_low - est * 0.9).abs() < 1e-6);
        assert!((analysis.confidence_high - est * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_display_report() {
        let pipeline = ValuationPipeline::default();
        let analysis = pipeline
            .analyze(&make_target(2_000_000.0), &make_pool(6, 1500.0))
            .unwrap();
        let report = format!("{analysis}");
        assert!(report.contains("Estimated value"));
        assert!(report.contains("Verdict"));
        assert!(report.contains("Comparable properties: 6"));
    }
}
