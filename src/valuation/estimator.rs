//! Valuation estimation.
//!
//! Aggregates price-per-area statistics over a comparable set and
//! projects an estimated value for the target: median price-per-area
//! (median, not mean — robust to outliers) scaled by the target's area,
//! with an amenity adjustment and a verified-listing premium.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::types::{Confidence, ListingRecord, OuvcError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Estimator tuning.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Bounds on the amenity adjustment factor. The lower/upper clamp
    /// keeps sparse amenity data from scaling an estimate away.
    pub amenity_clamp_min: f64,
    pub amenity_clamp_max: f64,
    /// Multiplier applied when the target itself is a verified listing.
    pub verified_premium: f64,
    /// |z-score| above which a target's price-per-area is an outlier.
    pub outlier_z_threshold: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            amenity_clamp_min: 0.5,
            amenity_clamp_max: 1.5,
            verified_premium: 1.02,
            outlier_z_threshold: 3.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

/// Result of a valuation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationEstimate {
    pub estimated_value: f64,
    /// Median price-per-area over the usable comparables.
    pub median_price_per_area: f64,
    /// Amenity adjustment applied (already folded into the value).
    pub amenity_factor: f64,
    /// Number of comparables with a usable price-per-area.
    pub samples_used: usize,
    /// Tier derived from the full comparable count.
    pub confidence: Confidence,
}

impl fmt::Display for ValuationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "est={:.0} (median {:.0}/unit × amenity {:.2}) over {} samples [{}]",
            self.estimated_value,
            self.median_price_per_area,
            self.amenity_factor,
            self.samples_used,
            self.confidence,
        )
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

pub struct ValuationEstimator {
    config: EstimatorConfig,
}

impl ValuationEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Access the estimator configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate the target's value from its comparables.
    ///
    /// Fails with `InvalidTarget` when the target has no known positive
    /// area, and `InsufficientData` when zero comparables carry a usable
    /// price-per-area.
    pub fn estimate(
        &self,
        target: &ListingRecord,
        comparables: &[ListingRecord],
    ) -> Result<ValuationEstimate, OuvcError> {
        let target_area = match target.area {
            Some(a) if a > 0.0 => a,
            _ => {
                return Err(OuvcError::InvalidTarget(format!(
                    "target {} has unknown area",
                    target.id
                )))
            }
        };

        let per_area: Vec<f64> = comparables
            .iter()
            .filter_map(|c| c.price_per_area())
            .collect();

        if per_area.is_empty() {
            return Err(OuvcError::InsufficientData(
                "no comparables with a known positive area".to_string(),
            ));
        }

        let median_ppa = median(&per_area);
        let amenity_factor = self.amenity_factor(target, comparables);

        let mut estimated_value = median_ppa * target_area * amenity_factor;
        if target.is_verified {
            estimated_value *= self.config.verified_premium;
        }

        let confidence = Confidence::from_comparable_count(comparables.len());

        debug!(
            target_id = %target.id,
            median_ppa = format!("{median_ppa:.1}"),
            amenity_factor = format!("{amenity_factor:.2}"),
            estimate = format!("{estimated_value:.0}"),
            confidence = %confidence,
            "Valuation estimated"
        );

        Ok(ValuationEstimate {
            estimated_value,
            median_price_per_area: median_ppa,
            amenity_factor,
            samples_used: per_area.len(),
            confidence,
        })
    }

    /// Whether the target's price-per-area sits more than the z
    /// threshold away from the comparable population.
    ///
    /// Fails with `InsufficientData` below 2 samples (the standard
    /// deviation is undefined) and `InvalidTarget` when the target has
    /// no computable price-per-area. A zero-deviation population
    /// degenerates to "any difference from the mean is an outlier".
    pub fn is_outlier(
        &self,
        target: &ListingRecord,
        comparables: &[ListingRecord],
    ) -> Result<bool, OuvcError> {
        let target_ppa = target.price_per_area().ok_or_else(|| {
            OuvcError::InvalidTarget(format!(
                "target {} has no computable price-per-area",
                target.id
            ))
        })?;

        let per_area: Vec<f64> = comparables
            .iter()
            .filter_map(|c| c.price_per_area())
            .collect();

        if per_area.len() < 2 {
            return Err(OuvcError::InsufficientData(format!(
                "outlier test needs at least 2 comparables, got {}",
                per_area.len()
            )));
        }

        let m = mean(&per_area);
        let sd = std_deviation(&per_area, m);

        if sd == 0.0 {
            return Ok((target_ppa - m).abs() > f64::EPSILON);
        }

        let z = (target_ppa - m) / sd;
        debug!(
            target_id = %target.id,
            z_score = format!("{z:.2}"),
            "Outlier test"
        );
        Ok(z.abs() > self.config.outlier_z_threshold)
    }

    /// Amenity adjustment: target amenity count relative to the mean
    /// comparable amenity count, clamped. A zero mean (no comparable
    /// lists any amenities) yields a neutral factor.
    fn amenity_factor(&self, target: &ListingRecord, comparables: &[ListingRecord]) -> f64 {
        if comparables.is_empty() {
            return 1.0;
        }
        let mean_amenities = comparables
            .iter()
            .map(|c| c.amenities.len() as f64)
            .sum::<f64>()
            / comparables.len() as f64;

        if mean_amenities == 0.0 {
            return 1.0;
        }

        let raw = target.amenities.len() as f64 / mean_amenities;
        raw.clamp(self.config.amenity_clamp_min, self.config.amenity_clamp_max)
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Median of a non-empty slice.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_deviation(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn make_comp(id: &str, price: f64, area: f64, amenity_count: usize) -> ListingRecord {
        let mut rec = ListingRecord::sample();
        rec.id = id.to_string();
        rec.price = price;
        rec.area = Some(area);
        rec.amenities = (0..amenity_count).map(|i| format!("amenity-{i}")).collect();
        rec
    }

    /// N comparables all at exactly `ppa` price-per-area.
    fn uniform_comps(n: usize, ppa: f64, amenity_count: usize) -> Vec<ListingRecord> {
        (0..n)
            .map(|i| make_comp(&format!("C{i}"), ppa * 1000.0, 1000.0, amenity_count))
            .collect()
    }

    fn make_target(amenity_count: usize) -> ListingRecord {
        let mut rec = make_comp("TARGET", 2_000_000.0, 1000.0, amenity_count);
        rec.is_verified = true;
        rec
    }

    fn estimator() -> ValuationEstimator {
        ValuationEstimator::new(EstimatorConfig::default())
    }

    #[test]
    fn test_flat_market_estimate() {
        // 6 comps at 2000/unit, target 1000 units, matching amenity
        // counts → estimate = 2000 × 1000 × 1.0 × 1.02 premium.
        let comps = uniform_comps(6, 2000.0, 3);
        let target = make_target(3);
        let est = estimator().estimate(&target, &comps).unwrap();

        assert!((est.median_price_per_area - 2000.0).abs() < 1e-10);
        assert!((est.amenity_factor - 1.0).abs() < 1e-10);
        assert!((est.estimated_value - 2_000_000.0 * 1.02).abs() < 1.0);
        assert_eq!(est.confidence, Confidence::Medium);
    }

    #[test]
    fn test_unverified_target_no_premium() {
        let comps = uniform_comps(6, 2000.0, 3);
        let mut target = make_target(3);
        target.is_verified = false;
        let est = estimator().estimate(&target, &comps).unwrap();
        assert!((est.estimated_value - 2_000_000.0).abs() < 1.0);
    }

    #[test]
    fn test_median_robust_to_outlier() {
        let mut comps = uniform_comps(4, 2000.0, 3);
        comps.push(make_comp("WILD", 9_000_000.0, 1000.0, 3)); // 9000/unit
        let est = estimator().estimate(&make_target(3), &comps).unwrap();
        // Median of [2000, 2000, 2000, 2000, 9000] is still 2000.
        assert!((est.median_price_per_area - 2000.0).abs() < 1e-10);
    }

    #[test]
    fn test_even_sample_median_interpolates() {
        let comps = vec![
            make_comp("A", 1_800_000.0, 1000.0, 0),
            make_comp("B", 2_200_000.0, 1000.0, 0),
        ];
        let est = estimator().estimate(&make_target(0), &comps).unwrap();
        assert!((est.median_price_per_area - 2000.0).abs() < 1e-10);
    }

    #[test]
    fn test_estimate_monotonic_in_area() {
        let comps = uniform_comps(6, 2000.0, 3);
        let mut small = make_target(3);
        small.area = Some(800.0);
        let mut big = make_target(3);
        big.area = Some(1600.0);

        let est_small = estimator().estimate(&small, &comps).unwrap();
        let est_big = estimator().estimate(&big, &comps).unwrap();
        assert!((est_big.estimated_value / est_small.estimated_value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_amenity_factor_clamped_high() {
        // Target loaded with amenities, comps with one each → raw
        // factor 10, clamped at 1.5.
        let comps = uniform_comps(5, 2000.0, 1);
        let target = make_target(10);
        let est = estimator().estimate(&target, &comps).unwrap();
        assert!((est.amenity_factor - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_amenity_factor_clamped_low() {
        let comps = uniform_comps(5, 2000.0, 8);
        let target = make_target(0);
        let est = estimator().estimate(&target, &comps).unwrap();
        assert!((est.amenity_factor - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_amenity_factor_neutral_when_comps_have_none() {
        let comps = uniform_comps(5, 2000.0, 0);
        let target = make_target(4);
        let est = estimator().estimate(&target, &comps).unwrap();
        assert!((est.amenity_factor - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_comps_without_area_are_discarded() {
        let mut comps = uniform_comps(3, 2000.0, 3);
        let mut no_area = make_comp("NOAREA", 5_000_000.0, 1.0, 3);
        no_area.area = None;
        comps.push(no_area);
        let est = estimator().estimate(&make_target(3), &comps).unwrap();
        assert_eq!(est.samples_used, 3);
        assert!((est.median_price_per_area - 2000.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_usable_comps_fails() {
        let mut comps = uniform_comps(2, 2000.0, 3);
        for c in &mut comps {
            c.area = None;
        }
        let err = estimator().estimate(&make_target(3), &comps).unwrap_err();
        assert!(matches!(err, OuvcError::InsufficientData(_)));
    }

    #[test]
    fn test_target_without_area_fails() {
        let comps = uniform_comps(5, 2000.0, 3);
        let mut target = make_target(3);
        target.area = None;
        let err = estimator().estimate(&target, &comps).unwrap_err();
        assert!(matches!(err, OuvcError::InvalidTarget(_)));
    }

    #[test]
    fn test_confidence_tiers_from_comp_count() {
        let target = make_target(3);
        let est = estimator().estimate(&target, &uniform_comps(3, 2000.0, 3)).unwrap();
        assert_eq!(est.confidence, Confidence::Low);
        let est = estimator().estimate(&target, &uniform_comps(7, 2000.0, 3)).unwrap();
        assert_eq!(est.confidence, Confidence::Medium);
        let est = estimator().estimate(&target, &uniform_comps(12, 2000.0, 3)).unwrap();
        assert_eq!(est.confidence, Confidence::High);
    }

    // -- is_outlier --

    #[test]
    fn test_outlier_far_target() {
        // Comps clustered at 2000 ± small noise; target at 6000.
        let comps = vec![
            make_comp("A", 1_950_000.0, 1000.0, 0),
            make_comp("B", 2_000_000.0, 1000.0, 0),
            make_comp("C", 2_050_000.0, 1000.0, 0),
            make_comp("D", 2_000_000.0, 1000.0, 0),
        ];
        let mut target = make_target(0);
        target.price = 6_000_000.0;
        assert!(estimator().is_outlier(&target, &comps).unwrap());
    }

    #[test]
    fn test_inlier_target() {
        let comps = vec![
            make_comp("A", 1_900_000.0, 1000.0, 0),
            make_comp("B", 2_000_000.0, 1000.0, 0),
            make_comp("C", 2_100_000.0, 1000.0, 0),
        ];
        let target = make_target(0); // 2000/unit, right at the mean
        assert!(!estimator().is_outlier(&target, &comps).unwrap());
    }

    #[test]
    fn test_outlier_single_comp_fails() {
        let comps = uniform_comps(1, 2000.0, 0);
        let err = estimator().is_outlier(&make_target(0), &comps).unwrap_err();
        assert!(matches!(err, OuvcError::InsufficientData(_)));
    }

    #[test]
    fn test_outlier_zero_deviation_population() {
        let comps = uniform_comps(4, 2000.0, 0);
        // Target exactly at the degenerate mean → not an outlier.
        assert!(!estimator().is_outlier(&make_target(0), &comps).unwrap());
        // Any deviation from a zero-spread population is an outlier.
        let mut off = make_target(0);
        off.price = 2_100_000.0;
        assert!(estimator().is_outlier(&off, &comps).unwrap());
    }

    #[test]
    fn test_outlier_target_without_ppa_fails() {
        let comps = uniform_comps(4, 2000.0, 0);
        let mut target = make_target(0);
        target.area = None;
        let err = estimator().is_outlier(&target, &comps).unwrap_err();
        assert!(matches!(err, OuvcError::InvalidTarget(_)));
    }

    // -- statistics helpers --

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn test_std_deviation_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert!((std_deviation(&values, m) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_amenity_sets_from_sample() {
        // BTreeSet dedups amenity strings.
        let mut rec = ListingRecord::sample();
        rec.amenities = ["Gym", "Gym", "Pool"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        assert_eq!(rec.amenities.len(), 2);
    }
}
