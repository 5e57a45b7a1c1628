//! Rental income estimation.
//!
//! Annual-rent bands per neighborhood and bedroom count, with a
//! rate-per-area fallback when no band covers the target. Bands are
//! caller-supplied configuration so they can be retuned without code
//! changes; the defaults carry 2024 Dubai market figures.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::types::{ListingRecord, OuvcError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Annual rent band (min, max) in the listing currency.
pub type RentBand = (f64, f64);

#[derive(Debug, Clone)]
pub struct RentalConfig {
    /// neighborhood slug → bedroom count → annual rent band.
    pub bands: HashMap<String, HashMap<u32, RentBand>>,
    /// Annual rent per area unit used when no band matches.
    pub fallback_rate_per_area: f64,
    /// Spread applied around the fallback midpoint (0.2 = ±20%).
    pub fallback_spread: f64,
}

impl Default for RentalConfig {
    fn default() -> Self {
        let mut bands: HashMap<String, HashMap<u32, RentBand>> = HashMap::new();

        bands.insert(
            "dubai-marina".to_string(),
            HashMap::from([
                (1, (80_000.0, 120_000.0)),
                (2, (120_000.0, 180_000.0)),
                (3, (180_000.0, 280_000.0)),
            ]),
        );
        bands.insert(
            "downtown-dubai".to_string(),
            HashMap::from([
                (0, (60_000.0, 90_000.0)),
                (1, (80_000.0, 120_000.0)),
                (2, (130_000.0, 200_000.0)),
            ]),
        );
        bands.insert(
            "business-bay".to_string(),
            HashMap::from([
                (1, (70_000.0, 110_000.0)),
                (2, (110_000.0, 170_000.0)),
                (3, (170_000.0, 250_000.0)),
            ]),
        );
        bands.insert(
            "jvc".to_string(),
            HashMap::from([
                (1, (45_000.0, 70_000.0)),
                (2, (70_000.0, 110_000.0)),
                (3, (110_000.0, 160_000.0)),
            ]),
        );

        Self {
            bands,
            fallback_rate_per_area: 80.0,
            fallback_spread: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RentalEstimate {
    pub min_annual_rent: f64,
    pub avg_annual_rent: f64,
    pub max_annual_rent: f64,
    /// Whether the estimate came from a configured band (as opposed to
    /// the rate-per-area fallback).
    pub from_band: bool,
}

impl RentalEstimate {
    /// Gross rental yield in percent against a property value.
    pub fn gross_yield_pct(&self, property_value: f64) -> Option<f64> {
        if property_value > 0.0 {
            Some(self.avg_annual_rent / property_value * 100.0)
        } else {
            None
        }
    }
}

impl fmt::Display for RentalEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rent {:.0}–{:.0}/yr (avg {:.0})",
            self.min_annual_rent, self.max_annual_rent, self.avg_annual_rent,
        )
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

pub struct RentalEstimator {
    config: RentalConfig,
}

impl RentalEstimator {
    pub fn new(config: RentalConfig) -> Self {
        Self { config }
    }

    /// Estimate annual rent for a target property.
    ///
    /// Uses the configured band for the target's neighborhood and
    /// bedroom count when one exists; otherwise falls back to the
    /// per-area rate, which requires a known area — with neither,
    /// fails with `InsufficientData`.
    pub fn estimate(&self, target: &ListingRecord) -> Result<RentalEstimate, OuvcError> {
        if let (Some(hood), Some(rooms)) = (target.neighborhood(), target.rooms) {
            if let Some((min, max)) = self
                .config
                .bands
                .get(&hood.slug)
                .and_then(|by_rooms| by_rooms.get(&rooms))
            {
                debug!(slug = %hood.slug, rooms, "Rent band matched");
                return Ok(RentalEstimate {
                    min_annual_rent: *min,
                    avg_annual_rent: (min + max) / 2.0,
                    max_annual_rent: *max,
                    from_band: true,
                });
            }
        }

        let area = target.area.filter(|a| *a > 0.0).ok_or_else(|| {
            OuvcError::InsufficientData(format!(
                "no rent band for target {} and area unknown",
                target.id
            ))
        })?;

        let base = area * self.config.fallback_rate_per_area;
        let spread = self.config.fallback_spread;
        Ok(RentalEstimate {
            min_annual_rent: base * (1.0 - spread),
            avg_annual_rent: base,
            max_annual_rent: base * (1.0 + spread),
            from_band: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
