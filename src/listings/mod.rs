//! Listing sources.
//!
//! Defines the `ListingSource` trait and provides implementations for:
//! - Bayut (RapidAPI) — live UAE listing search
//! - Demo — deterministic in-memory pool for keyless operation
//!
//! Sources return normalized `ListingRecord`s; all raw-payload handling
//! lives behind this boundary.

pub mod bayut;
pub mod demo;
pub mod normalize;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ListingRecord, Purpose};

/// Search parameters accepted by every listing source.
///
/// Bands are optional; a source passes along whatever the upstream API
/// supports and the comparable selector re-filters precisely.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Location slug or free text (e.g. "dubai-marina"); sources resolve
    /// this to their own location identifiers.
    pub location: String,
    pub purpose: Purpose,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub rooms: Option<u32>,
    /// Upper bound on result pages fetched from the upstream API.
    pub max_pages: u32,
}

impl SearchQuery {
    /// A query centred on a target property: price within ±40% and area
    /// within ±20%, matching the bands the comparable selector will
    /// apply downstream.
    pub fn around(location: &str, purpose: Purpose, price: f64, area: Option<f64>, rooms: Option<u32>) -> Self {
        Self {
            location: location.to_string(),
            purpose,
            price_min: Some(price * 0.6),
            price_max: Some(price * 1.4),
            area_min: area.map(|a| a * 0.7),
            area_max: area.map(|a| a * 1.3),
            rooms,
            max_pages: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Target specification
// ---------------------------------------------------------------------------

/// User-supplied description of the property under analysis.
///
/// A target is not itself a fetched listing, so its location hierarchy
/// is grafted from the pool returned by the same search — that keeps
/// the neighborhood external-id comparison meaningful.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TargetSpec {
    /// Location slug or Bayut external id, e.g. "dubai-marina".
    pub location: String,
    pub purpose: Purpose,
    /// Asking price.
    pub price: f64,
    /// Floor area in square units.
    pub area: Option<f64>,
    pub rooms: Option<u32>,
    #[serde(default)]
    pub baths: Option<u32>,
    #[serde(default)]
    pub coordinates: Option<crate::types::Coordinates>,
    #[serde(default)]
    pub verified: bool,
    /// Amenity names on the target, for the amenity adjustment.
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl TargetSpec {
    /// The search query that fetches this target's candidate pool.
    pub fn search_query(&self, max_pages: u32) -> SearchQuery {
        let mut query =
            SearchQuery::around(&self.location, self.purpose, self.price, self.area, self.rooms);
        query.max_pages = max_pages;
        query
    }

    /// Materialize the target as a `ListingRecord`, adopting the
    /// location hierarchy of the first pool record that matches the
    /// requested location (the pool came from the same search, so its
    /// records carry the resolved external ids).
    pub fn to_record(&self, pool: &[ListingRecord]) -> ListingRecord {
        let location = pool
            .iter()
            .find(|rec| {
                rec.location
                    .iter()
                    .any(|l| l.slug == self.location || l.external_id == self.location)
            })
            .or_else(|| pool.first())
            .map(|rec| rec.location.clone())
            .unwrap_or_default();

        ListingRecord {
            id: "target".to_string(),
            title: "analysis target".to_string(),
            price: self.price,
            purpose: self.purpose,
            rent_frequency: crate::types::RentFrequency::None,
            area: self.area,
            rooms: self.rooms,
            baths: self.baths,
            location,
            coordinates: self.coordinates,
            is_verified: self.verified,
            score: None,
            amenities: self.amenities.iter().cloned().collect(),
            state: crate::types::ListingState::Active,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Abstraction over property listing providers.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Search for listings matching the query. Returns normalized
    /// records; hits that fail normalization are skipped, not fatal.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ListingRecord>>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
