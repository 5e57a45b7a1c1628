//! Demo listing source.
//!
//! A deterministic in-memory pool used when no Bayut API key is
//! configured, and by tests that need known data. Prices are modelled
//! on the Dubai Marina / Downtown market so demo output looks sane.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::BTreeSet;
use tracing::debug;

use super::{ListingSource, SearchQuery};
use crate::types::{
    Coordinates, ListingRecord, ListingState, LocationLevel, Purpose, RentFrequency,
};

const SOURCE_NAME: &str = "demo";

/// Offline listing source with a fixed pool.
pub struct DemoListings {
    pool: Vec<ListingRecord>,
}

impl DemoListings {
    pub fn new() -> Self {
        Self { pool: demo_pool() }
    }

    /// The full pool, unfiltered (used by the `demo` subcommand report).
    pub fn all(&self) -> &[ListingRecord] {
        &self.pool
    }
}

impl Default for DemoListings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingSource for DemoListings {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ListingRecord>> {
        let matches: Vec<ListingRecord> = self
            .pool
            .iter()
            .filter(|rec| {
                rec.purpose == query.purpose
                    && rec
                        .location
                        .iter()
                        .any(|l| l.slug == query.location || l.external_id == query.location)
            })
            .filter(|rec| {
                query.price_min.map(|p| rec.price >= p).unwrap_or(true)
                    && query.price_max.map(|p| rec.price <= p).unwrap_or(true)
            })
            .cloned()
            .collect();

        debug!(count = matches.len(), location = %query.location, "Demo search");
        Ok(matches)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Fixture pool
// ---------------------------------------------------------------------------

fn marina_location() -> Vec<LocationLevel> {
    vec![
        level(0, "1", "UAE", "uae"),
        level(1, "2", "Dubai", "dubai"),
        level(2, "5002", "Dubai Marina", "dubai-marina"),
    ]
}

fn downtown_location() -> Vec<LocationLevel> {
    vec![
        level(0, "1", "UAE", "uae"),
        level(1, "2", "Dubai", "dubai"),
        level(2, "6020", "Downtown Dubai", "downtown-dubai"),
    ]
}

fn level(lvl: u8, id: &str, name: &str, slug: &str) -> LocationLevel {
    LocationLevel {
        level: lvl,
        external_id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
    }
}

fn amenities(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn listing(
    id: &str,
    title: &str,
    price: f64,
    purpose: Purpose,
    area: Option<f64>,
    rooms: Option<u32>,
    location: Vec<LocationLevel>,
    coordinates: Option<Coordinates>,
    is_verified: bool,
    amenity_names: &[&str],
) -> ListingRecord {
    ListingRecord {
        id: id.to_string(),
        title: title.to_string(),
        price,
        purpose,
        rent_frequency: match purpose {
            Purpose::ForSale => RentFrequency::None,
            Purpose::ForRent => RentFrequency::Yearly,
        },
        area,
        rooms,
        baths: rooms,
        location,
        coordinates,
        is_verified,
        score: Some(80.0),
        amenities: amenities(amenity_names),
        state: ListingState::Active,
        created_at: Utc.timestamp_opt(1_720_000_000, 0).single().unwrap_or_else(Utc::now),
    }
}

/// Pool modelled on real Marina/Downtown asking prices. The Marina
/// 2BR cluster sits around 1,400–1,550 per sqft so a mid-band target
/// screens as fairly priced.
fn demo_pool() -> Vec<ListingRecord> {
    vec![
        listing(
            "D-001", "2BR apartment in Marina Gate", 1_650_000.0, Purpose::ForSale,
            Some(1150.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0821, 55.1419)), true,
            &["Balcony", "Parking", "Shared Pool"],
        ),
        listing(
            "D-002", "2BR with full marina view", 1_820_000.0, Purpose::ForSale,
            Some(1250.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0787, 55.1392)), true,
            &["Balcony", "Parking", "Gym", "Shared Pool"],
        ),
        listing(
            "D-003", "Upgraded 2BR near the walk", 1_700_000.0, Purpose::ForSale,
            Some(1180.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0769, 55.1331)), true,
            &["Balcony", "Parking"],
        ),
        listing(
            "D-004", "2BR mid-floor, vacant on transfer", 1_580_000.0, Purpose::ForSale,
            Some(1100.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0844, 55.1451)), true,
            &["Parking", "Shared Pool", "Security"],
        ),
        listing(
            "D-005", "3BR corner unit", 2_450_000.0, Purpose::ForSale,
            Some(1650.0), Some(3), marina_location(),
            Some(Coordinates::new(25.0812, 55.1377)), true,
            &["Balcony", "Parking", "Maid Room"],
        ),
        // No geography block on this one — retained by the selector's
        // missing-coordinates policy.
        listing(
            "D-006", "2BR, agent-listed, no geotag", 1_760_000.0, Purpose::ForSale,
            Some(1210.0), Some(2), marina_location(),
            None, true,
            &["Balcony", "Gym"],
        ),
        listing(
            "D-007", "2BR listed without floor plan", 1_690_000.0, Purpose::ForSale,
            None, Some(2), marina_location(),
            Some(Coordinates::new(25.0798, 55.1408)), true,
            &["Parking"],
        ),
        listing(
            "D-008", "2BR unverified private listing", 1_450_000.0, Purpose::ForSale,
            Some(1160.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0830, 55.1400)), false,
            &["Balcony"],
        ),
        listing(
            "D-009", "Studio in Downtown", 850_000.0, Purpose::ForSale,
            Some(480.0), Some(0), downtown_location(),
            Some(Coordinates::new(25.1972, 55.2744)), true,
            &["Gym", "Shared Pool"],
        ),
        listing(
            "D-010", "2BR yearly rental, marina walk", 135_000.0, Purpose::ForRent,
            Some(1190.0), Some(2), marina_location(),
            Some(Coordinates::new(25.0809, 55.1385)), true,
            &["Balcony", "Parking"],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
