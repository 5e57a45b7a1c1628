//! Mock listing source for integration testing.
//!
//! Provides a deterministic `ListingSource` implementation that serves
//! a known pool, tracks queries, and can be forced into failure — all
//! in-memory with no external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

use ouvc::listings::{ListingSource, SearchQuery};
use ouvc::types::*;

/// A mock listing source for deterministic testing.
pub struct MockSource {
    pool: Vec<ListingRecord>,
    queries: Arc<Mutex<Vec<SearchQuery>>>,
    /// If set, all searches return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockSource {
    pub fn new(pool: Vec<ListingRecord>) -> Self {
        Self {
            pool,
            queries: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Force all subsequent searches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Queries observed so far.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for MockSource {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ListingRecord>> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!("{msg}"));
        }
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .pool
            .iter()
            .filter(|rec| rec.purpose == query.purpose)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn marina_location() -> Vec<LocationLevel> {
    vec![
        LocationLevel {
            level: 0,
            external_id: "1".to_string(),
            name: "UAE".to_string(),
            slug: "uae".to_string(),
        },
        LocationLevel {
            level: 1,
            external_id: "2".to_string(),
            name: "Dubai".to_string(),
            slug: "dubai".to_string(),
        },
        LocationLevel {
            level: 2,
            external_id: "5002".to_string(),
            name: "Dubai Marina".to_string(),
            slug: "dubai-marina".to_string(),
        },
    ]
}

/// A verified, active 2BR sale listing in the Marina cluster.
pub fn listing(id: &str, price: f64, area: f64) -> ListingRecord {
    ListingRecord {
        id: id.to_string(),
        title: format!("Listing {id}"),
        price,
        purpose: Purpose::ForSale,
        rent_frequency: RentFrequency::None,
        area: Some(area),
        rooms: Some(2),
        baths: Some(2),
        location: marina_location(),
        coordinates: Some(Coordinates::new(25.0805, 55.1403)),
        is_verified: true,
        score: Some(85.0),
        amenities: ["Balcony", "Parking"].iter().map(|s| s.to_string()).collect(),
        state: ListingState::Active,
        created_at: Utc.timestamp_opt(1_720_000_000, 0).single().unwrap(),
    }
}

/// `n` comparables all at exactly `price_per_area`, 1,000 square units
/// each, spread a few hundred metres apart.
pub fn uniform_pool(n: usize, price_per_area: f64) -> Vec<ListingRecord> {
    (0..n)
        .map(|i| {
            let mut rec = listing(&format!("P{i}"), price_per_area * 1000.0, 1000.0);
            rec.coordinates = Some(Coordinates::new(25.0805 + 0.001 * i as f64, 55.1403));
            rec
        })
        .collect()
}
