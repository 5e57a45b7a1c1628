//! Shared types for OUVC.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that listing-source, valuation,
//! and crypto modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Coordinates & location hierarchy
// ---------------------------------------------------------------------------

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether latitude and longitude are within valid WGS-84 bounds.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// One level of a listing's location hierarchy.
///
/// Level 0 is the country, level 4 the building. Level 2 (the
/// neighborhood) is the default comparability key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLevel {
    pub level: u8,
    pub external_id: String,
    pub name: String,
    /// URL-safe name, e.g. "dubai-marina". Used as the key into
    /// rental and yield tables.
    pub slug: String,
}

/// Hierarchy depth of the neighborhood level.
pub const NEIGHBORHOOD_LEVEL: u8 = 2;

/// Maximum number of location levels a record may carry.
pub const MAX_LOCATION_LEVELS: usize = 5;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Listing purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    ForSale,
    ForRent,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::ForSale => write!(f, "for-sale"),
            Purpose::ForRent => write!(f, "for-rent"),
        }
    }
}

impl std::str::FromStr for Purpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "for-sale" | "sale" | "buy" => Ok(Purpose::ForSale),
            "for-rent" | "rent" => Ok(Purpose::ForRent),
            _ => Err(anyhow::anyhow!("Unknown listing purpose: {s}")),
        }
    }
}

/// Rent billing frequency. `None` for sale listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentFrequency {
    Monthly,
    Yearly,
    Weekly,
    None,
}

impl fmt::Display for RentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RentFrequency::Monthly => write!(f, "monthly"),
            RentFrequency::Yearly => write!(f, "yearly"),
            RentFrequency::Weekly => write!(f, "weekly"),
            RentFrequency::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for RentFrequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(RentFrequency::Monthly),
            "yearly" | "annual" => Ok(RentFrequency::Yearly),
            "weekly" => Ok(RentFrequency::Weekly),
            "none" | "" => Ok(RentFrequency::None),
            _ => Err(anyhow::anyhow!("Unknown rent frequency: {s}")),
        }
    }
}

/// Publication state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    Active,
    Inactive,
    Other,
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingState::Active => write!(f, "active"),
            ListingState::Inactive => write!(f, "inactive"),
            ListingState::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// ListingRecord
// ---------------------------------------------------------------------------

/// A normalized property listing.
///
/// Produced by the listing-source layer as a read-only snapshot; the
/// valuation core only filters and aggregates over fresh collections,
/// it never mutates a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    /// Asking price (sale) or rent per `rent_frequency` period.
    pub price: f64,
    pub purpose: Purpose,
    pub rent_frequency: RentFrequency,
    /// Floor area in square units. `None` means unknown — unknown areas
    /// are excluded from all price-per-area math.
    pub area: Option<f64>,
    /// Bedroom count. 0 is a studio; `None` means unknown.
    pub rooms: Option<u32>,
    pub baths: Option<u32>,
    /// Location hierarchy, country (0) through building (4).
    pub location: Vec<LocationLevel>,
    /// Absent coordinates disable distance filtering for this record.
    pub coordinates: Option<Coordinates>,
    pub is_verified: bool,
    /// Listing quality score from the upstream API, when provided.
    pub score: Option<f64>,
    pub amenities: BTreeSet<String>,
    pub state: ListingState,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for ListingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let area = match self.area {
            Some(a) => format!("{a:.0} sqft"),
            None => "area n/a".to_string(),
        };
        let rooms = match self.rooms {
            Some(0) => "studio".to_string(),
            Some(r) => format!("{r}BR"),
            None => "?BR".to_string(),
        };
        write!(
            f,
            "[{}] {} | {} {:.0} | {} | {} | {}",
            self.id,
            self.title,
            self.purpose,
            self.price,
            rooms,
            area,
            self.neighborhood().map(|l| l.name.as_str()).unwrap_or("unknown area"),
        )
    }
}

impl ListingRecord {
    /// Price divided by area, the core unit for cross-property
    /// comparison. `None` unless both price and area are known positive.
    pub fn price_per_area(&self) -> Option<f64> {
        match self.area {
            Some(a) if a > 0.0 && self.price > 0.0 => Some(self.price / a),
            _ => None,
        }
    }

    /// The neighborhood entry of the location hierarchy, if present.
    pub fn neighborhood(&self) -> Option<&LocationLevel> {
        self.location.iter().find(|l| l.level == NEIGHBORHOOD_LEVEL)
    }

    /// Whether this record carries a valid coordinate pair.
    pub fn has_coordinates(&self) -> bool {
        self.coordinates.map(|c| c.is_valid()).unwrap_or(false)
    }

    /// Whether this listing passes the quality gate for use as a
    /// comparable: verified and currently active.
    pub fn is_quality(&self) -> bool {
        self.is_verified && self.state == ListingState::Active
    }

    /// Helper to build a test/sample listing with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        use chrono::TimeZone;
        ListingRecord {
            id: "L-1001".to_string(),
            title: "2BR apartment with marina view".to_string(),
            price: 1_800_000.0,
            purpose: Purpose::ForSale,
            rent_frequency: RentFrequency::None,
            area: Some(1200.0),
            rooms: Some(2),
            baths: Some(2),
            location: vec![
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
            ],
            coordinates: Some(Coordinates::new(25.0805, 55.1403)),
            is_verified: true,
            score: Some(87.0),
            amenities: ["Balcony", "Parking", "Shared Pool"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            state: ListingState::Active,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Sample-size adequacy behind an estimate.
///
/// Callers must inspect this before trusting an estimated value; a
/// `Low` result should be flagged, not hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Tier from the number of comparables backing an estimate.
    pub fn from_comparable_count(count: usize) -> Self {
        match count {
            0..=4 => Confidence::Low,
            5..=9 => Confidence::Medium,
            _ => Confidence::High,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

// ---------------------------------------------------------------------------
// Crypto types
// ---------------------------------------------------------------------------

/// Market snapshot for one coin, assembled from CoinGecko and DeFiLlama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub name: String,
    pub symbol: String,
    /// Spot price in USD.
    pub price: f64,
    pub circulating_supply: f64,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub price_change_24h: Option<f64>,
    /// Total value locked in USD, when a protocol TVL exists.
    pub value_locked: Option<f64>,
}

impl CoinSnapshot {
    /// Supply basis for the fully-diluted market cap: max supply when
    /// declared, else total supply.
    pub fn diluted_supply(&self) -> Option<f64> {
        self.max_supply.or(self.total_supply)
    }
}

impl fmt::Display for CoinSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) ${:.2} | mcap=${:.0} | circ={:.0}",
            self.name, self.symbol, self.price, self.market_cap, self.circulating_supply,
        )
    }
}

/// Manually supplied whitepaper metrics for the undervalued test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WhitepaperInputs {
    pub new_coins_per_year: f64,
    pub value_locked_usd: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for OUVC.
#[derive(Debug, thiserror::Error)]
pub enum OuvcError {
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Malformed listing record: {0}")]
    MalformedRecord(String),

    #[error("Invalid valuation target: {0}")]
    InvalidTarget(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Listing source error ({source_name}): {message}")]
    Listings { source_name: String, message: String },

    #[error("Data provider error ({provider}): {message}")]
    DataProvider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
