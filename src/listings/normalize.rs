//! Record normalization.
//!
//! Maps raw heterogeneous listing payloads into the canonical
//! `ListingRecord`. All "maybe this field is missing" handling lives
//! here: identity, price, and purpose are hard requirements; every
//! other field degrades to an explicit unknown (`None`, empty set)
//! rather than a zero that downstream ratio math would misread.

use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{
    Coordinates, ListingRecord, ListingState, LocationLevel, OuvcError, Purpose, RentFrequency,
    MAX_LOCATION_LEVELS,
};

/// Normalize one raw listing into a `ListingRecord`.
///
/// Fails with `MalformedRecord` when the identity, price, or purpose
/// fields are absent or unparseable. Ancillary fields never fail the
/// record: invalid coordinates are dropped to `None` (which disables
/// distance filtering for this record), unknown states map to `Other`.
pub fn normalize_listing(raw: &Value) -> Result<ListingRecord, OuvcError> {
    let id = match raw.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(OuvcError::MalformedRecord("missing or non-scalar id".into())),
    };

    let price = raw
        .get("price")
        .and_then(Value::as_f64)
        .ok_or_else(|| OuvcError::MalformedRecord(format!("listing {id}: missing or non-numeric price")))?;
    if price <= 0.0 {
        return Err(OuvcError::MalformedRecord(format!("listing {id}: non-positive price {price}")));
    }

    let purpose: Purpose = raw
        .get("purpose")
        .and_then(Value::as_str)
        .ok_or_else(|| OuvcError::MalformedRecord(format!("listing {id}: missing purpose")))?
        .parse()
        .map_err(|_| OuvcError::MalformedRecord(format!("listing {id}: unknown purpose")))?;

    let rent_frequency = raw
        .get("rentFrequency")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(RentFrequency::None);

    // Zero or negative area means "unknown", not "zero square feet".
    let area = raw
        .get("area")
        .and_then(Value::as_f64)
        .filter(|a| *a > 0.0);

    let rooms = raw.get("rooms").and_then(Value::as_u64).map(|r| r as u32);
    let baths = raw.get("baths").and_then(Value::as_u64).map(|b| b as u32);

    let location = parse_location(raw.get("location"));
    let coordinates = parse_coordinates(&id, raw.get("geography"));

    let is_verified = raw.get("isVerified").and_then(Value::as_bool).unwrap_or(false);
    let score = raw.get("score").and_then(Value::as_f64);

    let amenities: BTreeSet<String> = raw
        .get("amenities")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let state = match raw.get("state").and_then(Value::as_str) {
        Some("active") => ListingState::Active,
        Some("inactive") => ListingState::Inactive,
        _ => ListingState::Other,
    };

    let created_at = raw
        .get("createdAt")
        .and_then(Value::as_i64)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ListingRecord {
        id,
        title,
        price,
        purpose,
        rent_frequency,
        area,
        rooms,
        baths,
        location,
        coordinates,
        is_verified,
        score,
        amenities,
        state,
        created_at,
    })
}

/// Normalize a batch of raw listings, skipping malformed hits.
///
/// Returns the surviving records and the number of hits dropped; the
/// caller decides whether the drop count is worth surfacing.
pub fn normalize_batch(raws: &[Value]) -> (Vec<ListingRecord>, usize) {
    let mut records = Vec::with_capacity(raws.len());
    let mut skipped = 0usize;

    for raw in raws {
        match normalize_listing(raw) {
            Ok(rec) => records.push(rec),
            Err(e) => {
                debug!(error = %e, "Skipping malformed listing");
                skipped += 1;
            }
        }
    }

    (records, skipped)
}

/// Parse the location hierarchy, keeping at most `MAX_LOCATION_LEVELS`
/// entries. Entries missing a name or external id are dropped.
fn parse_location(raw: Option<&Value>) -> Vec<LocationLevel> {
    let Some(arr) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    arr.iter()
        .enumerate()
        .take(MAX_LOCATION_LEVELS)
        .filter_map(|(i, entry)| {
            let name = entry.get("name").and_then(Value::as_str)?;
            let external_id = match entry.get("externalID") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return None,
            };
            let level = entry
                .get("level")
                .and_then(Value::as_u64)
                .map(|l| l as u8)
                .unwrap_or(i as u8);
            let slug = entry
                .get("slug")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| name.to_lowercase().replace(' ', "-"));
            Some(LocationLevel {
                level,
                external_id,
                name: name.to_string(),
                slug,
            })
        })
        .collect()
}

/// Parse the geography block. Out-of-range coordinates are dropped —
/// a bad coordinate must not discard an otherwise-usable listing, it
/// only disables distance filtering for it.
fn parse_coordinates(id: &str, raw: Option<&Value>) -> Option<Coordinates> {
    let geo = raw?;
    let lat = geo.get("lat").and_then(Value::as_f64)?;
    let lng = geo.get("lng").and_then(Value::as_f64)?;
    let coords = Coordinates::new(lat, lng);
    if coords.is_valid() {
        Some(coords)
    } else {
        debug!(listing_id = id, lat, lng, "Dropping out-of-range coordinates");
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_hit() -> Value {
        json!({
            "id": 4321,
            "title": "Spacious 2BR in Marina Gate",
            "price": 1_650_000.0,
            "purpose": "for-sale",
            "rentFrequency": "yearly",
            "area": 1150.0,
            "rooms": 2,
            "baths": 2,
            "location": [
                {"level": 0, "externalID": "1", "name": "UAE", "slug": "uae"},
                {"level": 1, "externalID": "2", "name": "Dubai", "slug": "dubai"},
                {"level": 2, "externalID": "5002", "name": "Dubai Marina", "slug": "dubai-marina"},
                {"level": 3, "externalID": "8001", "name": "Marina Gate", "slug": "marina-gate"}
            ],
            "geography": {"lat": 25.0821, "lng": 55.1419},
            "isVerified": true,
            "score": 92.0,
            "amenities": ["Balcony", "Parking"],
            "state": "active",
            "createdAt": 1_700_000_000
        })
    }

    #[test]
    fn test_full_hit_normalizes() {
        let rec = normalize_listing(&full_hit()).unwrap();
        assert_eq!(rec.id, "4321");
        assert_eq!(rec.price, 1_650_000.0);
        assert_eq!(rec.purpose, Purpose::ForSale);
        assert_eq!(rec.area, Some(1150.0));
        assert_eq!(rec.rooms, Some(2));
        assert_eq!(rec.location.len(), 4);
        assert_eq!(rec.neighborhood().unwrap().external_id, "5002");
        assert!(rec.has_coordinates());
        assert!(rec.is_verified);
        assert_eq!(rec.state, ListingState::Active);
        assert_eq!(rec.amenities.len(), 2);
        assert_eq!(rec.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_string_id_accepted() {
        let mut hit = full_hit();
        hit["id"] = json!("abc-123");
        assert_eq!(normalize_listing(&hit).unwrap().id, "abc-123");
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut hit = full_hit();
        hit.as_object_mut().unwrap().remove("id");
        let err = normalize_listing(&hit).unwrap_err();
        assert!(matches!(err, OuvcError::MalformedRecord(_)));
    }

    #[test]
    fn test_missing_price_rejected() {
        let mut hit = full_hit();
        hit.as_object_mut().unwrap().remove("price");
        assert!(matches!(normalize_listing(&hit).unwrap_err(), OuvcError::MalformedRecord(_)));
    }

    #[test]
    fn test_non_numeric_price_rejected() {
        let mut hit = full_hit();
        hit["price"] = json!("1,650,000");
        assert!(normalize_listing(&hit).is_err());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut hit = full_hit();
        hit["price"] = json!(0.0);
        assert!(normalize_listing(&hit).is_err());
    }

    #[test]
    fn test_unknown_purpose_rejected() {
        let mut hit = full_hit();
        hit["purpose"] = json!("lease-to-own");
        assert!(normalize_listing(&hit).is_err());
    }

    #[test]
    fn test_zero_area_becomes_unknown() {
        let mut hit = full_hit();
        hit["area"] = json!(0.0);
        let rec = normalize_listing(&hit).unwrap();
        assert_eq!(rec.area, None);
        assert!(rec.price_per_area().is_none());
    }

    #[test]
    fn test_missing_area_becomes_unknown() {
        let mut hit = full_hit();
        hit.as_object_mut().unwrap().remove("area");
        assert_eq!(normalize_listing(&hit).unwrap().area, None);
    }

    #[test]
    fn test_missing_rooms_distinct_from_studio() {
        let mut hit = full_hit();
        hit["rooms"] = json!(0);
        assert_eq!(normalize_listing(&hit).unwrap().rooms, Some(0));

        hit.as_object_mut().unwrap().remove("rooms");
        assert_eq!(normalize_listing(&hit).unwrap().rooms, None);
    }

    #[test]
    fn test_invalid_coordinates_dropped_not_fatal() {
        let mut hit = full_hit();
        hit["geography"] = json!({"lat": 125.0, "lng": 55.0});
        let rec = normalize_listing(&hit).unwrap();
        assert!(rec.coordinates.is_none());
    }

    #[test]
    fn test_missing_geography_ok() {
        let mut hit = full_hit();
        hit.as_object_mut().unwrap().remove("geography");
        assert!(normalize_listing(&hit).unwrap().coordinates.is_none());
    }

    #[test]
    fn test_location_truncated_to_max_levels() {
        let mut hit = full_hit();
        let levels: Vec<Value> = (0..8)
            .map(|i| json!({"level": i, "externalID": format!("{i}"), "name": format!("L{i}"), "slug": format!("l{i}")}))
            .collect();
        hit["location"] = json!(levels);
        let rec = normalize_listing(&hit).unwrap();
        assert_eq!(rec.location.len(), MAX_LOCATION_LEVELS);
    }

    #[test]
    fn test_location_slug_derived_from_name() {
        let mut hit = full_hit();
        hit["location"] = json!([
            {"level": 2, "externalID": "5002", "name": "Dubai Marina"}
        ]);
        let rec = normalize_listing(&hit).unwrap();
        assert_eq!(rec.location[0].slug, "dubai-marina");
    }

    #[test]
    fn test_unknown_state_maps_to_other() {
        let mut hit = full_hit();
        hit["state"] = json!("archived");
        assert_eq!(normalize_listing(&hit).unwrap().state, ListingState::Other);

        hit.as_object_mut().unwrap().remove("state");
        assert_eq!(normalize_listing(&hit).unwrap().state, ListingState::Other);
    }

    #[test]
    fn test_unverified_default() {
        let mut hit = full_hit();
        hit.as_object_mut().unwrap().remove("isVerified");
        assert!(!normalize_listing(&hit).unwrap().is_verified);
    }

    #[test]
    fn test_batch_skips_malformed() {
        let good = full_hit();
        let mut bad = full_hit();
        bad.as_object_mut().unwrap().remove("price");

        let (records, skipped) = normalize_batch(&[good.clone(), bad, good]);
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_batch_empty() {
        let (records, skipped) = normalize_batch(&[]);
        assert!(records.is_empty());
        assert_eq!(skipped, 0);
    }
}
