//! Comparable selection.
//!
//! Filters a pool of candidate listings down to the bounded set of
//! comparables for a target property, using compound criteria: purpose,
//! room delta, neighborhood identity, area and price similarity bands,
//! geographic distance, and verification gates.

use tracing::debug;

use crate::geo::haversine_distance;
use crate::types::{ListingRecord, OuvcError};

// ---------------------------------------------------------------------------
// Configuration (defaults — overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Comparable selection criteria.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Maximum great-circle distance from the target, in km. Applies
    /// only when both records carry coordinates.
    pub max_distance_km: f64,
    /// Upper bound on the number of comparables returned.
    pub max_results: usize,
    /// Maximum bedroom-count difference from the target.
    pub rooms_tolerance: u32,
    /// Candidate area / target area must fall inside this band.
    pub area_ratio_min: f64,
    pub area_ratio_max: f64,
    /// Candidate price / target price must fall inside this band.
    pub price_ratio_min: f64,
    pub price_ratio_max: f64,
    /// Below this comparable count an estimate is low-confidence; the
    /// selector does not enforce it, callers read it off the config.
    pub min_comparables: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 2.0,
            max_results: 20,
            rooms_tolerance: 1,
            area_ratio_min: 0.7,
            area_ratio_max: 1.3,
            price_ratio_min: 0.6,
            price_ratio_max: 1.4,
            min_comparables: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// How a surviving candidate is ranked: closest first when a distance
/// to the target is computable, then the rest by area similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rank {
    DistanceKm(f64),
    AreaDeviation(f64),
}

impl Rank {
    fn ordering(&self, other: &Rank) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Rank::DistanceKm(a), Rank::DistanceKm(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Rank::AreaDeviation(a), Rank::AreaDeviation(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Rank::DistanceKm(_), Rank::AreaDeviation(_)) => Ordering::Less,
            (Rank::AreaDeviation(_), Rank::DistanceKm(_)) => Ordering::Greater,
        }
    }
}

/// Selects comparable listings for a valuation target.
pub struct ComparableSelector {
    config: SelectorConfig,
}

impl ComparableSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Access the selector configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select up to `max_results` comparables for `target` from `pool`,
    /// best match first.
    ///
    /// Candidates must match the target's purpose, sit within one
    /// bedroom (unknown candidate rooms exclude; an unknown target room
    /// count skips the check), share the neighborhood (location level 2)
    /// external id, fall inside the area and price similarity bands, be
    /// verified and active, and not be the target itself. The distance
    /// cap applies only when both records carry coordinates — a record
    /// without coordinates is retained, not distance-filtered.
    ///
    /// An empty pool or zero survivors returns an empty vector, never
    /// an error; fewer than `config.min_comparables` survivors means
    /// the caller should treat any estimate as low-confidence.
    pub fn select(
        &self,
        target: &ListingRecord,
        pool: &[ListingRecord],
    ) -> Result<Vec<ListingRecord>, OuvcError> {
        if target.price <= 0.0 {
            return Err(OuvcError::InvalidTarget(format!(
                "target {} has non-positive price",
                target.id
            )));
        }
        let target_area = match target.area {
            Some(a) if a > 0.0 => a,
            _ => {
                return Err(OuvcError::InvalidTarget(format!(
                    "target {} has unknown area",
                    target.id
                )))
            }
        };

        let mut survivors: Vec<(Rank, &ListingRecord)> = Vec::new();

        for candidate in pool {
            if !self.qualifies(target, target_area, candidate) {
                continue;
            }
            let rank = self.rank(target, target_area, candidate);
            survivors.push((rank, candidate));
        }

        survivors.sort_by(|(a, _), (b, _)| a.ordering(b));
        survivors.truncate(self.config.max_results);

        debug!(
            target_id = %target.id,
            pool = pool.len(),
            selected = survivors.len(),
            "Comparable selection complete"
        );

        Ok(survivors.into_iter().map(|(_, rec)| rec.clone()).collect())
    }

    /// All inclusion predicates; every one must hold.
    fn qualifies(&self, target: &ListingRecord, target_area: f64, candidate: &ListingRecord) -> bool {
        // Identity exclusion first — the target never comps itself.
        if candidate.id == target.id {
            return false;
        }

        if candidate.purpose != target.purpose {
            return false;
        }

        // Room delta. A candidate with an unknown count can't satisfy
        // the tolerance against a known target; an unknown target count
        // skips the predicate.
        if let Some(target_rooms) = target.rooms {
            match candidate.rooms {
                Some(rooms) => {
                    if target_rooms.abs_diff(rooms) > self.config.rooms_tolerance {
                        return false;
                    }
                }
                None => return false,
            }
        }

        // Neighborhood identity on location level 2.
        match (target.neighborhood(), candidate.neighborhood()) {
            (Some(t), Some(c)) if t.external_id == c.external_id => {}
            _ => return false,
        }

        // Area similarity band — requires a known candidate area.
        let area_ratio = match candidate.area {
            Some(a) if a > 0.0 => a / target_area,
            _ => return false,
        };
        if area_ratio < self.config.area_ratio_min || area_ratio > self.config.area_ratio_max {
            return false;
        }

        // Price similarity band.
        let price_ratio = candidate.price / target.price;
        if price_ratio < self.config.price_ratio_min || price_ratio > self.config.price_ratio_max {
            return false;
        }

        // Distance cap, only when both sides carry valid coordinates.
        if let Some(distance) = distance_between(target, candidate) {
            if distance > self.config.max_distance_km {
                debug!(
                    candidate_id = %candidate.id,
                    distance_km = format!("{distance:.2}"),
                    "Candidate beyond distance cap"
                );
                return false;
            }
        }

        // Quality gate: verified and active.
        candidate.is_quality()
    }

    fn rank(&self, target: &ListingRecord, target_area: f64, candidate: &ListingRecord) -> Rank {
        if let Some(d) = distance_between(target, candidate) {
            return Rank::DistanceKm(d);
        }
        let deviation = candidate
            .area
            .map(|a| (a / target_area - 1.0).abs())
            .unwrap_or(f64::MAX);
        Rank::AreaDeviation(deviation)
    }
}

/// Great-circle distance between two records, when both carry valid
/// coordinates.
fn distance_between(a: &ListingRecord, b: &ListingRecord) -> Option<f64> {
    let (ca, cb) = (a.coordinates?, b.coordinates?);
    if !ca.is_valid() || !cb.is_valid() {
        return None;
    }
    haversine_distance(ca, cb).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coordinates, ListingState, Purpose};

    fn make_target() -> ListingRecord {
        let mut rec = ListingRecord::sample();
        rec.id = "TARGET".to_string();
        rec.price = 2_000_000.0;
        rec.area = Some(1000.0);
        rec.rooms = Some(2);
        rec
    }

    /// A candidate that passes every predicate against `make_target`.
    fn make_candidate(id: &str) -> ListingRecord {
        let mut rec = ListingRecord::sample();
        rec.id = id.to_string();
        rec.price = 2_100_000.0;
        rec.area = Some(1050.0);
        rec.rooms = Some(2);
        rec
    }

    fn selector() -> ComparableSelector {
        ComparableSelector::new(SelectorConfig::default())
    }

    #[test]
    fn test_qualifying_candidate_selected() {
        let comps = selector()
            .select(&make_target(), &[make_candidate("C1")])
            .unwrap();
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].id, "C1");
    }

    #[test]
    fn test_target_never_selects_itself() {
        let target = make_target();
        let mut twin = make_candidate("TARGET");
        twin.price = target.price;
        let comps = selector().select(&target, &[twin]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_purpose_mismatch_excluded() {
        let mut candidate = make_candidate("C1");
        candidate.purpose = Purpose::ForRent;
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_rooms_tolerance() {
        let mut one_bed = make_candidate("C1");
        one_bed.rooms = Some(1);
        let mut three_bed = make_candidate("C3");
        three_bed.rooms = Some(3);
        let mut four_bed = make_candidate("C4");
        four_bed.rooms = Some(4);

        let comps = selector()
            .select(&make_target(), &[one_bed, three_bed, four_bed])
            .unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"C1"));
        assert!(ids.contains(&"C3"));
        assert!(!ids.contains(&"C4"));
    }

    #[test]
    fn test_unknown_candidate_rooms_excluded() {
        let mut candidate = make_candidate("C1");
        candidate.rooms = None;
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_unknown_target_rooms_skips_predicate() {
        let mut target = make_target();
        target.rooms = None;
        let mut candidate = make_candidate("C1");
        candidate.rooms = Some(5);
        let comps = selector().select(&target, &[candidate]).unwrap();
        assert_eq!(comps.len(), 1);
    }

    #[test]
    fn test_neighborhood_mismatch_excluded() {
        let mut candidate = make_candidate("C1");
        for level in &mut candidate.location {
            if level.level == 2 {
                level.external_id = "9999".to_string();
            }
        }
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_missing_neighborhood_excluded() {
        let mut candidate = make_candidate("C1");
        candidate.location.retain(|l| l.level != 2);
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_area_band() {
        let mut small = make_candidate("SMALL");
        small.area = Some(699.0); // ratio 0.699, below 0.7
        let mut edge_low = make_candidate("EDGE_LOW");
        edge_low.area = Some(700.0); // ratio 0.7, inclusive
        let mut big = make_candidate("BIG");
        big.area = Some(1301.0); // ratio 1.301, above 1.3

        let comps = selector()
            .select(&make_target(), &[small, edge_low, big])
            .unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["EDGE_LOW"]);
    }

    #[test]
    fn test_unknown_candidate_area_excluded() {
        let mut candidate = make_candidate("C1");
        candidate.area = None;
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_price_band() {
        let mut cheap = make_candidate("CHEAP");
        cheap.price = 1_100_000.0; // ratio 0.55, below 0.6
        let mut dear = make_candidate("DEAR");
        dear.price = 2_900_000.0; // ratio 1.45, above 1.4
        let mut fine = make_candidate("FINE");
        fine.price = 2_700_000.0; // ratio 1.35

        let comps = selector().select(&make_target(), &[cheap, dear, fine]).unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["FINE"]);
    }

    #[test]
    fn test_distance_cap_excludes_far_candidate() {
        let target = make_target(); // at (25.0805, 55.1403)
        let mut far = make_candidate("FAR");
        far.coordinates = Some(Coordinates::new(25.1972, 55.2744)); // ~18 km away
        let comps = selector().select(&target, &[far]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_candidate_without_coordinates_retained() {
        let mut candidate = make_candidate("NOGEO");
        candidate.coordinates = None;
        let comps = selector().select(&make_target(), &[candidate]).unwrap();
        assert_eq!(comps.len(), 1);
    }

    #[test]
    fn test_target_without_coordinates_skips_distance_filter() {
        let mut target = make_target();
        target.coordinates = None;
        let mut far = make_candidate("FAR");
        far.coordinates = Some(Coordinates::new(25.1972, 55.2744));
        let comps = selector().select(&target, &[far]).unwrap();
        assert_eq!(comps.len(), 1);
    }

    #[test]
    fn test_quality_gate() {
        let mut unverified = make_candidate("UNVERIFIED");
        unverified.is_verified = false;
        let mut inactive = make_candidate("INACTIVE");
        inactive.state = ListingState::Inactive;

        let comps = selector().select(&make_target(), &[unverified, inactive]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_ordering_by_distance() {
        let target = make_target(); // (25.0805, 55.1403)
        let mut near = make_candidate("NEAR");
        near.coordinates = Some(Coordinates::new(25.0810, 55.1410));
        let mut nearer = make_candidate("NEAREST");
        nearer.coordinates = Some(Coordinates::new(25.0806, 55.1404));
        let mut mid = make_candidate("MID");
        mid.coordinates = Some(Coordinates::new(25.0850, 55.1450));

        let comps = selector().select(&target, &[near, mid, nearer]).unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["NEAREST", "NEAR", "MID"]);
    }

    #[test]
    fn test_missing_distance_sorts_after_known_distance() {
        let target = make_target();
        let mut nogeo = make_candidate("NOGEO");
        nogeo.coordinates = None;
        nogeo.area = Some(1001.0); // nearly perfect area match
        let mut far_but_geotagged = make_candidate("GEO");
        far_but_geotagged.coordinates = Some(Coordinates::new(25.0900, 55.1500)); // ~1.5 km

        let comps = selector().select(&target, &[nogeo, far_but_geotagged]).unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["GEO", "NOGEO"]);
    }

    #[test]
    fn test_no_coordinates_anywhere_orders_by_area_deviation() {
        let mut target = make_target();
        target.coordinates = None;
        let mut close_area = make_candidate("CLOSE");
        close_area.area = Some(1010.0);
        close_area.coordinates = None;
        let mut off_area = make_candidate("OFF");
        off_area.area = Some(1250.0);
        off_area.coordinates = None;

        let comps = selector().select(&target, &[off_area, close_area]).unwrap();
        let ids: Vec<_> = comps.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["CLOSE", "OFF"]);
    }

    #[test]
    fn test_max_results_truncation() {
        let target = make_target();
        let pool: Vec<ListingRecord> = (0..30).map(|i| make_candidate(&format!("C{i}"))).collect();
        let comps = selector().select(&target, &pool).unwrap();
        assert_eq!(comps.len(), SelectorConfig::default().max_results);
    }

    #[test]
    fn test_empty_pool_is_not_an_error() {
        let comps = selector().select(&make_target(), &[]).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn test_invalid_target_missing_area() {
        let mut target = make_target();
        target.area = None;
        let err = selector().select(&target, &[make_candidate("C1")]).unwrap_err();
        assert!(matches!(err, OuvcError::InvalidTarget(_)));
    }

    #[test]
    fn test_invalid_target_nonpositive_price() {
        let mut target = make_target();
        target.price = 0.0;
        assert!(selector().select(&target, &[]).is_err());
    }

    #[test]
    fn test_config_default_values() {
        let config = SelectorConfig::default();
        assert_eq!(config.max_distance_km, 2.0);
        assert_eq!(config.max_results, 20);
        assert_eq!(config.rooms_tolerance, 1);
        assert_eq!(config.min_comparables, 5);
    }
}
