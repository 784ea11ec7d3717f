use crate::core::{
    distance::distance,
    filters::{accepts_any_category, within_radius},
};
use crate::models::{Coordinate, Facility, MatchRequest, RankedFacility};

/// Ranked facilities plus whether the radius cutoff had to be dropped
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub facilities: Vec<RankedFacility>,
    pub widened: bool,
}

/// Facility ranking pipeline
///
/// # Pipeline Stages
/// 1. Category filter
/// 2. Distance computation (facilities without a valid coordinate drop out)
/// 3. Ascending sort by distance, ties by id
/// 4. Radius cutoff with widening when nothing is close enough
/// 5. Result cap
///
/// Pure and synchronous; never fails.
#[derive(Debug, Clone, Default)]
pub struct FacilityMatcher {
    max_results: Option<usize>,
}

impl FacilityMatcher {
    pub fn new(max_results: Option<usize>) -> Self {
        Self { max_results }
    }

    /// Rank `facilities` around `origin` according to `request`
    ///
    /// With `prefer_nearby_only`, an empty radius cutoff widens to every
    /// candidate that passed the category filter. When the category filter
    /// already leaves nothing, there is nothing to widen to: the result is
    /// empty with `widened = false`.
    pub fn match_facilities(
        &self,
        origin: &Coordinate,
        facilities: &[Facility],
        request: &MatchRequest,
    ) -> MatchOutcome {
        let mut ranked: Vec<RankedFacility> = facilities
            .iter()
            // Stage 1: Category filter
            .filter(|facility| accepts_any_category(facility, &request.category_filter))
            // Stage 2: Distance against the resolved coordinate
            .filter_map(|facility| {
                let Some(coordinate) = facility.valid_coordinate() else {
                    tracing::debug!("Excluding facility {} without a valid coordinate", facility.id);
                    return None;
                };

                Some(RankedFacility {
                    distance_km: distance(origin, &coordinate),
                    facility: facility.clone(),
                })
            })
            .collect();

        // Stage 3: Sort by distance (ascending), then id for determinism
        ranked.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.facility.id.cmp(&b.facility.id))
        });

        // Stage 4: Radius cutoff, widening to the full list if it empties the result
        let mut widened = false;
        if request.prefer_nearby_only {
            let nearby_count = ranked
                .iter()
                .take_while(|r| within_radius(r.distance_km, request.radius_km))
                .count();

            if nearby_count > 0 {
                ranked.truncate(nearby_count);
            } else if !ranked.is_empty() {
                tracing::debug!(
                    "No facility within {} km of {}, widening to all {} candidates",
                    request.radius_km,
                    origin,
                    ranked.len()
                );
                widened = true;
            }
        }

        // Stage 5: Limit results
        let cap = match (request.limit, self.max_results) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (limit, max) => limit.or(max),
        };
        if let Some(cap) = cap {
            ranked.truncate(cap);
        }

        MatchOutcome {
            facilities: ranked,
            widened,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FacilityStatus;

    const ORIGIN: Coordinate = Coordinate { latitude: 28.6304, longitude: 77.2177 };

    /// Facility `north_deg` degrees due north of the origin (~111 km per degree)
    fn create_facility(id: &str, north_deg: f64, categories: &[&str]) -> Facility {
        Facility {
            id: id.to_string(),
            name: Some(format!("Bin {}", id)),
            address: None,
            coordinate: Some(Coordinate {
                latitude: ORIGIN.latitude + north_deg,
                longitude: ORIGIN.longitude,
            }),
            status: FacilityStatus::Active,
            accepted_categories: categories.iter().map(|c| c.to_string()).collect(),
            operating_window: "09:00-18:00".to_string(),
        }
    }

    #[test]
    fn test_sorted_by_distance() {
        let matcher = FacilityMatcher::default();
        let facilities = vec![
            create_facility("far", 0.5, &["plastic"]),
            create_facility("near", 0.01, &["plastic"]),
            create_facility("mid", 0.1, &["plastic"]),
        ];

        let outcome = matcher.match_facilities(&ORIGIN, &facilities, &MatchRequest::new(50.0));

        let ids: Vec<_> = outcome.facilities.iter().map(|r| r.facility.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(!outcome.widened);
    }

    #[test]
    fn test_widening_when_nothing_nearby() {
        let matcher = FacilityMatcher::default();
        // ~100 km away
        let facilities = vec![
            create_facility("b", 0.9, &["battery"]),
            create_facility("a", -0.9, &["battery"]),
        ];
        let request = MatchRequest::new(50.0).nearby_only(true);

        let outcome = matcher.match_facilities(&ORIGIN, &facilities, &request);

        assert!(outcome.widened);
        assert_eq!(outcome.facilities.len(), 2);
        assert!(outcome.facilities[0].distance_km <= outcome.facilities[1].distance_km);
    }

    #[test]
    fn test_no_widening_when_nearby_exists() {
        let matcher = FacilityMatcher::default();
        let facilities = vec![
            create_facility("far", 0.9, &["battery"]),
            create_facility("close", 0.09, &["battery"]),
        ];
        let request = MatchRequest::new(50.0).nearby_only(true);

        let outcome = matcher.match_facilities(&ORIGIN, &facilities, &request);

        assert!(!outcome.widened);
        assert_eq!(outcome.facilities.len(), 1);
        assert_eq!(outcome.facilities[0].facility.id, "close");
    }

    #[test]
    fn test_invalid_coordinates_excluded() {
        let matcher = FacilityMatcher::default();
        let mut missing = create_facility("missing", 0.0, &[]);
        missing.coordinate = None;
        let mut out_of_range = create_facility("bad", 0.0, &[]);
        out_of_range.coordinate = Some(Coordinate { latitude: 123.0, longitude: 0.0 });

        let facilities = vec![missing, out_of_range, create_facility("ok", 0.01, &[])];
        let outcome = matcher.match_facilities(&ORIGIN, &facilities, &MatchRequest::new(10.0));

        assert_eq!(outcome.facilities.len(), 1);
        assert_eq!(outcome.facilities[0].facility.id, "ok");
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        let matcher = FacilityMatcher::default();
        let request = MatchRequest::new(10.0).nearby_only(true);

        let outcome = matcher.match_facilities(&ORIGIN, &[], &request);

        assert!(outcome.facilities.is_empty());
        assert!(!outcome.widened);
    }

    #[test]
    fn test_respects_limit_and_cap() {
        let facilities: Vec<Facility> = (0..20)
            .map(|i| create_facility(&format!("{:02}", i), i as f64 * 0.01, &[]))
            .collect();

        let capped = FacilityMatcher::new(Some(5));
        let outcome = capped.match_facilities(&ORIGIN, &facilities, &MatchRequest::new(10.0));
        assert_eq!(outcome.facilities.len(), 5);

        let request = MatchRequest::new(10.0).with_limit(Some(3));
        let outcome = capped.match_facilities(&ORIGIN, &facilities, &request);
        assert_eq!(outcome.facilities.len(), 3);
    }

    #[test]
    fn test_no_category_match_is_empty_not_widened() {
        let matcher = FacilityMatcher::default();
        let facilities = vec![create_facility("glass-only", 0.001, &["glass"])];
        let request = MatchRequest::new(10.0)
            .with_categories(["battery"])
            .nearby_only(true);

        let outcome = matcher.match_facilities(&ORIGIN, &facilities, &request);

        assert!(outcome.facilities.is_empty());
        assert!(!outcome.widened, "an empty category match must not be reported as widened");
    }
}
