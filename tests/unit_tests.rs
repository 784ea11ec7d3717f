// Unit tests for Bin Locator

use bin_locator::core::{
    distance::{distance, haversine_distance},
    filters::accepts_any_category,
    matcher::FacilityMatcher,
};
use bin_locator::models::{Coordinate, Facility, FacilityStatus, MatchRequest};
use std::collections::BTreeSet;

fn coord(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate { latitude, longitude }
}

fn facility(id: &str, latitude: f64, longitude: f64, categories: &[&str]) -> Facility {
    Facility {
        id: id.to_string(),
        name: None,
        address: None,
        coordinate: Some(coord(latitude, longitude)),
        status: FacilityStatus::Active,
        accepted_categories: categories.iter().map(|c| c.to_string()).collect(),
        operating_window: "24/7".to_string(),
    }
}

fn sample_points() -> Vec<Coordinate> {
    vec![
        coord(28.6304, 77.2177),
        coord(19.0760, 72.8777),
        coord(-33.8688, 151.2093),
        coord(64.1466, -21.9426),
        coord(89.9, 45.0),
        coord(-89.9, -135.0),
        coord(0.0, 179.9),
        coord(0.0, -179.9),
        coord(0.0, 0.0),
    ]
}

#[test]
fn test_distance_symmetry() {
    let points = sample_points();
    for a in &points {
        for b in &points {
            let ab = distance(a, b);
            let ba = distance(b, a);
            let tolerance = 1e-9 * ab.abs().max(1.0);
            assert!(
                (ab - ba).abs() <= tolerance,
                "distance({}, {}) = {} but reverse = {}",
                a,
                b,
                ab,
                ba
            );
        }
    }
}

#[test]
fn test_distance_zero_and_non_negative() {
    let points = sample_points();
    for a in &points {
        assert_eq!(distance(a, a), 0.0);
        for b in &points {
            assert!(distance(a, b) >= 0.0);
        }
    }
}

#[test]
fn test_distance_delhi_mumbai() {
    let d = haversine_distance(28.6304, 77.2177, 19.0760, 72.8777);
    assert!(d >= 1150.0 && d <= 1160.0, "Expected 1150-1160km, got {}", d);
}

#[test]
fn test_distance_across_antimeridian_is_short() {
    let d = distance(&coord(0.0, 179.9), &coord(0.0, -179.9));
    assert!(d < 25.0, "Expected ~22km across the antimeridian, got {}", d);
}

#[test]
fn test_category_filter_correctness() {
    let bin = facility("bin", 0.0, 0.0, &["battery"]);

    let laptop_only: BTreeSet<String> = ["laptop".to_string()].into_iter().collect();
    assert!(!accepts_any_category(&bin, &laptop_only));

    let both: BTreeSet<String> = ["battery".to_string(), "laptop".to_string()].into_iter().collect();
    assert!(accepts_any_category(&bin, &both));
}

#[test]
fn test_category_filter_applied_by_matcher() {
    let matcher = FacilityMatcher::default();
    let facilities = vec![
        facility("battery-bin", 0.0, 0.01, &["battery"]),
        facility("laptop-bin", 0.0, 0.02, &["laptop"]),
        facility("glass-bin", 0.0, 0.03, &["glass"]),
    ];
    let request = MatchRequest::new(10.0).with_categories(["battery", "laptop"]);

    let outcome = matcher.match_facilities(&coord(0.0, 0.0), &facilities, &request);

    let ids: Vec<_> = outcome.facilities.iter().map(|r| r.facility.id.as_str()).collect();
    assert_eq!(ids, vec!["battery-bin", "laptop-bin"]);
}

#[test]
fn test_ties_ordered_by_id_regardless_of_input_order() {
    let matcher = FacilityMatcher::default();
    let origin = coord(0.0, 0.0);
    let east = facility("bin-b", 0.0, 1.0, &[]);
    let west = facility("bin-a", 0.0, -1.0, &[]);
    let request = MatchRequest::new(500.0);

    let forward = matcher.match_facilities(&origin, &[east.clone(), west.clone()], &request);
    let reverse = matcher.match_facilities(&origin, &[west, east], &request);

    assert_eq!(forward.facilities[0].distance_km, forward.facilities[1].distance_km);
    assert_eq!(forward.facilities[0].facility.id, "bin-a");
    assert_eq!(forward, reverse);
}

#[test]
fn test_distances_measured_from_origin() {
    let matcher = FacilityMatcher::default();
    let origin = coord(28.6304, 77.2177);
    let facilities = vec![facility("mumbai", 19.0760, 72.8777, &[])];

    let outcome = matcher.match_facilities(&origin, &facilities, &MatchRequest::new(10.0));

    assert_eq!(
        outcome.facilities[0].distance_km,
        distance(&origin, &coord(19.0760, 72.8777))
    );
}

#[test]
fn test_widening_returns_everything_sorted() {
    let matcher = FacilityMatcher::default();
    let origin = coord(28.6304, 77.2177);
    // ~100 km north, ~100 km south, a little further east
    let facilities = vec![
        facility("north", 29.5304, 77.2177, &[]),
        facility("south", 27.7304, 77.2177, &[]),
        facility("east", 28.6304, 78.3, &[]),
    ];
    let request = MatchRequest::new(50.0).nearby_only(true);

    let outcome = matcher.match_facilities(&origin, &facilities, &request);

    assert!(outcome.widened);
    assert_eq!(outcome.facilities.len(), 3);
    for pair in outcome.facilities.windows(2) {
        assert!(pair[0].distance_km <= pair[1].distance_km);
    }
}

#[test]
fn test_nearby_only_false_skips_radius() {
    let matcher = FacilityMatcher::default();
    let origin = coord(28.6304, 77.2177);
    let facilities = vec![
        facility("near", 28.7204, 77.2177, &[]),
        facility("far", 29.5304, 77.2177, &[]),
    ];

    let outcome = matcher.match_facilities(&origin, &facilities, &MatchRequest::new(50.0));

    assert!(!outcome.widened);
    assert_eq!(outcome.facilities.len(), 2);
}
