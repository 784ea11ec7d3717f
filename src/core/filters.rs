use std::collections::BTreeSet;

use crate::models::Facility;

/// Check if a facility accepts at least one of the requested categories
///
/// An empty filter accepts every facility. Category names are compared
/// ASCII case-insensitively.
#[inline]
pub fn accepts_any_category(facility: &Facility, filter: &BTreeSet<String>) -> bool {
    if filter.is_empty() {
        return true;
    }

    facility.accepted_categories.iter().any(|accepted| {
        filter
            .iter()
            .any(|wanted| accepted.trim().eq_ignore_ascii_case(wanted.trim()))
    })
}

/// Check if a ranked distance falls inside the search radius (inclusive)
#[inline]
pub fn within_radius(distance_km: f64, radius_km: f64) -> bool {
    distance_km <= radius_km
}
