// THEORY:
// The `RouteBuilder` orders the hazards inside one agent group into a visiting
// sequence. It is a greedy nearest-neighbor walk: start somewhere fixed, and keep
// moving to the closest place not yet visited.
//
// Key principles:
// 1.  **Determinism**: The walk starts at the smallest id, and a distance tie is
//     broken in favor of the smallest id, so the same group always yields the same
//     route.
// 2.  **Open Path**: Agents do not return to the start; the route ends at the last
//     hazard visited.
// 3.  **Heuristic, not Optimal**: No attempt is made to find the shortest tour. The
//     walk is O(k^2) in the group size, which is small (tens of hazards).

use crate::core_modules::cell::cell::Coordinate;
use std::collections::BTreeMap;

/// The visiting order for one agent group.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRoute {
    pub group_id: usize,
    /// Representative ids in visiting order.
    pub stops: Vec<usize>,
    /// Total Euclidean length of the open path through `stops`.
    pub length: f64,
}

impl AgentRoute {
    pub fn build(group_id: usize, coords: &BTreeMap<usize, Coordinate>) -> Self {
        let stops = build_route(coords);
        let length = route_length(&stops, coords);
        Self {
            group_id,
            stops,
            length,
        }
    }
}

/// Orders `group` by the nearest-neighbor heuristic. An empty group gives an empty route.
pub fn build_route(group: &BTreeMap<usize, Coordinate>) -> Vec<usize> {
    let mut unvisited = group.clone();
    let Some((start, mut current)) = unvisited.pop_first() else {
        return Vec::new();
    };

    let mut route = Vec::with_capacity(group.len());
    route.push(start);

    while !unvisited.is_empty() {
        let mut nearest: Option<(usize, f64)> = None;
        // Ascending iteration plus a strict comparison keeps the smallest id on ties.
        for (&id, position) in &unvisited {
            let dist = current.distance_to(position);
            if nearest.is_none_or(|(_, best)| dist < best) {
                nearest = Some((id, dist));
            }
        }

        let Some((next, _)) = nearest else { break };
        if let Some(position) = unvisited.remove(&next) {
            current = position;
        }
        route.push(next);
    }

    route
}

/// Sum of the distances between consecutive stops. Unknown ids are skipped.
pub fn route_length(stops: &[usize], coords: &BTreeMap<usize, Coordinate>) -> f64 {
    let points: Vec<&Coordinate> = stops.iter().filter_map(|id| coords.get(id)).collect();
    points.windows(2).map(|pair| pair[0].distance_to(pair[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn group(points: &[(usize, (f64, f64))]) -> BTreeMap<usize, Coordinate> {
        points.iter().map(|&(id, p)| (id, Coordinate::from(p))).collect()
    }

    #[test]
    fn visits_nearest_first() {
        let coords = group(&[(1, (0.0, 0.0)), (2, (10.0, 0.0)), (3, (1.0, 1.0))]);
        assert_eq!(build_route(&coords), vec![1, 3, 2]);
    }

    #[test]
    fn starts_at_the_smallest_id() {
        let coords = group(&[(9, (0.0, 0.0)), (4, (50.0, 50.0)), (7, (49.0, 50.0))]);
        assert_eq!(build_route(&coords)[0], 4);
    }

    #[test]
    fn ties_go_to_the_smallest_id() {
        // 2 and 3 are both exactly 5 away from 1.
        let coords = group(&[(1, (0.0, 0.0)), (3, (0.0, 5.0)), (2, (5.0, 0.0))]);
        assert_eq!(build_route(&coords), vec![1, 2, 3]);
    }

    #[test]
    fn empty_group_has_empty_route() {
        assert!(build_route(&BTreeMap::new()).is_empty());
        let route = AgentRoute::build(1, &BTreeMap::new());
        assert!(route.stops.is_empty());
        assert_eq!(route.length, 0.0);
    }

    #[test]
    fn route_length_is_an_open_path() {
        let coords = group(&[(1, (0.0, 0.0)), (2, (3.0, 4.0)), (3, (3.0, 0.0))]);
        let route = AgentRoute::build(5, &coords);
        assert_eq!(route.group_id, 5);
        // 1 -> 3 is 3.0, then 3 -> 2 is 4.0; no return leg.
        assert_eq!(route.stops, vec![1, 3, 2]);
        assert_eq!(route.length, 7.0);
    }

    proptest! {
        #[test]
        fn route_visits_every_member_once(
            points in proptest::collection::btree_map(0usize..200, (0.0f64..100.0, 0.0f64..100.0), 0..30),
        ) {
            let coords: BTreeMap<usize, Coordinate> =
                points.into_iter().map(|(id, p)| (id, Coordinate::from(p))).collect();
            let route = build_route(&coords);

            prop_assert_eq!(route.len(), coords.len());
            let visited: BTreeSet<usize> = route.iter().copied().collect();
            prop_assert_eq!(visited.len(), route.len());
            prop_assert_eq!(visited, coords.keys().copied().collect::<BTreeSet<_>>());
            prop_assert_eq!(route, build_route(&coords));
        }
    }
}
