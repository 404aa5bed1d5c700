// THEORY:
// The `GroupPartitioner` decides which agent visits which hazard. It takes one
// representative point per component and splits them into a fixed number of spatially
// compact groups, so that each agent's route stays short.
//
// Algorithm:
// 1.  **Seeding**: k-means++ picks initial centers, each new center drawn with
//     probability proportional to its squared distance from the centers already
//     chosen. All randomness comes from a `StdRng` built from the caller's seed.
// 2.  **Lloyd Iterations**: Points are assigned to their nearest center (ties go to
//     the lowest center index) and centers move to the mean of their points, until the
//     assignment stops changing or the iteration cap is reached.
// 3.  **No Empty Groups**: A center that loses all of its points steals the point
//     farthest from its own center out of a group that can spare one.
// 4.  **Restarts**: The whole procedure runs several times from the same RNG stream
//     and the lowest-inertia result wins (earliest run on ties).
// 5.  **Stable Numbering**: Groups are numbered from 1 in ascending order of their
//     smallest member id, so numbering never depends on internal center order.
//
// Identical inputs and seed always produce the identical partition. The result is
// a good partition, not a provably optimal one.

use crate::core_modules::cell::cell::Coordinate;
use crate::error::PlanningError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const RESTARTS: usize = 10;
const MAX_ITERATIONS: usize = 300;

/// The set of representatives assigned to one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentGroup {
    /// 1-based group number.
    pub id: usize,
    /// Representative ids, ascending.
    pub members: Vec<usize>,
}

/// Number of agents needed for `hazard_cells` flagged cells at a given capacity,
/// clipped so that no group can be left without a representative.
pub fn derive_group_count(
    hazard_cells: usize,
    capacity_per_agent: f64,
    representative_count: usize,
) -> Result<usize, PlanningError> {
    if !(capacity_per_agent.is_finite() && capacity_per_agent > 0.0) {
        return Err(PlanningError::InvalidConfig(format!(
            "capacity_per_agent must be positive, got {capacity_per_agent}"
        )));
    }
    if hazard_cells == 0 || representative_count == 0 {
        return Ok(0);
    }
    let needed = (hazard_cells as f64 / capacity_per_agent).ceil() as usize;
    Ok(needed.clamp(1, representative_count))
}

/// Splits `representatives` into `group_count` spatial groups.
///
/// `group_count` must be in `1..=representatives.len()`, except that an empty input
/// with a group count of zero yields an empty partition.
pub fn partition(
    representatives: &BTreeMap<usize, Coordinate>,
    group_count: usize,
    seed: u64,
) -> Result<BTreeMap<usize, AgentGroup>, PlanningError> {
    if representatives.is_empty() && group_count == 0 {
        return Ok(BTreeMap::new());
    }
    if group_count == 0 || group_count > representatives.len() {
        return Err(PlanningError::InvalidGroupCount {
            requested: group_count,
            available: representatives.len(),
        });
    }

    let ids: Vec<usize> = representatives.keys().copied().collect();
    let points: Vec<Coordinate> = representatives.values().copied().collect();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut best: Option<(f64, Vec<usize>)> = None;
    for _ in 0..RESTARTS {
        let centers = seed_centers(&points, group_count, &mut rng);
        let (assignment, inertia) = lloyd(&points, centers);
        if best.as_ref().is_none_or(|(best_inertia, _)| inertia < *best_inertia) {
            best = Some((inertia, assignment));
        }
    }

    let (inertia, assignment) = best.ok_or(PlanningError::InvalidGroupCount {
        requested: group_count,
        available: representatives.len(),
    })?;
    tracing::debug!(groups = group_count, inertia, seed, "partitioned representatives");

    Ok(number_groups(&ids, &assignment))
}

/// k-means++ seeding.
fn seed_centers(points: &[Coordinate], k: usize, rng: &mut StdRng) -> Vec<Coordinate> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centers
                    .iter()
                    .map(|c| p.squared_distance_to(c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, w) in weights.iter().enumerate() {
                cumulative += w;
                if *w > 0.0 && cumulative > target {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave `target` past the final sum.
            chosen.or_else(|| weights.iter().rposition(|w| *w > 0.0)).unwrap_or(0)
        } else {
            // Every point coincides with a center; duplicates are resolved later.
            rng.random_range(0..points.len())
        };
        centers.push(points[next]);
    }
    centers
}

/// Runs Lloyd iterations from `centers`, returning the assignment and its inertia.
fn lloyd(points: &[Coordinate], mut centers: Vec<Coordinate>) -> (Vec<usize>, f64) {
    let k = centers.len();
    let mut assignment: Vec<usize> = Vec::new();

    for _ in 0..MAX_ITERATIONS {
        let next = fill_empty_clusters(points, assign(points, &centers), &centers);
        let converged = next == assignment;
        assignment = next;
        centers = recompute_centers(points, &assignment, k);
        if converged {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&assignment)
        .map(|(p, &c)| p.squared_distance_to(&centers[c]))
        .sum();
    (assignment, inertia)
}

fn assign(points: &[Coordinate], centers: &[Coordinate]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (i, c) in centers.iter().enumerate() {
                let dist = p.squared_distance_to(c);
                if dist < best_dist {
                    best = i;
                    best_dist = dist;
                }
            }
            best
        })
        .collect()
}

fn fill_empty_clusters(points: &[Coordinate], mut assignment: Vec<usize>, centers: &[Coordinate]) -> Vec<usize> {
    let mut counts = vec![0usize; centers.len()];
    for &c in &assignment {
        counts[c] += 1;
    }

    for empty in 0..centers.len() {
        if counts[empty] > 0 {
            continue;
        }
        let donor = (0..points.len())
            .filter(|&i| counts[assignment[i]] > 1)
            .fold(None, |best: Option<(usize, f64)>, i| {
                let dist = points[i].squared_distance_to(&centers[assignment[i]]);
                match best {
                    Some((_, best_dist)) if best_dist >= dist => best,
                    _ => Some((i, dist)),
                }
            });
        // With k <= n there is always a group holding more than one point.
        if let Some((i, _)) = donor {
            counts[assignment[i]] -= 1;
            counts[empty] += 1;
            assignment[i] = empty;
        }
    }
    assignment
}

fn recompute_centers(points: &[Coordinate], assignment: &[usize], k: usize) -> Vec<Coordinate> {
    let mut sums = vec![(0.0, 0.0, 0usize); k];
    for (p, &c) in points.iter().zip(assignment) {
        sums[c].0 += p.x;
        sums[c].1 += p.y;
        sums[c].2 += 1;
    }
    sums.into_iter()
        .map(|(x, y, n)| {
            if n == 0 {
                Coordinate::default()
            } else {
                Coordinate::new(x / n as f64, y / n as f64)
            }
        })
        .collect()
}

/// Renumbers clusters 1..=k by their smallest member id.
fn number_groups(ids: &[usize], assignment: &[usize]) -> BTreeMap<usize, AgentGroup> {
    let mut cluster_to_group: BTreeMap<usize, usize> = BTreeMap::new();
    let mut groups: BTreeMap<usize, AgentGroup> = BTreeMap::new();

    // `ids` is ascending, so the first id seen in a cluster is its smallest.
    for (&id, &cluster) in ids.iter().zip(assignment) {
        let next_id = cluster_to_group.len() + 1;
        let group_id = *cluster_to_group.entry(cluster).or_insert(next_id);
        groups
            .entry(group_id)
            .or_insert_with(|| AgentGroup {
                id: group_id,
                members: Vec::new(),
            })
            .members
            .push(id);
    }
    groups
}
