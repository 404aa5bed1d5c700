// THEORY:
// The `ComponentDetector` is the engine of the spatial grouping layer. Given the set
// of cell labels that an upstream detector has flagged as hazardous, it finds the
// connected regions of that set under 8-connectivity (the Moore neighborhood), so
// that a survey agent can treat a contiguous hazardous patch as one place to visit.
//
// Key architectural principles & algorithm steps:
// 1.  **Implicit Graph**: The grid graph is never built. Neighbors come from label
//     arithmetic (`adjacent_labels`), so the cost is proportional to the flagged set,
//     not to the size of the grid.
// 2.  **Region Growing**: `connected_set` grows a region breadth-first from a seed
//     label using an explicit worklist, so very large regions cannot exhaust the
//     stack. The seed itself is always part of the result; every other member must
//     be flagged and reachable from the seed through flagged cells.
// 3.  **Deterministic Partition**: `compute_components` walks the flagged labels in
//     ascending order, skips labels already claimed, and grows a region from every
//     unclaimed label. It is written as a fold over (components, consumed) so no
//     state outlives the call. Components are numbered 1, 2, ... in order of
//     discovery, which makes the numbering a pure function of the flagged set.
// 4.  **Stateless Utility**: Like the rest of the core, the detector has no memory of
//     previous grids. Each call sees exactly one flagged set.

use crate::core_modules::cell::cell::{CellLabel, check_label, neighbors_unchecked};
use crate::core_modules::hazard_region::HazardComponent;
use crate::error::PlanningError;
use std::collections::{BTreeSet, VecDeque};

pub mod component_detector {
    use super::*; // Make items from parent module available.

    /// Grows the region reachable from `start` through labels in `valid`.
    ///
    /// `start` is always included, even when it is not itself in `valid`.
    pub fn connected_set(
        start: CellLabel,
        dimension: u32,
        valid: &BTreeSet<CellLabel>,
    ) -> Result<BTreeSet<CellLabel>, PlanningError> {
        check_label(start, dimension)?;

        let mut region = BTreeSet::from([start]);
        let mut worklist = VecDeque::from([start]);

        while let Some(current) = worklist.pop_front() {
            for neighbor in neighbors_unchecked(current, dimension) {
                if valid.contains(&neighbor) && region.insert(neighbor) {
                    worklist.push_back(neighbor);
                }
            }
        }

        Ok(region)
    }

    /// Splits the flagged labels of one grid into disjoint 8-connected components.
    ///
    /// An empty flagged set yields no components. Every flagged label must lie in
    /// `[1, dimension^2]`; the smallest offending label is reported otherwise.
    pub fn compute_components<I>(
        dimension: u32,
        flagged: I,
    ) -> Result<Vec<HazardComponent>, PlanningError>
    where
        I: IntoIterator<Item = CellLabel>,
    {
        let flagged: BTreeSet<CellLabel> = flagged.into_iter().collect();
        for &label in &flagged {
            check_label(label, dimension)?;
        }

        type Partition = (Vec<HazardComponent>, BTreeSet<CellLabel>);
        let (components, consumed) = flagged.iter().try_fold(
            (Vec::new(), BTreeSet::new()),
            |(mut components, mut consumed): Partition, &label| -> Result<Partition, PlanningError> {
                if consumed.contains(&label) {
                    return Ok((components, consumed));
                }
                let cells = connected_set(label, dimension, &flagged)?;
                consumed.extend(cells.iter().copied());
                components.push(HazardComponent::new(components.len() + 1, label, cells));
                Ok((components, consumed))
            },
        )?;

        tracing::debug!(
            flagged = flagged.len(),
            claimed = consumed.len(),
            components = components.len(),
            "partitioned flagged cells into components"
        );
        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use super::component_detector::*;
    use crate::error::PlanningError;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn labels(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn two_by_two_block_is_one_component() {
        let components = compute_components(4, [1, 2, 5, 6]).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].id, 1);
        assert_eq!(components[0].seed, 1);
        assert_eq!(components[0].cells, labels(&[1, 2, 5, 6]));
    }

    #[test]
    fn diagonal_contact_joins_cells() {
        // 1 and 6 only touch at a corner on a 4x4 grid.
        let components = compute_components(4, [1, 6, 11, 16]).unwrap();
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn separated_regions_are_numbered_by_discovery() {
        // Top-left block, then a lone cell in the bottom-right corner.
        let components = compute_components(4, [16, 2, 1]).unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].cells, labels(&[1, 2]));
        assert_eq!(components[1].id, 2);
        assert_eq!(components[1].cells, labels(&[16]));
    }

    #[test]
    fn regions_do_not_wrap_across_rows() {
        // 4 is the end of row 0 and 5 the start of row 1; they are not adjacent.
        let components = compute_components(4, [4, 5]).unwrap();
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn empty_flagged_set_yields_no_components() {
        assert!(compute_components(4, []).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_flagged_label_is_rejected() {
        assert!(matches!(
            compute_components(4, [3, 20, 18]),
            Err(PlanningError::InvalidLabel { label: 18, max: 16 })
        ));
    }

    #[test]
    fn start_is_kept_even_when_not_valid() {
        let region = connected_set(1, 4, &labels(&[6, 11])).unwrap();
        assert_eq!(region, labels(&[1, 6, 11]));

        let isolated = connected_set(16, 4, &labels(&[1])).unwrap();
        assert_eq!(isolated, labels(&[16]));
    }

    #[test]
    fn connected_set_rejects_invalid_start() {
        assert!(matches!(
            connected_set(0, 4, &BTreeSet::new()),
            Err(PlanningError::InvalidLabel { .. })
        ));
    }

    #[test]
    fn full_grid_region_does_not_overflow_the_stack() {
        let b = 400;
        let all: BTreeSet<u32> = (1..=b * b).collect();
        let region = connected_set(1, b, &all).unwrap();
        assert_eq!(region.len(), (b * b) as usize);
    }

    proptest! {
        #[test]
        fn components_partition_the_flagged_set(
            b in 1u32..12,
            raw in proptest::collection::vec(any::<u32>(), 0..60),
        ) {
            let flagged: BTreeSet<u32> = raw.iter().map(|v| v % (b * b) + 1).collect();
            let components = compute_components(b, flagged.iter().copied()).unwrap();

            let mut union = BTreeSet::new();
            for component in &components {
                prop_assert!(component.cells.contains(&component.seed));
                for cell in &component.cells {
                    prop_assert!(flagged.contains(cell));
                    prop_assert!(union.insert(*cell), "component overlap on {}", cell);
                }
            }
            prop_assert_eq!(union, flagged.clone());

            let again = compute_components(b, flagged.iter().rev().copied()).unwrap();
            prop_assert_eq!(components, again);
        }

        #[test]
        fn connected_set_is_closed_under_valid_neighbors(
            b in 1u32..12,
            start_seed in any::<u32>(),
            raw in proptest::collection::vec(any::<u32>(), 0..60),
        ) {
            let valid: BTreeSet<u32> = raw.iter().map(|v| v % (b * b) + 1).collect();
            let start = start_seed % (b * b) + 1;
            let region = connected_set(start, b, &valid).unwrap();

            for label in &region {
                prop_assert!(*label == start || valid.contains(label));
                for neighbor in crate::core_modules::cell::cell::adjacent_labels(*label, b).unwrap() {
                    if valid.contains(&neighbor) {
                        prop_assert!(region.contains(&neighbor));
                    }
                }
            }
        }
    }
}
