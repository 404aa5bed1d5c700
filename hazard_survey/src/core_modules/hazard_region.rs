// THEORY:
// The `HazardRegion` module turns the purely label-based output of the
// `ComponentDetector` into something an agent can fly to. A `HazardComponent` is a
// single contiguous patch of flagged cells; a `Representative` is the one point in
// pixel space that stands in for that whole patch during partitioning and routing.
//
// Key architectural principles:
// 1.  **Stateless Data Containers**: `HazardComponent` and `Representative` are
//     immutable summaries. They are built once per grid and only read afterwards.
// 2.  **Averaged Centroid**: The representative point of a component is the mean of
//     its cell centers. This keeps the point inside the bulk of the patch even for
//     irregular shapes.
// 3.  **Explicit Alternatives**: The center of the smallest-label cell is a cheaper
//     representative that some callers rely on. It is available only through an
//     explicit `RepresentativeRule`, never as a silent substitute.

use crate::core_modules::cell::cell::{Cell, CellLabel, Coordinate, GridGeometry};
use crate::error::PlanningError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A contiguous region of flagged cells discovered in one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardComponent {
    /// 1-based identifier, assigned in order of discovery.
    pub id: usize,
    /// The label the region was grown from.
    pub seed: CellLabel,
    pub cells: BTreeSet<CellLabel>,
}

impl HazardComponent {
    pub fn new(id: usize, seed: CellLabel, cells: BTreeSet<CellLabel>) -> Self {
        Self { id, seed, cells }
    }

    pub fn size_in_cells(&self) -> usize {
        self.cells.len()
    }

    /// The enclosing box as (top-left, bottom-right) cells in (row, col) terms.
    pub fn bounding_box(&self, dimension: u32) -> Result<Option<((u32, u32), (u32, u32))>, PlanningError> {
        let mut bounds: Option<((u32, u32), (u32, u32))> = None;
        for &label in &self.cells {
            let cell = Cell::from_label(label, dimension)?;
            bounds = Some(match bounds {
                None => ((cell.row, cell.col), (cell.row, cell.col)),
                Some(((min_row, min_col), (max_row, max_col))) => (
                    (min_row.min(cell.row), min_col.min(cell.col)),
                    (max_row.max(cell.row), max_col.max(cell.col)),
                ),
            });
        }
        Ok(bounds)
    }
}

/// How a component is reduced to a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeRule {
    /// Mean of all member cell centers.
    #[default]
    Centroid,
    /// Center of the member cell with the smallest label.
    MinimumLabelCell,
}

/// The point that stands in for one component during partitioning and routing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Representative {
    pub component_id: usize,
    pub position: Coordinate,
}

/// Arithmetic mean of the member cell centers.
pub fn centroid(cells: &BTreeSet<CellLabel>, geometry: &GridGeometry) -> Result<Coordinate, PlanningError> {
    if cells.is_empty() {
        return Err(PlanningError::EmptyComponent);
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for &label in cells {
        let center = geometry.cell_center(label)?;
        sum_x += center.x;
        sum_y += center.y;
    }

    let count = cells.len() as f64;
    Ok(Coordinate::new(sum_x / count, sum_y / count))
}

/// Center of the smallest-label cell.
pub fn minimum_label_center(cells: &BTreeSet<CellLabel>, geometry: &GridGeometry) -> Result<Coordinate, PlanningError> {
    let label = cells.first().ok_or(PlanningError::EmptyComponent)?;
    geometry.cell_center(*label)
}

impl Representative {
    pub fn of(component: &HazardComponent, geometry: &GridGeometry, rule: RepresentativeRule) -> Result<Self, PlanningError> {
        let position = match rule {
            RepresentativeRule::Centroid => centroid(&component.cells, geometry)?,
            RepresentativeRule::MinimumLabelCell => minimum_label_center(&component.cells, geometry)?,
        };
        Ok(Self {
            component_id: component.id,
            position,
        })
    }
}

/// Computes one representative per component, keyed by component id.
pub fn representatives(
    components: &[HazardComponent],
    geometry: &GridGeometry,
    rule: RepresentativeRule,
) -> Result<BTreeMap<usize, Representative>, PlanningError> {
    components
        .iter()
        .map(|component| -> Result<_, PlanningError> {
            Ok((component.id, Representative::of(component, geometry, rule)?))
        })
        .collect()
}
