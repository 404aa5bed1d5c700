// THEORY:
// The `Cell` module is the most fundamental unit of the planner. A survey area is
// partitioned into a square `b x b` grid, and every cell of that grid is addressed
// by a single integer label in `[1, b*b]`, assigned row-major from the top-left.
// Everything downstream (components, representatives, groups, routes) is built
// from these labels.
//
// What lives here:
// - `CellLabel`, `Cell` and the label <-> (row, col) conversions.
// - `GridGeometry`, the validated grid parameters (dimension and cell size) that
//   turn a label into a pixel-space coordinate.
// - `Coordinate`, a 2D point in pixel space with a Euclidean distance.
// - `adjacent_labels`, the Moore (8-connected) neighborhood of a label, computed
//   purely from label arithmetic so the grid never has to be materialized.
//
// Key principles:
// 1) Cells are "dumb" immutable values. Nothing here knows which cells are hazardous.
// 2) All bounds checking happens at this layer, so higher layers can trust labels.

pub mod cell {
    use crate::error::PlanningError;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeSet;

    /// A 1-indexed, row-major cell label.
    pub type CellLabel = u32;

    /// Returns the largest valid label for a `dimension x dimension` grid.
    pub fn max_label(dimension: u32) -> Result<CellLabel, PlanningError> {
        if dimension == 0 {
            return Err(PlanningError::InvalidGridDimension(dimension));
        }
        let cells = dimension as u64 * dimension as u64;
        CellLabel::try_from(cells).map_err(|_| PlanningError::InvalidGridDimension(dimension))
    }

    /// Fails with `InvalidLabel` unless `label` lies in `[1, dimension^2]`.
    pub fn check_label(label: CellLabel, dimension: u32) -> Result<(), PlanningError> {
        let max = max_label(dimension)?;
        if label == 0 || label > max {
            return Err(PlanningError::InvalidLabel { label, max });
        }
        Ok(())
    }

    /// A single cell of the grid with its derived position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Cell {
        pub label: CellLabel,
        /// Zero-based row, counted from the top.
        pub row: u32,
        /// Zero-based column, counted from the left.
        pub col: u32,
    }

    impl Cell {
        pub fn from_label(label: CellLabel, dimension: u32) -> Result<Self, PlanningError> {
            check_label(label, dimension)?;
            Ok(Self {
                label,
                row: (label - 1) / dimension,
                col: (label - 1) % dimension,
            })
        }

        pub fn from_position(row: u32, col: u32, dimension: u32) -> Result<Self, PlanningError> {
            let max = max_label(dimension)?;
            if row >= dimension || col >= dimension {
                // Report the label the position would have had, saturated to stay printable.
                let label = (row as u64 * dimension as u64 + col as u64 + 1).min(u32::MAX as u64);
                return Err(PlanningError::InvalidLabel {
                    label: label as CellLabel,
                    max,
                });
            }
            Ok(Self {
                label: row * dimension + col + 1,
                row,
                col,
            })
        }
    }

    /// A point in pixel space.
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Coordinate {
        pub x: f64,
        pub y: f64,
    }

    impl Coordinate {
        pub fn new(x: f64, y: f64) -> Self {
            Self { x, y }
        }

        pub fn distance_to(&self, other: &Coordinate) -> f64 {
            self.squared_distance_to(other).sqrt()
        }

        pub fn squared_distance_to(&self, other: &Coordinate) -> f64 {
            (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
        }
    }

    impl From<(f64, f64)> for Coordinate {
        fn from((x, y): (f64, f64)) -> Self {
            Self { x, y }
        }
    }

    /// Validated grid parameters shared by every stage that needs pixel positions.
    /// Only constructible through `new` or `from_image_size`.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridGeometry {
        dimension: u32,
        cell_width: f64,
        cell_height: f64,
    }

    impl GridGeometry {
        pub fn new(dimension: u32, cell_width: f64, cell_height: f64) -> Result<Self, PlanningError> {
            max_label(dimension)?;
            let valid = |v: f64| v.is_finite() && v > 0.0;
            if !valid(cell_width) || !valid(cell_height) {
                return Err(PlanningError::InvalidCellGeometry {
                    width: cell_width,
                    height: cell_height,
                });
            }
            Ok(Self {
                dimension,
                cell_width,
                cell_height,
            })
        }

        /// Derives the cell size from an image that the grid is laid over.
        /// Integer division matches how the detector slices the image into cells.
        pub fn from_image_size(width: u32, height: u32, dimension: u32) -> Result<Self, PlanningError> {
            max_label(dimension)?;
            Self::new(
                dimension,
                (width / dimension) as f64,
                (height / dimension) as f64,
            )
        }

        /// Number of cells along each side of the square grid (`b`).
        pub fn dimension(&self) -> u32 {
            self.dimension
        }

        pub fn cell_width(&self) -> f64 {
            self.cell_width
        }

        pub fn cell_height(&self) -> f64 {
            self.cell_height
        }

        /// The pixel-space center of a cell.
        pub fn cell_center(&self, label: CellLabel) -> Result<Coordinate, PlanningError> {
            let cell = Cell::from_label(label, self.dimension)?;
            Ok(self.center_of(&cell))
        }

        pub fn center_of(&self, cell: &Cell) -> Coordinate {
            Coordinate {
                x: (cell.col as f64 + 0.5) * self.cell_width,
                y: (cell.row as f64 + 0.5) * self.cell_height,
            }
        }
    }

    /// Returns the up-to-8 Moore neighbors of `label` that lie inside the grid.
    pub fn adjacent_labels(label: CellLabel, dimension: u32) -> Result<BTreeSet<CellLabel>, PlanningError> {
        check_label(label, dimension)?;
        Ok(neighbors_unchecked(label, dimension))
    }

    /// Neighbor computation for a label already known to be in range.
    pub(crate) fn neighbors_unchecked(n: CellLabel, b: u32) -> BTreeSet<CellLabel> {
        let has_top = n > b;
        let has_bottom = n <= b * (b - 1);
        let has_left = (n - 1) % b != 0;
        let has_right = n % b != 0;

        let mut adjacent = BTreeSet::new();
        if has_top {
            adjacent.insert(n - b);
        }
        if has_bottom {
            adjacent.insert(n + b);
        }
        if has_left {
            adjacent.insert(n - 1);
        }
        if has_right {
            adjacent.insert(n + 1);
        }

        // Diagonals need both contributing edges.
        if has_top && has_left {
            adjacent.insert(n - b - 1);
        }
        if has_top && has_right {
            adjacent.insert(n - b + 1);
        }
        if has_bottom && has_left {
            adjacent.insert(n + b - 1);
        }
        if has_bottom && has_right {
            adjacent.insert(n + b + 1);
        }
        adjacent
    }
}
