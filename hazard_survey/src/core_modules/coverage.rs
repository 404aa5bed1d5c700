// THEORY:
// The `Coverage` module is the baseline survey strategy. It ignores hazard data
// entirely and sweeps every cell, which is slow but guarantees that nothing is missed.
//
// Key architectural principles:
// 1.  **Column Bands**: The grid's columns are split into contiguous bands, one per
//     agent. How leftover columns are handled when the grid width does not divide
//     evenly is an explicit `BandPolicy`, never a silent truncation.
// 2.  **Boustrophedon Sweep**: Within a band, even rows run left-to-right and odd rows
//     run right-to-left. Consecutive cells always differ by one step along one axis,
//     so an agent never jumps, and every cell of the band appears exactly once.
// 3.  **Independence**: Bands share no state, so each path can be produced on its
//     own (or in parallel) and the result is the same.

use crate::error::PlanningError;
use serde::{Deserialize, Serialize};

/// What to do with columns left over when the grid does not split evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPolicy {
    /// Refuse to plan an uneven split.
    FailFast,
    /// Give the leftover columns to the last agent.
    #[default]
    AbsorbRemainder,
}

/// A half-open column range `[start_col, end_col)` assigned to one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBand {
    /// 1-based agent number.
    pub agent: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl ColumnBand {
    pub fn width(&self) -> u32 {
        self.end_col - self.start_col
    }
}

/// A full sweep of one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveragePath {
    pub band: ColumnBand,
    /// `(row, col)` pairs in visiting order.
    pub steps: Vec<(u32, u32)>,
}

impl CoveragePath {
    pub fn start(&self) -> Option<(u32, u32)> {
        self.steps.first().copied()
    }

    pub fn end(&self) -> Option<(u32, u32)> {
        self.steps.last().copied()
    }
}

/// Serpentine sweep over columns `[start_col, end_col)` of an `n x n` grid.
pub fn generate_path(n: u32, start_col: u32, end_col: u32) -> Result<Vec<(u32, u32)>, PlanningError> {
    if start_col >= end_col || end_col > n {
        return Err(PlanningError::InvalidBand {
            grid_size: n,
            start_col,
            end_col,
        });
    }

    let width = (end_col - start_col) as usize;
    let mut path = Vec::with_capacity(n as usize * width);
    for row in 0..n {
        if row % 2 == 0 {
            path.extend((start_col..end_col).map(|col| (row, col)));
        } else {
            path.extend((start_col..end_col).rev().map(|col| (row, col)));
        }
    }
    Ok(path)
}

/// Splits the `n` columns of the grid into one contiguous band per agent.
pub fn split_bands(n: u32, agents: u32, policy: BandPolicy) -> Result<Vec<ColumnBand>, PlanningError> {
    if agents == 0 || agents > n {
        return Err(PlanningError::InvalidAgentCount { agents, grid_size: n });
    }

    let width = n / agents;
    let remainder = n % agents;
    if remainder != 0 && policy == BandPolicy::FailFast {
        return Err(PlanningError::UnevenBandSplit { grid_size: n, agents });
    }

    Ok((0..agents)
        .map(|i| {
            let start_col = i * width;
            let end_col = if i + 1 == agents { n } else { start_col + width };
            ColumnBand {
                agent: i + 1,
                start_col,
                end_col,
            }
        })
        .collect())
}

/// Plans a complete coverage sweep of an `n x n` grid for `agents` agents.
pub fn plan_coverage(n: u32, agents: u32, policy: BandPolicy) -> Result<Vec<CoveragePath>, PlanningError> {
    split_bands(n, agents, policy)?
        .into_iter()
        .map(|band| -> Result<CoveragePath, PlanningError> {
            Ok(CoveragePath {
                band,
                steps: generate_path(n, band.start_col, band.end_col)?,
            })
        })
        .collect()
}
