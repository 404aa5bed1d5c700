// THEORY:
// Every stage of the planner is a pure function over in-memory values, so the
// only ways it can fail are precondition violations: a label outside the grid,
// an empty component, a group count the representatives cannot satisfy, or a
// malformed column band. None of these are transient, and none are retried.
// They are collected into a single `PlanningError` so that the orchestrating
// caller can decide whether to skip the offending grid or abort the batch.

use thiserror::Error;

use crate::core_modules::cell::cell::CellLabel;

/// The error type returned by every fallible operation in the planner.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// A cell label fell outside `[1, max]` for the grid it was used with.
    #[error("cell label {label} is outside the grid range [1, {max}]")]
    InvalidLabel { label: CellLabel, max: CellLabel },

    #[error("grid dimension must be positive, got {0}")]
    InvalidGridDimension(u32),

    #[error("cell geometry must be finite and positive, got {width}x{height}")]
    InvalidCellGeometry { width: f64, height: f64 },

    /// A centroid was requested for a component with no member cells.
    #[error("cannot compute a representative point for an empty component")]
    EmptyComponent,

    #[error("cannot split {available} representatives into {requested} groups")]
    InvalidGroupCount { requested: usize, available: usize },

    /// The column band does not satisfy `0 <= start_col < end_col <= grid_size`.
    #[error("invalid column band [{start_col}, {end_col}) for a grid of size {grid_size}")]
    InvalidBand {
        grid_size: u32,
        start_col: u32,
        end_col: u32,
    },

    #[error("cannot assign {agents} agents to a grid of {grid_size} columns")]
    InvalidAgentCount { agents: u32, grid_size: u32 },

    /// Raised by the fail-fast band policy when columns would be left over.
    #[error("{grid_size} columns do not split evenly across {agents} agents")]
    UnevenBandSplit { grid_size: u32, agents: u32 },

    #[error("invalid planner configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse planner configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The batch layer could not hand a grid to a worker or lost its reply.
    #[error("planning worker is unavailable")]
    WorkerUnavailable,
}
