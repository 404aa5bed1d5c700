// THEORY:
// The `pipeline` module is the top-level API for the planner. It encapsulates the
// full chain of stages behind a single call: flagged cells go in, agent routes come
// out. Each stage consumes the previous stage's immutable output and produces a new
// value, so a pipeline can be shared freely and re-run with identical results.

use crate::core_modules::cell::cell::{CellLabel, Coordinate, GridGeometry};
use crate::core_modules::component_detector::component_detector;
use crate::core_modules::coverage::{self, BandPolicy, CoveragePath};
use crate::core_modules::group_partitioner::{self, AgentGroup};
use crate::core_modules::hazard_region::{self, HazardComponent, Representative, RepresentativeRule};
use crate::core_modules::route_builder::AgentRoute;
use crate::error::PlanningError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_GRID_DIMENSION: u32 = 30;
/// 75% of a 40-cell sortie.
const DEFAULT_CAPACITY_PER_AGENT: f64 = 0.75 * 40.0;
const DEFAULT_SEED: u64 = 42;

/// Configuration for the SurveyPipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// Cells per side of the square grid (`b`).
    pub grid_dimension: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    /// How many flagged cells one agent is expected to handle.
    pub capacity_per_agent: f64,
    /// Seed for the spatial clustering.
    pub seed: u64,
    pub representative_rule: RepresentativeRule,
    pub band_policy: BandPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grid_dimension: DEFAULT_GRID_DIMENSION,
            cell_width: 1.0,
            cell_height: 1.0,
            capacity_per_agent: DEFAULT_CAPACITY_PER_AGENT,
            seed: DEFAULT_SEED,
            representative_rule: RepresentativeRule::default(),
            band_policy: BandPolicy::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, PlanningError> {
        let config: PlannerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlanningError> {
        self.geometry()?;
        if !(self.capacity_per_agent.is_finite() && self.capacity_per_agent > 0.0) {
            return Err(PlanningError::InvalidConfig(format!(
                "capacity_per_agent must be positive, got {}",
                self.capacity_per_agent
            )));
        }
        Ok(())
    }

    pub fn geometry(&self) -> Result<GridGeometry, PlanningError> {
        GridGeometry::new(self.grid_dimension, self.cell_width, self.cell_height)
    }
}

/// Everything planned for one grid that had at least one flagged cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyPlan {
    pub components: Vec<HazardComponent>,
    /// One representative per component, keyed by component id.
    pub representatives: BTreeMap<usize, Representative>,
    /// Agent groups keyed by group id (1-based).
    pub groups: BTreeMap<usize, AgentGroup>,
    /// One route per group, ordered by group id.
    pub routes: Vec<AgentRoute>,
    /// Number of distinct flagged cells.
    pub hazard_cells: usize,
}

impl SurveyPlan {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Pixel positions of a route's stops, in visiting order.
    pub fn waypoints(&self, route: &AgentRoute) -> Vec<Coordinate> {
        route
            .stops
            .iter()
            .filter_map(|id| self.representatives.get(id).map(|r| r.position))
            .collect()
    }
}

/// The primary output of the planner for a single grid.
#[derive(Debug, Clone, PartialEq)]
pub enum SurveyReport {
    NoHazards,
    Hazards(SurveyPlan),
}

/// The main, top-level struct for the planner.
#[derive(Debug, Clone)]
pub struct SurveyPipeline {
    config: PlannerConfig,
    geometry: GridGeometry,
}

impl SurveyPipeline {
    pub fn new(config: PlannerConfig) -> Result<Self, PlanningError> {
        config.validate()?;
        let geometry = config.geometry()?;
        Ok(Self { config, geometry })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[tracing::instrument(skip_all, fields(flagged = flagged.len(), grid = self.geometry.dimension()))]
    pub fn generate_report(&self, flagged: &[CellLabel]) -> Result<SurveyReport, PlanningError> {
        // Stage 1: Connectivity
        let components = component_detector::compute_components(
            self.geometry.dimension(),
            flagged.iter().copied(),
        )?;
        if components.is_empty() {
            tracing::debug!("no flagged cells");
            return Ok(SurveyReport::NoHazards);
        }
        let hazard_cells: usize = components.iter().map(HazardComponent::size_in_cells).sum();

        // Stage 2: Representatives
        let representatives =
            hazard_region::representatives(&components, &self.geometry, self.config.representative_rule)?;
        let positions: BTreeMap<usize, Coordinate> = representatives
            .iter()
            .map(|(&id, rep)| (id, rep.position))
            .collect();

        // Stage 3: Partitioning
        let group_count = group_partitioner::derive_group_count(
            hazard_cells,
            self.config.capacity_per_agent,
            positions.len(),
        )?;
        let groups = group_partitioner::partition(&positions, group_count, self.config.seed)?;

        // Stage 4: Routing
        let routes: Vec<AgentRoute> = groups
            .values()
            .map(|group| {
                let coords: BTreeMap<usize, Coordinate> = group
                    .members
                    .iter()
                    .filter_map(|id| positions.get(id).map(|p| (*id, *p)))
                    .collect();
                AgentRoute::build(group.id, &coords)
            })
            .collect();

        tracing::info!(
            hazard_cells,
            components = components.len(),
            groups = groups.len(),
            "planned hazard routes"
        );

        Ok(SurveyReport::Hazards(SurveyPlan {
            components,
            representatives,
            groups,
            routes,
            hazard_cells,
        }))
    }

    /// Full-coverage baseline for `agents` agents, independent of hazard data.
    pub fn plan_coverage(&self, agents: u32) -> Result<Vec<CoveragePath>, PlanningError> {
        let paths = coverage::plan_coverage(self.geometry.dimension(), agents, self.config.band_policy)?;
        tracing::debug!(agents, policy = ?self.config.band_policy, "planned coverage sweep");
        Ok(paths)
    }
}
