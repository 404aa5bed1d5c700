// THEORY:
// This file is the main entry point for the `hazard_survey` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `survey_tester` runner).
//
// The primary goal is to export the `SurveyPipeline` and its associated data
// structures (`PlannerConfig`, `SurveyReport`, etc.) as the clean, high-level
// interface for turning flagged grid cells into agent routes. The individual
// stages (`core_modules`) stay public so that callers who only need one stage,
// such as the coverage baseline, can call it directly.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::PlanningError;
