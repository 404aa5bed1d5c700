pub mod cell;
pub mod component_detector;
pub mod coverage;
pub mod group_partitioner;
pub mod hazard_region;
pub mod route_builder;
