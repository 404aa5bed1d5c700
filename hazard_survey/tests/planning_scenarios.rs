use hazard_survey::PlanningError;
use hazard_survey::core_modules::cell::cell::{Coordinate, GridGeometry};
use hazard_survey::core_modules::component_detector::component_detector::compute_components;
use hazard_survey::core_modules::coverage::generate_path;
use hazard_survey::core_modules::group_partitioner::partition;
use hazard_survey::core_modules::hazard_region::centroid;
use hazard_survey::core_modules::route_builder::build_route;
use hazard_survey::pipeline::{PlannerConfig, SurveyPipeline, SurveyReport};
use std::collections::{BTreeMap, BTreeSet};

#[test]
fn top_left_block_becomes_one_centered_component() {
    let components = compute_components(4, [1, 2, 5, 6]).unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].cells, BTreeSet::from([1, 2, 5, 6]));

    let geometry = GridGeometry::new(4, 1.0, 1.0).unwrap();
    assert_eq!(centroid(&components[0].cells, &geometry).unwrap(), Coordinate::new(1.0, 1.0));
}

#[test]
fn half_grid_serpentine() {
    let path = generate_path(10, 0, 5).unwrap();
    assert_eq!(path.len(), 50);
    assert_eq!(&path[..5], &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
    assert_eq!(&path[5..10], &[(1, 4), (1, 3), (1, 2), (1, 1), (1, 0)]);
    assert_eq!(path[49], (9, 0));
}

#[test]
fn route_prefers_the_nearer_hazard() {
    let group = BTreeMap::from([
        (1, Coordinate::new(0.0, 0.0)),
        (2, Coordinate::new(10.0, 0.0)),
        (3, Coordinate::new(1.0, 1.0)),
    ]);
    assert_eq!(build_route(&group), vec![1, 3, 2]);
}

#[test]
fn stages_compose_into_routes() {
    let geometry = GridGeometry::new(8, 2.0, 2.0).unwrap();
    // Two blocks in opposite corners plus a lone cell in the middle.
    let flagged = [1, 2, 9, 10, 55, 56, 63, 64, 28];
    let components = compute_components(geometry.dimension(), flagged).unwrap();
    assert_eq!(components.len(), 3);

    let positions: BTreeMap<usize, Coordinate> = components
        .iter()
        .map(|c| (c.id, centroid(&c.cells, &geometry).unwrap()))
        .collect();
    let groups = partition(&positions, 2, 42).unwrap();
    assert_eq!(groups.len(), 2);

    let mut routed = BTreeSet::new();
    for group in groups.values() {
        let coords: BTreeMap<usize, Coordinate> = group.members.iter().map(|id| (*id, positions[id])).collect();
        let route = build_route(&coords);
        assert_eq!(route.len(), group.members.len());
        routed.extend(route);
    }
    assert_eq!(routed, BTreeSet::from([1, 2, 3]));
}

#[test]
fn pipeline_end_to_end_is_deterministic() {
    let config = PlannerConfig::from_toml_str(
        r#"
        grid_dimension = 16
        cell_width = 25.0
        cell_height = 25.0
        capacity_per_agent = 4.0
        seed = 7
        "#,
    )
    .unwrap();
    let pipeline = SurveyPipeline::new(config).unwrap();
    let flagged: Vec<u32> = vec![1, 2, 17, 40, 41, 100, 120, 121, 137, 200, 230, 256];

    let first = pipeline.generate_report(&flagged).unwrap();
    let second = pipeline.generate_report(&flagged).unwrap();
    assert_eq!(first, second);

    let SurveyReport::Hazards(plan) = first else {
        panic!("expected hazards");
    };
    // ceil(12 / 4) = 3 agents, never more than the number of components.
    assert_eq!(plan.group_count(), 3.min(plan.components.len()));
    let stops: usize = plan.routes.iter().map(|r| r.stops.len()).sum();
    assert_eq!(stops, plan.components.len());
}

#[test]
fn failures_are_precondition_errors() {
    assert!(matches!(
        compute_components(3, [10]),
        Err(PlanningError::InvalidLabel { label: 10, max: 9 })
    ));
    assert!(matches!(generate_path(4, 2, 2), Err(PlanningError::InvalidBand { .. })));
    assert!(matches!(
        partition(&BTreeMap::new(), 2, 0),
        Err(PlanningError::InvalidGroupCount { .. })
    ));
}
