use approx::assert_relative_eq;
use geo::Intersects;
use geojson::Value;
use isochrone_generator::{
    Error, GeneratorConfig, HullType, IsochroneGenerator, RawNetwork, RawSegment,
};

const A: i64 = 1;
const B: i64 = 2;
const C: i64 = 3;
const D: i64 = 4;

/// A(0,0) -> B(0,1) -> C(1,1) -> D(1,0), positions as (lon, lat).
fn square_route() -> RawNetwork {
    let mut raw = RawNetwork::new();
    raw.add_node(A, 0.0, 0.0)
        .add_node(B, 1.0, 0.0)
        .add_node(C, 1.0, 1.0)
        .add_node(D, 0.0, 1.0)
        .add_segment(RawSegment::new(A, B, 100.0))
        .add_segment(RawSegment::new(B, C, 100.0).with_maxspeed("50"))
        .add_segment(RawSegment::new(C, D, 100.0).with_maxspeed("30 mph"));
    raw
}

fn generator() -> IsochroneGenerator {
    IsochroneGenerator::new(square_route(), GeneratorConfig::default()).unwrap()
}

#[test_log::test]
fn test_whole_square_is_reached() {
    let mut generator = generator();
    let boundary = generator
        .generate_isochrone("square", 0.0, 0.0, 10.0, None)
        .unwrap()
        .clone();

    let result = generator.isochrone("square").unwrap();
    let network = generator.network();
    let mut ids: Vec<i64> = result.subgraph.nodes().map(|n| network.graph()[n].id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![A, B, C, D]);

    // Travel times follow the resolved speeds: 48.28, 50 and 30 mph.
    let d = network.node_index(D).unwrap();
    let expected = 0.1 / 48.28 * 60.0 + 0.1 / 50.0 * 60.0 + 0.1 / (30.0 * 1.60934) * 60.0;
    assert_relative_eq!(result.subgraph.time_to(d).unwrap(), expected, epsilon = 1e-9);

    // Four points a degree apart are too sparse for an alpha shape, so the
    // boundary falls back to their convex hull.
    assert_eq!(boundary.part_count(), 1);
    assert_relative_eq!(boundary.area(), 1.0, epsilon = 1e-12);
    for id in [A, B, C, D] {
        let position = network.position(network.node_index(id).unwrap());
        assert!(boundary.as_multi_polygon().intersects(&position));
    }
}

#[test]
fn test_road_network_export() {
    let mut generator = generator();
    generator.generate_isochrone("square", 0.0, 0.0, 10.0, None).unwrap();

    let collection = generator.generate_road_network("square").unwrap();
    let lines = collection
        .features
        .iter()
        .filter(|f| matches!(f.geometry.as_ref().map(|g| &g.value), Some(Value::LineString(_))))
        .count();
    let points = collection
        .features
        .iter()
        .filter(|f| matches!(f.geometry.as_ref().map(|g| &g.value), Some(Value::Point(_))))
        .count();
    assert_eq!((lines, points), (3, 4));

    for feature in &collection.features[..3] {
        assert_eq!(feature.property("road_name"), Some(&"Unknown road".into()));
    }

    let again = generator.generate_road_network("square").unwrap();
    assert_eq!(
        serde_json::to_string(&collection).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

#[test_log::test]
fn test_routes_run_from_source_to_boundary() {
    let mut generator = generator();
    generator.generate_isochrone("square", 0.0, 0.0, 10.0, None).unwrap();

    let route_set = generator.generate_shortest_paths("square").unwrap();
    assert!(route_set.failures.is_empty());
    assert_eq!(route_set.len(), 4);

    let network = generator.network();
    let source = network.position(generator.isochrone("square").unwrap().source);
    for route in &route_set.routes {
        let target = network.position(network.node_index(route.target).unwrap());
        assert_eq!(route.coordinates.0.first(), Some(&source.0));
        assert_eq!(route.coordinates.0.last(), Some(&target.0));
    }

    // The route to D follows the only direction the segments allow.
    let to_d = route_set.routes.iter().find(|r| r.target == D).unwrap();
    assert_eq!(to_d.coordinates.0.len(), 4);

    let features = route_set.to_features();
    assert_eq!(features.len(), 4);
    assert!(features.iter().all(|f| f.property("source") == Some(&"square".into())));
}

#[test]
fn test_budget_limits_the_reach() {
    let mut generator = generator();

    // A and B only: not enough to bound an area.
    assert_eq!(
        generator.generate_isochrone("short", 0.0, 0.0, 0.13, None),
        Err(Error::InsufficientPoints(2))
    );
    assert!(generator.isochrone("short").is_err());

    let boundaries = generator
        .generate_isochrones(0.0, 0.0, &[0.3, 10.0], Some(HullType::Convex))
        .unwrap();
    assert_relative_eq!(boundaries[0].area(), 0.5, epsilon = 1e-12);
    assert_relative_eq!(boundaries[1].area(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_network_from_json() {
    let json = r#"{
        "nodes": [
            {"id": 1, "lat": 0.0, "lon": 0.0},
            {"id": 2, "lat": 0.001, "lon": 0.0},
            {"id": 3, "lat": 0.001, "lon": 0.001}
        ],
        "segments": [
            {"from": 1, "to": 2, "length": 111.0, "maxspeed": ["30 mph", "20 mph"]},
            {"from": 2, "to": 3, "length": 70.0, "maxspeed": "none", "name": "Lane"}
        ]
    }"#;
    let raw: RawNetwork = serde_json::from_str(json).unwrap();
    let generator = IsochroneGenerator::new(raw, GeneratorConfig::default()).unwrap();

    let speeds: Vec<f64> = generator
        .network()
        .graph()
        .edge_weights()
        .map(|s| s.speed_kph)
        .collect();
    assert_relative_eq!(speeds[0], 25.0 * 1.60934, epsilon = 1e-9);
    assert_relative_eq!(speeds[1], 48.28);

    let missing_length = r#"{
        "nodes": [{"id": 1, "lat": 0.0, "lon": 0.0}],
        "segments": [{"from": 1, "to": 1}]
    }"#;
    let raw: RawNetwork = serde_json::from_str(missing_length).unwrap();
    assert!(matches!(
        IsochroneGenerator::new(raw, GeneratorConfig::default()),
        Err(Error::Construction { .. })
    ));
}

#[test]
fn test_reload_clears_registry() {
    let mut generator = generator();
    generator.generate_isochrone("square", 0.0, 0.0, 10.0, None).unwrap();
    assert_eq!(generator.isochrone_names(), vec!["square"]);

    generator.reload_network(square_route()).unwrap();
    assert!(generator.isochrone_names().is_empty());
    assert_eq!(
        generator.generate_road_network("square").unwrap_err(),
        Error::UnknownIsochrone("square".to_string())
    );
}
