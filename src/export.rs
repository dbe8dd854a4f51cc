use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::error::{Error, Result};
use crate::graph::TimeWeightedNetwork;
use crate::hull::Boundary;
use crate::reachability::ReachableSubgraph;

const UNKNOWN_ROAD: &str = "Unknown road";

/// Exports a reachable subgraph as GeoJSON features.
///
/// One LineString per segment, in segment order, followed by one Point per
/// node, in node order. Segments without a recorded path become a straight
/// line between their endpoints. Indices `network` does not hold are skipped.
pub fn road_network_to_geojson(
    network: &TimeWeightedNetwork,
    subgraph: &ReachableSubgraph,
) -> FeatureCollection {
    let mut features = Vec::with_capacity(subgraph.segment_count() + subgraph.node_count());

    for &edge_index in subgraph.segments() {
        let (Some(segment), Some(geometry)) = (
            network.segment(edge_index),
            network.segment_geometry(edge_index),
        ) else {
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert("from".to_string(), segment.from.into());
        properties.insert("to".to_string(), segment.to.into());
        properties.insert(
            "road_name".to_string(),
            segment.name.as_deref().unwrap_or(UNKNOWN_ROAD).into(),
        );
        features.push(feature(Value::from(&geometry), properties));
    }

    for node_index in subgraph.nodes() {
        let Some(node) = network.node(node_index) else {
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert("node_id".to_string(), node.id.into());
        features.push(feature(Value::from(&node.position), properties));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// A single part becomes a Polygon, several parts a MultiPolygon. Positions
/// are `[lon, lat]`.
pub fn boundary_to_geojson(boundary: &Boundary) -> Geometry {
    let value = match boundary.as_polygon() {
        Some(polygon) => Value::from(polygon),
        None => Value::from(boundary.as_multi_polygon()),
    };
    Geometry::new(value)
}

pub fn boundary_to_geojson_string(boundary: &Boundary) -> Result<String> {
    serde_json::to_string(&boundary_to_geojson(boundary)).map_err(|e| Error::GeoJson(e.to_string()))
}

/// Reads a boundary back from a Polygon or MultiPolygon geometry.
pub fn boundary_from_geojson(geometry: &Geometry) -> Result<Boundary> {
    match &geometry.value {
        Value::Polygon(_) => Polygon::<f64>::try_from(geometry.value.clone())
            .map(Boundary::from)
            .map_err(|e| Error::GeoJson(e.to_string())),
        Value::MultiPolygon(_) => MultiPolygon::<f64>::try_from(geometry.value.clone())
            .map(|multi_polygon| Boundary::new(multi_polygon.0))
            .map_err(|e| Error::GeoJson(e.to_string())),
        _ => Err(Error::UnsupportedGeometry(
            "expected a Polygon or MultiPolygon geometry".to_string(),
        )),
    }
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
