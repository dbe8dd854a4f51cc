//! Shortest-by-distance routes from an isochrone's source to its boundary.

use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use geo::{Coord, LineString, Point, Polygon};
use geojson::{Feature, Geometry, JsonObject, Value};
use log::{debug, warn};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::graph::{NodeId, TimeWeightedNetwork};
use crate::hull::Boundary;
use crate::reachability::{ReachableSubgraph, State};
use crate::spatial_index::NodeSpatialIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub source_name: String,
    /// Node the route ends at, the closest reachable node to `boundary_vertex`.
    pub target: NodeId,
    pub boundary_vertex: Point<f64>,
    /// Node positions from the source to `target`, at least two of them.
    pub coordinates: LineString<f64>,
}

impl Route {
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("source".to_string(), self.source_name.clone().into());
        properties.insert("target".to_string(), self.target.into());

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(&self.coordinates))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Routes that could be built, plus the reason for every boundary vertex or
/// part that could not be routed to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSet {
    pub routes: Vec<Route>,
    pub failures: Vec<Error>,
}

impl RouteSet {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn to_features(&self) -> Vec<Feature> {
        self.routes.iter().map(Route::to_feature).collect()
    }
}

/// Routes from the subgraph's source to the reachable node nearest each
/// vertex of `boundary`, weighted by segment length and restricted to the
/// segments of `subgraph`.
///
/// Failures for single vertices or parts are collected in the returned set
/// instead of aborting. An empty subgraph, or one holding nodes `network`
/// does not have, is an error.
pub fn shortest_paths(
    network: &TimeWeightedNetwork,
    subgraph: &ReachableSubgraph,
    boundary: &Boundary,
    source_name: &str,
) -> Result<RouteSet> {
    let start_time = Instant::now();
    let source = subgraph.source();

    let positions = subgraph
        .nodes()
        .map(|node| {
            network
                .node(node)
                .map(|n| (node, n.position))
                .ok_or_else(|| Error::NodeNotFound(format!("index {}", node.index())))
        })
        .collect::<Result<Vec<_>>>()?;
    let index = NodeSpatialIndex::new(positions);
    if index.is_empty() {
        return Err(Error::NodeNotFound(format!(
            "isochrone {source_name:?} has no reachable nodes"
        )));
    }

    let predecessors = shortest_path_tree(network, subgraph, source);
    let mut route_set = RouteSet::default();

    for (part_number, part) in boundary.parts().iter().enumerate() {
        let vertices = match exterior_vertices(part) {
            Ok(vertices) => vertices,
            Err(err) => {
                warn!("Skipping boundary part {part_number} of {source_name:?}: {err}");
                route_set.failures.push(err);
                continue;
            }
        };

        for vertex in vertices {
            let Some(target) = index.nearest(Point::from(vertex)) else {
                continue;
            };

            match path_to(&predecessors, source, target) {
                Some(path) => route_set.routes.push(Route {
                    source_name: source_name.to_string(),
                    target: network.graph()[target].id,
                    boundary_vertex: Point::from(vertex),
                    coordinates: path_geometry(network, &path),
                }),
                None => {
                    let target = network.graph()[target].id;
                    warn!("No route from the source of {source_name:?} to node {target}");
                    route_set.failures.push(Error::NoRouteFound { target });
                }
            }
        }
    }

    debug!(
        "Built {} routes ({} failures) for {source_name:?} in {:?}",
        route_set.routes.len(),
        route_set.failures.len(),
        start_time.elapsed()
    );

    Ok(route_set)
}

/// Exterior ring without its closing vertex and without consecutive repeats.
fn exterior_vertices(part: &Polygon<f64>) -> Result<Vec<Coord<f64>>> {
    let ring = &part.exterior().0;
    if ring.len() < 4 {
        return Err(Error::UnsupportedGeometry(format!(
            "polygon ring with {} coordinates",
            ring.len()
        )));
    }

    let mut vertices: Vec<Coord<f64>> = ring[..ring.len() - 1].to_vec();
    vertices.dedup();
    Ok(vertices)
}

/// Dijkstra over segment lengths, confined to the subgraph. Returns the
/// predecessor of every node reached from `start`.
fn shortest_path_tree(
    network: &TimeWeightedNetwork,
    subgraph: &ReachableSubgraph,
    start: NodeIndex,
) -> HashMap<NodeIndex, NodeIndex> {
    let graph = network.graph();
    let mut distances: HashMap<NodeIndex, f64> = HashMap::new();
    let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(start, 0.0);
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if distances.get(&node).is_some_and(|&best| cost > best) {
            continue;
        }

        for edge in graph.edges(node) {
            if !subgraph.contains_segment(edge.id()) {
                continue;
            }

            let next = edge.target();
            let next_cost = cost + edge.weight().length;
            if distances.get(&next).map_or(true, |&best| next_cost < best) {
                distances.insert(next, next_cost);
                predecessors.insert(next, node);
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    predecessors
}

fn path_to(
    predecessors: &HashMap<NodeIndex, NodeIndex>,
    source: NodeIndex,
    target: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut path = vec![target];
    let mut current = target;
    while current != source {
        current = *predecessors.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

fn path_geometry(network: &TimeWeightedNetwork, path: &[NodeIndex]) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = path.iter().map(|&node| network.position(node).0).collect();
    // A route to the source itself still has to be a valid line.
    if coords.len() == 1 {
        coords.push(coords[0]);
    }
    LineString::new(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RawNetwork, RawSegment};
    use crate::hull::{self, HullOptions};
    use crate::reachability::reachable;
    use geo::polygon;

    /// A star: center 1 with two-way arms to 2, 3 and 4. Node 5 hangs off 2
    /// by a long one-way road and has a one-way return to the center.
    fn star_network() -> TimeWeightedNetwork {
        let mut raw = RawNetwork::new();
        raw.add_node(1, 0.0, 0.0)
            .add_node(2, 0.01, 0.0)
            .add_node(3, 0.0, 0.01)
            .add_node(4, -0.01, -0.01)
            .add_node(5, 0.01, -0.01)
            .add_two_way_segment(RawSegment::new(1, 2, 1000.0))
            .add_two_way_segment(RawSegment::new(1, 3, 1000.0))
            .add_two_way_segment(RawSegment::new(1, 4, 1500.0))
            .add_segment(RawSegment::new(5, 1, 1500.0))
            .add_segment(RawSegment::new(2, 5, 5000.0));
        TimeWeightedNetwork::new(raw, 60.0).unwrap()
    }

    fn reachable_from_center(network: &TimeWeightedNetwork, budget: f64) -> ReachableSubgraph {
        let source = network.node_index(1).unwrap();
        reachable(network, source, budget).unwrap()
    }

    fn positions(network: &TimeWeightedNetwork, subgraph: &ReachableSubgraph) -> Vec<Point<f64>> {
        subgraph.nodes().map(|n| network.position(n)).collect()
    }

    #[test_log::test]
    fn test_routes_start_at_source_and_end_at_nearest_node() {
        let network = star_network();
        let subgraph = reachable_from_center(&network, 2.0);
        let boundary =
            hull::boundary(&positions(&network, &subgraph), HullOptions::convex()).unwrap();

        let route_set = shortest_paths(&network, &subgraph, &boundary, "center").unwrap();
        assert!(route_set.failures.is_empty());
        // Triangle 2, 3, 4 with the center inside it
        assert_eq!(route_set.len(), 3);

        let source_position = network.position(subgraph.source());
        for route in &route_set.routes {
            assert_eq!(route.coordinates.0.first(), Some(&source_position.0));
            let target = network.node_index(route.target).unwrap();
            assert_eq!(route.boundary_vertex, network.position(target));
            assert_eq!(route.coordinates.0.last(), Some(&route.boundary_vertex.0));
            assert_eq!(route.coordinates.0.len(), 2);
        }
    }

    #[test_log::test]
    fn test_routes_follow_subgraph_segments() {
        let network = star_network();
        // Node 5 is only reached through 2 -> 5, exactly at the budget.
        let subgraph = reachable_from_center(&network, 6.0);
        assert!(subgraph.contains(network.node_index(5).unwrap()));

        let boundary =
            hull::boundary(&positions(&network, &subgraph), HullOptions::convex()).unwrap();
        let route_set = shortest_paths(&network, &subgraph, &boundary, "center").unwrap();

        assert!(route_set.failures.is_empty());
        assert_eq!(route_set.len(), 4);
        let to_five = route_set.routes.iter().find(|r| r.target == 5).unwrap();
        assert_eq!(
            to_five.coordinates,
            LineString::from(vec![(0.0, 0.0), (0.0, 0.01), (-0.01, 0.01)])
        );
    }

    #[test]
    fn test_missing_predecessor_means_no_path() {
        let mut predecessors = HashMap::new();
        predecessors.insert(NodeIndex::new(2), NodeIndex::new(1));
        predecessors.insert(NodeIndex::new(1), NodeIndex::new(0));

        assert_eq!(
            path_to(&predecessors, NodeIndex::new(0), NodeIndex::new(2)),
            Some(vec![NodeIndex::new(0), NodeIndex::new(1), NodeIndex::new(2)])
        );
        assert_eq!(path_to(&predecessors, NodeIndex::new(0), NodeIndex::new(3)), None);
        assert_eq!(
            path_to(&predecessors, NodeIndex::new(0), NodeIndex::new(0)),
            Some(vec![NodeIndex::new(0)])
        );
    }

    #[test]
    fn test_source_vertex_gets_a_degenerate_line() {
        let network = star_network();
        let subgraph = reachable_from_center(&network, 2.0);
        let boundary = Boundary::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 0.01),
            (x: 0.0, y: 0.01),
            (x: 0.01, y: 0.0),
        ]);

        let route_set = shortest_paths(&network, &subgraph, &boundary, "center").unwrap();
        // Closing vertex and the repeated corner are skipped.
        assert_eq!(route_set.len(), 3);

        let to_source = &route_set.routes[0];
        assert_eq!(to_source.target, 1);
        assert_eq!(to_source.coordinates.0, vec![Coord { x: 0.0, y: 0.0 }; 2]);
    }

    #[test]
    fn test_degenerate_part_is_reported() {
        let network = star_network();
        let subgraph = reachable_from_center(&network, 2.0);
        let boundary = Boundary::new(vec![
            Polygon::new(LineString::from(vec![(0.0, 0.0), (0.01, 0.0)]), vec![]),
            polygon![(x: 0.0, y: 0.0), (x: 0.01, y: 0.0), (x: 0.0, y: 0.01)],
        ]);

        let route_set = shortest_paths(&network, &subgraph, &boundary, "center").unwrap();
        assert_eq!(route_set.len(), 3);
        assert_eq!(route_set.failures.len(), 1);
        assert!(matches!(route_set.failures[0], Error::UnsupportedGeometry(_)));
    }

    #[test]
    fn test_subgraph_of_another_network_is_rejected() {
        let network = star_network();
        let subgraph = reachable_from_center(&network, 6.0);

        let mut raw = RawNetwork::new();
        raw.add_node(1, 0.0, 0.0)
            .add_node(2, 0.01, 0.0)
            .add_two_way_segment(RawSegment::new(1, 2, 1000.0));
        let smaller = TimeWeightedNetwork::new(raw, 60.0).unwrap();
        let boundary = Boundary::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 0.01, y: 0.0),
            (x: 0.0, y: 0.01),
        ]);

        assert!(matches!(
            shortest_paths(&smaller, &subgraph, &boundary, "center"),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_route_features() {
        let network = star_network();
        let subgraph = reachable_from_center(&network, 2.0);
        let boundary =
            hull::boundary(&positions(&network, &subgraph), HullOptions::convex()).unwrap();
        let route_set = shortest_paths(&network, &subgraph, &boundary, "center").unwrap();

        let features = route_set.to_features();
        assert_eq!(features.len(), route_set.len());
        for (feature, route) in features.iter().zip(&route_set.routes) {
            assert_eq!(feature.property("source"), Some(&"center".into()));
            assert_eq!(feature.property("target"), Some(&route.target.into()));
            let geometry = feature.geometry.as_ref().unwrap();
            assert!(matches!(geometry.value, Value::LineString(ref line) if line.len() == 2));
        }
    }
}
