//! Road network model.
//!
//! A [`RawNetwork`] is what a loader hands over: nodes with positions and
//! directed segments carrying a length plus optional speed limit, geometry and
//! name. [`TimeWeightedNetwork`] validates it once and annotates every segment
//! with its traversal time in minutes.

use std::collections::HashMap;
use std::time::Instant;

use geo::{Coord, LineString, Point};
use log::{debug, info, warn};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spatial_index::NodeSpatialIndex;
use crate::speed::{self, SpeedAnnotation};

/// Identifier of a node, stable within one network.
pub type NodeId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub from: NodeId,
    pub to: NodeId,
    /// Physical length in meters. Mandatory; kept optional here so a loader
    /// can pass missing values through and have them rejected at build time.
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub maxspeed: Option<SpeedAnnotation>,
    /// Path as `[lon, lat]` positions. Absent means a straight line.
    #[serde(default)]
    pub geometry: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawSegment {
    pub fn new(from: NodeId, to: NodeId, length: f64) -> Self {
        Self {
            from,
            to,
            length: Some(length),
            maxspeed: None,
            geometry: None,
            name: None,
        }
    }

    pub fn with_maxspeed(mut self, maxspeed: impl Into<SpeedAnnotation>) -> Self {
        self.maxspeed = Some(maxspeed.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<[f64; 2]>) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Directed multigraph as supplied by a network loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNetwork {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

impl RawNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) -> &mut Self {
        self.nodes.push(RawNode { id, lat, lon });
        self
    }

    pub fn add_segment(&mut self, segment: RawSegment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    /// Adds the segment and its reverse, for two-way roads.
    pub fn add_two_way_segment(&mut self, segment: RawSegment) -> &mut Self {
        let reverse = RawSegment {
            from: segment.to,
            to: segment.from,
            geometry: segment.geometry.as_ref().map(|path| {
                let mut path = path.clone();
                path.reverse();
                path
            }),
            ..segment.clone()
        };
        self.segments.push(segment);
        self.segments.push(reverse);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// `x` is longitude, `y` is latitude.
    pub position: Point<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: NodeId,
    pub to: NodeId,
    pub length: f64,
    pub maxspeed: Option<SpeedAnnotation>,
    pub geometry: Option<LineString<f64>>,
    pub name: Option<String>,
    /// Resolved speed in km/h.
    pub speed_kph: f64,
    /// Traversal time in minutes.
    pub travel_time: f64,
}

/// Road network whose segments carry a positive, finite traversal time.
#[derive(Debug, Clone)]
pub struct TimeWeightedNetwork {
    graph: DiGraph<Node, Segment>,
    node_index_map: HashMap<NodeId, NodeIndex>,
    spatial_index: NodeSpatialIndex,
    default_speed_kmh: f64,
}

impl TimeWeightedNetwork {
    /// Validates `raw` and builds the network. Any malformed segment aborts
    /// the build.
    pub fn new(raw: RawNetwork, default_speed_kmh: f64) -> Result<Self> {
        let start_time = Instant::now();

        if !(default_speed_kmh.is_finite() && default_speed_kmh > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "default speed must be positive, got {default_speed_kmh}"
            )));
        }

        let mut graph =
            DiGraph::<Node, Segment>::with_capacity(raw.nodes.len(), raw.segments.len());
        let mut node_index_map = HashMap::with_capacity(raw.nodes.len());

        for node in raw.nodes {
            if !(node.lat.is_finite() && node.lon.is_finite()) {
                return Err(Error::construction(
                    format!("node {}", node.id),
                    format!("non-finite position ({}, {})", node.lon, node.lat),
                ));
            }
            if node_index_map.contains_key(&node.id) {
                return Err(Error::construction(
                    format!("node {}", node.id),
                    "duplicate node id",
                ));
            }

            let node_index = graph.add_node(Node {
                id: node.id,
                position: Point::new(node.lon, node.lat),
            });
            node_index_map.insert(node.id, node_index);
        }

        for (position, raw_segment) in raw.segments.into_iter().enumerate() {
            let label = format!("#{position} ({} -> {})", raw_segment.from, raw_segment.to);
            let segment = validate_segment(raw_segment, &label)?;

            let (Some(&start_index), Some(&end_index)) = (
                node_index_map.get(&segment.from),
                node_index_map.get(&segment.to),
            ) else {
                return Err(Error::construction(label, "endpoint is not a known node"));
            };

            graph.add_edge(start_index, end_index, segment);
        }

        let spatial_index = NodeSpatialIndex::new(
            graph
                .node_indices()
                .map(|node_index| (node_index, graph[node_index].position)),
        );

        let mut network = Self {
            graph,
            node_index_map,
            spatial_index,
            default_speed_kmh,
        };
        network.add_edge_travel_times();

        info!(
            "Built network with {} nodes and {} segments",
            network.node_count(),
            network.segment_count()
        );
        debug!("Network construction took: {:?}", start_time.elapsed());

        Ok(network)
    }

    /// Recomputes speed and traversal time of every segment from its length
    /// and raw speed annotation. Running it again yields identical values.
    pub fn add_edge_travel_times(&mut self) {
        let default_speed_kmh = self.default_speed_kmh;
        for segment in self.graph.edge_weights_mut() {
            segment.speed_kph = speed::resolve(segment.maxspeed.as_ref(), default_speed_kmh);
            segment.travel_time = calculate_travel_time(segment.length, segment.speed_kph);
        }
    }

    pub fn graph(&self) -> &DiGraph<Node, Segment> {
        &self.graph
    }

    pub fn default_speed_kmh(&self) -> f64 {
        self.default_speed_kmh
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn segment_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, node_index: NodeIndex) -> bool {
        self.graph.node_weight(node_index).is_some()
    }

    pub fn node(&self, node_index: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(node_index)
    }

    pub fn segment(&self, edge_index: EdgeIndex) -> Option<&Segment> {
        self.graph.edge_weight(edge_index)
    }

    pub fn node_index(&self, id: NodeId) -> Result<NodeIndex> {
        self.node_index_map
            .get(&id)
            .copied()
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    /// Position of a node in the network. Panics on a foreign index, like
    /// graph indexing does.
    pub fn position(&self, node_index: NodeIndex) -> Point<f64> {
        self.graph[node_index].position
    }

    /// Node closest to the given point.
    pub fn latlon_to_node(&self, lat: f64, lon: f64) -> Result<NodeIndex> {
        if !(lat.is_finite() && lon.is_finite()) {
            return Err(Error::NodeNotFound(format!("invalid position ({lon}, {lat})")));
        }
        self.spatial_index
            .nearest(Point::new(lon, lat))
            .ok_or_else(|| Error::NodeNotFound(format!("no node near ({lon}, {lat})")))
    }

    /// Segment path, falling back to the straight line between its endpoints.
    pub fn segment_geometry(&self, edge_index: EdgeIndex) -> Option<LineString<f64>> {
        let segment = self.graph.edge_weight(edge_index)?;
        if let Some(geometry) = &segment.geometry {
            return Some(geometry.clone());
        }

        let (start_index, end_index) = self.graph.edge_endpoints(edge_index)?;
        Some(LineString::from(vec![
            self.position(start_index),
            self.position(end_index),
        ]))
    }
}

fn validate_segment(raw: RawSegment, label: &str) -> Result<Segment> {
    let length = match raw.length {
        Some(length) if length.is_finite() && length > 0.0 => length,
        Some(length) => {
            return Err(Error::construction(
                label,
                format!("length must be positive, got {length}"),
            ))
        }
        None => return Err(Error::construction(label, "missing length")),
    };

    let geometry = match raw.geometry {
        Some(path) if path.len() >= 2 && path.iter().flatten().all(|v| v.is_finite()) => Some(
            path.into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect::<LineString<f64>>(),
        ),
        Some(_) => {
            warn!("Segment {label} has an unusable geometry, using a straight line instead");
            None
        }
        None => None,
    };

    Ok(Segment {
        from: raw.from,
        to: raw.to,
        length,
        maxspeed: raw.maxspeed,
        geometry,
        name: raw.name,
        speed_kph: 0.0,
        travel_time: 0.0,
    })
}

/// Traversal time in minutes for `length` meters at `speed_kph`.
pub fn calculate_travel_time(length: f64, speed_kph: f64) -> f64 {
    let meters_per_minute = speed_kph * 1000.0 / 60.0;
    length / meters_per_minute
}
