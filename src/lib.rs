//! Isochrones over travel-time weighted road networks.
//!
//! A [`RawNetwork`] is turned into a [`TimeWeightedNetwork`]; from a source
//! point and a time budget the [`IsochroneGenerator`] derives the reachable
//! subgraph, its boundary polygon, shortest-by-distance routes to that
//! boundary and GeoJSON exports of the reached roads.

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod hull;
pub mod isochrone;
pub mod reachability;
pub mod routes;
pub mod spatial_index;
pub mod speed;

#[cfg(feature = "python")]
mod python;

pub use config::GeneratorConfig;
pub use error::{Error, Result};
pub use export::{
    boundary_from_geojson, boundary_to_geojson, boundary_to_geojson_string, road_network_to_geojson,
};
pub use graph::{Node, NodeId, RawNetwork, RawNode, RawSegment, Segment, TimeWeightedNetwork};
pub use hull::{Boundary, HullOptions, HullType};
pub use isochrone::{IsochroneGenerator, IsochroneResult};
pub use reachability::{reachable, ReachableSubgraph};
pub use routes::{shortest_paths, Route, RouteSet};
pub use speed::SpeedAnnotation;
