use thiserror::Error;

use crate::graph::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid segment {segment}: {reason}")]
    Construction { segment: String, reason: String },
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("At least 3 distinct, non-collinear points are needed to bound an area, got {0}")]
    InsufficientPoints(usize),
    #[error("No route found to node {target}")]
    NoRouteFound { target: NodeId },
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    #[error("No isochrone registered under the name {0:?}")]
    UnknownIsochrone(String),
    #[error("Time budget must be finite and non-negative, got {0}")]
    InvalidBudget(f64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("GeoJSON error: {0}")]
    GeoJson(String),
}

impl Error {
    pub(crate) fn construction(segment: impl ToString, reason: impl ToString) -> Self {
        Error::Construction {
            segment: segment.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
