//! Boundary polygons around a set of reached positions.
//!
//! Two strategies are offered. [`HullType::Concave`] is an alpha shape: the
//! Delaunay triangulation of the points, filtered to triangles whose
//! circumradius is below `1 / alpha`. If that fragments into several parts it
//! is retried once at half the alpha. [`HullType::Convex`] is the plain convex
//! hull, which never fragments but also covers the gaps between network arms.

mod alpha;
mod delaunay;

use std::time::Instant;

use geo::{Area, ConvexHull, Coord, MultiPoint, MultiPolygon, Point, Polygon};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use alpha::concave_hull;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HullType {
    #[default]
    Concave,
    Convex,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HullOptions {
    pub hull_type: HullType,
    /// Concavity, only used by [`HullType::Concave`].
    pub alpha: f64,
}

impl HullOptions {
    pub fn concave(alpha: f64) -> Self {
        Self {
            hull_type: HullType::Concave,
            alpha,
        }
    }

    pub fn convex() -> Self {
        Self {
            hull_type: HullType::Convex,
            alpha: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.alpha.is_finite() && self.alpha >= 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "alpha must be finite and non-negative, got {}",
                self.alpha
            )))
        }
    }
}

/// Isochrone boundary: one polygon, or several disjoint ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary(MultiPolygon<f64>);

impl Boundary {
    pub fn new(parts: Vec<Polygon<f64>>) -> Self {
        Boundary(MultiPolygon::new(parts))
    }

    pub fn parts(&self) -> &[Polygon<f64>] {
        &self.0 .0
    }

    pub fn part_count(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_fragmented(&self) -> bool {
        self.part_count() > 1
    }

    /// The single polygon, if the boundary did not fragment.
    pub fn as_polygon(&self) -> Option<&Polygon<f64>> {
        match self.parts() {
            [polygon] => Some(polygon),
            _ => None,
        }
    }

    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.0
    }

    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }
}

impl From<Polygon<f64>> for Boundary {
    fn from(polygon: Polygon<f64>) -> Self {
        Boundary::new(vec![polygon])
    }
}

/// Computes the boundary of `points` with the chosen strategy.
///
/// Fails with [`Error::InsufficientPoints`] when the distinct points cannot
/// enclose any area (fewer than three, or all on one line).
pub fn boundary(points: &[Point<f64>], options: HullOptions) -> Result<Boundary> {
    options.validate()?;
    let start_time = Instant::now();

    let coords = distinct_coords(points);
    if coords.len() < 3 || all_collinear(&coords) {
        return Err(Error::InsufficientPoints(coords.len()));
    }

    let boundary = match options.hull_type {
        HullType::Concave => concave_hull(&coords, options.alpha),
        HullType::Convex => Boundary::from(convex_hull(&coords)),
    };

    debug!(
        "{:?} boundary over {} points has {} part(s), took {:?}",
        options.hull_type,
        coords.len(),
        boundary.part_count(),
        start_time.elapsed()
    );

    Ok(boundary)
}

pub(crate) fn convex_hull(coords: &[Coord<f64>]) -> Polygon<f64> {
    MultiPoint::from(coords.iter().map(|&c| Point::from(c)).collect::<Vec<_>>()).convex_hull()
}

/// Sorts lexicographically by (x, y) and drops exact duplicates, so later
/// stages see a canonical point order.
fn distinct_coords(points: &[Point<f64>]) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = points.iter().map(|p| p.0).collect();
    coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    coords.dedup();
    coords
}

fn all_collinear(coords: &[Coord<f64>]) -> bool {
    let origin = coords[0];
    let Some(direction) = coords.iter().map(|&c| c - origin).find(|d| d.x != 0.0 || d.y != 0.0)
    else {
        return true;
    };

    coords.iter().all(|&c| {
        let offset = c - origin;
        let cross = direction.x * offset.y - direction.y * offset.x;
        let scale = (direction.x.powi(2) + direction.y.powi(2)).sqrt()
            * (offset.x.powi(2) + offset.y.powi(2)).sqrt();
        cross.abs() <= f64::EPSILON * scale
    })
}
