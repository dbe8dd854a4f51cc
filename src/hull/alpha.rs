use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::f64::consts::TAU;

use geo::{Area, Coord, Intersects, LineString, Polygon, Winding};
use log::{info, warn};

use super::delaunay::{orientation, triangulate};
use super::{convex_hull, Boundary};

/// Alpha shape of `coords` (sorted, distinct), retried once at `alpha / 2`
/// when it fragments.
///
/// The retry is kept unless it has strictly more parts than the first
/// attempt. If neither attempt leaves any triangle, the convex hull is used.
pub(crate) fn concave_hull(coords: &[Coord<f64>], alpha: f64) -> Boundary {
    let first = alpha_shape(coords, alpha);
    if first.len() == 1 {
        return Boundary::new(first);
    }

    let retry_alpha = alpha / 2.0;
    info!(
        "Alpha shape at alpha {alpha} has {} parts, retrying at alpha {retry_alpha}",
        first.len()
    );
    let retry = alpha_shape(coords, retry_alpha);

    let parts = if retry.is_empty() || (!first.is_empty() && retry.len() > first.len()) {
        first
    } else {
        retry
    };

    if parts.is_empty() {
        warn!("Alpha shape enclosed no area, falling back to the convex hull");
        return Boundary::from(convex_hull(coords));
    }

    Boundary::new(parts)
}

/// Polygons formed by the Delaunay triangles of `coords` whose circumradius
/// is below `1 / alpha`. An `alpha` of 0 keeps every triangle.
pub(crate) fn alpha_shape(coords: &[Coord<f64>], alpha: f64) -> Vec<Polygon<f64>> {
    let max_radius = if alpha > 0.0 { 1.0 / alpha } else { f64::INFINITY };

    let kept: Vec<[usize; 3]> = triangulate(coords)
        .into_iter()
        .filter(|&[a, b, c]| circumradius(coords[a], coords[b], coords[c]) < max_radius)
        .collect();
    if kept.is_empty() {
        return Vec::new();
    }

    let rings = trace_rings(coords, boundary_edges(&kept));
    assemble_polygons(rings)
}

/// Infinite for (near) degenerate triangles.
fn circumradius(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    let ab = (b - a).x.hypot((b - a).y);
    let bc = (c - b).x.hypot((c - b).y);
    let ca = (a - c).x.hypot((a - c).y);
    let twice_area = orientation(a, b, c).abs();

    if twice_area <= f64::EPSILON * (ab * ab + bc * bc + ca * ca) {
        return f64::INFINITY;
    }
    ab * bc * ca / (2.0 * twice_area)
}

/// Directed edges used by exactly one kept triangle, oriented so the kept
/// area lies on their left.
fn boundary_edges(triangles: &[[usize; 3]]) -> BTreeSet<(usize, usize)> {
    let directed: HashSet<(usize, usize)> = triangles
        .iter()
        .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
        .collect();

    directed
        .iter()
        .filter(|&&(a, b)| !directed.contains(&(b, a)))
        .copied()
        .collect()
}

/// Chains boundary edges into closed rings.
///
/// Each ring starts at the smallest unused edge. Where several boundary edges
/// leave a vertex, the walk takes the first one clockwise from the edge it
/// arrived on, which keeps parts touching at a single vertex apart.
fn trace_rings(coords: &[Coord<f64>], edges: BTreeSet<(usize, usize)>) -> Vec<LineString<f64>> {
    let mut outgoing: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(from, to) in &edges {
        outgoing.entry(from).or_default().push(to);
    }

    let mut unused = edges;
    let mut rings = Vec::new();

    while let Some((start, first)) = unused.pop_first() {
        let mut ring = vec![start];
        let (mut previous, mut current) = (start, first);

        while current != start {
            ring.push(current);

            let next = outgoing
                .get(&current)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&candidate| unused.contains(&(current, candidate)))
                .min_by(|&x, &y| {
                    clockwise_turn(coords, previous, current, x)
                        .total_cmp(&clockwise_turn(coords, previous, current, y))
                        .then(x.cmp(&y))
                });

            match next {
                Some(next) => {
                    unused.remove(&(current, next));
                    previous = current;
                    current = next;
                }
                None => {
                    warn!("Boundary ring starting at vertex {start} does not close, skipping it");
                    ring.clear();
                    break;
                }
            }
        }

        if ring.len() >= 3 {
            let mut ring: Vec<Coord<f64>> = ring.into_iter().map(|i| coords[i]).collect();
            ring.push(coords[start]);
            rings.push(LineString::new(ring));
        }
    }

    rings
}

/// Clockwise angle in (0, 2π] from the edge back to `previous` to the edge
/// towards `candidate`, both seen from `current`.
fn clockwise_turn(coords: &[Coord<f64>], previous: usize, current: usize, candidate: usize) -> f64 {
    let back = coords[previous] - coords[current];
    let out = coords[candidate] - coords[current];

    let turn = back.y.atan2(back.x) - out.y.atan2(out.x);
    if turn <= 0.0 {
        turn + TAU
    } else {
        turn
    }
}

/// Counter-clockwise rings become polygon exteriors; clockwise rings are holes
/// and go to the smallest exterior enclosing them.
fn assemble_polygons(rings: Vec<LineString<f64>>) -> Vec<Polygon<f64>> {
    let (shells, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|ring| ring.is_ccw());

    let mut polygons: Vec<Polygon<f64>> = shells
        .into_iter()
        .map(|shell| Polygon::new(shell, vec![]))
        .collect();

    for hole in holes {
        let owner = polygons
            .iter()
            .enumerate()
            .filter(|(_, polygon)| hole.0.iter().all(|coord| polygon.intersects(coord)))
            .min_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .map(|(index, _)| index);

        match owner {
            Some(index) => polygons[index].interiors_push(hole),
            None => warn!("Dropping a boundary hole that lies outside every part"),
        }
    }

    polygons
}
