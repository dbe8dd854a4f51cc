//! Bowyer-Watson Delaunay triangulation.
//!
//! Triangles keep their neighbours, so each insertion walks from the most
//! recently created triangle to the one holding the new point and only
//! visits the triangles whose circumcircle it falls into.

use std::collections::HashMap;

use geo::Coord;
use log::trace;

/// Half-size, in normalized units, of the super triangle enclosing the
/// unit square the points are mapped into.
const SUPER_TRIANGLE_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Triangle {
    vertices: [usize; 3],
    /// `neighbors[i]` lies across the edge `vertices[i] -> vertices[i + 1]`.
    neighbors: [Option<usize>; 3],
    center: Coord<f64>,
    radius_squared: f64,
    alive: bool,
}

impl Triangle {
    fn new(vertices: [usize; 3], points: &[Coord<f64>]) -> Self {
        let (center, radius_squared) = circumcircle(
            points[vertices[0]],
            points[vertices[1]],
            points[vertices[2]],
        );
        Self {
            vertices,
            neighbors: [None; 3],
            center,
            radius_squared,
            alive: true,
        }
    }

    fn circumcircle_contains(&self, point: Coord<f64>) -> bool {
        let dx = point.x - self.center.x;
        let dy = point.y - self.center.y;
        dx * dx + dy * dy < self.radius_squared
    }

    fn edge(&self, i: usize) -> (usize, usize) {
        (self.vertices[i], self.vertices[(i + 1) % 3])
    }
}

struct Mesh {
    points: Vec<Coord<f64>>,
    triangles: Vec<Triangle>,
    last: usize,
}

impl Mesh {
    fn new(points: Vec<Coord<f64>>, super_triangle: [usize; 3]) -> Self {
        let triangles = vec![Triangle::new(super_triangle, &points)];
        Self {
            points,
            triangles,
            last: 0,
        }
    }

    /// Walks towards `point` from the last created triangle. Falls back to a
    /// scan when the walk does not settle.
    fn locate(&self, point: Coord<f64>) -> Option<usize> {
        let mut current = self.last;

        'walk: for _ in 0..self.triangles.len() {
            let triangle = &self.triangles[current];
            for i in 0..3 {
                let (a, b) = triangle.edge(i);
                if orientation(self.points[a], self.points[b], point) < 0.0 {
                    match triangle.neighbors[i] {
                        Some(next) => {
                            current = next;
                            continue 'walk;
                        }
                        None => break 'walk,
                    }
                }
            }
            return Some(current);
        }

        trace!("Point location walk did not settle, scanning");
        self.triangles
            .iter()
            .position(|t| t.alive && t.circumcircle_contains(point))
    }

    /// Alive triangles connected to `start` whose circumcircle holds `point`.
    fn cavity(&self, start: usize, point: Coord<f64>) -> Vec<usize> {
        let mut bad = vec![start];
        let mut visited = vec![start];
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            for neighbor in self.triangles[current].neighbors.into_iter().flatten() {
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.push(neighbor);
                if self.triangles[neighbor].circumcircle_contains(point) {
                    bad.push(neighbor);
                    stack.push(neighbor);
                }
            }
        }

        bad
    }

    fn insert(&mut self, index: usize) {
        let point = self.points[index];

        let Some(start) = self.locate(point) else {
            trace!("Point {index} is outside the mesh, skipping");
            return;
        };
        if !self.triangles[start].circumcircle_contains(point) {
            trace!("Point {index} fell outside every circumcircle, skipping");
            return;
        }

        let bad = self.cavity(start, point);
        for &triangle in &bad {
            self.triangles[triangle].alive = false;
        }

        // Fan the cavity outline around the new point.
        let mut spokes: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        for &old in &bad {
            for i in 0..3 {
                let outside = self.triangles[old].neighbors[i];
                if outside.is_some_and(|n| !self.triangles[n].alive) {
                    continue;
                }

                let (a, b) = self.triangles[old].edge(i);
                let created = self.triangles.len();
                let mut triangle = Triangle::new([a, b, index], &self.points);
                triangle.neighbors[0] = outside;
                self.triangles.push(triangle);

                if let Some(outside) = outside {
                    let across = &mut self.triangles[outside];
                    if let Some(j) = (0..3).find(|&j| across.edge(j) == (b, a)) {
                        across.neighbors[j] = Some(created);
                    }
                }

                // Edge 1 is b -> index, edge 2 is index -> a.
                for (edge, slot) in [((b, index), 1), ((index, a), 2)] {
                    match spokes.remove(&(edge.1, edge.0)) {
                        Some((twin, twin_slot)) => {
                            self.triangles[created].neighbors[slot] = Some(twin);
                            self.triangles[twin].neighbors[twin_slot] = Some(created);
                        }
                        None => {
                            spokes.insert(edge, (created, slot));
                        }
                    }
                }
                self.last = created;
            }
        }
    }
}

/// Triangulates `points`, which must be free of duplicates.
///
/// Returns counter-clockwise vertex triples indexing into `points`. Collinear
/// or too small inputs produce no triangles.
pub(crate) fn triangulate(points: &[Coord<f64>]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(min_x, min_y, max_x, max_y), c| {
            (min_x.min(c.x), min_y.min(c.y), max_x.max(c.x), max_y.max(c.y))
        },
    );
    let span = (max_x - min_x).max(max_y - min_y);
    if span <= 0.0 || !span.is_finite() {
        return Vec::new();
    }

    // Work in the unit square to keep the circumcircle arithmetic well scaled.
    let mut vertices: Vec<Coord<f64>> = points
        .iter()
        .map(|c| Coord {
            x: (c.x - min_x) / span,
            y: (c.y - min_y) / span,
        })
        .collect();
    vertices.push(Coord {
        x: 0.5 - 2.0 * SUPER_TRIANGLE_SCALE,
        y: -SUPER_TRIANGLE_SCALE,
    });
    vertices.push(Coord {
        x: 0.5 + 2.0 * SUPER_TRIANGLE_SCALE,
        y: -SUPER_TRIANGLE_SCALE,
    });
    vertices.push(Coord {
        x: 0.5,
        y: 2.0 * SUPER_TRIANGLE_SCALE,
    });

    let mut mesh = Mesh::new(vertices, [n, n + 1, n + 2]);
    for index in 0..n {
        mesh.insert(index);
    }

    mesh.triangles
        .into_iter()
        .filter(|triangle| triangle.alive)
        .map(|triangle| triangle.vertices)
        .filter(|vertices| vertices.iter().all(|&v| v < n))
        .collect()
}

/// Circumcenter and squared circumradius. Degenerate triangles get an
/// infinite circle so that any later point replaces them.
fn circumcircle(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> (Coord<f64>, f64) {
    let b = b - a;
    let c = c - a;
    let d = 2.0 * (b.x * c.y - b.y * c.x);
    if d == 0.0 {
        return (a, f64::INFINITY);
    }

    let b_len = b.x * b.x + b.y * b.y;
    let c_len = c.x * c.x + c.y * c.y;
    let ux = (c.y * b_len - b.y * c_len) / d;
    let uy = (b.x * c_len - c.x * b_len) / d;

    (
        Coord {
            x: a.x + ux,
            y: a.y + uy,
        },
        ux * ux + uy * uy,
    )
}

/// Twice the signed area; positive for counter-clockwise triples.
pub(crate) fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}
