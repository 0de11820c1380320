//! Delaunay triangulation of a point scatter (Bowyer–Watson).
//!
//! Built once per interpolation call and queried per lattice cell. Inputs
//! with fewer than three distinct, non-collinear points produce an empty
//! triangle set, which the caller treats as the everything-outside-hull
//! degenerate case.

const EPS: f64 = 1e-12;

#[derive(Debug)]
pub struct Triangulation {
    points: Vec<(f64, f64)>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulates `points` (input order preserved; triangle vertex
    /// indices refer into it).
    pub fn build(input: &[(f64, f64)]) -> Self {
        let n = input.len();
        let mut points = input.to_vec();

        if n < 3 {
            return Triangulation {
                points,
                triangles: Vec::new(),
            };
        }

        // Super-triangle comfortably enclosing the scatter.
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in input {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let cx = (min_x + max_x) / 2.0;
        let cy = (min_y + max_y) / 2.0;
        let span = (max_x - min_x).max(max_y - min_y).max(1.0) * 20.0;

        points.push((cx - span, cy - span / 2.0));
        points.push((cx + span, cy - span / 2.0));
        points.push((cx, cy + span));

        let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

        for i in 0..n {
            let p = points[i];

            // Triangles whose circumcircle contains the new point.
            let mut bad = Vec::new();
            for (t, tri) in triangles.iter().enumerate() {
                if circumcircle_contains(points[tri[0]], points[tri[1]], points[tri[2]], p) {
                    bad.push(t);
                }
            }

            if bad.is_empty() {
                // Duplicate or numerically coincident point.
                continue;
            }

            // Boundary of the cavity: edges belonging to exactly one bad
            // triangle.
            let mut edges: Vec<(usize, usize)> = Vec::new();
            for &t in &bad {
                let tri = triangles[t];
                for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                    let key = (a.min(b), a.max(b));
                    if let Some(pos) = edges.iter().position(|e| *e == key) {
                        edges.swap_remove(pos);
                    } else {
                        edges.push(key);
                    }
                }
            }

            for &t in bad.iter().rev() {
                triangles.swap_remove(t);
            }

            for (a, b) in edges {
                triangles.push([a, b, i]);
            }
        }

        // Drop triangles touching the super-triangle and slivers.
        triangles.retain(|tri| {
            tri.iter().all(|&v| v < n)
                && triangle_area2(points[tri[0]], points[tri[1]], points[tri[2]]).abs() > EPS
        });

        points.truncate(n);
        Triangulation { points, triangles }
    }

    pub fn is_degenerate(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Finds the triangle containing `(x, y)` and its barycentric weights.
    /// Returns `None` outside the convex hull.
    pub fn locate(&self, x: f64, y: f64) -> Option<([usize; 3], [f64; 3])> {
        for tri in &self.triangles {
            let a = self.points[tri[0]];
            let b = self.points[tri[1]];
            let c = self.points[tri[2]];

            let det = (b.1 - c.1) * (a.0 - c.0) + (c.0 - b.0) * (a.1 - c.1);
            if det.abs() < EPS {
                continue;
            }

            let w0 = ((b.1 - c.1) * (x - c.0) + (c.0 - b.0) * (y - c.1)) / det;
            let w1 = ((c.1 - a.1) * (x - c.0) + (a.0 - c.0) * (y - c.1)) / det;
            let w2 = 1.0 - w0 - w1;

            let tol = -1e-9;
            if w0 >= tol && w1 >= tol && w2 >= tol {
                return Some((*tri, [w0.max(0.0), w1.max(0.0), w2.max(0.0)]));
            }
        }
        None
    }

    #[cfg(test)]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

fn circumcircle_contains(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> bool {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < EPS {
        return false;
    }

    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;

    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let r2 = (a.0 - ux).powi(2) + (a.1 - uy).powi(2);

    let dist2 = (p.0 - ux).powi(2) + (p.1 - uy).powi(2);
    dist2 <= r2 * (1.0 + 1e-10)
}

fn triangle_area2(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)
}
