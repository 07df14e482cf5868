use crate::geo::segment::Point2;

const DEGENERATE_AREA: f64 = 1e-12;
const INSIDE_EPS: f64 = 1e-9;

/// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine2 {
    /// The affine map carrying three source vertices onto three destination
    /// vertices, or `None` when the source triangle has no area.
    pub fn from_triangles(src: [Point2; 3], dst: [Point2; 3]) -> Option<Self> {
        let m = [
            [src[0].x, src[0].y, 1.0],
            [src[1].x, src[1].y, 1.0],
            [src[2].x, src[2].y, 1.0],
        ];
        let det = det3(m);
        if det.abs() < DEGENERATE_AREA || !det.is_finite() {
            return None;
        }
        let solve = |values: [f64; 3]| {
            let mut coeffs = [0.0; 3];
            for (column, coeff) in coeffs.iter_mut().enumerate() {
                let mut replaced = m;
                for row in 0..3 {
                    replaced[row][column] = values[row];
                }
                *coeff = det3(replaced) / det;
            }
            coeffs
        };
        let [a, b, c] = solve([dst[0].x, dst[1].x, dst[2].x]);
        let [d, e, f] = solve([dst[0].y, dst[1].y, dst[2].y]);
        Some(Self { a, b, c, d, e, f })
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        Point2::new(
            self.a * p.x + self.b * p.y + self.c,
            self.d * p.x + self.e * p.y + self.f,
        )
    }
}

fn det3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Barycentric weights of `p` in `tri`, if it lies inside (edges included).
pub fn barycentric(p: Point2, tri: [Point2; 3]) -> Option<[f64; 3]> {
    let [p0, p1, p2] = tri;
    let denom = (p1.y - p2.y) * (p0.x - p2.x) + (p2.x - p1.x) * (p0.y - p2.y);
    if denom.abs() < DEGENERATE_AREA {
        return None;
    }
    let w0 = ((p1.y - p2.y) * (p.x - p2.x) + (p2.x - p1.x) * (p.y - p2.y)) / denom;
    let w1 = ((p2.y - p0.y) * (p.x - p2.x) + (p0.x - p2.x) * (p.y - p2.y)) / denom;
    let w2 = 1.0 - w0 - w1;
    (w0 >= -INSIDE_EPS && w1 >= -INSIDE_EPS && w2 >= -INSIDE_EPS).then_some([w0, w1, w2])
}

/// Index triangles over control points stored as interleaved row pairs
/// (`near_0, far_0, near_1, far_1, ...`), two triangles per neighbouring pair.
pub fn strip_triangles(pairs: usize) -> Vec<[usize; 3]> {
    (0..pairs.saturating_sub(1))
        .flat_map(|k| {
            let (near, far) = (2 * k, 2 * k + 1);
            let (next_near, next_far) = (2 * k + 2, 2 * k + 3);
            [[near, far, next_near], [far, next_far, next_near]]
        })
        .collect()
}

/// One triangle of a piecewise-affine map, carrying the map from its
/// destination triangle back to its source triangle.
#[derive(Debug, Clone, Copy)]
pub struct AffinePiece {
    pub src: [Point2; 3],
    pub dst: [Point2; 3],
    pub inverse: Affine2,
}

/// Locally affine map over a shared triangulation of source and destination
/// control points.
#[derive(Debug, Clone)]
pub struct PiecewiseAffine {
    pieces: Vec<AffinePiece>,
}

impl PiecewiseAffine {
    /// Fits one affine per triangle; triangles degenerate on either side are
    /// left out. Returns `None` when nothing usable remains.
    pub fn estimate(src: &[Point2], dst: &[Point2], triangles: &[[usize; 3]]) -> Option<Self> {
        if src.len() != dst.len() {
            return None;
        }
        let pieces: Vec<AffinePiece> = triangles
            .iter()
            .filter(|tri| tri.iter().all(|&i| i < src.len()))
            .filter_map(|&[i, j, k]| {
                let s = [src[i], src[j], src[k]];
                let d = [dst[i], dst[j], dst[k]];
                Affine2::from_triangles(s, d)?;
                Some(AffinePiece {
                    src: s,
                    dst: d,
                    inverse: Affine2::from_triangles(d, s)?,
                })
            })
            .collect();
        (!pieces.is_empty()).then_some(Self { pieces })
    }

    pub fn pieces(&self) -> &[AffinePiece] {
        &self.pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point2, b: Point2) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn affine_maps_vertices_exactly() {
        let src = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let dst = [Point2::new(2.0, 3.0), Point2::new(4.0, 3.0), Point2::new(2.0, 6.0)];
        let affine = Affine2::from_triangles(src, dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!(close(affine.apply(*s), *d));
        }
        assert!(close(affine.apply(Point2::new(0.5, 0.5)), Point2::new(3.0, 4.5)));
    }

    #[test]
    fn collinear_source_is_degenerate() {
        let src = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
        assert!(Affine2::from_triangles(src, src).is_none());
    }

    #[test]
    fn strip_triangulation_covers_each_quad_twice() {
        assert!(strip_triangles(1).is_empty());
        let tris = strip_triangles(3);
        assert_eq!(tris.len(), 4);
        assert_eq!(tris[0], [0, 1, 2]);
        assert_eq!(tris[3], [3, 5, 4]);
    }

    #[test]
    fn pieces_map_destination_back_into_source() {
        let src = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        ];
        let dst: Vec<Point2> = src
            .iter()
            .map(|p| Point2::new(2.0 * p.x + 1.0, p.y + 0.1 * p.x * p.x))
            .collect();
        let warp = PiecewiseAffine::estimate(&src, &dst, &strip_triangles(3)).unwrap();
        assert_eq!(warp.pieces().len(), 4);

        for piece in warp.pieces() {
            for (d, s) in piece.dst.iter().zip(piece.src.iter()) {
                assert!(close(piece.inverse.apply(*d), *s));
            }
            let centroid = Point2::new(
                (piece.dst[0].x + piece.dst[1].x + piece.dst[2].x) / 3.0,
                (piece.dst[0].y + piece.dst[1].y + piece.dst[2].y) / 3.0,
            );
            assert!(barycentric(piece.inverse.apply(centroid), piece.src).is_some());
        }
        assert!(PiecewiseAffine::estimate(&src, &dst[..4], &strip_triangles(3)).is_none());
    }
}
