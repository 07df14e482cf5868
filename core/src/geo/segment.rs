#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn offset_by(&self, origin: Point2) -> Point2 {
        Point2::new(self.x - origin.x, self.y - origin.y)
    }

    fn shifted_by(&self, origin: Point2) -> Point2 {
        Point2::new(self.x + origin.x, self.y + origin.y)
    }
}

/// General-form line `a*y + b*x = c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl LineCoefficients {
    pub fn through(p1: Point2, p2: Point2) -> Self {
        let a = p2.x - p1.x;
        let b = p1.y - p2.y;
        let c = a * p1.y + b * p1.x;
        Self { a, b, c }
    }

    /// Intersection of the two infinite lines by Cramer's rule.
    pub fn intersection(&self, other: &LineCoefficients) -> Option<Point2> {
        let det = self.a * other.b - other.a * self.b;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let y = (self.c * other.b - other.c * self.b) / det;
        let x = (self.a * other.c - other.a * self.c) / det;
        Some(Point2::new(x, y))
    }
}

/// A ping's footprint: trackline origin to range-extent end point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingSegment {
    pub origin: Point2,
    pub end: Point2,
    pub range: f64,
}

impl PingSegment {
    pub fn new(origin: Point2, end: Point2, range: f64) -> Self {
        Self { origin, end, range }
    }

    /// Whether `point` falls inside this segment's bounding box grown by `tolerance`.
    pub fn bounds_contain(&self, point: Point2, tolerance: f64) -> bool {
        let (min_x, max_x) = min_max(self.origin.x, self.end.x);
        let (min_y, max_y) = min_max(self.origin.y, self.end.y);
        point.x >= min_x - tolerance
            && point.x <= max_x + tolerance
            && point.y >= min_y - tolerance
            && point.y <= max_y + tolerance
    }

    /// Crossing point of two ping footprints, if they cross within the beam of `other`.
    pub fn crossing(&self, other: &PingSegment, tolerance: f64) -> Option<Point2> {
        // Work relative to this origin so large projected coordinates do not cancel.
        let anchor = self.origin;
        let local_self = self.relative_to(anchor);
        let local_other = other.relative_to(anchor);

        let point = LineCoefficients::through(local_self.origin, local_self.end)
            .intersection(&LineCoefficients::through(local_other.origin, local_other.end))?;

        let within_both = local_self.bounds_contain(point, tolerance)
            && local_other.bounds_contain(point, tolerance);
        if within_both && local_other.origin.distance(point) <= local_other.range {
            Some(point.shifted_by(anchor))
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &PingSegment, tolerance: f64) -> bool {
        self.crossing(other, tolerance).is_some()
    }

    fn relative_to(&self, anchor: Point2) -> PingSegment {
        PingSegment::new(
            self.origin.offset_by(anchor),
            self.end.offset_by(anchor),
            self.range,
        )
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
