use serde::{Deserialize, Serialize};

use super::point::{Bounds, Point2};

/// Where two polylines cross.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub point: Point2,
    /// Segment index on the first line (segment `i` joins points `i` and `i+1`).
    pub seg_a: usize,
    /// Segment index on the second line.
    pub seg_b: usize,
}

/// An ordered sequence of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point2>,
}

impl Polyline {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, p: Point2) {
        self.points.push(p);
    }

    pub fn first(&self) -> Option<&Point2> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point2> {
        self.points.last()
    }

    /// Append another line, skipping its first point when it repeats our last.
    pub fn append(&mut self, other: &Polyline) {
        let skip = match (self.points.last(), other.points.first()) {
            (Some(a), Some(b)) if a == b => 1,
            _ => 0,
        };
        self.points.extend(other.points.iter().skip(skip).copied());
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }

    /// Repeat the first point at the end, unless already there.
    pub fn close(&mut self) {
        if let (Some(a), Some(b)) = (self.points.first().copied(), self.points.last()) {
            if a != *b {
                self.points.push(a);
            }
        }
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Drop consecutive duplicate points.
    pub fn condense(&mut self) {
        self.points.dedup();
    }

    /// Shoelace area of the implicitly closed line; counter-clockwise is positive.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        0.5 * sum
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// Even-odd point-in-polygon test on the implicitly closed line.
    pub fn contains_point(&self, p: &Point2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Apply `f` to every point.
    pub fn map(&self, f: impl Fn(&Point2) -> Point2) -> Polyline {
        Self::from_points(self.points.iter().map(f).collect())
    }

    /// Clip the implicitly closed line to a rectangle, one side at a time
    /// (Sutherland-Hodgman). Returns a closed line, or an empty one when
    /// nothing is left inside.
    pub fn clip_to(&self, bounds: &Bounds) -> Polyline {
        let mut pts = self.points.clone();
        if self.is_closed() {
            pts.pop();
        }
        // (clip on x, limit, keep coordinates above the limit)
        let sides = [
            (true, bounds.left, true),
            (true, bounds.right, false),
            (false, bounds.bottom, true),
            (false, bounds.top, false),
        ];
        for (on_x, limit, keep_above) in sides {
            let coord = |p: &Point2| if on_x { p.x } else { p.y };
            let inside = |p: &Point2| if keep_above { coord(p) >= limit } else { coord(p) <= limit };
            let cross = |a: &Point2, b: &Point2| a.lerp(b, (limit - coord(a)) / (coord(b) - coord(a)));

            let n = pts.len();
            let mut out = Vec::with_capacity(n + 4);
            for i in 0..n {
                let (prev, cur) = (pts[(i + n - 1) % n], pts[i]);
                match (inside(&prev), inside(&cur)) {
                    (true, true) => out.push(cur),
                    (true, false) => out.push(cross(&prev, &cur)),
                    (false, true) => {
                        out.push(cross(&prev, &cur));
                        out.push(cur);
                    }
                    (false, false) => {}
                }
            }
            pts = out;
        }

        let mut clipped = Polyline::from_points(pts);
        clipped.condense();
        if clipped.len() < 3 {
            return Polyline::new();
        }
        clipped.close();
        clipped
    }

    /// Distance from `p` to the nearest segment.
    pub fn distance_to(&self, p: &Point2) -> f64 {
        match self.points.len() {
            0 => f64::INFINITY,
            1 => self.points[0].distance_to(p),
            _ => self
                .points
                .windows(2)
                .map(|w| segment_distance(&w[0], &w[1], p))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// First crossing between a segment of `self` and a segment of `other`,
    /// scanning `self` from its start.
    pub fn segment_crossing(&self, other: &Polyline) -> Option<Crossing> {
        for (ia, a) in self.points.windows(2).enumerate() {
            for (ib, b) in other.points.windows(2).enumerate() {
                if let Some(point) = segment_intersection(&a[0], &a[1], &b[0], &b[1]) {
                    return Some(Crossing {
                        point,
                        seg_a: ia,
                        seg_b: ib,
                    });
                }
            }
        }
        None
    }

    /// True if two non-adjacent segments of the line cross.
    ///
    /// For a closed line, the first and last segments count as adjacent.
    pub fn self_crossing(&self) -> bool {
        let nseg = self.points.len().saturating_sub(1);
        let closed = self.is_closed();
        for i in 0..nseg {
            for j in (i + 2)..nseg {
                if closed && i == 0 && j == nseg - 1 {
                    continue;
                }
                let (a0, a1) = (self.points[i], self.points[i + 1]);
                let (b0, b1) = (self.points[j], self.points[j + 1]);
                if segment_intersection(&a0, &a1, &b0, &b1).is_some() {
                    return true;
                }
            }
        }
        false
    }
}

/// Intersection of segments `a0-a1` and `b0-b1`, ends included.
/// Parallel segments never intersect.
pub fn segment_intersection(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2) -> Option<Point2> {
    let (dax, day) = (a1.x - a0.x, a1.y - a0.y);
    let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);
    let denom = dax * dby - day * dbx;
    if denom == 0.0 {
        return None;
    }
    let (ex, ey) = (b0.x - a0.x, b0.y - a0.y);
    let t = (ex * dby - ey * dbx) / denom;
    let s = (ex * day - ey * dax) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&s) {
        Some(a0.lerp(a1, t))
    } else {
        None
    }
}

fn segment_distance(a: &Point2, b: &Point2, p: &Point2) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a.distance_to(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    a.lerp(b, t).distance_to(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square_ccw() -> Polyline {
        Polyline::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ])
    }

    #[test]
    fn test_clip_to_box() {
        let sq = unit_square_ccw().map(|p| Point2::new(p.x * 2.0, p.y * 2.0));
        let clipped = sq.clip_to(&Bounds::new(1.0, -1.0, 3.0, 1.0));
        assert!(clipped.is_closed());
        assert!((clipped.signed_area() - 1.0).abs() < 1e-12);

        let inside = unit_square_ccw().clip_to(&Bounds::new(-1.0, -1.0, 2.0, 2.0));
        assert_eq!(inside, unit_square_ccw());

        assert!(unit_square_ccw().clip_to(&Bounds::new(5.0, 5.0, 6.0, 6.0)).is_empty());
    }

    #[test]
    fn test_signed_area_and_winding() {
        let mut sq = unit_square_ccw();
        assert!((sq.signed_area() - 1.0).abs() < 1e-12);
        assert!(!sq.is_clockwise());
        sq.reverse();
        assert!((sq.signed_area() + 1.0).abs() < 1e-12);
        assert!(sq.is_clockwise());
    }

    #[test]
    fn test_close_and_condense() {
        let mut line = Polyline::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ]);
        line.condense();
        assert_eq!(line.len(), 3);
        assert!(!line.is_closed());
        line.close();
        assert!(line.is_closed());
        line.close();
        assert_eq!(line.len(), 4);
    }

    #[test]
    fn test_append_skips_shared_point() {
        let mut a = Polyline::from_points(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        let b = Polyline::from_points(vec![Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)]);
        a.append(&b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_contains_point() {
        let sq = unit_square_ccw();
        assert!(sq.contains_point(&Point2::new(0.5, 0.5)));
        assert!(!sq.contains_point(&Point2::new(1.5, 0.5)));
        assert!(!sq.contains_point(&Point2::new(0.5, -0.1)));
    }

    #[test]
    fn test_segment_crossing_indices() {
        let a = Polyline::from_points(vec![
            Point2::new(0.0, 0.5),
            Point2::new(0.4, 0.5),
            Point2::new(1.0, 0.5),
        ]);
        let b = Polyline::from_points(vec![
            Point2::new(0.7, 0.0),
            Point2::new(0.7, 1.0),
        ]);
        let c = a.segment_crossing(&b).unwrap();
        assert_eq!(c.seg_a, 1);
        assert_eq!(c.seg_b, 0);
        assert!((c.point.x - 0.7).abs() < 1e-12);
        assert!((c.point.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_self_crossing() {
        assert!(!unit_square_ccw().self_crossing());
        let bowtie = Polyline::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ]);
        assert!(bowtie.self_crossing());
    }

    #[test]
    fn test_distance_to_line() {
        let sq = unit_square_ccw();
        assert!((sq.distance_to(&Point2::new(0.5, -2.0)) - 2.0).abs() < 1e-12);
    }
}
