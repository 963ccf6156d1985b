//! Geometry kernel
//!
//! Headings are compass bearings in degrees: 0 points north (+y) and angles
//! grow clockwise. Turning angles are signed, positive to the right.

use glam::Vec2;

/// Unit vector for a compass heading.
pub fn heading_to_vector(heading: f32) -> Vec2 {
    let rad = heading.to_radians();
    Vec2::new(rad.sin(), rad.cos())
}

/// Compass heading of a vector, in [0, 360).
pub fn vector_to_heading(v: Vec2) -> f32 {
    wrap_heading(90.0 - v.y.atan2(v.x).to_degrees())
}

/// Wraps a heading into [0, 360).
pub fn wrap_heading(heading: f32) -> f32 {
    let h = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Wraps a turning angle into [-180, 180].
pub fn wrap_turn(angle: f32) -> f32 {
    let mut a = angle;
    while a < -180.0 {
        a += 360.0;
    }
    while a > 180.0 {
        a -= 360.0;
    }
    a
}

/// Rotates a vector clockwise by `degrees`.
pub fn rotate_clockwise(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(-degrees.to_radians()).rotate(v)
}

/// A straight line segment in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Squared distance from `p` to the nearest point on the segment.
    pub fn distance_squared_to_point(&self, p: Vec2) -> f32 {
        let d = self.end - self.start;
        let len_sq = d.length_squared();
        if len_sq == 0.0 {
            return p.distance_squared(self.start);
        }
        let t = (p - self.start).dot(d) / len_sq;
        let nearest = if t < 0.0 {
            self.start
        } else if t > 1.0 {
            self.end
        } else {
            self.start + d * t
        };
        p.distance_squared(nearest)
    }

    /// Whether two segments cross. Parallel segments never do.
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = self.end - self.start;
        let d2 = other.end - other.start;
        let det = d2.x * d1.y - d2.y * d1.x;
        if det.abs() < 1e-6 {
            return false;
        }
        let s = (d1.x * (other.start.y - self.start.y) + d1.y * (self.start.x - other.start.x))
            / det;
        let t = (d2.x * (self.start.y - other.start.y) + d2.y * (other.start.x - self.start.x))
            / -det;
        (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t)
    }

    /// Minimum distance between two segments; zero when they cross.
    pub fn distance_to_segment(&self, other: &Segment) -> f32 {
        if self.intersects(other) {
            return 0.0;
        }
        [
            self.distance_squared_to_point(other.start),
            self.distance_squared_to_point(other.end),
            other.distance_squared_to_point(self.start),
            other.distance_squared_to_point(self.end),
        ]
        .into_iter()
        .fold(f32::INFINITY, f32::min)
        .sqrt()
    }
}
