//! Distance and containment math over circles.

use glam::DVec2;

/// Anything with a center and a radius.
pub trait Circle {
    fn center(&self) -> DVec2;
    fn radius(&self) -> f64;
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: DVec2, b: DVec2) -> f64 {
    a.distance(b)
}

/// Whether `smaller` lies entirely within the disk of `larger` (boundary inclusive).
#[inline]
pub fn is_fully_absorbed(smaller: &impl Circle, larger: &impl Circle) -> bool {
    distance(smaller.center(), larger.center()) + smaller.radius() <= larger.radius()
}

/// Whether the two circles overlap (touching does not count).
#[inline]
pub fn overlaps(a: &impl Circle, b: &impl Circle) -> bool {
    distance(a.center(), b.center()) < a.radius() + b.radius()
}

/// Clamp both coordinates into `[0, map_size]`.
#[inline]
pub fn clamp_to_map(point: DVec2, map_size: f64) -> DVec2 {
    point.clamp(DVec2::ZERO, DVec2::splat(map_size))
}
