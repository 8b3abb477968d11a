//! Collision detection.
//!
//! This module handles the exact shape tests run on spatial index candidates:
//! - Circle vs circle
//! - Axis-aligned square vs circle
//! - Square vs square
//!
//! Every test returns the overlap vector pointing from the first shape toward
//! the second; moving the first shape by its negation separates the pair.

use crate::spatial::Bounds;
use glam::Vec2;

/// Base radius of a massless body.
pub const BASE_RADIUS: f32 = 4.0;
/// Radius growth per square root of mass.
pub const RADIUS_PER_MASS: f32 = 6.0;

/// Radius of a circular body of `mass`.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    BASE_RADIUS + mass.max(0.0).sqrt() * RADIUS_PER_MASS
}

/// Unit vector for a heading in radians.
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center(center: Vec2, half_extent: f32) -> Self {
        Self {
            min: center - Vec2::splat(half_extent),
            max: center + Vec2::splat(half_extent),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Shape used for exact collision tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Circle(Circle),
    Square(Rect),
}

impl Collider {
    /// Axis-aligned bounds used for spatial index insertion and queries.
    pub fn bounds(&self) -> Bounds {
        match self {
            Collider::Circle(c) => Bounds::from_center(c.center.x, c.center.y, c.radius),
            Collider::Square(r) => Bounds::new(r.min.x, r.min.y, r.max.x, r.max.y),
        }
    }

    /// Overlap vector from `self` toward `other`, if they intersect.
    pub fn overlap(&self, other: &Collider) -> Option<Vec2> {
        match (self, other) {
            (Collider::Circle(a), Collider::Circle(b)) => circle_circle(a, b),
            (Collider::Square(a), Collider::Circle(b)) => rect_circle(a, b),
            (Collider::Circle(a), Collider::Square(b)) => rect_circle(b, a).map(|v| -v),
            (Collider::Square(a), Collider::Square(b)) => rect_rect(a, b),
        }
    }

    #[inline]
    pub fn overlaps_circle(&self, circle: &Circle) -> Option<Vec2> {
        self.overlap(&Collider::Circle(*circle))
    }
}

/// Circle vs circle.
pub fn circle_circle(a: &Circle, b: &Circle) -> Option<Vec2> {
    let delta = b.center - a.center;
    let r = a.radius + b.radius;
    let d = delta.length();
    if d >= r {
        return None;
    }
    if d <= f32::EPSILON {
        return Some(Vec2::new(r, 0.0));
    }
    Some(delta / d * (r - d))
}

/// Square vs circle.
pub fn rect_circle(rect: &Rect, circle: &Circle) -> Option<Vec2> {
    let c = circle.center;
    let closest = c.clamp(rect.min, rect.max);
    let delta = c - closest;
    let d = delta.length();

    if d > f32::EPSILON {
        if d >= circle.radius {
            return None;
        }
        return Some(delta / d * (circle.radius - d));
    }

    // Center inside the square: push out through the nearest side.
    let left = c.x - rect.min.x;
    let right = rect.max.x - c.x;
    let down = c.y - rect.min.y;
    let up = rect.max.y - c.y;
    let nearest = left.min(right).min(down).min(up);
    let push = nearest + circle.radius;
    let v = if nearest == left {
        Vec2::new(-push, 0.0)
    } else if nearest == right {
        Vec2::new(push, 0.0)
    } else if nearest == down {
        Vec2::new(0.0, -push)
    } else {
        Vec2::new(0.0, push)
    };
    Some(v)
}

/// Square vs square.
pub fn rect_rect(a: &Rect, b: &Rect) -> Option<Vec2> {
    let ox = a.max.x.min(b.max.x) - a.min.x.max(b.min.x);
    let oy = a.max.y.min(b.max.y) - a.min.y.max(b.min.y);
    if ox <= 0.0 || oy <= 0.0 {
        return None;
    }
    let dir = b.center() - a.center();
    if ox < oy {
        Some(Vec2::new(ox.copysign(if dir.x == 0.0 { 1.0 } else { dir.x }), 0.0))
    } else {
        Some(Vec2::new(0.0, oy.copysign(if dir.y == 0.0 { 1.0 } else { dir.y })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_of_zero_mass() {
        assert_eq!(mass_to_radius(0.0), 4.0);
        assert_eq!(mass_to_radius(100.0), 64.0);
    }

    #[test]
    fn test_radius_monotonic() {
        let mut last = mass_to_radius(0.0);
        for i in 1..2000 {
            let r = mass_to_radius(i as f32 * 0.5);
            assert!(r >= last);
            last = r;
        }
    }

    #[test]
    fn test_circle_overlap() {
        let a = Circle::new(Vec2::new(0.0, 0.0), 50.0);
        let b = Circle::new(Vec2::new(30.0, 0.0), 20.0);
        let v = circle_circle(&a, &b).unwrap();
        assert!((v.x - 40.0).abs() < 1e-4);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_no_circle_overlap() {
        let a = Circle::new(Vec2::new(0.0, 0.0), 10.0);
        let b = Circle::new(Vec2::new(100.0, 0.0), 10.0);
        assert!(circle_circle(&a, &b).is_none());
    }

    #[test]
    fn test_square_circle_outside_corner() {
        let rect = Rect::from_center(Vec2::ZERO, 10.0);
        let near = Circle::new(Vec2::new(13.0, 13.0), 5.0);
        let far = Circle::new(Vec2::new(20.0, 20.0), 5.0);
        let v = rect_circle(&rect, &near).unwrap();
        assert!(v.x > 0.0 && v.y > 0.0);
        assert!(rect_circle(&rect, &far).is_none());
    }

    #[test]
    fn test_square_circle_inside() {
        let rect = Rect::from_center(Vec2::ZERO, 10.0);
        let circle = Circle::new(Vec2::new(8.0, 0.0), 1.0);
        let v = rect_circle(&rect, &circle).unwrap();
        assert_eq!(v, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_collider_symmetry() {
        let square = Collider::Square(Rect::from_center(Vec2::ZERO, 10.0));
        let circle = Collider::Circle(Circle::new(Vec2::new(12.0, 0.0), 5.0));
        let a = square.overlap(&circle).unwrap();
        let b = circle.overlap(&square).unwrap();
        assert_eq!(a, -b);
        assert!(a.x > 0.0);
    }

    #[test]
    fn test_square_square() {
        let a = Rect::from_center(Vec2::ZERO, 10.0);
        let b = Rect::from_center(Vec2::new(15.0, 2.0), 10.0);
        assert_eq!(rect_rect(&a, &b), Some(Vec2::new(5.0, 0.0)));
        let c = Rect::from_center(Vec2::new(25.0, 0.0), 10.0);
        assert!(rect_rect(&a, &c).is_none());
    }
}
