//! A single mass blob of a player.

use crate::collision::{mass_to_radius, Circle};
use glam::Vec2;
use protocol::messages::CellView;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Cell {
    pub position: Vec2,
    pub mass: f32,
    /// Always `mass_to_radius(mass)`.
    pub radius: f32,
    /// Units per tick. Zero until the first movement step assigns the base speed.
    pub speed: f32,
    /// Set on cells created by a split; they may not merge back before this.
    pub merge_at: Option<Instant>,
}

impl Cell {
    pub fn new(position: Vec2, mass: f32) -> Self {
        Self {
            position,
            mass,
            radius: mass_to_radius(mass),
            speed: 0.0,
            merge_at: None,
        }
    }

    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.radius = mass_to_radius(mass);
    }

    #[inline]
    pub fn add_mass(&mut self, mass: f32) {
        self.set_mass(self.mass + mass);
    }

    #[inline]
    pub fn circle(&self) -> Circle {
        Circle::new(self.position, self.radius)
    }

    #[inline]
    pub fn can_merge(&self, now: Instant) -> bool {
        self.merge_at.is_none_or(|at| now >= at)
    }

    pub fn view(&self) -> CellView {
        CellView {
            x: self.position.x,
            y: self.position.y,
            mass: self.mass,
            radius: self.radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_radius_follows_mass() {
        let mut cell = Cell::new(Vec2::ZERO, 0.0);
        assert_eq!(cell.radius, 4.0);
        cell.add_mass(100.0);
        assert_eq!(cell.radius, 64.0);
    }

    #[test]
    fn test_merge_gate() {
        let now = Instant::now();
        let mut cell = Cell::new(Vec2::ZERO, 10.0);
        assert!(cell.can_merge(now));
        cell.merge_at = Some(now + Duration::from_secs(1));
        assert!(!cell.can_merge(now));
        assert!(cell.can_merge(now + Duration::from_secs(1)));
    }
}
