//! Fired projectiles.

use super::store::Entity;
use crate::collision::{heading, mass_to_radius, Circle};
use crate::config::ArenaConfig;
use glam::Vec2;
use protocol::messages::ProjectileView;
use protocol::PlayerId;

/// A projectile requested by [`Player::fire`](super::Player::fire),
/// not yet given an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub position: Vec2,
    pub angle: f32,
    pub speed: f32,
    pub mass: f32,
    pub range: f32,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u32,
    pub owner: PlayerId,
    pub position: Vec2,
    pub speed: f32,
    pub angle: f32,
    /// Travel budget left.
    pub remaining: f32,
    /// Damage carried.
    pub mass: f32,
    pub radius: f32,
}

impl Projectile {
    pub fn new(id: u32, owner: PlayerId, shot: Shot) -> Self {
        Self {
            id,
            owner,
            position: shot.position,
            speed: shot.speed,
            angle: shot.angle,
            remaining: shot.range,
            mass: shot.mass,
            radius: mass_to_radius(shot.mass) * 0.5,
        }
    }

    /// Advance one tick. Returns false once the travel budget is spent.
    pub fn update(&mut self, arena: &ArenaConfig) -> bool {
        let delta = heading(self.angle) * self.speed;
        self.position = arena.clamp(self.position + delta, self.radius);
        self.remaining -= delta.length();
        self.remaining > 0.0
    }

    #[inline]
    pub fn circle(&self) -> Circle {
        Circle::new(self.position, self.radius)
    }

    pub fn view(&self) -> ProjectileView {
        ProjectileView {
            id: self.id,
            player_id: self.owner,
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
            speed: self.speed,
        }
    }
}

impl Entity for Projectile {
    fn id(&self) -> u32 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_runs_out() {
        let arena = ArenaConfig { width: 10_000.0, height: 10_000.0 };
        let shot = Shot {
            position: Vec2::new(100.0, 5000.0),
            angle: 0.0,
            speed: 15.0,
            mass: 1.0,
            range: 100.0,
        };
        let mut projectile = Projectile::new(1, 7, shot);
        let mut ticks = 0;
        let mut last = projectile.remaining;
        while projectile.update(&arena) {
            assert!(projectile.remaining < last);
            last = projectile.remaining;
            ticks += 1;
        }
        ticks += 1;
        assert_eq!(ticks, (100.0f32 / 15.0).ceil() as u32);
    }

    #[test]
    fn test_radius_is_half() {
        let shot = Shot {
            position: Vec2::ZERO,
            angle: 0.0,
            speed: 15.0,
            mass: 100.0,
            range: 10.0,
        };
        assert_eq!(Projectile::new(1, 1, shot).radius, 32.0);
    }
}
