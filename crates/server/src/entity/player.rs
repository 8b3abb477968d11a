//! Player state and per-tick rules.
//!
//! A player owns one or more cells. `cells[0]` is the primary cell: pickups,
//! damage leaks, obstruction pushes and merges all act on it.

use super::cell::Cell;
use super::pellet::chunks;
use super::projectile::Shot;
use super::store::Entity;
use crate::collision::{heading, mass_to_radius, Circle, Collider, Rect};
use crate::config::{ArenaConfig, PlayerConfig, ProjectileConfig};
use crate::spatial::Bounds;
use glam::Vec2;
use protocol::messages::PlayerView;
use protocol::{PlayerId, Shape};
use rand::Rng;
use std::time::Instant;

/// Fraction of total mass shed when sprinting.
const SPRINT_COST: f32 = 0.2;
/// Sprinting requires more than this multiple of the spawn mass.
const SPRINT_THRESHOLD: f32 = 1.2;
/// Largest pellet in a sprint trail.
const SPRINT_CHUNK: f32 = 10.0;
/// Fraction of total mass scattered on death.
const EXPLOSION_SHARE: f32 = 0.9;
const EXPLOSION_MAX_SPEED: f32 = 10.0;

/// Pellet to spawn on behalf of a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spill {
    pub position: Vec2,
    pub mass: f32,
    pub speed: f32,
    pub angle: f32,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Centroid of all cells.
    pub position: Vec2,
    /// Collider width, `2 * mass_to_radius(mass_total)`.
    pub width: f32,
    pub mass_total: f32,
    /// Damageable mass. The player dies when it reaches zero.
    pub mass_current: f32,
    pub hue: u16,
    pub shape: Shape,
    pub cells: Vec<Cell>,
    /// Movement target as an offset from the centroid.
    pub target: Vec2,
    pub eye_angle: f32,
    pub last_heartbeat: Instant,
    pub last_shot: Instant,
    pub clip_size: u32,
    pub shots_left: u32,
    pub screen_width: f32,
    pub screen_height: f32,
    sprint_start: Option<Instant>,
    invulnerable: bool,
    invulnerable_start: Instant,
    collider: Collider,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: String,
        shape: Shape,
        position: Vec2,
        hue: u16,
        config: &PlayerConfig,
        now: Instant,
    ) -> Self {
        let mass = config.default_mass;
        let mut player = Self {
            id,
            name,
            position,
            width: 0.0,
            mass_total: mass,
            mass_current: mass,
            hue,
            shape,
            cells: vec![Cell::new(position, mass)],
            target: Vec2::ZERO,
            eye_angle: 0.0,
            last_heartbeat: now,
            last_shot: now,
            clip_size: config.clip_size,
            shots_left: config.clip_size,
            screen_width: 0.0,
            screen_height: 0.0,
            sprint_start: None,
            invulnerable: false,
            invulnerable_start: now,
            collider: Collider::Circle(Circle::new(position, 0.0)),
        };
        player.refresh_collider();
        player
    }

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.collider.bounds()
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.mass_current <= 0.0
    }

    pub fn is_sprinting(&self, now: Instant, config: &PlayerConfig) -> bool {
        self.sprint_start
            .is_some_and(|start| now.saturating_duration_since(start) < config.sprint_duration())
    }

    pub fn is_invulnerable(&self, now: Instant, config: &PlayerConfig) -> bool {
        self.invulnerable
            && now.saturating_duration_since(self.invulnerable_start) < config.invulnerable_duration()
    }

    /// Flip the invulnerability flag and restart its window.
    pub fn toggle_invulnerability(&mut self, now: Instant) {
        self.invulnerable = !self.invulnerable;
        self.invulnerable_start = now;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
    }

    /// Per-tick update: timers, movement, reload and collider.
    pub fn update(&mut self, now: Instant, config: &PlayerConfig, arena: &ArenaConfig) {
        if !self.is_sprinting(now, config) {
            self.sprint_start = None;
        }
        if !self.is_invulnerable(now, config) {
            self.invulnerable = false;
        }
        for cell in &mut self.cells {
            if cell.speed == 0.0 {
                cell.speed = config.base_speed;
            }
        }
        self.move_cells(now, config, arena);
        self.reload(now, config);
        self.refresh_collider();
    }

    fn move_cells(&mut self, now: Instant, config: &PlayerConfig, arena: &ArenaConfig) {
        let boosted = self.is_sprinting(now, config) || self.invulnerable;
        let center = self.position;
        let half_width = self.width / 2.0;

        for cell in &mut self.cells {
            let target = center - cell.position + self.target;
            let dist = target.length();
            let angle = target.y.atan2(target.x);
            self.eye_angle = angle;

            let speed = if boosted { config.boost_speed } else { cell.speed };
            let mut delta = heading(angle) * speed;
            let slow_zone = cell.radius / 3.0;
            if !self.invulnerable && dist < slow_zone {
                delta *= dist / slow_zone;
            }
            cell.position += delta;

            let margin = match self.shape {
                Shape::Circle => slow_zone,
                Shape::Square => half_width,
            };
            cell.position = arena.clamp(cell.position, margin);
        }
        self.recenter();
    }

    /// Recompute the centroid from the cells.
    pub fn recenter(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let sum: Vec2 = self.cells.iter().map(|c| c.position).sum();
        self.position = sum / self.cells.len() as f32;
    }

    /// Regain one shot per reload interval, up to the clip size.
    pub fn reload(&mut self, now: Instant, config: &PlayerConfig) {
        if self.shots_left < self.clip_size
            && now.saturating_duration_since(self.last_shot) >= config.reload_interval()
        {
            self.shots_left += 1;
            self.last_shot = now;
        }
    }

    /// Resize the collider to the current total mass.
    pub fn refresh_collider(&mut self) {
        let r = mass_to_radius(self.mass_total);
        self.width = r * 2.0;
        self.collider = match self.shape {
            Shape::Circle => Collider::Circle(Circle::new(self.position, r)),
            Shape::Square => Collider::Square(Rect::from_center(self.position, r)),
        };
    }

    /// Move the primary cell by `offset` and keep it inside the arena.
    pub fn push_primary(&mut self, offset: Vec2, arena: &ArenaConfig) {
        let margin = match self.shape {
            Shape::Circle => self.cells.first().map_or(0.0, |c| c.radius / 3.0),
            Shape::Square => self.width / 2.0,
        };
        if let Some(cell) = self.cells.first_mut() {
            cell.position = arena.clamp(cell.position + offset, margin);
        }
        self.recenter();
        self.refresh_collider();
    }

    /// Grow by `mass`. Current mass never exceeds total mass.
    pub fn add_mass(&mut self, mass: f32) {
        if let Some(cell) = self.cells.first_mut() {
            cell.add_mass(mass);
        }
        self.mass_total += mass;
        self.mass_current = (self.mass_current + mass).min(self.mass_total);
    }

    pub fn apply_damage(&mut self, damage: f32) {
        self.mass_current -= damage;
    }

    /// Shrink every cell by the same fraction.
    fn shed_mass(&mut self, mass: f32) {
        if self.mass_total <= 0.0 {
            return;
        }
        let keep = ((self.mass_total - mass) / self.mass_total).max(0.0);
        for cell in &mut self.cells {
            cell.set_mass(cell.mass * keep);
        }
        self.mass_total = self.cells.iter().map(|c| c.mass).sum();
        self.mass_current = self.mass_current.min(self.mass_total);
    }

    /// Start a sprint if heavy enough and not already sprinting.
    /// Returns the trail of pellets to spawn.
    pub fn start_sprint(&mut self, now: Instant, config: &PlayerConfig) -> Option<Vec<Spill>> {
        if self.mass_total <= config.default_mass * SPRINT_THRESHOLD || self.is_sprinting(now, config) {
            return None;
        }
        self.sprint_start = Some(now);
        let lost = self.mass_total * SPRINT_COST;
        self.shed_mass(lost);

        let mut rng = rand::rng();
        let trail = chunks(lost, SPRINT_CHUNK)
            .map(|mass| {
                let spread = mass_to_radius(mass) * 2.0;
                let offset = Vec2::new(
                    rng.random_range(-spread..spread),
                    rng.random_range(-spread..spread),
                );
                Spill {
                    position: self.position - offset,
                    mass,
                    speed: 0.0,
                    angle: 0.0,
                }
            })
            .collect();
        Some(trail)
    }

    /// Fire toward the target. Circles fire a three-way spread.
    pub fn fire(&mut self, now: Instant, config: &ProjectileConfig) -> Vec<Shot> {
        if self.shots_left == 0 {
            return Vec::new();
        }
        self.shots_left -= 1;
        self.last_shot = now;

        let primary = self.target.y.atan2(self.target.x);
        let spread = config.spread_degrees.to_radians();
        let (angles, mass) = match self.shape {
            Shape::Circle => (
                vec![primary, primary + spread, primary - spread],
                self.mass_total * config.damage_ratio / 3.0,
            ),
            Shape::Square => (vec![primary], self.mass_total * config.damage_ratio),
        };
        let range = config.range_factor * self.width;
        angles
            .into_iter()
            .map(|angle| Shot {
                position: self.position + heading(angle) * (self.width / 2.0),
                angle,
                speed: config.speed,
                mass,
                range,
            })
            .collect()
    }

    /// Damage from a projectile of `mass`. Oversized hits are scaled down.
    pub fn damage_from(&self, mass: f32) -> f32 {
        if mass > self.mass_total { mass * 0.1 } else { mass }
    }

    /// Halve the primary cell, throwing the new half toward the target.
    pub fn split(&mut self, now: Instant, config: &PlayerConfig) -> bool {
        if self.cells.len() >= config.max_cells {
            return false;
        }
        let Some(primary) = self.cells.first_mut() else {
            return false;
        };
        if primary.mass < config.default_mass * 2.0 {
            return false;
        }
        let half = primary.mass / 2.0;
        primary.set_mass(half);

        let dir = if self.target.length_squared() > 0.0 {
            self.target.normalize()
        } else {
            Vec2::X
        };
        let mut cell = Cell::new(primary.position + dir * primary.radius * 2.0, half);
        cell.merge_at = Some(now + config.merge_delay());
        self.cells.push(cell);
        true
    }

    /// Fold overlapping cells whose merge timer expired into the primary cell.
    /// Returns how many cells were absorbed.
    pub fn merge(&mut self, now: Instant) -> usize {
        if self.cells.len() < 2 {
            return 0;
        }
        let primary = self.cells[0].circle();
        let mut absorbed = 0.0;
        let before = self.cells.len();
        let mut index = 0;
        self.cells.retain(|cell| {
            index += 1;
            if index == 1 || !cell.can_merge(now) {
                return true;
            }
            let overlapping = cell.position.distance(primary.center) < cell.radius + primary.radius;
            if overlapping {
                absorbed += cell.mass;
            }
            !overlapping
        });
        if absorbed > 0.0 {
            self.cells[0].add_mass(absorbed);
            self.recenter();
        }
        before - self.cells.len()
    }

    /// Scatter most of the mass as pellets around the primary cell.
    pub fn explode(&self) -> Vec<Spill> {
        let origin = self.cells.first().map_or(self.position, |c| c.position);
        let mut rng = rand::rng();
        chunks(self.mass_total * EXPLOSION_SHARE, 1.0)
            .map(|mass| Spill {
                position: origin,
                mass,
                speed: rng.random_range(0.0..EXPLOSION_MAX_SPEED),
                angle: rng.random_range(0.0..std::f32::consts::TAU),
            })
            .collect()
    }

    /// Snapshot entry. The viewer's own copy carries no id.
    pub fn view(&self, with_id: bool) -> PlayerView {
        PlayerView {
            id: with_id.then_some(self.id),
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            w: self.width,
            h: self.width,
            cells: self.cells.iter().map(Cell::view).collect(),
            mass_total: self.mass_total,
            mass_current: self.mass_current,
            hue: self.hue,
            shape: self.shape,
            eye_angle: self.eye_angle,
        }
    }
}

impl Entity for Player {
    fn id(&self) -> u32 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn arena() -> ArenaConfig {
        ArenaConfig { width: 1000.0, height: 1000.0 }
    }

    fn player(shape: Shape, mass: f32) -> Player {
        let config = PlayerConfig::default();
        let mut p = Player::new(1, "p".into(), shape, Vec2::splat(500.0), 0, &config, Instant::now());
        p.cells[0].set_mass(mass);
        p.mass_total = mass;
        p.mass_current = mass;
        p.refresh_collider();
        p
    }

    #[test]
    fn test_pickup_caps_current() {
        let mut p = player(Shape::Circle, 100.0);
        p.add_mass(5.0);
        assert_eq!(p.mass_total, 105.0);
        assert_eq!(p.mass_current, 105.0);
        assert_eq!(p.cells[0].mass, 105.0);

        p.apply_damage(20.0);
        p.add_mass(1.0);
        assert_eq!(p.mass_total, 106.0);
        assert_eq!(p.mass_current, 86.0);
    }

    #[test]
    fn test_moves_toward_target() {
        let config = PlayerConfig::default();
        let mut p = player(Shape::Circle, 10.0);
        p.target = Vec2::new(300.0, 0.0);
        let start = p.position;
        p.update(Instant::now(), &config, &arena());
        assert!((p.position.x - start.x - config.base_speed).abs() < 1e-4);
        assert!((p.position.y - start.y).abs() < 1e-4);
        assert_eq!(p.cells[0].speed, config.base_speed);
    }

    #[test]
    fn test_sprint_moves_at_boost_speed() {
        let config = PlayerConfig::default();
        let now = Instant::now();
        let mut p = player(Shape::Circle, 100.0);
        p.target = Vec2::new(300.0, 0.0);
        assert!(p.start_sprint(now, &config).is_some());

        let start = p.cells[0].position;
        p.update(now, &config, &arena());
        let moved = p.cells[0].position.x - start.x;
        assert!((moved - config.boost_speed).abs() < 1e-3);

        let later = now + config.sprint_duration() + Duration::from_millis(1);
        let start = p.cells[0].position;
        p.update(later, &config, &arena());
        let moved = p.cells[0].position.x - start.x;
        assert!((moved - config.base_speed).abs() < 1e-3);
        assert!(!p.is_sprinting(later, &config));
    }

    #[test]
    fn test_invulnerable_skips_deceleration() {
        let config = PlayerConfig::default();
        let now = Instant::now();
        let mut p = player(Shape::Circle, 10.0);
        let slow_zone = p.cells[0].radius / 3.0;
        p.target = Vec2::new(slow_zone / 2.0, 0.0);
        p.toggle_invulnerability(now);
        assert!(p.is_invulnerable(now, &config));

        let start = p.cells[0].position;
        p.update(now, &config, &arena());
        let moved = p.cells[0].position.x - start.x;
        assert!((moved - config.boost_speed).abs() < 1e-3);
    }

    #[test]
    fn test_square_width_follows_radius() {
        let p = player(Shape::Square, 100.0);
        assert_eq!(p.width, 2.0 * mass_to_radius(100.0));
        assert_eq!(p.bounds().width(), p.width);
    }

    #[test]
    fn test_decelerates_near_target() {
        let config = PlayerConfig::default();
        let mut p = player(Shape::Circle, 10.0);
        let slow_zone = p.cells[0].radius / 3.0;
        p.target = Vec2::new(slow_zone / 2.0, 0.0);
        let start = p.position;
        p.update(Instant::now(), &config, &arena());
        let moved = p.position.x - start.x;
        assert!((moved - config.base_speed * 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_square_stays_inside_arena() {
        let config = PlayerConfig::default();
        let mut p = player(Shape::Square, 10.0);
        p.target = Vec2::new(-10_000.0, 0.0);
        for _ in 0..500 {
            p.update(Instant::now(), &config, &arena());
        }
        assert!((p.position.x - p.width / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_fire_uses_ammo() {
        let config = ProjectileConfig::default();
        let now = Instant::now();
        let mut p = player(Shape::Circle, 30.0);
        p.shots_left = 2;
        p.target = Vec2::new(0.0, 10.0);

        let shots = p.fire(now, &config);
        assert_eq!(shots.len(), 3);
        assert!((shots[0].mass - 1.0).abs() < 1e-5);
        assert!((shots[0].angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(shots[0].range, 8.0 * p.width);

        assert_eq!(p.fire(now, &config).len(), 3);
        assert!(p.fire(now, &config).is_empty());
        assert_eq!(p.shots_left, 0);
    }

    #[test]
    fn test_square_fires_once() {
        let config = ProjectileConfig::default();
        let mut p = player(Shape::Square, 30.0);
        let shots = p.fire(Instant::now(), &config);
        assert_eq!(shots.len(), 1);
        assert!((shots[0].mass - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_reload() {
        let config = PlayerConfig::default();
        let start = Instant::now();
        let mut p = player(Shape::Square, 10.0);
        p.shots_left = 0;
        p.last_shot = start;
        p.reload(start + Duration::from_millis(500), &config);
        assert_eq!(p.shots_left, 0);
        p.reload(start + config.reload_interval(), &config);
        assert_eq!(p.shots_left, 1);
        p.shots_left = p.clip_size;
        p.reload(start + Duration::from_secs(60), &config);
        assert_eq!(p.shots_left, p.clip_size);
    }

    #[test]
    fn test_sprint() {
        let config = PlayerConfig::default();
        let now = Instant::now();

        let mut light = player(Shape::Circle, config.default_mass);
        assert!(light.start_sprint(now, &config).is_none());

        let mut p = player(Shape::Circle, 100.0);
        let trail = p.start_sprint(now, &config).unwrap();
        let shed: f32 = trail.iter().map(|s| s.mass).sum();
        assert!((shed - 20.0).abs() < 1e-3);
        assert!(trail.iter().all(|s| s.mass <= 10.0));
        assert!((p.mass_total - 80.0).abs() < 1e-3);
        assert!(p.mass_current <= p.mass_total);
        assert!(p.is_sprinting(now, &config));
        assert!(p.start_sprint(now, &config).is_none());
        assert!(!p.is_sprinting(now + config.sprint_duration(), &config));
    }

    #[test]
    fn test_invulnerability_window() {
        let config = PlayerConfig::default();
        let now = Instant::now();
        let mut p = player(Shape::Circle, 10.0);
        p.toggle_invulnerability(now);
        assert!(p.is_invulnerable(now, &config));
        assert!(!p.is_invulnerable(now + config.invulnerable_duration(), &config));
    }

    #[test]
    fn test_split_and_merge_conserve_mass() {
        let config = PlayerConfig::default();
        let now = Instant::now();
        let mut p = player(Shape::Circle, 40.0);
        p.target = Vec2::new(1.0, 0.0);
        assert!(p.split(now, &config));
        assert_eq!(p.cells.len(), 2);
        assert_eq!(p.cells[0].mass + p.cells[1].mass, 40.0);

        // Not yet allowed.
        p.cells[1].position = p.cells[0].position;
        assert_eq!(p.merge(now), 0);

        let later = now + config.merge_delay();
        assert_eq!(p.merge(later), 1);
        assert_eq!(p.cells.len(), 1);
        assert_eq!(p.cells[0].mass, 40.0);
    }

    #[test]
    fn test_explosion_mass() {
        let p = player(Shape::Circle, 50.0);
        let spills = p.explode();
        let total: f32 = spills.iter().map(|s| s.mass).sum();
        assert!((total - 45.0).abs() < 1e-3);
        assert!(spills.iter().all(|s| s.speed >= 0.0 && s.speed < 10.0));
    }
}
