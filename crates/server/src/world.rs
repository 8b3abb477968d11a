//! World state management.
//!
//! Owns every entity collection, the spatial index and mass accounting, and
//! runs the tick pipeline. Nothing here is shared: the game loop is the only
//! writer.

use crate::collision::mass_to_radius;
use crate::config::Config;
use crate::entity::{chunks, EntityStore, Pellet, Player, Projectile, Spill};
use crate::spatial::{Bounds, EntityKind, QuadItem, QuadTree};
use glam::Vec2;
use protocol::messages::Elimination;
use protocol::{PlayerId, Shape};
use rand::Rng;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Share of a projectile's mass spilled from the target on impact.
const LEAK_RATIO: f32 = 0.1;
const LEAK_SPEED: f32 = 5.0;

/// Players that left the world during a tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Destroyed or eaten. Their connections stay open.
    pub eliminated: Vec<Elimination>,
    /// Kicked for a stale heartbeat. `message` is the disconnect reason.
    pub timed_out: Vec<Elimination>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.eliminated.is_empty() && self.timed_out.is_empty()
    }
}

/// Entity count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldCounts {
    pub players: usize,
    pub pellets: usize,
    pub projectiles: usize,
}

/// The game world.
#[derive(Debug)]
pub struct World {
    config: Config,
    players: EntityStore<Player>,
    pellets: EntityStore<Pellet>,
    projectiles: EntityStore<Projectile>,
    quad_tree: QuadTree,
    /// Scratch buffer for index queries.
    candidates: Vec<QuadItem>,
    /// Next pellet / projectile id.
    next_id: u32,
    tick_count: u64,
}

impl World {
    pub fn new(config: Config) -> Self {
        let quad_tree = QuadTree::for_world(
            config.arena.width,
            config.arena.height,
            config.spatial.max_objects,
            config.spatial.max_levels,
        );
        Self {
            players: EntityStore::with_capacity(256),
            pellets: EntityStore::with_capacity(config.food.max_count),
            projectiles: EntityStore::with_capacity(256),
            quad_tree,
            candidates: Vec::with_capacity(256),
            next_id: 1,
            tick_count: 0,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Get the next pellet / projectile id.
    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.next_id == 0 {
            self.next_id = 1; // Skip 0
        }
        id
    }

    #[inline]
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter_live()
    }

    #[inline]
    pub fn pellets(&self) -> impl Iterator<Item = &Pellet> {
        self.pellets.iter_live()
    }

    #[inline]
    pub fn projectiles(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter_live()
    }

    #[inline]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get_live(id)
    }

    #[inline]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_live_mut(id)
    }

    #[inline]
    pub fn quad_tree(&self) -> &QuadTree {
        &self.quad_tree
    }

    pub fn counts(&self) -> WorldCounts {
        WorldCounts {
            players: self.players.len(),
            pellets: self.pellets.len(),
            projectiles: self.projectiles.len(),
        }
    }

    /// Σ pellet mass + Σ player total mass.
    pub fn total_mass(&self) -> f32 {
        let pellets: f32 = self.pellets.iter_live().map(|p| p.mass).sum();
        let players: f32 = self.players.iter_live().map(|p| p.mass_total).sum();
        pellets + players
    }

    /// Put a new player in the arena. Returns `None` if `id` is already playing.
    ///
    /// Shapes alternate: the player joining an odd-sized arena is a circle.
    pub fn spawn_player(&mut self, id: PlayerId, name: String, now: Instant) -> Option<&Player> {
        if self.players.contains(id) {
            return None;
        }
        let shape = if self.players.len() % 2 == 1 {
            Shape::Circle
        } else {
            Shape::Square
        };
        let radius = mass_to_radius(self.config.player.default_mass);
        let position = self.config.arena.random_position(radius);
        let hue = rand::rng().random_range(0..360);
        let player = Player::new(id, name, shape, position, hue, &self.config.player, now);
        info!("Player {} ({}) spawned as {:?} at ({:.0}, {:.0})", id, player.name, shape, position.x, position.y);
        self.players.insert(player);
        self.players.get(id)
    }

    /// Remove a player immediately. Removing an absent player is a no-op.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        debug!("Player {} ({}) removed", id, player.name);
        Some(player)
    }

    /// Power-up hook: toggle invulnerability and restart its window.
    pub fn grant_invulnerability(&mut self, id: PlayerId, now: Instant) -> bool {
        match self.players.get_live_mut(id) {
            Some(player) => {
                player.toggle_invulnerability(now);
                true
            }
            None => false,
        }
    }

    /// Fire the player's weapon. Returns how many projectiles were launched.
    pub fn fire(&mut self, id: PlayerId, now: Instant) -> usize {
        let Some(player) = self.players.get_live_mut(id) else {
            return 0;
        };
        let shots = player.fire(now, &self.config.projectile);
        for shot in &shots {
            let projectile_id = self.next_id();
            self.projectiles.insert(Projectile::new(projectile_id, id, *shot));
        }
        shots.len()
    }

    /// Start a sprint, dropping the mass it costs as a pellet trail.
    pub fn sprint(&mut self, id: PlayerId, now: Instant) -> bool {
        let Some(player) = self.players.get_live_mut(id) else {
            return false;
        };
        let Some(trail) = player.start_sprint(now, &self.config.player) else {
            return false;
        };
        let hue = player.hue;
        self.spill(id, hue, &trail);
        true
    }

    /// Split the primary cell. Only available when cell merging is enabled.
    pub fn split(&mut self, id: PlayerId, now: Instant) -> bool {
        if !self.config.rules.cell_merge {
            return false;
        }
        self.players
            .get_live_mut(id)
            .is_some_and(|player| player.split(now, &self.config.player))
    }

    /// Place a stationary pellet. Returns its id.
    pub fn spawn_pellet(&mut self, position: Vec2, mass: f32, owner: Option<PlayerId>) -> u32 {
        let id = self.next_id();
        let hue = rand::rng().random_range(0..360);
        let mut pellet = Pellet::new(id, position, mass, hue);
        pellet.owner = owner;
        self.add_pellet(pellet)
    }

    /// Insert a pellet, clamped into the arena.
    fn add_pellet(&mut self, mut pellet: Pellet) -> u32 {
        pellet.position = self.config.arena.clamp(pellet.position, pellet.radius);
        let id = pellet.id;
        self.pellets.insert(pellet);
        id
    }

    fn spill(&mut self, owner: PlayerId, hue: u16, spills: &[Spill]) {
        for spill in spills {
            let id = self.next_id();
            let pellet = Pellet::new(id, spill.position, spill.mass, hue)
                .with_owner(owner)
                .with_motion(spill.speed, spill.angle);
            self.add_pellet(pellet);
        }
    }

    /// Spawn `count` unowned pellets at random positions.
    fn add_food(&mut self, count: usize) {
        let mass = self.config.food.mass;
        let radius = mass_to_radius(mass);
        let mut rng = rand::rng();
        for _ in 0..count {
            let id = self.next_id();
            let position = self.config.arena.random_position(radius);
            self.pellets.insert(Pellet::new(id, position, mass, rng.random_range(0..360)));
        }
    }

    /// Advance the simulation by one step.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.tick_count += 1;
        let mut report = TickReport::default();

        self.check_heartbeats(now, &mut report);
        self.update_players(now);
        self.update_projectiles();
        self.update_pellets();
        self.rebuild_index();
        self.resolve_collisions(now, &mut report);
        self.process_deaths(&mut report);
        if self.config.rules.cell_merge {
            self.merge_cells(now);
        }
        self.sweep();
        self.balance_mass();

        report
    }

    fn check_heartbeats(&mut self, now: Instant, report: &mut TickReport) {
        let Some(timeout) = self.config.server.heartbeat_timeout() else {
            return;
        };
        let stale: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| now.saturating_duration_since(p.last_heartbeat) > timeout)
            .map(|p| p.id)
            .collect();
        for id in stale {
            if let Some(player) = self.players.remove(id) {
                warn!("Kicking player {} ({}) for inactivity", id, player.name);
                report.timed_out.push(Elimination {
                    id,
                    name: player.name,
                    message: format!(
                        "Last heartbeat received over {} ms ago",
                        self.config.server.heartbeat_timeout_ms
                    ),
                });
            }
        }
    }

    fn update_players(&mut self, now: Instant) {
        let player_config = &self.config.player;
        let arena = &self.config.arena;
        for player in self.players.iter_mut() {
            player.update(now, player_config, arena);
        }
    }

    fn update_projectiles(&mut self) {
        let arena = self.config.arena;
        let mut spent = Vec::new();
        for projectile in self.projectiles.iter_mut() {
            if !projectile.update(&arena) {
                spent.push(projectile.id);
            }
        }
        for id in spent {
            self.projectiles.mark(id);
        }
    }

    fn update_pellets(&mut self) {
        let arena = self.config.arena;
        let friction = self.config.food.friction;
        for pellet in self.pellets.iter_mut().filter(|p| p.is_moving()) {
            pellet.update(&arena, friction);
        }
    }

    /// Rebuild the entire QuadTree from live entities.
    fn rebuild_index(&mut self) {
        self.quad_tree.clear();
        for player in self.players.iter_live() {
            self.quad_tree
                .insert(QuadItem::new(EntityKind::Player, player.id, player.bounds()));
        }
        for pellet in self.pellets.iter_live() {
            let bound = Bounds::from_center(pellet.position.x, pellet.position.y, pellet.radius);
            self.quad_tree.insert(QuadItem::new(EntityKind::Pellet, pellet.id, bound));
        }
        for projectile in self.projectiles.iter_live() {
            let bound = Bounds::from_center(projectile.position.x, projectile.position.y, projectile.radius);
            self.quad_tree
                .insert(QuadItem::new(EntityKind::Projectile, projectile.id, bound));
        }
    }

    fn resolve_collisions(&mut self, now: Instant, report: &mut TickReport) {
        let mut candidates = std::mem::take(&mut self.candidates);
        for id in self.players.ids() {
            let Some(player) = self.players.get_live(id) else {
                continue;
            };
            let bounds = player.bounds();
            candidates.clear();
            self.quad_tree.retrieve(&bounds, &mut candidates);

            for item in &candidates {
                if self.players.is_marked(id) {
                    break;
                }
                match item.kind {
                    EntityKind::Pellet => self.collide_pellet(id, item.id),
                    EntityKind::Projectile => self.collide_projectile(id, item.id, now),
                    EntityKind::Player if item.id != id => self.collide_player(id, item.id, report),
                    EntityKind::Player => {}
                }
            }
        }
        self.candidates = candidates;
    }

    fn collide_pellet(&mut self, player_id: PlayerId, pellet_id: u32) {
        let Some(pellet) = self.pellets.get_live(pellet_id) else {
            return;
        };
        if pellet.owner == Some(player_id) {
            return;
        }
        let (circle, mass) = (pellet.circle(), pellet.mass);
        let Some(player) = self.players.get_live_mut(player_id) else {
            return;
        };
        if player.collider().overlaps_circle(&circle).is_none() {
            return;
        }
        player.add_mass(mass);
        self.pellets.mark(pellet_id);
    }

    fn collide_projectile(&mut self, player_id: PlayerId, projectile_id: u32, now: Instant) {
        let Some(projectile) = self.projectiles.get_live(projectile_id) else {
            return;
        };
        if projectile.owner == player_id {
            return;
        }
        let (circle, mass, angle) = (projectile.circle(), projectile.mass, projectile.angle);
        let Some(player) = self.players.get_live_mut(player_id) else {
            return;
        };
        if player.is_invulnerable(now, &self.config.player) {
            return;
        }
        let Some(overlap) = player.collider().overlaps_circle(&circle) else {
            return;
        };

        let damage = player.damage_from(mass);
        player.apply_damage(damage);
        let origin = player.cells.first().map_or(player.position, |c| c.position) - overlap;
        let hue = player.hue;
        debug!("Projectile {} hit player {} for {:.2}", projectile_id, player_id, damage);

        self.projectiles.mark(projectile_id);
        let leak: Vec<Spill> = chunks(mass * LEAK_RATIO, 1.0)
            .map(|mass| Spill {
                position: origin,
                mass,
                speed: LEAK_SPEED,
                angle,
            })
            .collect();
        self.spill(player_id, hue, &leak);
    }

    fn collide_player(&mut self, player_id: PlayerId, other_id: PlayerId, report: &mut TickReport) {
        let Some(other) = self.players.get_live(other_id) else {
            return;
        };
        let (other_collider, other_total) = (*other.collider(), other.mass_total);
        let rules = &self.config.rules;
        let arena = self.config.arena;
        let Some(player) = self.players.get_live_mut(player_id) else {
            return;
        };
        let Some(overlap) = player.collider().overlap(&other_collider) else {
            return;
        };

        if rules.player_eating && player.mass_total > other_total * rules.eat_ratio {
            player.add_mass(other_total);
            let eater = player.name.clone();
            if let Some(victim) = self.players.get_live(other_id) {
                let name = victim.name.clone();
                info!("Player {} ({}) was eaten by {}", other_id, name, eater);
                report.eliminated.push(Elimination {
                    id: other_id,
                    name,
                    message: format!("You were eaten by {eater}"),
                });
            }
            self.players.mark(other_id);
            return;
        }

        let about_to_be_eaten = rules.player_eating && other_total > player.mass_total * rules.eat_ratio;
        if other_total > player.mass_total && !about_to_be_eaten {
            player.push_primary(-overlap, &arena);
        }
    }

    fn process_deaths(&mut self, report: &mut TickReport) {
        let dead: Vec<PlayerId> = self
            .players
            .iter_live()
            .filter(|p| p.is_dead())
            .map(|p| p.id)
            .collect();
        for id in dead {
            let Some(player) = self.players.get_live(id) else {
                continue;
            };
            let spills = player.explode();
            let (hue, name) = (player.hue, player.name.clone());
            self.spill(id, hue, &spills);
            self.players.mark(id);
            info!("Player {} ({}) was destroyed", id, name);
            report.eliminated.push(Elimination {
                id,
                name,
                message: "You were destroyed".to_string(),
            });
        }
    }

    fn merge_cells(&mut self, now: Instant) {
        for player in self.players.iter_mut() {
            let merged = player.merge(now);
            if merged > 0 {
                player.refresh_collider();
                debug!("Player {} merged {} cells", player.id, merged);
            }
        }
    }

    fn sweep(&mut self) {
        self.players.sweep();
        self.pellets.sweep();
        self.projectiles.sweep();
    }

    /// Pellets in the order the balancer gives them up: unowned first,
    /// newest first.
    fn removal_order(&self) -> Vec<u32> {
        let mut order: Vec<(bool, u32)> = self.pellets.iter().map(|p| (p.owner.is_some(), p.id)).collect();
        order.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Spawn or remove pellets so the total mass converges on the target.
    pub fn balance_mass(&mut self) {
        let food_mass = self.config.food.mass;
        let target = self.config.food.game_mass;
        let max_count = self.config.food.max_count;
        if food_mass <= 0.0 {
            return;
        }

        let diff = target - self.total_mass();
        let count = self.pellets.len();
        if diff >= food_mass && count < max_count {
            let to_add = ((diff / food_mass) as usize).min(max_count - count);
            self.add_food(to_add);
        } else if diff <= -food_mass {
            let mut excess = -diff;
            for id in self.removal_order() {
                if excess < food_mass {
                    break;
                }
                let overshoots = self.pellets.get(id).is_none_or(|p| p.mass - excess >= food_mass);
                if overshoots {
                    continue;
                }
                if let Some(pellet) = self.pellets.remove(id) {
                    excess -= pellet.mass;
                }
            }
        }

        if self.pellets.len() > max_count {
            let surplus = self.pellets.len() - max_count;
            for id in self.removal_order().into_iter().take(surplus) {
                self.pellets.remove(id);
            }
        }
    }
}
