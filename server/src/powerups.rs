//! Lifecycle of the shrink pickup, the fog pickup and the global fog effect.
//!
//! Spawn checks are driven by their own wall-clock timer rather than by the
//! movement tick, so pickups do not become more frequent as the game speeds up.

use crate::config::GameConfig;
use crate::spawn::SpawnPolicy;
use log::info;
use shared::Position;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpEvent {
    ShrinkSpawned(Position),
    FogSpawned(Position),
    /// An unclaimed fog pickup was removed from the board.
    FogPickupExpired(Position),
    FogExpired,
}

#[derive(Debug, Clone)]
pub struct PowerUpManager {
    shrink: Option<Position>,
    fog_pickup: Option<Position>,
    /// When the current fog pickup appeared.
    fog_spawned_at: Option<Instant>,
    /// When the fog effect was triggered, if it is active.
    fog_activated_at: Option<Instant>,
    /// Lifetime of both the fog effect and an unclaimed fog pickup.
    fog_duration: Duration,
    shrink_spawn_chance: f64,
    fog_spawn_chance: f64,
}

impl PowerUpManager {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            shrink: None,
            fog_pickup: None,
            fog_spawned_at: None,
            fog_activated_at: None,
            fog_duration: config.fog_duration,
            shrink_spawn_chance: config.shrink_spawn_chance,
            fog_spawn_chance: config.fog_spawn_chance,
        }
    }

    /// Clears every pickup and ends the fog effect.
    pub fn reset(&mut self) {
        self.shrink = None;
        self.fog_pickup = None;
        self.fog_spawned_at = None;
        self.fog_activated_at = None;
    }

    pub fn shrink(&self) -> Option<Position> {
        self.shrink
    }

    pub fn fog_pickup(&self) -> Option<Position> {
        self.fog_pickup
    }

    pub fn fog_active(&self) -> bool {
        self.fog_activated_at.is_some()
    }

    /// True if `pos` holds any pickup.
    pub fn occupies(&self, pos: Position) -> bool {
        self.shrink == Some(pos) || self.fog_pickup == Some(pos)
    }

    pub fn place_shrink(&mut self, pos: Position) {
        self.shrink = Some(pos);
    }

    /// Puts the fog pickup on the board; it disappears unclaimed one fog
    /// duration after `now`.
    pub fn place_fog_pickup(&mut self, pos: Position, now: Instant) {
        self.fog_pickup = Some(pos);
        self.fog_spawned_at = Some(now);
    }

    /// Consumes the shrink pickup if it lies at `pos`.
    pub fn take_shrink_at(&mut self, pos: Position) -> bool {
        if self.shrink == Some(pos) {
            self.shrink = None;
            true
        } else {
            false
        }
    }

    /// Consumes the fog pickup at `pos` and starts the fog effect at `now`.
    pub fn take_fog_at(&mut self, pos: Position, now: Instant) -> bool {
        if self.fog_pickup == Some(pos) {
            self.fog_pickup = None;
            self.fog_spawned_at = None;
            self.fog_activated_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Ends the fog effect and removes an unclaimed fog pickup once either
    /// has lasted longer than the fog duration.
    pub fn expire(&mut self, now: Instant) -> Vec<PowerUpEvent> {
        let mut events = Vec::new();

        if self.outlived(self.fog_activated_at, now) {
            self.fog_activated_at = None;
            info!("Fog lifted after {:?}", self.fog_duration);
            events.push(PowerUpEvent::FogExpired);
        }

        if self.outlived(self.fog_spawned_at, now) {
            self.fog_spawned_at = None;
            if let Some(pos) = self.fog_pickup.take() {
                info!("Unclaimed fog power-up at ({}, {}) vanished", pos.x, pos.y);
                events.push(PowerUpEvent::FogPickupExpired(pos));
            }
        }

        events
    }

    fn outlived(&self, since: Option<Instant>, now: Instant) -> bool {
        since.map_or(false, |at| now.saturating_duration_since(at) > self.fog_duration)
    }

    /// Runs one round of spawn checks at `now`. `occupied` reports cells
    /// taken by snakes or food; pickups never share a cell with each other.
    pub fn roll_spawns<F>(&mut self, spawner: &mut SpawnPolicy, now: Instant, occupied: F) -> Vec<PowerUpEvent>
    where
        F: Fn(Position) -> bool,
    {
        let mut events = Vec::new();

        if self.shrink.is_none() && spawner.roll(self.shrink_spawn_chance) {
            let pos = spawner.free_cell(|cell| occupied(cell) || self.occupies(cell));
            self.shrink = Some(pos);
            info!("Shrink power-up spawned at ({}, {})", pos.x, pos.y);
            events.push(PowerUpEvent::ShrinkSpawned(pos));
        }

        if self.fog_pickup.is_none()
            && self.fog_activated_at.is_none()
            && spawner.roll(self.fog_spawn_chance)
        {
            let pos = spawner.free_cell(|cell| occupied(cell) || self.occupies(cell));
            self.place_fog_pickup(pos, now);
            info!("Fog power-up spawned at ({}, {})", pos.x, pos.y);
            events.push(PowerUpEvent::FogSpawned(pos));
        }

        events
    }
}
