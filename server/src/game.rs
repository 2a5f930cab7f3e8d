use crate::collision::{self, Collision};
use crate::config::GameConfig;
use crate::error::IntentRejected;
use crate::powerups::{PowerUpEvent, PowerUpManager};
use crate::snake::Snake;
use crate::spawn::SpawnPolicy;
use log::{debug, info};
use shared::{
    Action, Direction, InitialSnapshot, Intent, PlayerId, Position, SnakeView, TickSnapshot,
    Vector,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// The authoritative state of one two-player game.
///
/// Every mutation goes through `&mut self`; the server keeps the session
/// behind a single mutex so ticks, intents and snapshots never interleave.
pub struct GameSession {
    config: GameConfig,
    snakes: BTreeMap<PlayerId, Snake>,
    food: Position,
    powerups: PowerUpManager,
    spawner: SpawnPolicy,
    game_over: bool,
    tick_interval: Duration,
    tick: u64,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let mut spawner = SpawnPolicy::new(config.board, config.seed);
        let snakes = Self::spawn_snakes(&config);
        let food = spawner.free_cell(|cell| snakes.values().any(|s| s.occupies(cell)));

        Self {
            powerups: PowerUpManager::new(&config),
            tick_interval: config.initial_tick_interval,
            config,
            snakes,
            food,
            spawner,
            game_over: false,
            tick: 0,
        }
    }

    fn spawn_snakes(config: &GameConfig) -> BTreeMap<PlayerId, Snake> {
        config
            .spawn_points
            .iter()
            .enumerate()
            .map(|(index, spawn)| {
                let id = index as PlayerId + 1;
                (id, Snake::new(id, *spawn))
            })
            .collect()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn snake(&self, id: PlayerId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn powerups(&self) -> &PowerUpManager {
        &self.powerups
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Dispatches a decoded client intent.
    pub fn apply_intent(&mut self, id: PlayerId, intent: Intent) -> Result<(), IntentRejected> {
        match intent.action {
            Action::Move => {
                let vector = intent.direction.ok_or(IntentRejected::MissingDirection)?;
                self.apply_direction_intent(id, vector)
            }
            Action::Restart => self.restart(),
        }
    }

    /// Overwrites the player's committed direction; only the latest accepted
    /// intent before a tick takes effect.
    pub fn apply_direction_intent(
        &mut self,
        id: PlayerId,
        vector: Vector,
    ) -> Result<(), IntentRejected> {
        if self.game_over {
            return Err(IntentRejected::GameOver);
        }
        let direction = Direction::try_from(vector)?;
        let snake = self
            .snakes
            .get_mut(&id)
            .ok_or(IntentRejected::UnknownPlayer(id))?;
        snake.set_direction(direction)
    }

    /// Resets snakes, food, power-ups and speed. Only allowed after game over.
    pub fn restart(&mut self) -> Result<(), IntentRejected> {
        if !self.game_over {
            return Err(IntentRejected::GameInProgress);
        }

        self.snakes = Self::spawn_snakes(&self.config);
        self.powerups.reset();
        self.respawn_food();
        self.tick_interval = self.config.initial_tick_interval;
        self.game_over = false;

        info!("Game restarted");
        Ok(())
    }

    /// Moves every alive snake one cell along its committed direction,
    /// handling fog, food and shrink pickups on the way. Does nothing once
    /// the game is over.
    pub fn advance_tick(&mut self, now: Instant) {
        if self.game_over {
            return;
        }
        self.expire_fog(now);

        let cell_size = self.config.board.cell_size;
        let ids: Vec<PlayerId> = self.snakes.keys().copied().collect();

        for id in ids {
            let new_head = match self.snakes.get(&id) {
                Some(snake) if snake.alive => snake.next_head(cell_size),
                _ => continue,
            };

            if self.powerups.take_fog_at(new_head, now) {
                for snake in self.snakes.values_mut() {
                    snake.fog_active = true;
                }
                info!("Player {} triggered the fog", id);
            }

            let ate = new_head == self.food;
            if let Some(snake) = self.snakes.get_mut(&id) {
                snake.advance(new_head, ate);
                if ate {
                    snake.score += 1;
                    debug!("Player {} ate food, score {}", id, snake.score);
                }
            }
            if ate {
                self.respawn_food();
            }

            if self.powerups.take_shrink_at(new_head) {
                if let Some(snake) = self.snakes.get_mut(&id) {
                    snake.shrink();
                    debug!("Player {} shrank to {} segments", id, snake.len());
                }
            }
        }

        self.tick += 1;
    }

    /// Kills colliding snakes; any death ends the game.
    pub fn resolve_collisions(&mut self) -> Vec<(PlayerId, Collision)> {
        let deaths = collision::resolve(&mut self.snakes, &self.config.board);
        for (id, collision) in &deaths {
            info!("Player {} died: {:?}", id, collision);
        }
        if !deaths.is_empty() {
            self.game_over = true;
            info!("Game over after {} ticks", self.tick);
        }
        deaths
    }

    /// One full simulation step: movement, collisions and the resulting snapshot.
    pub fn step(&mut self, now: Instant) -> TickSnapshot {
        if !self.game_over {
            self.advance_tick(now);
            self.resolve_collisions();
        }
        self.tick_snapshot()
    }

    /// Fog expiry and power-up spawn checks, driven by a wall-clock timer.
    pub fn update_powerups(&mut self, now: Instant) -> Vec<PowerUpEvent> {
        let mut events = self.expire_fog(now);
        if self.game_over {
            return events;
        }

        let snakes = &self.snakes;
        let food = self.food;
        events.extend(self.powerups.roll_spawns(&mut self.spawner, now, |cell| {
            cell == food || snakes.values().any(|s| s.occupies(cell))
        }));
        events
    }

    /// Shortens the tick interval by one step, never below the floor.
    pub fn speed_up(&mut self) -> Duration {
        self.tick_interval = self
            .tick_interval
            .saturating_sub(self.config.tick_interval_step)
            .max(self.config.min_tick_interval);
        self.tick_interval
    }

    pub fn initial_snapshot(&self, player_id: PlayerId) -> InitialSnapshot {
        InitialSnapshot {
            player_id,
            state: self.views(),
            food: self.food,
            powerup: self.powerups.shrink(),
            fog: self.powerups.fog_pickup(),
        }
    }

    pub fn tick_snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            state: self.views(),
            food: self.food,
            powerup: self.powerups.shrink(),
            fog_powerup: self.powerups.fog_pickup(),
            game_over: self.game_over,
        }
    }

    fn views(&self) -> BTreeMap<PlayerId, SnakeView> {
        self.snakes.iter().map(|(id, s)| (*id, s.view())).collect()
    }

    fn respawn_food(&mut self) {
        let snakes = &self.snakes;
        let powerups = &self.powerups;
        self.food = self.spawner.free_cell(|cell| {
            snakes.values().any(|s| s.occupies(cell)) || powerups.occupies(cell)
        });
    }

    fn expire_fog(&mut self, now: Instant) -> Vec<PowerUpEvent> {
        let events = self.powerups.expire(now);
        if events.contains(&PowerUpEvent::FogExpired) {
            for snake in self.snakes.values_mut() {
                snake.fog_active = false;
            }
        }
        events
    }
}
