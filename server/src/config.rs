//! Server and game configuration.
//!
//! Command line arguments only cover what operators change between runs;
//! everything else falls back to the defaults in [`GameConfig`].

use clap::Parser;
use shared::{Board, Direction, Position, WireFormat};
use std::time::Duration;

/// Command line arguments of the `server` binary
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "5555")]
    pub port: u16,
    /// Payload encoding inside each frame (json or bincode)
    #[clap(short, long, default_value = "json")]
    pub wire_format: WireFormat,
    /// Seed for food and power-up placement, random if omitted
    #[clap(short, long)]
    pub seed: Option<u64>,
    /// How long the fog effect lasts once picked up, in seconds
    #[clap(long, default_value = "5")]
    pub fog_duration_secs: u64,
}

/// Starting position and heading of one snake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPoint {
    pub position: Position,
    pub direction: Direction,
}

/// Tunables of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub board: Board,
    /// Indexed by player id minus one.
    pub spawn_points: [SpawnPoint; 2],
    pub initial_tick_interval: Duration,
    pub min_tick_interval: Duration,
    pub tick_interval_step: Duration,
    /// How often the tick interval shrinks by `tick_interval_step`.
    pub speed_up_period: Duration,
    pub fog_duration: Duration,
    /// Chance per power-up check of spawning the shrink pickup.
    pub shrink_spawn_chance: f64,
    /// Chance per power-up check of spawning the fog pickup.
    pub fog_spawn_chance: f64,
    /// Wall-clock period of the power-up spawn checks.
    pub powerup_check_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board: Board::default(),
            spawn_points: [
                SpawnPoint {
                    position: Position::new(100, 100),
                    direction: Direction::Right,
                },
                SpawnPoint {
                    position: Position::new(500, 300),
                    direction: Direction::Left,
                },
            ],
            initial_tick_interval: Duration::from_millis(75),
            min_tick_interval: Duration::from_millis(10),
            tick_interval_step: Duration::from_millis(5),
            speed_up_period: Duration::from_secs(10),
            fog_duration: Duration::from_secs(5),
            shrink_spawn_chance: 0.005,
            fog_spawn_chance: 0.003,
            powerup_check_interval: Duration::from_millis(75),
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub wire_format: WireFormat,
    /// Outbound frames buffered per client before snapshots are dropped.
    pub outbound_queue: usize,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5555".to_string(),
            wire_format: WireFormat::Json,
            outbound_queue: 64,
            game: GameConfig::default(),
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let game = GameConfig {
            seed: args.seed,
            fog_duration: Duration::from_secs(args.fog_duration_secs),
            ..GameConfig::default()
        };

        Self {
            address: format!("{}:{}", args.host, args.port),
            wire_format: args.wire_format,
            game,
            ..ServerConfig::default()
        }
    }
}
