//! # Snake Duel Server Library
//!
//! This library provides the authoritative server for a two-player networked
//! snake game. It owns every piece of game truth (snake bodies, headings,
//! scores, food, power-ups, the global fog effect and collision outcomes) and
//! pushes the full state to both clients after every tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send direction intents and restart requests. The server
//! recomputes every position from those intents, so a modified client cannot
//! teleport or grow its snake.
//!
//! ### Client Management
//! Handles the lifecycle of the two player connections:
//! - Stable player ids (first connection is 1, second is 2)
//! - Reconnecting clients take over the idle snake of a departed player
//! - A third concurrent connection is told the server is full
//!
//! ### State Broadcasting
//! After each fully resolved tick one snapshot is encoded and queued for
//! every client. A client that cannot keep up only loses its own frames.
//!
//! ## Architecture Design
//!
//! ### Single Session Lock
//! The [`game::GameSession`] is the only shared mutable resource. It lives
//! behind one mutex that the game loop holds for a whole
//! advance/resolve/snapshot cycle and that connection handlers take briefly
//! to write a direction. A direction arriving mid-tick is therefore only seen
//! by the next tick, and no client ever observes a half-updated state.
//!
//! ### TCP With Explicit Framing
//! Every message is a 4-byte big-endian length followed by a versioned
//! payload (JSON by default, bincode optionally), see [`shared::codec`].
//!
//! ### Wall-Clock Timers
//! Ticks follow the session's current tick interval, which shrinks every ten
//! seconds. Power-up spawn checks and the difficulty ramp run on their own
//! timers so their pacing does not depend on the movement speed.
//!
//! ## Module Organization
//!
//! - `config`: command line arguments and game tunables
//! - `snake`, `collision`, `spawn`, `powerups`: the simulation pieces
//! - `game`: the session aggregate tying them together
//! - `client_manager`: player slots and outbound queues
//! - `network`: listener, per-client connection handlers and socket writers
//! - `game_loop`: tick scheduling and snapshot broadcasting
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         address: "127.0.0.1:5555".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     // Fails only if the address cannot be bound
//!     let server = Server::bind(config).await?;
//!
//!     // Waits for two players, then runs the game until shutdown
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod collision;
pub mod config;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod network;
pub mod powerups;
pub mod snake;
pub mod spawn;
