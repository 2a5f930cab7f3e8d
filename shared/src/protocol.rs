//! Versioned message schema exchanged between server and clients.
//!
//! Every frame payload is an envelope carrying [`PROTOCOL_VERSION`] so that
//! implementations in other languages can reject frames they do not understand.

use crate::{Direction, Position, Vector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PROTOCOL_VERSION: u8 = 1;

/// Stable player identifier: the first connection is 1, the second is 2.
pub type PlayerId = u8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub v: u8,
    pub msg: ServerMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub v: u8,
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    InitialSnapshot(InitialSnapshot),
    TickSnapshot(TickSnapshot),
    Rejected { reason: String },
}

/// Per-snake state as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeView {
    /// Body segments, head first.
    pub pos: Vec<Position>,
    pub dir: Vector,
    pub alive: bool,
    pub score: u32,
    pub fog_active: bool,
}

impl SnakeView {
    pub fn head(&self) -> Option<Position> {
        self.pos.first().copied()
    }
}

/// Sent once per connection, right after the player slot is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSnapshot {
    pub player_id: PlayerId,
    pub state: BTreeMap<PlayerId, SnakeView>,
    pub food: Position,
    pub powerup: Option<Position>,
    pub fog: Option<Position>,
}

/// Sent to every client after each fully resolved tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub state: BTreeMap<PlayerId, SnakeView>,
    pub food: Position,
    pub powerup: Option<Position>,
    pub fog_powerup: Option<Position>,
    pub game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Move,
    Restart,
}

/// A player command, applied at the next tick boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    /// Required for `move`, ignored for `restart`.
    #[serde(default)]
    pub direction: Option<Vector>,
}

impl Intent {
    pub fn move_towards(direction: Direction) -> Self {
        Self {
            action: Action::Move,
            direction: Some(direction.vector()),
        }
    }

    pub fn restart() -> Self {
        Self {
            action: Action::Restart,
            direction: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_json_shape() {
        let json = serde_json::to_value(Intent::move_towards(Direction::Up)).unwrap();
        assert_eq!(json["action"], "move");
        assert_eq!(json["direction"], serde_json::json!([0, -1]));
    }

    #[test]
    fn test_restart_without_direction_field() {
        let intent: Intent = serde_json::from_str(r#"{"action":"restart"}"#).unwrap();
        assert_eq!(intent, Intent::restart());
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result: Result<Intent, _> = serde_json::from_str(r#"{"action":"teleport"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_tick_snapshot_json_shape() {
        let mut state = BTreeMap::new();
        state.insert(
            1,
            SnakeView {
                pos: vec![Position::new(120, 100)],
                dir: Vector::new(1, 0),
                alive: true,
                score: 0,
                fog_active: false,
            },
        );
        let msg = ServerMessage::TickSnapshot(TickSnapshot {
            state,
            food: Position::new(40, 60),
            powerup: None,
            fog_powerup: Some(Position::new(0, 0)),
            game_over: false,
        });

        let json = serde_json::to_value(&msg).unwrap();
        let snapshot = &json["tick_snapshot"];
        assert_eq!(snapshot["game_over"], false);
        assert_eq!(snapshot["state"]["1"]["pos"], serde_json::json!([[120, 100]]));
        assert_eq!(snapshot["state"]["1"]["dir"], serde_json::json!([1, 0]));
        assert_eq!(snapshot["food"], serde_json::json!([40, 60]));
        assert!(snapshot["powerup"].is_null());
        assert_eq!(snapshot["fog_powerup"], serde_json::json!([0, 0]));
    }

    #[test]
    fn test_snake_view_head() {
        let view = SnakeView {
            pos: vec![Position::new(20, 40), Position::new(0, 40)],
            dir: Vector::new(1, 0),
            alive: true,
            score: 1,
            fog_active: false,
        };
        assert_eq!(view.head(), Some(Position::new(20, 40)));
    }
}
