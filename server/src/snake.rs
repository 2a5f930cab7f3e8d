use crate::config::SpawnPoint;
use crate::error::IntentRejected;
use shared::{Direction, PlayerId, Position, SnakeView};
use std::collections::VecDeque;

/// A player's snake. Index 0 of `body` is the head.
#[derive(Debug, Clone)]
pub struct Snake {
    pub id: PlayerId,
    pub body: VecDeque<Position>,
    pub direction: Direction,
    pub alive: bool,
    pub score: u32,
    pub fog_active: bool,
}

impl Snake {
    pub fn new(id: PlayerId, spawn: SpawnPoint) -> Self {
        Self {
            id,
            body: VecDeque::from([spawn.position]),
            direction: spawn.direction,
            alive: true,
            score: 0,
            fog_active: false,
        }
    }

    pub fn head(&self) -> Position {
        // The body is never empty: it starts with one segment and shrinking keeps at least one.
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// The cell the head moves into on the next tick.
    pub fn next_head(&self, cell_size: i32) -> Position {
        self.head().offset(self.direction, cell_size)
    }

    /// Overwrites the committed heading unless it would reverse the snake.
    pub fn set_direction(&mut self, direction: Direction) -> Result<(), IntentRejected> {
        if self.direction.is_opposite(direction) {
            return Err(IntentRejected::Reversal);
        }
        self.direction = direction;
        Ok(())
    }

    /// Moves the head into `new_head`, keeping the tail when growing.
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.body.push_front(new_head);
        if !grow {
            self.body.pop_back();
        }
    }

    /// Keeps the first half of the body. Single-segment snakes are unchanged.
    pub fn shrink(&mut self) {
        if self.body.len() > 1 {
            let keep = self.body.len() / 2;
            self.body.truncate(keep);
        }
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    pub fn view(&self) -> SnakeView {
        SnakeView {
            pos: self.body.iter().copied().collect(),
            dir: self.direction.vector(),
            alive: self.alive,
            score: self.score,
            fog_active: self.fog_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vector;

    fn snake_at(x: i32, y: i32, direction: Direction) -> Snake {
        Snake::new(
            1,
            SpawnPoint {
                position: Position::new(x, y),
                direction,
            },
        )
    }

    #[test]
    fn test_snake_creation() {
        let snake = snake_at(100, 100, Direction::Right);
        assert_eq!(snake.len(), 1);
        assert_eq!(snake.head(), Position::new(100, 100));
        assert!(snake.alive);
        assert_eq!(snake.score, 0);
        assert!(!snake.fog_active);
    }

    #[test]
    fn test_reversal_is_rejected_and_idempotent() {
        let mut snake = snake_at(100, 100, Direction::Right);
        for _ in 0..3 {
            assert_eq!(
                snake.set_direction(Direction::Left),
                Err(IntentRejected::Reversal)
            );
            assert_eq!(snake.direction, Direction::Right);
        }
    }

    #[test]
    fn test_perpendicular_and_same_direction_accepted() {
        let mut snake = snake_at(100, 100, Direction::Right);
        assert!(snake.set_direction(Direction::Right).is_ok());
        assert!(snake.set_direction(Direction::Up).is_ok());
        assert_eq!(snake.direction, Direction::Up);
        assert!(snake.set_direction(Direction::Left).is_ok());
        assert_eq!(snake.direction, Direction::Left);
    }

    #[test]
    fn test_advance_with_and_without_growth() {
        let mut snake = snake_at(100, 100, Direction::Right);
        let next = snake.next_head(20);
        snake.advance(next, true);
        assert_eq!(
            snake.body,
            VecDeque::from([Position::new(120, 100), Position::new(100, 100)])
        );

        let next = snake.next_head(20);
        snake.advance(next, false);
        assert_eq!(
            snake.body,
            VecDeque::from([Position::new(140, 100), Position::new(120, 100)])
        );
    }

    #[test]
    fn test_shrink_halves_body() {
        let mut snake = snake_at(100, 100, Direction::Right);
        snake.body = (0..5).map(|i| Position::new(100 - i * 20, 100)).collect();
        snake.shrink();
        assert_eq!(
            snake.body,
            VecDeque::from([Position::new(100, 100), Position::new(80, 100)])
        );

        snake.body.truncate(1);
        snake.shrink();
        assert_eq!(snake.len(), 1);
    }

    #[test]
    fn test_view() {
        let mut snake = snake_at(40, 60, Direction::Down);
        snake.score = 3;
        let view = snake.view();
        assert_eq!(view.pos, vec![Position::new(40, 60)]);
        assert_eq!(view.dir, Vector::new(0, 1));
        assert_eq!(view.score, 3);
        assert!(view.alive);
    }
}
