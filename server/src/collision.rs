//! Collision detection between snakes, walls and their own bodies.
//!
//! All checks read the post-move positions first and deaths are applied
//! afterwards, so the evaluation order of snakes never changes the outcome.

use crate::snake::Snake;
use shared::{Board, PlayerId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    OwnBody,
    /// Ran into any segment of the other snake, its head included.
    Snake(PlayerId),
}

/// Checks one alive snake against the board and every other alive snake.
pub fn check(snake: &Snake, snakes: &BTreeMap<PlayerId, Snake>, board: &Board) -> Option<Collision> {
    let head = snake.head();

    if !board.contains(head) {
        return Some(Collision::Wall);
    }

    if snake.body.iter().skip(1).any(|segment| *segment == head) {
        return Some(Collision::OwnBody);
    }

    snakes
        .values()
        .find(|other| other.id != snake.id && other.alive && other.occupies(head))
        .map(|other| Collision::Snake(other.id))
}

/// Returns every alive snake that dies this tick, without mutating anything.
pub fn find_deaths(snakes: &BTreeMap<PlayerId, Snake>, board: &Board) -> Vec<(PlayerId, Collision)> {
    snakes
        .values()
        .filter(|snake| snake.alive)
        .filter_map(|snake| check(snake, snakes, board).map(|collision| (snake.id, collision)))
        .collect()
}

/// Marks colliding snakes dead and returns who died and why.
pub fn resolve(snakes: &mut BTreeMap<PlayerId, Snake>, board: &Board) -> Vec<(PlayerId, Collision)> {
    let deaths = find_deaths(snakes, board);
    for (id, _) in &deaths {
        if let Some(snake) = snakes.get_mut(id) {
            snake.alive = false;
        }
    }
    deaths
}
