//! Random placement of food and power-ups on free cells.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{Board, Position};

pub struct SpawnPolicy {
    board: Board,
    rng: StdRng,
}

impl SpawnPolicy {
    pub fn new(board: Board, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { board, rng }
    }

    /// Picks a random cell for which `occupied` is false. Falls back to any
    /// cell when the board is full.
    pub fn free_cell<F>(&mut self, occupied: F) -> Position
    where
        F: Fn(Position) -> bool,
    {
        let free: Vec<Position> = self.board.cells().filter(|cell| !occupied(*cell)).collect();
        match free.choose(&mut self.rng) {
            Some(cell) => *cell,
            None => self.any_cell(),
        }
    }

    pub fn any_cell(&mut self) -> Position {
        let column = self.rng.gen_range(0..self.board.columns());
        let row = self.rng.gen_range(0..self.board.rows());
        self.board.cell_to_pixel(column, row)
    }

    /// One spawn check that succeeds with `probability`.
    pub fn roll(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_free_cell_is_on_board_and_aligned() {
        let board = Board::default();
        let mut policy = SpawnPolicy::new(board, Some(7));
        for _ in 0..100 {
            let cell = policy.free_cell(|_| false);
            assert!(board.contains(cell));
            assert!(board.is_aligned(cell));
        }
    }

    #[test]
    fn test_free_cell_avoids_occupied_cells() {
        let board = Board::new(60, 20, 20);
        let mut policy = SpawnPolicy::new(board, Some(1));
        let only_free = Position::new(40, 0);
        for _ in 0..50 {
            assert_eq!(policy.free_cell(|cell| cell != only_free), only_free);
        }
    }

    #[test]
    fn test_full_board_falls_back_to_any_cell() {
        let board = Board::new(40, 40, 20);
        let mut policy = SpawnPolicy::new(board, Some(3));
        let cell = policy.free_cell(|_| true);
        assert!(board.contains(cell));
    }

    #[test]
    fn test_same_seed_same_placements() {
        let mut a = SpawnPolicy::new(Board::default(), Some(99));
        let mut b = SpawnPolicy::new(Board::default(), Some(99));
        for _ in 0..20 {
            assert_eq!(a.free_cell(|_| false), b.free_cell(|_| false));
        }
    }

    #[test]
    fn test_roll_rate_matches_probability() {
        let mut policy = SpawnPolicy::new(Board::default(), Some(2024));
        let trials = 200_000;
        let hits = (0..trials).filter(|_| policy.roll(0.005)).count();
        assert_approx_eq!(hits as f64 / trials as f64, 0.005, 0.002);
    }

    #[test]
    fn test_roll_extremes() {
        let mut policy = SpawnPolicy::new(Board::default(), Some(5));
        assert!((0..100).all(|_| !policy.roll(0.0)));
        assert!((0..100).all(|_| policy.roll(1.0)));
    }
}
