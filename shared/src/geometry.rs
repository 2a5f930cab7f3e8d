//! Grid geometry: mapping cells to pixel positions and validating bounds.

use crate::{Position, CELL_SIZE, WORLD_HEIGHT, WORLD_WIDTH};

/// Dimensions of the playing field in pixels, divided into square cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            cell_size: CELL_SIZE,
        }
    }
}

impl Board {
    pub fn new(width: i32, height: i32, cell_size: i32) -> Self {
        Self {
            width,
            height,
            cell_size,
        }
    }

    pub fn columns(&self) -> i32 {
        self.width / self.cell_size
    }

    pub fn rows(&self) -> i32 {
        self.height / self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        (self.columns() * self.rows()) as usize
    }

    pub fn cell_to_pixel(&self, column: i32, row: i32) -> Position {
        Position::new(column * self.cell_size, row * self.cell_size)
    }

    /// Inverse of [`Board::cell_to_pixel`]; `None` for misaligned or off-board positions.
    pub fn pixel_to_cell(&self, pos: Position) -> Option<(i32, i32)> {
        if self.contains(pos) && self.is_aligned(pos) {
            Some((pos.x / self.cell_size, pos.y / self.cell_size))
        } else {
            None
        }
    }

    /// An off-board head is the wall collision signal.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn is_aligned(&self, pos: Position) -> bool {
        pos.x.rem_euclid(self.cell_size) == 0 && pos.y.rem_euclid(self.cell_size) == 0
    }

    /// Every aligned on-board position, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows())
            .flat_map(move |row| (0..self.columns()).map(move |col| self.cell_to_pixel(col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_board() {
        let board = Board::default();
        assert_eq!(board.columns(), 40);
        assert_eq!(board.rows(), 30);
        assert_eq!(board.cell_count(), 1200);
    }

    #[test]
    fn test_cell_pixel_mapping() {
        let board = Board::default();
        assert_eq!(board.cell_to_pixel(5, 5), Position::new(100, 100));
        assert_eq!(board.pixel_to_cell(Position::new(100, 100)), Some((5, 5)));
        assert_eq!(board.pixel_to_cell(Position::new(105, 100)), None);
        assert_eq!(board.pixel_to_cell(Position::new(800, 100)), None);
    }

    #[test]
    fn test_bounds() {
        let board = Board::default();
        assert!(board.contains(Position::new(0, 0)));
        assert!(board.contains(Position::new(780, 580)));
        assert!(!board.contains(Position::new(800, 0)));
        assert!(!board.contains(Position::new(0, 600)));
        assert!(!board.contains(Position::new(-20, 100)));
        assert!(!board.contains(Position::new(100, -20)));
    }

    #[test]
    fn test_alignment_handles_negative_coordinates() {
        let board = Board::default();
        assert!(board.is_aligned(Position::new(-20, 40)));
        assert!(!board.is_aligned(Position::new(-10, 40)));
    }

    #[test]
    fn test_cells_cover_board() {
        let board = Board::new(60, 40, 20);
        let cells: Vec<Position> = board.cells().collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.iter().all(|c| board.contains(*c) && board.is_aligned(*c)));
        assert_eq!(cells[0], Position::new(0, 0));
        assert_eq!(cells[5], Position::new(40, 20));
    }
}
