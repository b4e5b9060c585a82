//! Grid coordinate model shared by every other component.
//!
//! Cells are addressed by `(row, col)`. Continuous world positions use the
//! centre-of-cell convention:
//!
//! ```text
//! to_world(row, col) = (col * L + L/2, row * L + L/2)
//! to_cell(x, y)      = (floor(y / L), floor(x / L))
//! ```
//!
//! where `L` is the cell length. Whenever `L` changes (zoom), every derived
//! position held elsewhere must be re-derived from its cell.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, floor_to_i32};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A discrete cell of the square grid. May lie outside the grid; use
/// [`GridGeometry::contains`] before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The adjacent cell in `direction`, without bounds checking.
    pub fn step(self, direction: Direction) -> Cell {
        self.step_by(direction, 1)
    }

    /// The cell `distance` cells away in `direction`, without bounds checking.
    pub fn step_by(self, direction: Direction, distance: i32) -> Cell {
        let (dr, dc) = direction.offset();
        Cell::new(self.row + dr * distance, self.col + dc * distance)
    }
}

/// A continuous world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl WorldPos {
    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }
}

/// Cardinal directions, encoded by ordinal as 0=up, 1=right, 2=down, 3=left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// All four cardinal directions, in ordinal order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Right,
            Direction::Down,
            Direction::Left,
        ]
    }

    /// Decode an ordinal. Anything above 3 is not a direction.
    pub fn from_ordinal(ordinal: u8) -> Option<Direction> {
        match ordinal {
            0 => Some(Direction::Up),
            1 => Some(Direction::Right),
            2 => Some(Direction::Down),
            3 => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// `(row, col)` offset for this direction. Rows grow downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        self.rotate_cw().rotate_cw()
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Right => Direction::Up,
            Direction::Down => Direction::Right,
            Direction::Left => Direction::Down,
        }
    }
}

/// Errors from geometry construction and zoom.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("cell length must be positive, got {0}")]
    InvalidCellLength(Fixed64),
    #[error("grid must have at least one cell per side")]
    EmptyGrid,
    #[error("{num_cells} cells of length {cell_length} exceed the fixed-point world range")]
    WorldTooLarge {
        num_cells: u32,
        cell_length: Fixed64,
    },
}

/// The world must span one cell past the far edge without overflowing, so
/// an item overshooting the last cell still has a representable position.
fn check_extent(num_cells: u32, cell_length: Fixed64) -> Result<(), GridError> {
    if cell_length <= Fixed64::ZERO {
        return Err(GridError::InvalidCellLength(cell_length));
    }
    Fixed64::checked_from_num(u64::from(num_cells) + 1)
        .and_then(|n| n.checked_mul(cell_length))
        .map(|_| ())
        .ok_or(GridError::WorldTooLarge {
            num_cells,
            cell_length,
        })
}

// ---------------------------------------------------------------------------
// GridGeometry
// ---------------------------------------------------------------------------

/// Size and scale of the square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    num_cells: u32,
    cell_length: Fixed64,
}

impl GridGeometry {
    pub fn new(num_cells: u32, cell_length: Fixed64) -> Result<Self, GridError> {
        if num_cells == 0 {
            return Err(GridError::EmptyGrid);
        }
        check_extent(num_cells, cell_length)?;
        Ok(Self {
            num_cells,
            cell_length,
        })
    }

    /// Number of cells along one side.
    pub fn num_cells(&self) -> u32 {
        self.num_cells
    }

    /// Total number of cells (`num_cells * num_cells`).
    pub fn cell_count(&self) -> usize {
        self.num_cells as usize * self.num_cells as usize
    }

    pub fn cell_length(&self) -> Fixed64 {
        self.cell_length
    }

    /// Change the cell length. Derived positions held elsewhere become stale
    /// until re-derived.
    pub fn set_cell_length(&mut self, cell_length: Fixed64) -> Result<(), GridError> {
        check_extent(self.num_cells, cell_length)?;
        self.cell_length = cell_length;
        Ok(())
    }

    /// Centre of `cell` in world coordinates.
    pub fn to_world(&self, cell: Cell) -> WorldPos {
        let half = self.cell_length / 2;
        WorldPos::new(
            Fixed64::from_num(cell.col) * self.cell_length + half,
            Fixed64::from_num(cell.row) * self.cell_length + half,
        )
    }

    /// The cell containing `pos`. The result may lie outside the grid.
    pub fn to_cell(&self, pos: WorldPos) -> Cell {
        Cell::new(
            floor_to_i32(pos.y / self.cell_length),
            floor_to_i32(pos.x / self.cell_length),
        )
    }

    pub fn contains(&self, cell: Cell) -> bool {
        let n = self.num_cells as i64;
        (0..n).contains(&(cell.row as i64)) && (0..n).contains(&(cell.col as i64))
    }

    /// Row-major flat index of `cell`, or `None` outside the grid.
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.row as usize * self.num_cells as usize + cell.col as usize)
    }

    /// The neighbour of `cell` in `direction`, or `None` if it falls off the grid.
    pub fn neighbor(&self, cell: Cell, direction: Direction) -> Option<Cell> {
        let next = cell.step(direction);
        self.contains(next).then_some(next)
    }
}
