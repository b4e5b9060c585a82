//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::BTreeMap;

use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction, GridGeometry};
use crate::id::ItemKind;
use crate::registry::ItemRegistry;
use crate::structure::{StructureKind, StructureLayer};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Item kinds
// ===========================================================================

pub fn coal() -> ItemKind {
    ItemKind(0)
}
pub fn iron_ore() -> ItemKind {
    ItemKind(1)
}
pub fn copper_ore() -> ItemKind {
    ItemKind(2)
}
pub fn iron_plate() -> ItemKind {
    ItemKind(3)
}

// ===========================================================================
// Registry construction
// ===========================================================================

/// A registry over an `n x n` grid with the given cell length, iron and
/// copper ore designated as raw ore.
pub fn make_registry(num_cells: u32, cell_length: f64) -> ItemRegistry {
    let geometry = GridGeometry::new(num_cells, fixed(cell_length))
        .unwrap_or_else(|e| panic!("bad test geometry: {e}"));
    let mut registry = ItemRegistry::new(geometry);
    registry.set_ore_kinds([iron_ore(), copper_ore()]);
    registry
}

// ===========================================================================
// Stub structure layer
// ===========================================================================

/// One cell of a [`StubLayer`]: fixed answers to every capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubStructure {
    pub kind: StructureKind,
    pub facing: Option<Direction>,
    pub accepts: bool,
    pub legal: bool,
}

impl StubStructure {
    pub fn conveyor(facing: Direction) -> Self {
        Self {
            kind: StructureKind::Conveyor,
            facing: Some(facing),
            accepts: true,
            legal: true,
        }
    }

    /// An underground or splitter with a fixed acceptance answer.
    pub fn gated(kind: StructureKind, facing: Direction, accepts: bool) -> Self {
        Self {
            kind,
            facing: Some(facing),
            accepts,
            legal: true,
        }
    }

    /// A non-transport structure that holds items in place.
    pub fn machine() -> Self {
        Self {
            kind: StructureKind::Other,
            facing: None,
            accepts: false,
            legal: true,
        }
    }

    /// A cell that rejects item placement (e.g. an underground's hidden run).
    pub fn solid() -> Self {
        Self {
            kind: StructureKind::Other,
            facing: None,
            accepts: false,
            legal: false,
        }
    }
}

/// A map-backed structure layer with fixed per-cell answers. Unset cells
/// are empty ground that accepts placement.
#[derive(Debug, Clone, Default)]
pub struct StubLayer {
    cells: BTreeMap<Cell, StubStructure>,
}

impl StubLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, cell: Cell, structure: StubStructure) {
        self.cells.insert(cell, structure);
    }

    pub fn conveyor(&mut self, cell: Cell, facing: Direction) {
        self.set(cell, StubStructure::conveyor(facing));
    }

    /// Lay a straight conveyor line of `length` cells from `start`.
    pub fn conveyor_line(&mut self, start: Cell, facing: Direction, length: i32) {
        for i in 0..length {
            self.conveyor(start.step_by(facing, i), facing);
        }
    }

    pub fn clear(&mut self, cell: Cell) {
        self.cells.remove(&cell);
    }
}

impl StructureLayer for StubLayer {
    fn kind_at(&self, cell: Cell) -> StructureKind {
        self.cells
            .get(&cell)
            .map_or(StructureKind::Empty, |s| s.kind)
    }

    fn facing_direction(&self, cell: Cell) -> Option<Direction> {
        self.cells.get(&cell).and_then(|s| s.facing)
    }

    fn accepts_transfer(&self, cell: Cell) -> bool {
        self.cells.get(&cell).is_some_and(|s| s.accepts)
    }

    fn placement_legal(&self, cell: Cell) -> bool {
        self.cells.get(&cell).is_none_or(|s| s.legal)
    }
}
