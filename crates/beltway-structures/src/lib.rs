//! Structure grid for conveyors, underground conveyors, splitters and
//! opaque buildings.
//!
//! Maps grid cells to placed structures and answers the transport engine's
//! capability queries through [`StructureLayer`]. Multi-cell structures
//! (underground pairs) register every cell they cover, so each cell maps to
//! at most one structure.

use std::collections::BTreeMap;

use beltway_core::fixed::Fixed64;
use beltway_core::grid::{Cell, Direction};
use beltway_core::registry::ItemRegistry;
use beltway_core::structure::{StructureKind, StructureLayer};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::debug;

pub mod splitter;
pub mod underground;

pub use splitter::Splitter;
pub use underground::{Cargo, MAX_UNDERGROUND_SPAN, Underground, UndergroundRole};

new_key_type! {
    /// Identifies a placed structure.
    pub struct StructureId;
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A placed structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Structure {
    Conveyor { cell: Cell, facing: Direction },
    Underground(Underground),
    Splitter(Splitter),
    /// Any non-transport building. Items may rest on it only if it accepts
    /// them.
    Other { cell: Cell, accepts_items: bool },
}

impl Structure {
    /// Anchor cell: the entrance for undergrounds, the only cell otherwise.
    pub fn cell(&self) -> Cell {
        match self {
            Structure::Conveyor { cell, .. } | Structure::Other { cell, .. } => *cell,
            Structure::Underground(u) => u.entrance(),
            Structure::Splitter(s) => s.cell(),
        }
    }

    /// Every cell the structure covers.
    pub fn cells(&self) -> Vec<Cell> {
        match self {
            Structure::Underground(u) => u.cells().collect(),
            other => vec![other.cell()],
        }
    }

    fn kind_at(&self, cell: Cell) -> StructureKind {
        match self {
            Structure::Conveyor { .. } => StructureKind::Conveyor,
            Structure::Splitter(_) => StructureKind::Splitter,
            Structure::Other { .. } => StructureKind::Other,
            Structure::Underground(u) => match u.role(cell) {
                Some(UndergroundRole::Entrance | UndergroundRole::Exit) => {
                    StructureKind::UndergroundConveyor
                }
                _ => StructureKind::Other,
            },
        }
    }

    fn facing_at(&self, cell: Cell) -> Option<Direction> {
        match self {
            Structure::Conveyor { facing, .. } => Some(*facing),
            Structure::Splitter(s) => Some(s.chosen().unwrap_or(s.facing())),
            Structure::Other { .. } => None,
            Structure::Underground(u) => match u.role(cell) {
                Some(UndergroundRole::Entrance | UndergroundRole::Exit) => Some(u.facing()),
                _ => None,
            },
        }
    }

    fn accepts_transfer_at(&self, cell: Cell) -> bool {
        match self {
            Structure::Conveyor { .. } => true,
            Structure::Splitter(s) => s.chosen().is_some(),
            Structure::Other { .. } => false,
            Structure::Underground(u) => u.role(cell) == Some(UndergroundRole::Exit),
        }
    }

    fn placement_legal_at(&self, cell: Cell) -> bool {
        match self {
            Structure::Conveyor { .. } | Structure::Splitter(_) => true,
            Structure::Other { accepts_items, .. } => *accepts_items,
            Structure::Underground(u) => match u.role(cell) {
                Some(UndergroundRole::Entrance) => !u.is_carrying(),
                Some(UndergroundRole::Exit) => true,
                _ => false,
            },
        }
    }
}

/// Errors from structure placement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("cell {cell:?} is outside the grid")]
    OutOfBounds { cell: Cell },
    #[error("cell {cell:?} is already covered by {occupant:?}")]
    Occupied { cell: Cell, occupant: StructureId },
    #[error("underground span {span} is outside 1..={max}")]
    InvalidSpan { span: u32, max: u32 },
    #[error("splitter at {cell:?} has invalid outputs: {reason}")]
    InvalidOutputs { cell: Cell, reason: &'static str },
    #[error("no structure at {cell:?}")]
    NotFound { cell: Cell },
    #[error("structure at {cell:?} cannot be rotated")]
    NotRotatable { cell: Cell },
}

// ---------------------------------------------------------------------------
// StructureGrid
// ---------------------------------------------------------------------------

/// Placed structures over a square grid of `num_cells` per side.
#[derive(Debug, Clone, Default)]
pub struct StructureGrid {
    num_cells: u32,
    structures: SlotMap<StructureId, Structure>,
    tiles: BTreeMap<Cell, StructureId>,
}

impl StructureGrid {
    pub fn new(num_cells: u32) -> Self {
        Self {
            num_cells,
            ..Self::default()
        }
    }

    pub fn num_cells(&self) -> u32 {
        self.num_cells
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        let n = self.num_cells as i32;
        (0..n).contains(&cell.row) && (0..n).contains(&cell.col)
    }

    // -- Placement --

    /// Place a structure, claiming every cell it covers.
    pub fn place(&mut self, structure: Structure) -> Result<StructureId, StructureError> {
        let cells = structure.cells();
        for &cell in &cells {
            if !self.in_bounds(cell) {
                return Err(StructureError::OutOfBounds { cell });
            }
            if let Some(&occupant) = self.tiles.get(&cell) {
                return Err(StructureError::Occupied { cell, occupant });
            }
        }

        let anchor = structure.cell();
        let id = self.structures.insert(structure);
        for cell in cells {
            self.tiles.insert(cell, id);
        }
        debug!(?id, ?anchor, "structure placed");
        Ok(id)
    }

    pub fn place_conveyor(
        &mut self,
        cell: Cell,
        facing: Direction,
    ) -> Result<StructureId, StructureError> {
        self.place(Structure::Conveyor { cell, facing })
    }

    /// Lay `length` conveyors in a straight line from `start`.
    pub fn place_conveyor_line(
        &mut self,
        start: Cell,
        facing: Direction,
        length: u32,
    ) -> Result<Vec<StructureId>, StructureError> {
        (0..length as i32)
            .map(|i| self.place_conveyor(start.step_by(facing, i), facing))
            .collect()
    }

    pub fn place_underground(
        &mut self,
        entrance: Cell,
        facing: Direction,
        span: u32,
    ) -> Result<StructureId, StructureError> {
        self.place(Structure::Underground(Underground::new(
            entrance, facing, span,
        )?))
    }

    pub fn place_splitter(
        &mut self,
        cell: Cell,
        facing: Direction,
    ) -> Result<StructureId, StructureError> {
        self.place(Structure::Splitter(Splitter::new(cell, facing)))
    }

    pub fn place_splitter_with_outputs(
        &mut self,
        cell: Cell,
        facing: Direction,
        outputs: Vec<Direction>,
    ) -> Result<StructureId, StructureError> {
        self.place(Structure::Splitter(Splitter::with_outputs(
            cell, facing, outputs,
        )?))
    }

    pub fn place_other(
        &mut self,
        cell: Cell,
        accepts_items: bool,
    ) -> Result<StructureId, StructureError> {
        self.place(Structure::Other {
            cell,
            accepts_items,
        })
    }

    /// Remove the structure covering `cell`. Items resting on it stay where
    /// they are; cargo inside an underground is discarded.
    ///
    /// An empty cell is a no-op returning `None`.
    pub fn remove(&mut self, cell: Cell, items: &mut ItemRegistry) -> Option<Structure> {
        let id = self.tiles.get(&cell).copied()?;
        let mut structure = self.structures.remove(id)?;
        for covered in structure.cells() {
            self.tiles.remove(&covered);
        }
        if let Structure::Underground(u) = &mut structure {
            if let Some(item) = u.take_cargo() {
                items.discard(item);
            }
        }
        debug!(?id, ?cell, "structure removed");
        Some(structure)
    }

    /// Turn the conveyor or splitter at `cell` to face `facing`.
    pub fn set_facing(&mut self, cell: Cell, facing: Direction) -> Result<(), StructureError> {
        let id = self
            .tiles
            .get(&cell)
            .copied()
            .ok_or(StructureError::NotFound { cell })?;
        match self.structures.get_mut(id) {
            Some(Structure::Conveyor { facing: f, .. }) => *f = facing,
            Some(Structure::Splitter(s)) => s.set_facing(facing),
            Some(_) => return Err(StructureError::NotRotatable { cell }),
            None => return Err(StructureError::NotFound { cell }),
        }
        Ok(())
    }

    // -- Queries --

    pub fn id_at(&self, cell: Cell) -> Option<StructureId> {
        self.tiles.get(&cell).copied()
    }

    pub fn structure_at(&self, cell: Cell) -> Option<&Structure> {
        self.id_at(cell).and_then(|id| self.structures.get(id))
    }

    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id)
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructureId, &Structure)> {
        self.structures.iter()
    }

    /// Whether an item leaving `from` toward `direction` would land on a free,
    /// legal cell.
    fn branch_open(&self, items: &ItemRegistry, from: Cell, direction: Direction) -> bool {
        items
            .geometry()
            .neighbor(from, direction)
            .is_some_and(|to| !items.is_occupied(to) && self.placement_legal(to))
    }
}

impl StructureLayer for StructureGrid {
    fn kind_at(&self, cell: Cell) -> StructureKind {
        self.structure_at(cell)
            .map_or(StructureKind::Empty, |s| s.kind_at(cell))
    }

    fn facing_direction(&self, cell: Cell) -> Option<Direction> {
        self.structure_at(cell).and_then(|s| s.facing_at(cell))
    }

    fn accepts_transfer(&self, cell: Cell) -> bool {
        self.structure_at(cell)
            .is_some_and(|s| s.accepts_transfer_at(cell))
    }

    fn placement_legal(&self, cell: Cell) -> bool {
        self.structure_at(cell)
            .is_none_or(|s| s.placement_legal_at(cell))
    }

    /// Undergrounds move their cargo, then splitters route their occupants,
    /// so a splitter sees exits that were filled this tick.
    fn update(&mut self, items: &mut ItemRegistry, travel: Fixed64) {
        for structure in self.structures.values_mut() {
            if let Structure::Underground(u) = structure {
                u.update(items, travel);
            }
        }

        let splitters: Vec<StructureId> = self
            .structures
            .iter()
            .filter(|(_, s)| matches!(s, Structure::Splitter(_)))
            .map(|(id, _)| id)
            .collect();
        for id in splitters {
            let Some(Structure::Splitter(s)) = self.structures.get(id) else {
                continue;
            };
            let cell = s.cell();
            let open: Vec<bool> = s
                .outputs()
                .iter()
                .map(|&d| self.branch_open(items, cell, d))
                .collect();
            let occupant = items.item_at(cell);
            if let Some(Structure::Splitter(s)) = self.structures.get_mut(id) {
                s.route(occupant, &open);
            }
        }
    }
}
