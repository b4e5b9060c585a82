use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction, GridGeometry, WorldPos};
use crate::id::ItemKind;

/// A movable unit on the grid.
///
/// `cell` is the authoritative discrete location; `position` is derived from
/// it and drifts within the cell while the item travels. The registry owns
/// grid placement, so the cell can only be changed from inside the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    kind: ItemKind,
    cell: Cell,
    position: WorldPos,
    last_direction: Option<Direction>,
    caught: bool,
    visible: bool,
}

impl Item {
    /// Create an item centred on `cell`.
    pub fn new(kind: ItemKind, cell: Cell, geometry: &GridGeometry) -> Self {
        Self {
            kind,
            cell,
            position: geometry.to_world(cell),
            last_direction: None,
            caught: false,
            visible: true,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }

    /// Caught items are held by another mechanism and skipped by transport.
    pub fn is_caught(&self) -> bool {
        self.caught
    }

    pub fn set_caught(&mut self, caught: bool) {
        self.caught = caught;
    }

    /// Invisible items stay in the simulation but are not rendered.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Re-derive the continuous position from the cell (centre of cell).
    pub fn recenter(&mut self, geometry: &GridGeometry) {
        self.position = geometry.to_world(self.cell);
    }

    /// Move `distance` world units in `direction` and recompute the cell.
    ///
    /// A change of direction first snaps the item back to the centre of its
    /// cell so sub-cell drift from the previous heading does not carry over.
    /// No bounds or occupancy checks happen here; the transport engine only
    /// calls this once the destination is known to be free and legal.
    pub fn advance(&mut self, direction: Direction, distance: Fixed64, geometry: &GridGeometry) {
        if self.last_direction != Some(direction) {
            self.recenter(geometry);
        }

        match direction {
            Direction::Up => self.position.y -= distance,
            Direction::Right => self.position.x += distance,
            Direction::Down => self.position.y += distance,
            Direction::Left => self.position.x -= distance,
        }

        self.last_direction = Some(direction);
        self.cell = geometry.to_cell(self.position);
    }

    /// Re-attach to `cell`, snapping to its centre.
    pub(crate) fn place_at(&mut self, cell: Cell, geometry: &GridGeometry) {
        self.cell = cell;
        self.recenter(geometry);
    }
}
