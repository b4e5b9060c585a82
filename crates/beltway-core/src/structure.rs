//! The capability contract the transport engine consumes from the
//! structure layer.
//!
//! The engine never inspects concrete structure types. It asks four
//! questions per cell (kind tag, facing direction, whether transfer is
//! currently accepted, whether an item may be placed) and leaves every
//! structure-specific rule behind this trait.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction};
use crate::registry::ItemRegistry;

/// Kind tag for the structure occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Empty,
    Conveyor,
    UndergroundConveyor,
    Splitter,
    Other,
}

impl StructureKind {
    /// Whether items resting on this kind are carried by the transport pass.
    pub fn is_transport(self) -> bool {
        matches!(
            self,
            StructureKind::Conveyor | StructureKind::UndergroundConveyor | StructureKind::Splitter
        )
    }

    /// Whether movement off this kind is gated by
    /// [`StructureLayer::accepts_transfer`].
    pub fn gates_transfer(self) -> bool {
        matches!(
            self,
            StructureKind::UndergroundConveyor | StructureKind::Splitter
        )
    }
}

/// A grid of structures as seen by the transport engine.
pub trait StructureLayer {
    /// Kind tag at `cell`. Cells outside the grid report `Empty`.
    fn kind_at(&self, cell: Cell) -> StructureKind;

    /// Direction the structure at `cell` pushes items, if any.
    fn facing_direction(&self, cell: Cell) -> Option<Direction>;

    /// Whether the structure at `cell` will currently let an item leave.
    /// Only consulted for kinds where [`StructureKind::gates_transfer`] holds.
    fn accepts_transfer(&self, cell: Cell) -> bool;

    /// Whether an item may be placed on `cell` at all.
    fn placement_legal(&self, cell: Cell) -> bool;

    /// Structure-side work for one tick, run before the transport pass.
    ///
    /// `travel` is the distance an unobstructed item covers this tick, in
    /// world units. Structures that take custody of items (undergrounds,
    /// machines) go through the registry's `fetch`/`drop` operations.
    fn update(&mut self, _items: &mut ItemRegistry, _travel: Fixed64) {}
}

/// A layer with no structures: every item is stationary, every in-grid
/// cell accepts placement.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGround;

impl StructureLayer for OpenGround {
    fn kind_at(&self, _cell: Cell) -> StructureKind {
        StructureKind::Empty
    }

    fn facing_direction(&self, _cell: Cell) -> Option<Direction> {
        None
    }

    fn accepts_transfer(&self, _cell: Cell) -> bool {
        false
    }

    fn placement_legal(&self, _cell: Cell) -> bool {
        true
    }
}
