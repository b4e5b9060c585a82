//! Underground conveyor pairs.
//!
//! An entrance and an exit `span` cells apart along `facing`, with the
//! cells between them hidden. Items reaching the entrance are taken off the
//! grid, carried under the hidden run at conveyor speed, and set down on
//! the exit once it is free.

use beltway_core::fixed::Fixed64;
use beltway_core::grid::{Cell, Direction};
use beltway_core::id::ItemId;
use beltway_core::registry::{ItemRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::StructureError;

/// Longest allowed distance from entrance to exit, in cells.
pub const MAX_UNDERGROUND_SPAN: u32 = 5;

/// Which part of an underground pair a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UndergroundRole {
    Entrance,
    Hidden,
    Exit,
}

/// An item in transit, with the distance left to travel in cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub item: ItemId,
    pub remaining: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Underground {
    entrance: Cell,
    facing: Direction,
    span: u32,
    cargo: Option<Cargo>,
}

impl Underground {
    pub fn new(entrance: Cell, facing: Direction, span: u32) -> Result<Self, StructureError> {
        if !(1..=MAX_UNDERGROUND_SPAN).contains(&span) {
            return Err(StructureError::InvalidSpan {
                span,
                max: MAX_UNDERGROUND_SPAN,
            });
        }
        Ok(Self {
            entrance,
            facing,
            span,
            cargo: None,
        })
    }

    pub fn entrance(&self) -> Cell {
        self.entrance
    }

    pub fn exit(&self) -> Cell {
        self.entrance.step_by(self.facing, self.span as i32)
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    /// Every cell the pair covers, entrance first.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..=self.span as i32).map(|i| self.entrance.step_by(self.facing, i))
    }

    pub fn role(&self, cell: Cell) -> Option<UndergroundRole> {
        let i = self.cells().position(|c| c == cell)?;
        Some(if i == 0 {
            UndergroundRole::Entrance
        } else if i == self.span as usize {
            UndergroundRole::Exit
        } else {
            UndergroundRole::Hidden
        })
    }

    pub fn cargo(&self) -> Option<Cargo> {
        self.cargo
    }

    pub fn is_carrying(&self) -> bool {
        self.cargo.is_some()
    }

    /// Give up the carried item, if any, without touching the registry.
    pub(crate) fn take_cargo(&mut self) -> Option<ItemId> {
        self.cargo.take().map(|c| c.item)
    }

    /// Carry cargo forward, deliver it at the exit, or pick up a new item
    /// from the entrance.
    pub(crate) fn update(&mut self, items: &mut ItemRegistry, travel: Fixed64) {
        let cell_length = items.geometry().cell_length();

        if let Some(cargo) = self.cargo.as_mut() {
            let cells = travel.checked_div(cell_length).unwrap_or(Fixed64::ZERO);
            cargo.remaining = (cargo.remaining - cells).max(Fixed64::ZERO);
            if cargo.remaining > Fixed64::ZERO {
                return;
            }
            let item = cargo.item;
            self.deliver(items, item);
            return;
        }

        let Some(item) = items.item_at(self.entrance) else {
            return;
        };
        if items.item(item).is_some_and(|i| i.is_caught()) {
            return;
        }
        if items.fetch(self.entrance).is_none() {
            return;
        }
        if let Some(entity) = items.item_mut(item) {
            entity.set_caught(true);
            entity.set_visible(false);
        }
        trace!(?item, entrance = ?self.entrance, "item entered underground");
        self.cargo = Some(Cargo {
            item,
            remaining: Fixed64::from_num(self.span),
        });
    }

    fn deliver(&mut self, items: &mut ItemRegistry, item: ItemId) {
        let exit = self.exit();
        if items.is_occupied(exit) {
            return;
        }
        let centre = items.geometry().to_world(exit);
        match items.drop(item, centre.x, centre.y) {
            Ok(_) => {
                if let Some(entity) = items.item_mut(item) {
                    entity.set_caught(false);
                    entity.set_visible(true);
                }
                trace!(?item, ?exit, "item left underground");
                self.cargo = None;
            }
            Err(RegistryError::UnknownItem(_)) => {
                warn!(?item, "underground cargo vanished in transit");
                self.cargo = None;
            }
            // Exit outside the grid or taken; keep waiting.
            Err(_) => {}
        }
    }
}
