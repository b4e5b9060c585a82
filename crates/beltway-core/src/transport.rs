//! The per-tick transport pass.
//!
//! Every live item is visited once, in registry order, and each move is
//! committed to the occupancy grid before the next item is considered
//! (process-and-commit, not snapshot-then-apply). An item therefore sees
//! the cells already claimed earlier in the same tick, and when two items
//! target the same cell the one earlier in registry order wins.
//!
//! # Per-item state machine
//!
//! 1. Caught items are skipped.
//! 2. Items not on a conveyor, underground or splitter are stationary.
//! 3. The structure's facing direction picks the single candidate cell.
//! 4. Undergrounds and splitters may refuse transfer; the item waits.
//! 5. The candidate must be inside the grid, unoccupied, and legal for
//!    placement according to the structure layer.
//! 6. The item advances; a cell change is committed by the registry.
//!
//! Blocked is a normal steady state and never an error.

use tracing::trace;

use crate::fixed::Fixed64;
use crate::grid::Direction;
use crate::id::ItemId;
use crate::registry::ItemRegistry;
use crate::structure::StructureLayer;

/// What happened to one item during a transport pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Held by another mechanism.
    Caught,
    /// Live but not on the grid (fetched); never moved by transport.
    Detached,
    /// Not on a transport structure, or the structure has no direction.
    Stationary,
    /// The structure refused transfer this tick.
    Gated,
    /// The destination is off-grid, occupied, or illegal.
    Blocked,
    /// The item moved; `crossed` is true if its cell changed.
    Advanced { direction: Direction, crossed: bool },
}

/// Tally of a transport pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub advanced: u32,
    /// Items whose cell changed (a subset of `advanced`).
    pub crossed: u32,
    pub blocked: u32,
    pub gated: u32,
    pub stationary: u32,
    pub caught: u32,
    pub detached: u32,
}

impl TickReport {
    fn record(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Caught => self.caught += 1,
            MoveOutcome::Detached => self.detached += 1,
            MoveOutcome::Stationary => self.stationary += 1,
            MoveOutcome::Gated => self.gated += 1,
            MoveOutcome::Blocked => self.blocked += 1,
            MoveOutcome::Advanced { crossed, .. } => {
                self.advanced += 1;
                if crossed {
                    self.crossed += 1;
                }
            }
        }
    }
}

/// Advance every live item by one tick.
///
/// `travel` is `speed * elapsed` in world units. It is clamped to
/// `[0, cell_length]` so one tick can never carry an item past the single
/// destination cell that was checked for it.
pub fn update_tick<S>(items: &mut ItemRegistry, structures: &S, travel: Fixed64) -> TickReport
where
    S: StructureLayer + ?Sized,
{
    let travel = travel.clamp(Fixed64::ZERO, items.geometry().cell_length());
    let mut report = TickReport::default();

    // No item is added or removed during the pass, so indices stay valid.
    for i in 0..items.len() {
        let id = items.live_ids()[i];
        let outcome = step_item(items, structures, id, travel);
        report.record(outcome);
    }
    report
}

/// Run the state machine for a single item and commit the result.
pub fn step_item<S>(
    items: &mut ItemRegistry,
    structures: &S,
    id: ItemId,
    travel: Fixed64,
) -> MoveOutcome
where
    S: StructureLayer + ?Sized,
{
    let Some(item) = items.item(id) else {
        return MoveOutcome::Detached;
    };
    if item.is_caught() {
        return MoveOutcome::Caught;
    }
    let cell = item.cell();
    if items.item_at(cell) != Some(id) {
        return MoveOutcome::Detached;
    }

    let kind = structures.kind_at(cell);
    if !kind.is_transport() {
        return MoveOutcome::Stationary;
    }
    let Some(direction) = structures.facing_direction(cell) else {
        return MoveOutcome::Stationary;
    };
    if kind.gates_transfer() && !structures.accepts_transfer(cell) {
        return MoveOutcome::Gated;
    }

    let Some(destination) = items.geometry().neighbor(cell, direction) else {
        return MoveOutcome::Blocked;
    };
    if items.is_occupied(destination) || !structures.placement_legal(destination) {
        trace!(?id, ?cell, ?destination, "item blocked");
        return MoveOutcome::Blocked;
    }

    match items.advance_item(id, direction, travel) {
        Some(to) => MoveOutcome::Advanced {
            direction,
            crossed: to != cell,
        },
        None => MoveOutcome::Detached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, GridGeometry};
    use crate::id::ItemKind;
    use crate::structure::StructureKind;
    use crate::test_utils::*;

    const ORE: ItemKind = ItemKind(0);

    fn registry() -> ItemRegistry {
        ItemRegistry::new(GridGeometry::new(10, fixed(32.0)).unwrap())
    }

    #[test]
    fn simple_advance_crosses_boundary() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Right);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();
        let x0 = reg.item(a).unwrap().position().x;

        // speed 64 * 0.5s = 32 units
        let report = update_tick(&mut reg, &layer, fixed(64.0) * fixed(0.5));

        let item = reg.item(a).unwrap();
        assert_eq!(item.position().x, x0 + fixed(32.0));
        assert_eq!(item.cell(), Cell::new(5, 6));
        assert_eq!(reg.item_at(Cell::new(5, 6)), Some(a));
        assert!(!reg.is_occupied(Cell::new(5, 5)));
        assert_eq!(report.advanced, 1);
        assert_eq!(report.crossed, 1);
    }

    #[test]
    fn sub_cell_motion_does_not_touch_grid() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Right);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();

        let report = update_tick(&mut reg, &layer, fixed(8.0));

        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(5, 5));
        assert_eq!(reg.item_at(Cell::new(5, 5)), Some(a));
        assert_eq!(report.advanced, 1);
        assert_eq!(report.crossed, 0);
    }

    #[test]
    fn blocked_by_occupied_destination() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Right);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();
        let _b = reg.add(Cell::new(5, 6), ORE).unwrap();
        let before = reg.item(a).unwrap().clone();

        let report = update_tick(&mut reg, &layer, fixed(32.0));

        assert_eq!(reg.item(a).unwrap(), &before);
        assert_eq!(report.blocked, 1);
    }

    #[test]
    fn blocked_by_illegal_destination() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(2, 2), Direction::Down);
        layer.set(Cell::new(3, 2), StubStructure::solid());
        let a = reg.add(Cell::new(2, 2), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(2, 2));
    }

    #[test]
    fn blocked_at_grid_edge() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(0, 4), Direction::Up);
        let a = reg.add(Cell::new(0, 4), ORE).unwrap();

        let report = update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(0, 4));
        assert_eq!(report.blocked, 1);
    }

    #[test]
    fn gated_structure_holds_item_even_when_clear() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.set(
            Cell::new(4, 4),
            StubStructure::gated(StructureKind::UndergroundConveyor, Direction::Right, false),
        );
        let a = reg.add(Cell::new(4, 4), ORE).unwrap();

        let report = update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(4, 4));
        assert_eq!(report.gated, 1);
    }

    #[test]
    fn open_splitter_passes_item() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.set(
            Cell::new(4, 4),
            StubStructure::gated(StructureKind::Splitter, Direction::Up, true),
        );
        let a = reg.add(Cell::new(4, 4), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(3, 4));
    }

    #[test]
    fn items_off_transport_are_stationary() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.set(Cell::new(1, 1), StubStructure::machine());
        reg.add(Cell::new(1, 1), ORE).unwrap();
        reg.add(Cell::new(7, 7), ORE).unwrap();

        let report = update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(report.stationary, 2);
    }

    #[test]
    fn caught_items_are_skipped() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Left);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();
        reg.item_mut(a).unwrap().set_caught(true);

        let report = update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(5, 5));
        assert_eq!(report.caught, 1);
    }

    #[test]
    fn fetched_items_are_not_moved() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Left);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();
        reg.fetch(Cell::new(5, 5));

        let report = update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(5, 5));
        assert_eq!(report.detached, 1);
        assert!(!reg.is_occupied(Cell::new(5, 4)));
    }

    #[test]
    fn first_inserted_wins_contested_cell() {
        // Two conveyors feed (5,5) from the left and from above.
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 4), Direction::Right);
        layer.conveyor(Cell::new(4, 5), Direction::Down);
        let first = reg.add(Cell::new(4, 5), ORE).unwrap();
        let second = reg.add(Cell::new(5, 4), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(32.0));

        assert_eq!(reg.item_at(Cell::new(5, 5)), Some(first));
        assert_eq!(reg.item(second).unwrap().cell(), Cell::new(5, 4));
    }

    #[test]
    fn chain_moves_in_registry_order() {
        // Leader inserted first frees its cell before the follower is processed.
        let mut reg = registry();
        let mut layer = StubLayer::new();
        for col in 0..9 {
            layer.conveyor(Cell::new(0, col), Direction::Right);
        }
        let leader = reg.add(Cell::new(0, 3), ORE).unwrap();
        let follower = reg.add(Cell::new(0, 2), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(leader).unwrap().cell(), Cell::new(0, 4));
        assert_eq!(reg.item(follower).unwrap().cell(), Cell::new(0, 3));
    }

    #[test]
    fn follower_inserted_first_waits_one_tick() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        for col in 0..9 {
            layer.conveyor(Cell::new(0, col), Direction::Right);
        }
        let follower = reg.add(Cell::new(0, 2), ORE).unwrap();
        let leader = reg.add(Cell::new(0, 3), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(32.0));
        assert_eq!(reg.item(follower).unwrap().cell(), Cell::new(0, 2));
        assert_eq!(reg.item(leader).unwrap().cell(), Cell::new(0, 4));
    }

    #[test]
    fn oversized_travel_is_clamped_to_one_cell() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        for col in 0..9 {
            layer.conveyor(Cell::new(0, col), Direction::Right);
        }
        let a = reg.add(Cell::new(0, 0), ORE).unwrap();

        update_tick(&mut reg, &layer, fixed(500.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(0, 1));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn negative_travel_is_ignored() {
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(3, 3), Direction::Right);
        let a = reg.add(Cell::new(3, 3), ORE).unwrap();
        let before = reg.item(a).unwrap().position();

        update_tick(&mut reg, &layer, fixed(-10.0));
        assert_eq!(reg.item(a).unwrap().position(), before);
    }

    #[test]
    fn turn_recenters_before_new_heading() {
        // Right along row 5, then down at (5,6).
        let mut reg = registry();
        let mut layer = StubLayer::new();
        layer.conveyor(Cell::new(5, 5), Direction::Right);
        layer.conveyor(Cell::new(5, 6), Direction::Down);
        let a = reg.add(Cell::new(5, 5), ORE).unwrap();

        // 24 units: x goes 176 -> 200, crossing into col 6 off-centre.
        update_tick(&mut reg, &layer, fixed(24.0));
        assert_eq!(reg.item(a).unwrap().cell(), Cell::new(5, 6));
        assert_eq!(reg.item(a).unwrap().position().x, fixed(200.0));

        update_tick(&mut reg, &layer, fixed(4.0));
        let item = reg.item(a).unwrap();
        let centre = reg.geometry().to_world(Cell::new(5, 6));
        assert_eq!(item.position().x, centre.x);
        assert_eq!(item.position().y, centre.y + fixed(4.0));
        assert_eq!(item.last_direction(), Some(Direction::Down));
    }
}
