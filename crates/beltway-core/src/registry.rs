//! The item registry: authoritative occupancy grid plus the ordered
//! collection of live items.
//!
//! The registry is the only component that writes grid slots. Items live
//! in a generational arena ([`SlotMap`]) and the grid stores `Option<ItemId>`
//! per cell, so there are no aliased references to reconcile.
//!
//! # Live order
//!
//! `live` keeps insertion order. Removal compacts the list without
//! reordering the survivors, so when two items compete for the same cell
//! in one tick the one inserted first always wins.
//!
//! # Tolerant operations
//!
//! Removing or fetching from an empty cell is a documented no-op that
//! returns `None`. Adding onto an occupied cell is a checked precondition
//! and returns [`RegistryError::PlacementConflict`].

use std::collections::BTreeSet;

use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::event::{Event, EventBus};
use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction, GridError, GridGeometry, WorldPos};
use crate::id::{ItemId, ItemKind};
use crate::item::Item;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("cell {cell:?} is already occupied by {occupant:?}")]
    PlacementConflict { cell: Cell, occupant: ItemId },
    #[error("cell {cell:?} is outside the grid")]
    OutOfBounds { cell: Cell },
    #[error("item {0:?} is not live")]
    UnknownItem(ItemId),
}

/// A broken registry invariant, found by [`ItemRegistry::verify_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("grid cell {cell:?} references dead item {item:?}")]
    DanglingSlot { cell: Cell, item: ItemId },
    #[error("grid cell {cell:?} references {item:?}, which believes it is at {actual:?}")]
    MisplacedSlot { cell: Cell, item: ItemId, actual: Cell },
    #[error("item {item:?} is referenced by more than one grid cell")]
    DuplicateSlot { item: ItemId },
    #[error("live item {item:?} is neither on the grid nor caught")]
    Orphaned { item: ItemId },
    #[error("live list and arena disagree ({live} live entries, {arena} items)")]
    LiveListMismatch { live: usize, arena: usize },
}

// ---------------------------------------------------------------------------
// ItemRegistry
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ItemRegistry {
    geometry: GridGeometry,
    items: SlotMap<ItemId, Item>,
    /// Live items in insertion order.
    live: Vec<ItemId>,
    /// Row-major occupancy grid.
    grid: Vec<Option<ItemId>>,
    ore_kinds: BTreeSet<ItemKind>,
    /// Item events, delivered by the simulation driver.
    pub events: EventBus,
}

impl ItemRegistry {
    pub fn new(geometry: GridGeometry) -> Self {
        Self::with_events(geometry, EventBus::default())
    }

    pub fn with_events(geometry: GridGeometry, events: EventBus) -> Self {
        Self {
            geometry,
            items: SlotMap::with_key(),
            live: Vec::new(),
            grid: vec![None; geometry.cell_count()],
            ore_kinds: BTreeSet::new(),
            events,
        }
    }

    /// Designate the kinds that count as raw ore.
    pub fn set_ore_kinds(&mut self, kinds: impl IntoIterator<Item = ItemKind>) {
        self.ore_kinds = kinds.into_iter().collect();
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    // -- Queries --

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    /// Mutable access for flags (`caught`, `visible`). The cell can only be
    /// changed through registry operations.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    /// The item occupying `cell`, if any. `None` outside the grid.
    pub fn item_at(&self, cell: Cell) -> Option<ItemId> {
        self.geometry.index(cell).and_then(|i| self.grid[i])
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.item_at(cell).is_some()
    }

    /// Live item ids in iteration (insertion) order.
    pub fn live_ids(&self) -> &[ItemId] {
        &self.live
    }

    /// Read-only iteration over live items in order, e.g. for rendering.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.live
            .iter()
            .filter_map(|&id| self.items.get(id).map(|item| (id, item)))
    }

    /// True if `cell` holds an item of a designated raw-ore kind.
    pub fn contains_ore_kind(&self, cell: Cell) -> bool {
        self.item_at(cell)
            .and_then(|id| self.items.get(id))
            .is_some_and(|item| self.ore_kinds.contains(&item.kind()))
    }

    // -- Mutations --

    /// Place a new item of `kind` at `cell`.
    pub fn add(&mut self, cell: Cell, kind: ItemKind) -> Result<ItemId, RegistryError> {
        let index = self.slot_index(cell)?;
        if let Some(occupant) = self.grid[index] {
            warn!(?cell, ?occupant, "rejected add onto occupied cell");
            return Err(RegistryError::PlacementConflict { cell, occupant });
        }

        let id = self.items.insert(Item::new(kind, cell, &self.geometry));
        self.grid[index] = Some(id);
        self.live.push(id);
        debug!(?id, ?kind, ?cell, "item added");
        self.events.emit(Event::ItemAdded { item: id, kind, cell });
        Ok(id)
    }

    /// Remove the item at `cell`, destroying it.
    ///
    /// An empty (or out-of-grid) cell is a no-op returning `None`. An item
    /// already missing from the live list is still cleared from the grid.
    /// `by_player` additionally emits [`Event::ItemPickedUp`].
    pub fn remove(&mut self, cell: Cell, by_player: bool) -> Option<Item> {
        let index = self.geometry.index(cell)?;
        let id = self.grid[index].take()?;

        if let Some(pos) = self.live.iter().position(|&live| live == id) {
            self.live.remove(pos);
        }
        let item = self.items.remove(id)?;
        let kind = item.kind();
        debug!(?id, ?cell, by_player, "item removed");
        self.events.emit(Event::ItemRemoved {
            item: id,
            kind,
            cell,
            by_player,
        });
        if by_player {
            self.events.emit(Event::ItemPickedUp { item: id, kind, cell });
        }
        Some(item)
    }

    /// Take the item at `cell` off the grid without destroying it.
    ///
    /// The item stays live; the caller must later [`drop`](Self::drop) it
    /// back or [`discard`](Self::discard) it. Empty cells return `None`.
    pub fn fetch(&mut self, cell: Cell) -> Option<ItemId> {
        let index = self.geometry.index(cell)?;
        let id = self.grid[index].take()?;
        debug!(?id, ?cell, "item fetched");
        self.events.emit(Event::ItemFetched { item: id, cell });
        Some(id)
    }

    /// Place a live item at the cell containing world position `(x, y)`.
    ///
    /// The item is re-centred on its new cell. If it still occupies a grid
    /// slot (it was never fetched), that slot is cleared, so dropping also
    /// relocates.
    pub fn drop(&mut self, id: ItemId, x: Fixed64, y: Fixed64) -> Result<Cell, RegistryError> {
        let cell = self.geometry.to_cell(WorldPos::new(x, y));
        let index = self.slot_index(cell)?;
        let previous = self
            .items
            .get(id)
            .map(Item::cell)
            .ok_or(RegistryError::UnknownItem(id))?;

        match self.grid[index] {
            Some(occupant) if occupant != id => {
                warn!(?cell, ?occupant, item = ?id, "rejected drop onto occupied cell");
                return Err(RegistryError::PlacementConflict { cell, occupant });
            }
            _ => {}
        }

        if let Some(prev_index) = self.geometry.index(previous) {
            if self.grid[prev_index] == Some(id) {
                self.grid[prev_index] = None;
            }
        }
        self.grid[index] = Some(id);
        if let Some(item) = self.items.get_mut(id) {
            item.place_at(cell, &self.geometry);
        }
        if !self.live.contains(&id) {
            self.live.push(id);
        }
        debug!(?id, ?cell, "item dropped");
        self.events.emit(Event::ItemDropped { item: id, cell });
        Ok(cell)
    }

    /// Destroy a live item wherever it is (on the grid or fetched).
    pub fn discard(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(id)?;
        if let Some(index) = self.geometry.index(item.cell()) {
            if self.grid[index] == Some(id) {
                self.grid[index] = None;
            }
        }
        self.live.retain(|&live| live != id);
        debug!(?id, "item discarded");
        self.events.emit(Event::ItemDiscarded {
            item: id,
            kind: item.kind(),
        });
        Some(item)
    }

    /// Re-derive every live item's position after a cell-length change.
    pub fn apply_zoom(&mut self) {
        let geometry = self.geometry;
        for item in self.items.values_mut() {
            item.recenter(&geometry);
        }
    }

    /// Change the cell length and re-derive all positions.
    pub fn set_cell_length(&mut self, cell_length: Fixed64) -> Result<(), GridError> {
        self.geometry.set_cell_length(cell_length)?;
        self.apply_zoom();
        Ok(())
    }

    /// Repair grid/list divergence.
    ///
    /// Mark phase: every live, non-caught item whose cell does not reference
    /// it is collected. Compact phase: the collected items are destroyed and
    /// the live list is rebuilt in its original order. Sweep phase: any grid
    /// slot still naming a destroyed item, or an item that sits elsewhere, is
    /// cleared. Returns the number of repairs; a second call returns 0.
    pub fn garbage_collect(&mut self) -> usize {
        let orphans: Vec<ItemId> = self
            .live
            .iter()
            .copied()
            .filter(|&id| match self.items.get(id) {
                Some(item) => !item.is_caught() && self.item_at(item.cell()) != Some(id),
                None => true,
            })
            .collect();

        for &id in &orphans {
            if let Some(item) = self.items.remove(id) {
                self.events.emit(Event::ItemCollected {
                    item: id,
                    cell: item.cell(),
                });
            }
        }
        if !orphans.is_empty() {
            let doomed: BTreeSet<ItemId> = orphans.iter().copied().collect();
            self.live.retain(|id| !doomed.contains(id));
        }

        // Runs after the compact phase so slots naming just-destroyed
        // orphans are swept too.
        let n = self.geometry.num_cells() as usize;
        let mut stale = 0;
        for (i, slot) in self.grid.iter_mut().enumerate() {
            let Some(id) = *slot else { continue };
            let cell = Cell::new((i / n) as i32, (i % n) as i32);
            let resident = self.items.get(id).is_some_and(|item| item.cell() == cell);
            if !resident {
                *slot = None;
                stale += 1;
            }
        }

        if orphans.is_empty() && stale == 0 {
            return 0;
        }
        warn!(
            orphans = orphans.len(),
            stale_slots = stale,
            "garbage collection repaired item bookkeeping"
        );
        orphans.len() + stale
    }

    /// Check every bookkeeping invariant, returning the first violation.
    ///
    /// Fetched items count as orphans here; use
    /// [`verify_occupancy`](Self::verify_occupancy) while items are
    /// legitimately detached.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let seen = self.verify_occupancy()?;
        for (id, item) in self.iter() {
            if !item.is_caught() && !seen.contains(&id) {
                return Err(InvariantViolation::Orphaned { item: id });
            }
        }
        Ok(())
    }

    /// Check the grid side only: the live list matches the arena and every
    /// occupied slot names a distinct item that believes it is there.
    /// Returns the set of items found on the grid.
    pub fn verify_occupancy(&self) -> Result<BTreeSet<ItemId>, InvariantViolation> {
        if self.live.len() != self.items.len() {
            return Err(InvariantViolation::LiveListMismatch {
                live: self.live.len(),
                arena: self.items.len(),
            });
        }

        let mut seen = BTreeSet::new();
        let n = self.geometry.num_cells() as usize;
        for (i, slot) in self.grid.iter().enumerate() {
            let Some(id) = *slot else { continue };
            let cell = Cell::new((i / n) as i32, (i % n) as i32);
            let item = self
                .items
                .get(id)
                .ok_or(InvariantViolation::DanglingSlot { cell, item: id })?;
            if item.cell() != cell {
                return Err(InvariantViolation::MisplacedSlot {
                    cell,
                    item: id,
                    actual: item.cell(),
                });
            }
            if !seen.insert(id) {
                return Err(InvariantViolation::DuplicateSlot { item: id });
            }
        }
        Ok(seen)
    }

    // -- Engine hooks --

    /// Advance a grid-resident item and commit any cell change atomically.
    /// Returns the new cell.
    pub(crate) fn advance_item(
        &mut self,
        id: ItemId,
        direction: Direction,
        distance: Fixed64,
    ) -> Option<Cell> {
        let geometry = self.geometry;
        let item = self.items.get_mut(id)?;
        let from = item.cell();
        item.advance(direction, distance, &geometry);
        let to = item.cell();

        if to != from {
            if let (Some(old), Some(new)) = (geometry.index(from), geometry.index(to)) {
                self.grid[old] = None;
                self.grid[new] = Some(id);
            }
            trace!(?id, ?from, ?to, "item crossed cell boundary");
            self.events.emit(Event::ItemMoved { item: id, from, to });
        }
        Some(to)
    }

    fn slot_index(&self, cell: Cell) -> Result<usize, RegistryError> {
        self.geometry
            .index(cell)
            .ok_or(RegistryError::OutOfBounds { cell })
    }

    /// Force a grid slot, bypassing every check. Only for tests that need to
    /// manufacture divergence.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn corrupt_slot(&mut self, cell: Cell, value: Option<ItemId>) {
        if let Some(i) = self.geometry.index(cell) {
            self.grid[i] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn registry() -> ItemRegistry {
        ItemRegistry::new(GridGeometry::new(10, Fixed64::from_num(32)).unwrap())
    }

    const IRON_ORE: ItemKind = ItemKind(1);
    const PLATE: ItemKind = ItemKind(5);

    // -----------------------------------------------------------------------
    // add / remove
    // -----------------------------------------------------------------------

    #[test]
    fn add_places_in_grid_and_live_list() {
        let mut reg = registry();
        let id = reg.add(Cell::new(2, 3), IRON_ORE).unwrap();
        assert_eq!(reg.item_at(Cell::new(2, 3)), Some(id));
        assert_eq!(reg.live_ids(), &[id]);
        assert_eq!(reg.item(id).unwrap().cell(), Cell::new(2, 3));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn add_to_occupied_cell_conflicts() {
        let mut reg = registry();
        let first = reg.add(Cell::new(1, 1), IRON_ORE).unwrap();
        let err = reg.add(Cell::new(1, 1), PLATE).unwrap_err();
        assert_eq!(
            err,
            RegistryError::PlacementConflict {
                cell: Cell::new(1, 1),
                occupant: first
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn add_out_of_bounds_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.add(Cell::new(10, 0), IRON_ORE),
            Err(RegistryError::OutOfBounds {
                cell: Cell::new(10, 0)
            })
        );
    }

    #[test]
    fn remove_empty_cell_is_noop() {
        let mut reg = registry();
        assert!(reg.remove(Cell::new(4, 4), false).is_none());
        assert!(reg.remove(Cell::new(-1, 4), true).is_none());
        assert_eq!(reg.events.pending_len(), 0);
    }

    #[test]
    fn remove_clears_grid_and_live_list() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), IRON_ORE).unwrap();
        let b = reg.add(Cell::new(0, 1), PLATE).unwrap();
        let removed = reg.remove(Cell::new(0, 0), false).unwrap();
        assert_eq!(removed.kind(), IRON_ORE);
        assert!(!reg.is_occupied(Cell::new(0, 0)));
        assert_eq!(reg.live_ids(), &[b]);
        assert!(reg.item(a).is_none());
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn player_removal_emits_pickup_cue() {
        let mut reg = registry();
        reg.add(Cell::new(3, 3), IRON_ORE).unwrap();
        reg.events.drain();

        reg.remove(Cell::new(3, 3), true);
        let kinds: Vec<EventKind> = reg.events.pending().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::ItemRemoved, EventKind::ItemPickedUp]);
    }

    #[test]
    fn non_player_removal_has_no_pickup_cue() {
        let mut reg = registry();
        reg.add(Cell::new(3, 3), IRON_ORE).unwrap();
        reg.events.drain();

        reg.remove(Cell::new(3, 3), false);
        let kinds: Vec<EventKind> = reg.events.pending().map(Event::kind).collect();
        assert_eq!(kinds, vec![EventKind::ItemRemoved]);
    }

    // -----------------------------------------------------------------------
    // fetch / drop / discard
    // -----------------------------------------------------------------------

    #[test]
    fn fetch_clears_slot_but_keeps_item_live() {
        let mut reg = registry();
        let id = reg.add(Cell::new(5, 5), PLATE).unwrap();
        assert_eq!(reg.fetch(Cell::new(5, 5)), Some(id));
        assert!(!reg.is_occupied(Cell::new(5, 5)));
        assert_eq!(reg.live_ids(), &[id]);
        assert!(reg.item(id).is_some());
    }

    #[test]
    fn fetch_empty_returns_none() {
        let mut reg = registry();
        assert_eq!(reg.fetch(Cell::new(5, 5)), None);
    }

    #[test]
    fn drop_reattaches_at_world_position() {
        let mut reg = registry();
        let id = reg.add(Cell::new(5, 5), PLATE).unwrap();
        reg.fetch(Cell::new(5, 5));

        // (x=70, y=100) lies in row 3, col 2.
        let cell = reg
            .drop(id, Fixed64::from_num(70), Fixed64::from_num(100))
            .unwrap();
        assert_eq!(cell, Cell::new(3, 2));
        assert_eq!(reg.item_at(cell), Some(id));
        let item = reg.item(id).unwrap();
        assert_eq!(item.cell(), cell);
        assert_eq!(item.position(), reg.geometry().to_world(cell));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn drop_onto_occupied_conflicts() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        let b = reg.add(Cell::new(0, 1), PLATE).unwrap();
        reg.fetch(Cell::new(0, 0));

        let pos = reg.geometry().to_world(Cell::new(0, 1));
        assert_eq!(
            reg.drop(a, pos.x, pos.y),
            Err(RegistryError::PlacementConflict {
                cell: Cell::new(0, 1),
                occupant: b
            })
        );
    }

    #[test]
    fn drop_unknown_item_rejected() {
        let mut reg = registry();
        let id = reg.add(Cell::new(0, 0), PLATE).unwrap();
        reg.remove(Cell::new(0, 0), false);
        assert_eq!(
            reg.drop(id, Fixed64::from_num(16), Fixed64::from_num(16)),
            Err(RegistryError::UnknownItem(id))
        );
    }

    #[test]
    fn drop_outside_grid_rejected() {
        let mut reg = registry();
        let id = reg.add(Cell::new(0, 0), PLATE).unwrap();
        reg.fetch(Cell::new(0, 0));
        assert!(matches!(
            reg.drop(id, Fixed64::from_num(-5), Fixed64::from_num(16)),
            Err(RegistryError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn drop_without_fetch_relocates() {
        let mut reg = registry();
        let id = reg.add(Cell::new(1, 1), PLATE).unwrap();
        let pos = reg.geometry().to_world(Cell::new(4, 4));
        reg.drop(id, pos.x, pos.y).unwrap();
        assert!(!reg.is_occupied(Cell::new(1, 1)));
        assert_eq!(reg.item_at(Cell::new(4, 4)), Some(id));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn discard_destroys_fetched_item() {
        let mut reg = registry();
        let id = reg.add(Cell::new(1, 1), PLATE).unwrap();
        reg.fetch(Cell::new(1, 1));
        assert!(reg.discard(id).is_some());
        assert!(reg.is_empty());
        assert!(reg.discard(id).is_none());
        reg.verify_invariants().unwrap();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn contains_ore_kind_checks_designated_set() {
        let mut reg = registry();
        reg.set_ore_kinds([IRON_ORE]);
        reg.add(Cell::new(0, 0), IRON_ORE).unwrap();
        reg.add(Cell::new(0, 1), PLATE).unwrap();

        assert!(reg.contains_ore_kind(Cell::new(0, 0)));
        assert!(!reg.contains_ore_kind(Cell::new(0, 1)));
        assert!(!reg.contains_ore_kind(Cell::new(0, 2)));
        assert!(!reg.contains_ore_kind(Cell::new(50, 50)));
    }

    #[test]
    fn iter_preserves_insertion_order_across_removal() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        let _b = reg.add(Cell::new(0, 1), PLATE).unwrap();
        let c = reg.add(Cell::new(0, 2), PLATE).unwrap();
        let d = reg.add(Cell::new(0, 3), PLATE).unwrap();
        reg.remove(Cell::new(0, 1), false);

        let order: Vec<ItemId> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, c, d]);
    }

    // -----------------------------------------------------------------------
    // Zoom
    // -----------------------------------------------------------------------

    #[test]
    fn set_cell_length_rederives_positions() {
        let mut reg = registry();
        let id = reg.add(Cell::new(2, 7), PLATE).unwrap();
        reg.set_cell_length(Fixed64::from_num(20)).unwrap();

        let item = reg.item(id).unwrap();
        assert_eq!(item.cell(), Cell::new(2, 7));
        assert_eq!(item.position().x, Fixed64::from_num(7 * 20 + 10));
        assert_eq!(item.position().y, Fixed64::from_num(2 * 20 + 10));
    }

    #[test]
    fn invalid_cell_length_leaves_positions() {
        let mut reg = registry();
        let id = reg.add(Cell::new(1, 1), PLATE).unwrap();
        let before = reg.item(id).unwrap().position();
        assert!(reg.set_cell_length(Fixed64::ZERO).is_err());
        assert_eq!(reg.item(id).unwrap().position(), before);
    }

    // -----------------------------------------------------------------------
    // Garbage collection
    // -----------------------------------------------------------------------

    #[test]
    fn gc_removes_fetched_uncaught_items() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        let b = reg.add(Cell::new(0, 1), PLATE).unwrap();
        reg.fetch(Cell::new(0, 0));

        assert_eq!(reg.garbage_collect(), 1);
        assert_eq!(reg.live_ids(), &[b]);
        assert!(reg.item(a).is_none());
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn gc_spares_caught_items() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        reg.fetch(Cell::new(0, 0));
        reg.item_mut(a).unwrap().set_caught(true);

        assert_eq!(reg.garbage_collect(), 0);
        assert_eq!(reg.live_ids(), &[a]);
    }

    #[test]
    fn gc_clears_dangling_slots() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        reg.remove(Cell::new(0, 0), false);
        reg.corrupt_slot(Cell::new(6, 6), Some(a));
        assert!(reg.verify_invariants().is_err());

        assert_eq!(reg.garbage_collect(), 1);
        assert!(!reg.is_occupied(Cell::new(6, 6)));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn gc_sweeps_slots_naming_collected_orphans() {
        let mut reg = registry();
        let a = reg.add(Cell::new(1, 1), PLATE).unwrap();
        // a's own slot is empty, but a foreign slot still names it.
        reg.corrupt_slot(Cell::new(1, 1), None);
        reg.corrupt_slot(Cell::new(4, 4), Some(a));

        assert_eq!(reg.garbage_collect(), 2);
        assert!(reg.item(a).is_none());
        assert!(!reg.is_occupied(Cell::new(4, 4)));
        reg.verify_invariants().unwrap();
        assert_eq!(reg.garbage_collect(), 0);
    }

    #[test]
    fn gc_clears_misplaced_slots() {
        let mut reg = registry();
        let a = reg.add(Cell::new(2, 2), PLATE).unwrap();
        reg.corrupt_slot(Cell::new(7, 7), Some(a));
        assert!(reg.verify_invariants().is_err());

        assert_eq!(reg.garbage_collect(), 1);
        assert_eq!(reg.item_at(Cell::new(2, 2)), Some(a));
        assert!(!reg.is_occupied(Cell::new(7, 7)));
        reg.verify_invariants().unwrap();
    }

    #[test]
    fn gc_is_idempotent() {
        let mut reg = registry();
        for col in 0..5 {
            reg.add(Cell::new(1, col), PLATE).unwrap();
        }
        reg.fetch(Cell::new(1, 1));
        reg.fetch(Cell::new(1, 3));

        reg.garbage_collect();
        let once: Vec<ItemId> = reg.live_ids().to_vec();
        assert_eq!(reg.garbage_collect(), 0);
        assert_eq!(reg.live_ids(), once.as_slice());
    }

    #[test]
    fn verify_detects_orphan() {
        let mut reg = registry();
        let a = reg.add(Cell::new(0, 0), PLATE).unwrap();
        reg.fetch(Cell::new(0, 0));
        assert_eq!(
            reg.verify_invariants(),
            Err(InvariantViolation::Orphaned { item: a })
        );
    }
}
