//! The simulation driver.
//!
//! [`Simulation`] owns the item registry and a structure layer and runs one
//! tick per [`Simulation::update_tick`] call:
//!
//! 1. **Structures** -- the layer's `update` hook (undergrounds carry
//!    cargo, splitters pick branches).
//! 2. **Transport** -- every live item is advanced once.
//! 3. **Events** -- buffered item events are delivered to listeners.
//! 4. **Bookkeeping** -- tick counter and simulated time.

use slotmap::Key;
use tracing::{info, warn};

use crate::config::{ConfigError, SimConfig};
use crate::event::{EventBus, PassiveListener};
use crate::fixed::{Fixed64, Ticks, f64_to_fixed64, fixed64_to_f64};
use crate::grid::Cell;
use crate::id::{ItemId, ItemKind};
use crate::item::Item;
use crate::registry::{ItemRegistry, RegistryError};
use crate::structure::StructureLayer;
use crate::transport::{self, TickReport};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Incremented by 1 for each tick.
    pub tick: Ticks,
    /// Total simulated time in seconds.
    pub elapsed: Fixed64,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a grid cell into the hash, row first.
    pub fn write_cell(&mut self, cell: Cell) {
        self.write(&cell.row.to_le_bytes());
        self.write(&cell.col.to_le_bytes());
    }

    /// Feed a Fixed64 into the hash.
    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Simulation<S: StructureLayer> {
    pub items: ItemRegistry,
    pub structures: S,
    config: SimConfig,
    speed: Fixed64,
    pub sim_state: SimState,
    last_report: TickReport,
}

impl<S: StructureLayer> Simulation<S> {
    pub fn new(config: SimConfig, structures: S) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let mut items =
            ItemRegistry::with_events(geometry, EventBus::new(config.event_capacity));
        items.set_ore_kinds(config.ore_kinds.iter().copied());
        info!(
            num_cells = config.num_cells,
            cell_length = config.cell_length,
            conveyor_speed = config.conveyor_speed,
            "simulation created"
        );
        Ok(Self {
            items,
            structures,
            speed: config.speed(),
            config,
            sim_state: SimState::default(),
            last_report: TickReport::default(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn last_report(&self) -> TickReport {
        self.last_report
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Advance by one tick of `elapsed_secs` wall-clock seconds.
    ///
    /// Negative or non-finite deltas count as zero elapsed time.
    pub fn update_tick(&mut self, elapsed_secs: f64) -> TickReport {
        let elapsed = if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
            f64_to_fixed64(elapsed_secs)
        } else {
            Fixed64::ZERO
        };
        self.step(elapsed)
    }

    /// Advance by one tick of `elapsed` seconds in fixed-point.
    pub fn step(&mut self, elapsed: Fixed64) -> TickReport {
        let travel = self.speed.saturating_mul(elapsed.max(Fixed64::ZERO));

        self.structures.update(&mut self.items, travel);
        let report = transport::update_tick(&mut self.items, &self.structures, travel);
        self.items.events.deliver();

        self.sim_state.tick += 1;
        self.sim_state.elapsed = self.sim_state.elapsed.saturating_add(elapsed);
        self.last_report = report;
        report
    }

    // -----------------------------------------------------------------------
    // Item operations
    // -----------------------------------------------------------------------

    pub fn add_item(&mut self, cell: Cell, kind: ItemKind) -> Result<ItemId, RegistryError> {
        let result = self.items.add(cell, kind);
        self.items.events.deliver();
        result
    }

    pub fn remove_item(&mut self, cell: Cell, by_player: bool) -> Option<Item> {
        let removed = self.items.remove(cell, by_player);
        self.items.events.deliver();
        removed
    }

    pub fn fetch_item(&mut self, cell: Cell) -> Option<ItemId> {
        let fetched = self.items.fetch(cell);
        self.items.events.deliver();
        fetched
    }

    /// Drop a fetched item at world coordinates `(x, y)`.
    pub fn drop_item(&mut self, item: ItemId, x: f64, y: f64) -> Result<Cell, RegistryError> {
        let result = self
            .items
            .drop(item, f64_to_fixed64(x), f64_to_fixed64(y));
        self.items.events.deliver();
        result
    }

    pub fn garbage_collect(&mut self) -> usize {
        let repaired = self.items.garbage_collect();
        self.items.events.deliver();
        repaired
    }

    pub fn subscribe(&mut self, listener: PassiveListener) {
        self.items.events.subscribe(listener);
    }

    // -----------------------------------------------------------------------
    // Zoom
    // -----------------------------------------------------------------------

    /// Re-derive every item's position from its cell.
    pub fn apply_zoom(&mut self) {
        self.items.apply_zoom();
    }

    /// Set the cell length (within the configured zoom range) and re-derive
    /// positions.
    pub fn set_cell_length(&mut self, cell_length: f64) -> Result<(), ConfigError> {
        let (min, max) = (self.config.min_cell_length, self.config.max_cell_length);
        if !cell_length.is_finite() || cell_length < min || cell_length > max {
            return Err(ConfigError::OutsideZoomRange {
                cell_length,
                min,
                max,
            });
        }
        self.items.set_cell_length(f64_to_fixed64(cell_length))?;
        self.config.cell_length = cell_length;
        info!(cell_length, "zoom applied");
        Ok(())
    }

    /// Grow the cell length by one zoom step, clamped to the maximum.
    /// Returns the new cell length.
    pub fn zoom_in(&mut self) -> f64 {
        self.zoom_by(self.config.zoom_step)
    }

    /// Shrink the cell length by one zoom step, clamped to the minimum.
    pub fn zoom_out(&mut self) -> f64 {
        self.zoom_by(-self.config.zoom_step)
    }

    fn zoom_by(&mut self, delta: f64) -> f64 {
        let target = (self.config.cell_length + delta)
            .clamp(self.config.min_cell_length, self.config.max_cell_length);
        if target != self.config.cell_length {
            if let Err(e) = self.set_cell_length(target) {
                warn!(target, error = %e, "zoom step rejected");
            }
        }
        self.config.cell_length
    }

    // -----------------------------------------------------------------------
    // Determinism
    // -----------------------------------------------------------------------

    /// Hash of the tick counter and every live item, in registry order.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);
        for (id, item) in self.items.iter() {
            h.write_u64(id.data().as_ffi());
            h.write_u32(item.kind().0);
            h.write_cell(item.cell());
            h.write_fixed64(item.position().x);
            h.write_fixed64(item.position().y);
            h.write(&[item.is_caught() as u8, item.is_visible() as u8]);
        }
        h.finish()
    }

    /// Simulated time in seconds, for display.
    pub fn elapsed_secs(&self) -> f64 {
        fixed64_to_f64(self.sim_state.elapsed)
    }
}
