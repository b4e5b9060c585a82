//! Beltway Core -- grid transport simulation for factory-building games.
//!
//! Items occupy cells of a square grid and are pushed, one tick at a time,
//! along conveyors, underground conveyors and splitters. At most one item
//! ever occupies a cell; the [`registry::ItemRegistry`] owns that
//! bookkeeping and the [`transport`] pass moves items through it.
//!
//! # Tick Pipeline
//!
//! Each call to [`sim::Simulation::update_tick`] runs:
//!
//! 1. **Structures** -- the structure layer's `update` hook.
//! 2. **Transport** -- each live item, in registry order, advances one step
//!    toward the single cell its structure faces, if that cell is free and
//!    legal. Moves are committed immediately.
//! 3. **Events** -- buffered item events go to listeners.
//! 4. **Bookkeeping** -- tick counter and simulated time.
//!
//! # Key Types
//!
//! - [`grid::GridGeometry`] -- cell <-> world coordinate conversion.
//! - [`item::Item`] -- a movable unit with position, cell and flags.
//! - [`registry::ItemRegistry`] -- occupancy grid plus ordered live items.
//! - [`structure::StructureLayer`] -- capability contract of the structure grid.
//! - [`transport::update_tick`] -- the per-tick movement pass.
//! - [`sim::Simulation`] -- driver tying the pieces together.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod catalog;
pub mod config;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod item;
pub mod registry;
pub mod sim;
pub mod structure;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
