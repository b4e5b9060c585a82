//! Simulation settings.
//!
//! Plain `f64` values keep the config human-editable; they are converted to
//! [`Fixed64`] exactly once, when the simulation is built.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, f64_to_fixed64, fixed64_to_f64};
use crate::grid::{GridError, GridGeometry};
use crate::id::ItemKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("num_cells must be at least 1")]
    NoCells,
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("conveyor_speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f64),
    #[error("cell_length {cell_length} is outside the zoom range [{min}, {max}]")]
    OutsideZoomRange { cell_length: f64, min: f64, max: f64 },
    #[error("{num_cells} cells at the maximum cell length {max_cell_length} exceed the world coordinate range")]
    WorldTooLarge { num_cells: u32, max_cell_length: f64 },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Settings for a [`Simulation`](crate::sim::Simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cells per side of the square grid.
    pub num_cells: u32,
    /// Initial side length of one cell in world units.
    pub cell_length: f64,
    /// Item travel speed on transport structures, world units per second.
    pub conveyor_speed: f64,
    pub min_cell_length: f64,
    pub max_cell_length: f64,
    /// Cell-length change per zoom step.
    pub zoom_step: f64,
    /// Ring-buffer capacity for pending item events.
    pub event_capacity: usize,
    /// Kinds that count as raw ore.
    pub ore_kinds: Vec<ItemKind>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_cells: 64,
            cell_length: 32.0,
            conveyor_speed: 64.0,
            min_cell_length: 8.0,
            max_cell_length: 128.0,
            zoom_step: 5.0,
            event_capacity: 1024,
            ore_kinds: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_cells == 0 {
            return Err(ConfigError::NoCells);
        }
        for (field, value) in [
            ("cell_length", self.cell_length),
            ("min_cell_length", self.min_cell_length),
            ("max_cell_length", self.max_cell_length),
            ("zoom_step", self.zoom_step),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !self.conveyor_speed.is_finite() || self.conveyor_speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.conveyor_speed));
        }
        if self.cell_length < self.min_cell_length || self.cell_length > self.max_cell_length {
            return Err(ConfigError::OutsideZoomRange {
                cell_length: self.cell_length,
                min: self.min_cell_length,
                max: self.max_cell_length,
            });
        }
        // Zooming out to the maximum must keep every position representable,
        // with one cell of headroom past the far edge.
        let extent = (f64::from(self.num_cells) + 1.0) * self.max_cell_length;
        if extent >= fixed64_to_f64(Fixed64::MAX) {
            return Err(ConfigError::WorldTooLarge {
                num_cells: self.num_cells,
                max_cell_length: self.max_cell_length,
            });
        }
        Ok(())
    }

    /// Validated grid geometry.
    pub fn geometry(&self) -> Result<GridGeometry, ConfigError> {
        self.validate()?;
        Ok(GridGeometry::new(
            self.num_cells,
            f64_to_fixed64(self.cell_length),
        )?)
    }

    pub fn speed(&self) -> Fixed64 {
        f64_to_fixed64(self.conveyor_speed)
    }
}
