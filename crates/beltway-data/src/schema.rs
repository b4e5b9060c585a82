//! Serde structs for scenario files.
//!
//! A scenario names its item kinds, lays out structures and seeds initial
//! items. It is deserialized from RON, JSON or TOML and then resolved into
//! engine types by the loader.

use beltway_core::config::SimConfig;
use beltway_core::grid::{Cell, Direction};
use serde::Deserialize;

/// Top-level scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioData {
    #[serde(default)]
    pub name: Option<String>,
    /// Simulation settings. Omitted fields take their defaults; `ore_kinds`
    /// is filled from the `ore` flags below.
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub kinds: Vec<KindData>,
    #[serde(default)]
    pub structures: Vec<StructureData>,
    #[serde(default)]
    pub items: Vec<ItemData>,
}

/// An item kind definition.
#[derive(Debug, Clone, Deserialize)]
pub struct KindData {
    pub name: String,
    #[serde(default)]
    pub ore: bool,
}

/// A structure placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureData {
    Conveyor {
        cell: Cell,
        facing: Direction,
    },
    /// A straight run of `length` conveyors starting at `cell`.
    ConveyorLine {
        cell: Cell,
        facing: Direction,
        length: u32,
    },
    Underground {
        cell: Cell,
        facing: Direction,
        span: u32,
    },
    Splitter {
        cell: Cell,
        facing: Direction,
        /// Branch order; defaults to left then right of `facing`.
        #[serde(default)]
        outputs: Option<Vec<Direction>>,
    },
    Other {
        cell: Cell,
        #[serde(default)]
        accepts_items: bool,
    },
}

/// An item present when the scenario starts.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub kind: String,
    pub cell: Cell,
}
