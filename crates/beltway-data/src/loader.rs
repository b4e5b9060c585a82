//! Resolution pipeline: reads a scenario file, resolves kind names, builds a
//! ready-to-run simulation.
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers used
//! by [`load_scenario`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use beltway_core::catalog::{CatalogError, KindCatalog, KindCatalogBuilder};
use beltway_core::config::ConfigError;
use beltway_core::id::ItemKind;
use beltway_core::registry::RegistryError;
use beltway_core::sim::Simulation;
use beltway_structures::{StructureError, StructureGrid};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::schema::{ScenarioData, StructureData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during scenario loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The extension is not `.ron`, `.json` or `.toml`.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// The file could not be deserialized.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A kind name in the scenario is not defined.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A kind definition was rejected by the catalog.
    #[error("bad item kind in {file}: {source}")]
    Catalog {
        file: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error("invalid sim settings in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("structure #{index} in {file}: {source}")]
    Structure {
        file: PathBuf,
        index: usize,
        #[source]
        source: StructureError,
    },

    #[error("item #{index} in {file}: {source}")]
    Item {
        file: PathBuf,
        index: usize,
        #[source]
        source: RegistryError,
    },

    /// Reading the file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Scenario file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Pick the format from a file's extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `origin` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read and deserialize a scenario file in whatever format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Resolution
// ===========================================================================

/// A loaded scenario: the kind catalog and a simulation with every
/// structure and initial item in place.
#[derive(Debug)]
pub struct Scenario {
    pub name: Option<String>,
    pub catalog: KindCatalog,
    pub sim: Simulation<StructureGrid>,
}

impl Scenario {
    /// Look up a kind by name.
    pub fn kind(&self, name: &str) -> Option<ItemKind> {
        self.catalog.kind_id(name)
    }
}

/// Load a scenario file (`.ron`, `.toml` or `.json`).
pub fn load_scenario(path: &Path) -> Result<Scenario, DataLoadError> {
    let data: ScenarioData = deserialize_file(path)?;
    build_scenario(data, path)
}

/// Resolve parsed scenario data. `origin` labels errors.
pub fn build_scenario(data: ScenarioData, origin: &Path) -> Result<Scenario, DataLoadError> {
    let file = || origin.to_path_buf();

    // -- Kinds --
    let mut builder = KindCatalogBuilder::new();
    for kind in &data.kinds {
        builder
            .register(&kind.name, kind.ore)
            .map_err(|source| DataLoadError::Catalog {
                file: file(),
                source,
            })?;
    }
    let catalog = builder.build();
    let names: HashMap<&str, ItemKind> = data
        .kinds
        .iter()
        .filter_map(|k| catalog.kind_id(&k.name).map(|id| (k.name.as_str(), id)))
        .collect();

    // -- Structures --
    let mut structures = StructureGrid::new(data.sim.num_cells);
    for (index, placement) in data.structures.iter().enumerate() {
        place(&mut structures, placement).map_err(|source| DataLoadError::Structure {
            file: file(),
            index,
            source,
        })?;
    }

    // -- Simulation --
    let mut config = data.sim;
    config.ore_kinds = catalog.ore_kinds().into_iter().collect();
    let mut sim = Simulation::new(config, structures).map_err(|source| DataLoadError::Config {
        file: file(),
        source,
    })?;

    // -- Items --
    for (index, item) in data.items.iter().enumerate() {
        let kind = resolve_name(&names, &item.kind, origin, "item kind")?;
        sim.add_item(item.cell, kind)
            .map_err(|source| DataLoadError::Item {
                file: file(),
                index,
                source,
            })?;
    }

    info!(
        file = %origin.display(),
        kinds = catalog.len(),
        structures = sim.structures.len(),
        items = sim.items.len(),
        "scenario loaded"
    );
    Ok(Scenario {
        name: data.name,
        catalog,
        sim,
    })
}

fn place(grid: &mut StructureGrid, placement: &StructureData) -> Result<(), StructureError> {
    debug!(?placement, "placing structure");
    match placement {
        StructureData::Conveyor { cell, facing } => {
            grid.place_conveyor(*cell, *facing)?;
        }
        StructureData::ConveyorLine {
            cell,
            facing,
            length,
        } => {
            grid.place_conveyor_line(*cell, *facing, *length)?;
        }
        StructureData::Underground { cell, facing, span } => {
            grid.place_underground(*cell, *facing, *span)?;
        }
        StructureData::Splitter {
            cell,
            facing,
            outputs: Some(outputs),
        } => {
            grid.place_splitter_with_outputs(*cell, *facing, outputs.clone())?;
        }
        StructureData::Splitter {
            cell,
            facing,
            outputs: None,
        } => {
            grid.place_splitter(*cell, *facing)?;
        }
        StructureData::Other {
            cell,
            accepts_items,
        } => {
            grid.place_other(*cell, *accepts_items)?;
        }
    }
    Ok(())
}

/// Look up a name, returning an `UnresolvedRef` error if not found.
pub fn resolve_name(
    map: &HashMap<&str, ItemKind>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<ItemKind, DataLoadError> {
    map.get(name)
        .copied()
        .ok_or_else(|| DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        })
}

// ===========================================================================
// Tests
// ===========================================================================
