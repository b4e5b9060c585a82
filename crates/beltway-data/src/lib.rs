pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Scenario, build_scenario, load_scenario};
