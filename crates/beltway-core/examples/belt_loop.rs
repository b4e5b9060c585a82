//! Belt loop example: a custom structure layer driving the transport pass.
//!
//! Implements `StructureLayer` for a single rectangular conveyor loop,
//! drops a few items on it and runs the simulation headless, logging item
//! moves through a passive listener.
//!
//! Run with: `RUST_LOG=debug cargo run -p beltway-core --example belt_loop`

use beltway_core::config::SimConfig;
use beltway_core::event::Event;
use beltway_core::grid::{Cell, Direction};
use beltway_core::id::ItemKind;
use beltway_core::sim::Simulation;
use beltway_core::structure::{StructureKind, StructureLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A clockwise loop whose corners are `top_left` and `bottom_right`.
struct RectLoop {
    top_left: Cell,
    bottom_right: Cell,
}

impl RectLoop {
    fn facing(&self, cell: Cell) -> Option<Direction> {
        let (t, l) = (self.top_left.row, self.top_left.col);
        let (b, r) = (self.bottom_right.row, self.bottom_right.col);
        if cell.row == t && (l..r).contains(&cell.col) {
            Some(Direction::Right)
        } else if cell.col == r && (t..b).contains(&cell.row) {
            Some(Direction::Down)
        } else if cell.row == b && (l + 1..=r).contains(&cell.col) {
            Some(Direction::Left)
        } else if cell.col == l && (t + 1..=b).contains(&cell.row) {
            Some(Direction::Up)
        } else {
            None
        }
    }
}

impl StructureLayer for RectLoop {
    fn kind_at(&self, cell: Cell) -> StructureKind {
        match self.facing(cell) {
            Some(_) => StructureKind::Conveyor,
            None => StructureKind::Empty,
        }
    }

    fn facing_direction(&self, cell: Cell) -> Option<Direction> {
        self.facing(cell)
    }

    fn accepts_transfer(&self, cell: Cell) -> bool {
        self.facing(cell).is_some()
    }

    fn placement_legal(&self, _cell: Cell) -> bool {
        true
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let layer = RectLoop {
        top_left: Cell::new(2, 2),
        bottom_right: Cell::new(6, 9),
    };
    let config = SimConfig {
        num_cells: 12,
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config, layer)?;

    sim.subscribe(Box::new(|event| {
        if let Event::ItemMoved { item, from, to } = event {
            info!(?item, ?from, ?to, "moved");
        }
    }));

    for (i, col) in [2, 4, 6].into_iter().enumerate() {
        sim.add_item(Cell::new(2, col), ItemKind(i as u32))?;
    }

    // Two simulated seconds at 30 ticks per second.
    for _ in 0..60 {
        sim.update_tick(1.0 / 30.0);
    }

    let report = sim.last_report();
    info!(
        tick = sim.tick(),
        elapsed = sim.elapsed_secs(),
        advanced = report.advanced,
        blocked = report.blocked,
        hash = sim.state_hash(),
        "run finished"
    );
    for (id, item) in sim.items.iter() {
        println!("{id:?}: kind {} at {:?}", item.kind().0, item.cell());
    }
    Ok(())
}
