//! Splitters: single-cell structures that divert items round-robin across
//! an ordered list of output branches.

use beltway_core::grid::{Cell, Direction};
use beltway_core::id::ItemId;
use serde::{Deserialize, Serialize};

use crate::StructureError;

/// A splitter occupying one cell.
///
/// Items enter from behind (`facing.opposite()`) and leave through one of
/// `outputs`. The branch for the item currently resting on the splitter is
/// chosen when it arrives and kept until that branch is blocked, at which
/// point the next open branch is tried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splitter {
    cell: Cell,
    facing: Direction,
    outputs: Vec<Direction>,
    /// Index into `outputs` where the next round-robin search starts.
    next: usize,
    chosen: Option<Direction>,
    occupant: Option<ItemId>,
}

impl Splitter {
    /// A splitter feeding the branches left and right of `facing`.
    pub fn new(cell: Cell, facing: Direction) -> Self {
        Self {
            cell,
            facing,
            outputs: default_outputs(facing),
            next: 0,
            chosen: None,
            occupant: None,
        }
    }

    /// A splitter with an explicit branch order.
    ///
    /// Branches must be non-empty, distinct, and must not point back at the
    /// input side.
    pub fn with_outputs(
        cell: Cell,
        facing: Direction,
        outputs: Vec<Direction>,
    ) -> Result<Self, StructureError> {
        validate_outputs(cell, facing, &outputs)?;
        Ok(Self {
            outputs,
            ..Self::new(cell, facing)
        })
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn outputs(&self) -> &[Direction] {
        &self.outputs
    }

    /// Branch chosen for the current occupant, if one is open.
    pub fn chosen(&self) -> Option<Direction> {
        self.chosen
    }

    /// Re-point the splitter. Branches reset to the sides of the new facing.
    pub fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
        self.outputs = default_outputs(facing);
        self.next = 0;
        self.chosen = None;
    }

    /// Choose a branch for `occupant`.
    ///
    /// `open[i]` says whether `outputs[i]` currently leads to a free, legal
    /// cell. A new occupant always gets a fresh round-robin pick; the same
    /// occupant keeps its branch while that branch stays open.
    pub(crate) fn route(&mut self, occupant: Option<ItemId>, open: &[bool]) {
        let Some(item) = occupant else {
            self.occupant = None;
            self.chosen = None;
            return;
        };
        if self.occupant != Some(item) {
            self.occupant = Some(item);
            self.chosen = None;
        }

        if let Some(current) = self.chosen {
            let still_open = self
                .outputs
                .iter()
                .position(|&d| d == current)
                .is_some_and(|i| open.get(i).copied().unwrap_or(false));
            if still_open {
                return;
            }
        }

        let n = self.outputs.len();
        self.chosen = None;
        for k in 0..n {
            let i = (self.next + k) % n;
            if open.get(i).copied().unwrap_or(false) {
                self.chosen = Some(self.outputs[i]);
                self.next = (i + 1) % n;
                break;
            }
        }
    }
}

fn default_outputs(facing: Direction) -> Vec<Direction> {
    vec![facing.rotate_ccw(), facing.rotate_cw()]
}

fn validate_outputs(
    cell: Cell,
    facing: Direction,
    outputs: &[Direction],
) -> Result<(), StructureError> {
    if outputs.is_empty() {
        return Err(StructureError::InvalidOutputs {
            cell,
            reason: "no output branches",
        });
    }
    if outputs.contains(&facing.opposite()) {
        return Err(StructureError::InvalidOutputs {
            cell,
            reason: "output points back at the input side",
        });
    }
    for (i, d) in outputs.iter().enumerate() {
        if outputs[..i].contains(d) {
            return Err(StructureError::InvalidOutputs {
                cell,
                reason: "duplicate output branch",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ItemId> {
        let mut arena: SlotMap<ItemId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn default_branches_are_the_sides() {
        let s = Splitter::new(Cell::new(0, 0), Direction::Right);
        assert_eq!(s.outputs(), &[Direction::Up, Direction::Down]);
    }

    #[test]
    fn alternates_between_arrivals() {
        let items = ids(4);
        let mut s = Splitter::new(Cell::new(0, 0), Direction::Down);
        let mut picks = Vec::new();
        for &item in &items {
            s.route(Some(item), &[true, true]);
            picks.push(s.chosen());
        }
        assert_eq!(
            picks,
            vec![
                Some(Direction::Right),
                Some(Direction::Left),
                Some(Direction::Right),
                Some(Direction::Left)
            ]
        );
    }

    #[test]
    fn same_occupant_keeps_branch() {
        let items = ids(1);
        let mut s = Splitter::new(Cell::new(0, 0), Direction::Down);
        s.route(Some(items[0]), &[true, true]);
        let first = s.chosen();
        s.route(Some(items[0]), &[true, true]);
        assert_eq!(s.chosen(), first);
    }

    #[test]
    fn blocked_branch_falls_over() {
        let items = ids(1);
        let mut s = Splitter::new(Cell::new(0, 0), Direction::Down);
        s.route(Some(items[0]), &[true, true]);
        assert_eq!(s.chosen(), Some(Direction::Right));

        s.route(Some(items[0]), &[false, true]);
        assert_eq!(s.chosen(), Some(Direction::Left));
    }

    #[test]
    fn all_blocked_chooses_nothing() {
        let items = ids(1);
        let mut s = Splitter::new(Cell::new(0, 0), Direction::Down);
        s.route(Some(items[0]), &[false, false]);
        assert_eq!(s.chosen(), None);

        s.route(None, &[true, true]);
        assert_eq!(s.chosen(), None);
    }

    #[test]
    fn output_validation() {
        let cell = Cell::new(1, 1);
        assert!(Splitter::with_outputs(cell, Direction::Up, vec![]).is_err());
        assert!(Splitter::with_outputs(cell, Direction::Up, vec![Direction::Down]).is_err());
        assert!(
            Splitter::with_outputs(cell, Direction::Up, vec![Direction::Left, Direction::Left])
                .is_err()
        );
        let s = Splitter::with_outputs(
            cell,
            Direction::Up,
            vec![Direction::Up, Direction::Left, Direction::Right],
        )
        .unwrap();
        assert_eq!(s.outputs().len(), 3);
    }

    #[test]
    fn set_facing_resets_branches() {
        let mut s = Splitter::with_outputs(Cell::new(0, 0), Direction::Up, vec![Direction::Up])
            .unwrap();
        s.set_facing(Direction::Left);
        assert_eq!(s.outputs(), &[Direction::Down, Direction::Up]);
        assert_eq!(s.chosen(), None);
    }
}
