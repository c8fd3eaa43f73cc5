//! Step-scoped storage for sparse matrix rows.
//!
//! Matrices borrow the arena for their whole life, so [`FrameArena::reset`]
//! (which needs `&mut self`) cannot run while any matrix built from it is
//! alive. Released rows are pooled and handed out again within the step.

use std::cell::{Cell, RefCell};

use glam::Mat3;

/// One stored block of a sparse row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowValue {
    pub column: u32,
    pub value: Mat3,
}

pub(crate) type Row = Vec<RowValue>;

#[derive(Debug, Default)]
pub struct FrameArena {
    free_rows: RefCell<Vec<Row>>,
    taken: Cell<usize>,
    released: Cell<usize>,
    generation: u64,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resets so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rows handed out and not yet released.
    pub fn live_rows(&self) -> usize {
        self.taken.get() - self.released.get()
    }

    /// Released rows waiting for reuse.
    pub fn pooled_rows(&self) -> usize {
        self.free_rows.borrow().len()
    }

    pub(crate) fn take_row(&self) -> Row {
        self.taken.set(self.taken.get() + 1);
        self.free_rows.borrow_mut().pop().unwrap_or_default()
    }

    pub(crate) fn release_row(&self, mut row: Row) {
        self.released.set(self.released.get() + 1);
        row.clear();
        self.free_rows.borrow_mut().push(row);
    }

    /// Drop all pooled storage and start a new generation.
    pub fn reset(&mut self) {
        debug_assert_eq!(self.live_rows(), 0, "rows still in use at arena reset");
        self.free_rows.get_mut().clear();
        self.taken.set(0);
        self.released.set(0);
        self.generation += 1;
    }
}
