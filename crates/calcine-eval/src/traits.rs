//! Integration seams: the read-only worksheet accessor and the narrow
//! context view handed to handlers that need one.

use std::cell::RefCell;

use calcine_common::{CellAddr, LiteralValue, Reference};
use chrono::NaiveDateTime;
use rand::rngs::SmallRng;
use rand::Rng;

/// Read-only, synchronous cell access. `None` is a blank cell.
///
/// No function invoked through this engine may mutate cell storage; the
/// trait's shape makes that impossible to express.
pub trait CellResolver {
    fn get_cell(&self, addr: CellAddr) -> Option<LiteralValue>;
}

/// A sheetless resolver: every cell is blank. Useful for pure-expression
/// evaluation and tests.
impl CellResolver for () {
    fn get_cell(&self, _addr: CellAddr) -> Option<LiteralValue> {
        None
    }
}

/// The view a `needs_context` handler gets: worksheet reads, the current
/// cell, wall-clock time, and the context's deterministic random stream.
/// Everything here is read-only with respect to cell storage.
pub struct HandlerCtx<'a> {
    resolver: &'a dyn CellResolver,
    current_cell: Option<CellAddr>,
    rng: &'a RefCell<SmallRng>,
}

impl<'a> HandlerCtx<'a> {
    pub(crate) fn new(
        resolver: &'a dyn CellResolver,
        current_cell: Option<CellAddr>,
        rng: &'a RefCell<SmallRng>,
    ) -> Self {
        Self {
            resolver,
            current_cell,
            rng,
        }
    }

    /// A blank cell reads as `Empty`.
    pub fn get_cell(&self, addr: CellAddr) -> LiteralValue {
        self.resolver
            .get_cell(addr)
            .unwrap_or(LiteralValue::Empty)
    }

    pub fn current_cell(&self) -> Option<CellAddr> {
        self.current_cell
    }

    pub fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// Next value of the per-context seeded `SmallRng` stream, uniform in
    /// [0, 1).
    ///
    /// Deterministic per context seed, so volatile results are reproducible
    /// within a session while still changing between passes.
    pub fn next_rand(&self) -> f64 {
        self.rng.borrow_mut().gen()
    }

    /// Materialise a reference into a rectangular row-major array of values.
    pub fn materialize(&self, reference: &Reference) -> Vec<Vec<LiteralValue>> {
        let range = reference.as_range().normalized();
        let start = range.start;
        let (rows, cols) = range.dims();
        let mut out = Vec::with_capacity(rows);
        for r in 0..rows as u32 {
            let mut row = Vec::with_capacity(cols);
            for c in 0..cols as u32 {
                row.push(self.get_cell(CellAddr::new(start.row + r, start.col + c)));
            }
            out.push(row);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn rand_stream_is_deterministic_per_seed() {
        let a = RefCell::new(SmallRng::seed_from_u64(7));
        let b = RefCell::new(SmallRng::seed_from_u64(7));
        let ctx_a = HandlerCtx::new(&(), None, &a);
        let ctx_b = HandlerCtx::new(&(), None, &b);
        let xs: Vec<f64> = (0..8).map(|_| ctx_a.next_rand()).collect();
        let ys: Vec<f64> = (0..8).map(|_| ctx_b.next_rand()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
        assert!(xs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn blank_cells_read_as_empty() {
        let rng = RefCell::new(SmallRng::seed_from_u64(1));
        let ctx = HandlerCtx::new(&(), None, &rng);
        assert_eq!(ctx.get_cell(CellAddr::new(1, 1)), LiteralValue::Empty);
    }
}
