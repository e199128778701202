//! Lightweight in-memory worksheet for unit/prop tests.

use rustc_hash::FxHashMap;

use calcine_common::{CellAddr, LiteralValue};

use crate::ast::ExprNode;
use crate::interpreter::EvalContext;
use crate::traits::CellResolver;

type V = LiteralValue;

/// Builder-style grid: seed cells, then evaluate formulas against it.
#[derive(Default)]
pub struct TestWorkbook {
    cells: FxHashMap<CellAddr, V>,
}

impl TestWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, row: u32, col: u32, v: impl Into<V>) -> Self {
        self.cells.insert(CellAddr::new(row, col), v.into());
        self
    }

    /// Fill one row left-to-right starting at `(row, start_col)`.
    pub fn with_row(mut self, row: u32, start_col: u32, values: Vec<V>) -> Self {
        for (i, v) in values.into_iter().enumerate() {
            self.cells.insert(CellAddr::new(row, start_col + i as u32), v);
        }
        self
    }

    /// Fill one column top-down starting at `(start_row, col)`.
    pub fn with_column(mut self, start_row: u32, col: u32, values: Vec<V>) -> Self {
        for (i, v) in values.into_iter().enumerate() {
            self.cells.insert(CellAddr::new(start_row + i as u32, col), v);
        }
        self
    }

    pub fn context(&self) -> EvalContext<'_> {
        EvalContext::new(self)
    }

    /// One-shot evaluation shortcut.
    pub fn evaluate(&self, node: &ExprNode) -> V {
        self.context().evaluate(node)
    }
}

impl CellResolver for TestWorkbook {
    fn get_cell(&self, addr: CellAddr) -> Option<V> {
        self.cells.get(&addr).cloned()
    }
}
