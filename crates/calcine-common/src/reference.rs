//! Cell and range addresses.
//!
//! Addresses are 1-based `(row, col)` pairs, sheet-agnostic: the engine
//! evaluates one expression tree against one read-only worksheet accessor, so
//! cross-sheet addressing belongs to the host.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single cell address, 1-based.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// A rectangular cell range; corners may arrive unordered.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RangeAddr {
    pub start: CellAddr,
    pub end: CellAddr,
}

impl RangeAddr {
    pub fn new(start: CellAddr, end: CellAddr) -> Self {
        Self { start, end }
    }

    /// Reorder corners so `start` is the top-left and `end` the bottom-right.
    pub fn normalized(&self) -> Self {
        let (r1, r2) = if self.start.row <= self.end.row {
            (self.start.row, self.end.row)
        } else {
            (self.end.row, self.start.row)
        };
        let (c1, c2) = if self.start.col <= self.end.col {
            (self.start.col, self.end.col)
        } else {
            (self.end.col, self.start.col)
        };
        Self {
            start: CellAddr::new(r1, c1),
            end: CellAddr::new(r2, c2),
        }
    }

    /// `(rows, cols)` of the normalized rectangle.
    pub fn dims(&self) -> (usize, usize) {
        let n = self.normalized();
        (
            (n.end.row - n.start.row + 1) as usize,
            (n.end.col - n.start.col + 1) as usize,
        )
    }

    pub fn contains(&self, addr: CellAddr) -> bool {
        let n = self.normalized();
        addr.row >= n.start.row
            && addr.row <= n.end.row
            && addr.col >= n.start.col
            && addr.col <= n.end.col
    }

    /// Row-major iteration over every cell address in the rectangle.
    pub fn iter_cells(&self) -> impl Iterator<Item = CellAddr> {
        let n = self.normalized();
        let cols = n.start.col..=n.end.col;
        (n.start.row..=n.end.row)
            .flat_map(move |row| cols.clone().map(move |col| CellAddr::new(row, col)))
    }
}

/// A reference value: a single cell or a rectangular range.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Cell(CellAddr),
    Range(RangeAddr),
}

impl Reference {
    pub fn cell(row: u32, col: u32) -> Self {
        Reference::Cell(CellAddr::new(row, col))
    }

    pub fn range(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Reference::Range(RangeAddr::new(
            CellAddr::new(start_row, start_col),
            CellAddr::new(end_row, end_col),
        ))
    }

    /// View any reference as a (possibly 1x1) normalized rectangle.
    pub fn as_range(&self) -> RangeAddr {
        match *self {
            Reference::Cell(c) => RangeAddr::new(c, c),
            Reference::Range(r) => r.normalized(),
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        self.as_range().dims()
    }

    pub fn is_single_cell(&self) -> bool {
        self.dims() == (1, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_reorders_corners() {
        let r = RangeAddr::new(CellAddr::new(5, 4), CellAddr::new(2, 1)).normalized();
        assert_eq!(r.start, CellAddr::new(2, 1));
        assert_eq!(r.end, CellAddr::new(5, 4));
        assert_eq!(r.dims(), (4, 4));
    }

    #[test]
    fn iteration_is_row_major() {
        let r = RangeAddr::new(CellAddr::new(1, 1), CellAddr::new(2, 2));
        let cells: Vec<_> = r.iter_cells().collect();
        assert_eq!(
            cells,
            vec![
                CellAddr::new(1, 1),
                CellAddr::new(1, 2),
                CellAddr::new(2, 1),
                CellAddr::new(2, 2),
            ]
        );
    }

    #[test]
    fn single_cell_reference_is_1x1() {
        assert!(Reference::cell(3, 3).is_single_cell());
        assert!(!Reference::range(1, 1, 1, 2).is_single_cell());
    }
}
