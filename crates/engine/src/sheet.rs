use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellValue};

/// Bounding rectangle of non-empty cells. 0-based, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(usize, usize), Cell>,
    /// Cells written since load. Codecs use this to patch only what changed.
    #[serde(skip)]
    dirty: BTreeSet<(usize, usize)>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Insert a cell as loaded from a file. Does not mark it dirty.
    pub fn load_cell(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn cells_iter(&self) -> impl Iterator<Item = (&(usize, usize), &Cell)> {
        self.cells.iter()
    }

    /// Set a cell's value. Existing style is kept; a formula is dropped.
    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.cells.entry((row, col)).or_default().set_value(value);
        self.dirty.insert((row, col));
    }

    /// Set a cell's formula. Existing style is kept; the cached value is dropped.
    pub fn set_formula(&mut self, row: usize, col: usize, formula: impl Into<String>) {
        self.cells.entry((row, col)).or_default().set_formula(formula);
        self.dirty.insert((row, col));
    }

    /// Empty a cell's content while keeping its style.
    pub fn clear_cell(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(&(row, col)) {
            cell.set_value(CellValue::Empty);
            self.dirty.insert((row, col));
        }
    }

    pub fn dirty_cells(&self) -> impl Iterator<Item = &(usize, usize)> {
        self.dirty.iter()
    }

    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Bounding box of non-empty cells, or None for a blank sheet.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut range: Option<CellRange> = None;
        for (&(row, col), cell) in &self.cells {
            if cell.is_empty() {
                continue;
            }
            range = Some(match range {
                None => CellRange { start_row: row, start_col: col, end_row: row, end_col: col },
                Some(r) => CellRange {
                    start_row: r.start_row.min(row),
                    start_col: r.start_col.min(col),
                    end_row: r.end_row.max(row),
                    end_col: r.end_col.max(col),
                },
            });
        }
        range
    }
}
