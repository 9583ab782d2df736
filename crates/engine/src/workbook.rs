use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};
use crate::sheet::{CellRange, Sheet};

/// Read/write access to a workbook's cells.
///
/// This is the whole surface the population engine relies on. File codecs
/// implement it on top of their own package state so the engine never sees
/// the underlying format.
pub trait WorkbookModel {
    fn sheet_count(&self) -> usize;

    fn sheet_name(&self, sheet: usize) -> Option<&str>;

    /// Bounding box of non-empty cells for a sheet.
    fn used_range(&self, sheet: usize) -> Option<CellRange>;

    fn cell(&self, sheet: usize, row: usize, col: usize) -> Option<&Cell>;

    /// Stored cells of a sheet in row-major order, blank ones included.
    fn cells(&self, sheet: usize) -> Box<dyn Iterator<Item = ((usize, usize), &Cell)> + '_>;

    /// Replace a cell's value without touching its style.
    fn set_value(&mut self, sheet: usize, row: usize, col: usize, value: CellValue);

    /// Replace a cell's formula without touching its style.
    fn set_formula(&mut self, sheet: usize, row: usize, col: usize, formula: String);

    fn value(&self, sheet: usize, row: usize, col: usize) -> Option<&CellValue> {
        self.cell(sheet, row, col).map(|c| &c.value)
    }

    fn formula(&self, sheet: usize, row: usize, col: usize) -> Option<&str> {
        self.cell(sheet, row, col).and_then(|c| c.formula.as_deref())
    }
}

/// A workbook containing multiple sheets, in tab order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> usize {
        self.sheets.push(sheet);
        self.sheets.len() - 1
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn has_changes(&self) -> bool {
        self.sheets.iter().any(|s| s.has_changes())
    }
}

impl WorkbookModel for Workbook {
    fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_name(&self, sheet: usize) -> Option<&str> {
        self.sheets.get(sheet).map(|s| s.name.as_str())
    }

    fn used_range(&self, sheet: usize) -> Option<CellRange> {
        self.sheets.get(sheet).and_then(|s| s.used_range())
    }

    fn cell(&self, sheet: usize, row: usize, col: usize) -> Option<&Cell> {
        self.sheets.get(sheet).and_then(|s| s.cell(row, col))
    }

    fn cells(&self, sheet: usize) -> Box<dyn Iterator<Item = ((usize, usize), &Cell)> + '_> {
        match self.sheets.get(sheet) {
            Some(s) => Box::new(s.cells_iter().map(|(&at, cell)| (at, cell))),
            None => Box::new(std::iter::empty()),
        }
    }

    fn set_value(&mut self, sheet: usize, row: usize, col: usize, value: CellValue) {
        if let Some(s) = self.sheets.get_mut(sheet) {
            s.set_value(row, col, value);
        }
    }

    fn set_formula(&mut self, sheet: usize, row: usize, col: usize, formula: String) {
        if let Some(s) = self.sheets.get_mut(sheet) {
            s.set_formula(row, col, formula);
        }
    }
}
