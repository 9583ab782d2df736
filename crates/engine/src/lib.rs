//! `sheetfill-engine` - in-memory workbook model.
//!
//! Cells, sheets and the `WorkbookModel` contract the population engine
//! works against. No file format knowledge lives here.

pub mod cell;
pub mod cell_id;
pub mod sheet;
pub mod workbook;

pub use cell::{format_number, Cell, CellValue, TextRun};
pub use cell_id::CellId;
pub use sheet::{CellRange, Sheet};
pub use workbook::{Workbook, WorkbookModel};
