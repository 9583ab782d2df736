//! `sheetfill-io` - XLSX template packages.
//!
//! Loads a template into the `sheetfill-engine` workbook model and writes a
//! patched copy back, leaving every untouched part of the package as it was.

pub mod error;
pub mod xlsx;

pub use error::XlsxError;
pub use xlsx::{SheetPart, XlsxDocument};
