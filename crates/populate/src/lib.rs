//! `sheetfill-populate` - template placeholder population engine.
//!
//! Fills `<...>` placeholder tokens in a spreadsheet template from a list of
//! categorized data items, in three passes: specific item codes, category
//! fallback rows, then residue cleanup. The engine works against the
//! [`WorkbookModel`](sheetfill_engine::WorkbookModel) trait; the functions in
//! this module add XLSX load and save around it.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod inspect;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod result;
pub mod scanner;
pub mod writer;

use sheetfill_io::XlsxDocument;

pub use config::PopulateConfig;
pub use engine::run;
pub use error::PopulateError;
pub use inspect::{scan_template, ScanReport};
pub use model::{items_from_json, DataItem, DataType, MappingStatus, PopulationOutput, PopulationReport, PopulationStats};
pub use normalize::{normalize_category, CategoryTable};

/// Load an XLSX template, populate it, and serialize the result.
///
/// A template that fails to load or save aborts the call; nothing partial is
/// returned.
pub fn populate_template(
    template: &[u8],
    items: &[DataItem],
    config: &PopulateConfig,
) -> Result<PopulationOutput, PopulateError> {
    let mut doc = XlsxDocument::from_bytes(template)?;
    let report = run(&mut doc, items, config);
    let output_bytes = doc.to_bytes()?;
    log::info!(
        "populated template: {} matched, {} unmatched, {} fallback row(s), {} cleared",
        report.stats.matched,
        report.stats.unmatched,
        report.stats.fallbacks_inserted,
        report.stats.placeholders_cleared
    );
    Ok(PopulationOutput { output_bytes, report })
}

/// Load an XLSX template and list its tokens.
pub fn inspect_template(
    template: &[u8],
    items: Option<&[DataItem]>,
    config: &PopulateConfig,
) -> Result<ScanReport, PopulateError> {
    let doc = XlsxDocument::from_bytes(template)?;
    Ok(scan_template(&doc, items, &config.category_table()))
}
