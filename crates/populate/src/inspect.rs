//! Read-only template audit: which tokens a template holds and whether
//! they would resolve against a given item list.

use serde::Serialize;

use sheetfill_engine::WorkbookModel;

use crate::lookup::{CategoryPools, CodeLookup};
use crate::model::DataItem;
use crate::normalize::CategoryTable;
use crate::scanner::{scan_workbook, FieldKind, Slot, TokenClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Specific,
    FallbackDefault,
    FallbackNumbered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub sheet: String,
    pub cell: String,
    pub token: String,
    pub kind: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    /// Present only when items were supplied. For fallbacks this means the
    /// category pool is non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolves: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub cells: usize,
    pub tokens: usize,
    pub specific: usize,
    pub fallback_default: usize,
    pub fallback_numbered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unresolved: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub summary: ScanSummary,
    pub tokens: Vec<TokenEntry>,
}

/// List every token in a workbook without modifying it.
pub fn scan_template<W: WorkbookModel + ?Sized>(
    workbook: &W,
    items: Option<&[DataItem]>,
    table: &CategoryTable,
) -> ScanReport {
    let scan = scan_workbook(workbook);
    let lookup = items.map(CodeLookup::build);
    let pools = items.map(|items| CategoryPools::build(items, table));

    let mut report = ScanReport::default();
    report.summary.cells = scan.cells.len();

    for cell in &scan.cells {
        for token in &cell.tokens {
            let mut entry = TokenEntry {
                sheet: cell.sheet_name.clone(),
                cell: cell.location.a1(),
                token: token.text.clone(),
                kind: TokenKind::Specific,
                category: None,
                field: None,
                slot: None,
                resolves: None,
            };
            match &token.class {
                TokenClass::SpecificCode => {
                    report.summary.specific += 1;
                    entry.resolves = lookup.as_ref().map(|l| l.lookup(&token.text).is_some());
                }
                TokenClass::Fallback(f) => {
                    entry.category = Some(f.category.clone());
                    entry.field = Some(match f.field {
                        FieldKind::Name => "name",
                        FieldKind::Value => "value",
                    });
                    match f.slot {
                        Slot::Default => {
                            entry.kind = TokenKind::FallbackDefault;
                            report.summary.fallback_default += 1;
                        }
                        Slot::Numbered(n) => {
                            entry.kind = TokenKind::FallbackNumbered;
                            entry.slot = Some(n);
                            report.summary.fallback_numbered += 1;
                        }
                    }
                    entry.resolves = pools.as_ref().map(|p| !p.resolve(&f.category, table).is_empty());
                }
            }
            report.tokens.push(entry);
        }
    }

    report.summary.tokens = report.tokens.len();
    if items.is_some() {
        report.summary.unresolved =
            Some(report.tokens.iter().filter(|t| t.resolves == Some(false)).count());
    }
    report
}
