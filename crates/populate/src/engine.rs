use std::collections::{BTreeSet, HashSet};

use sheetfill_engine::{CellId, WorkbookModel};

use crate::aggregate::{aggregate_fallback_rows, FallbackRow};
use crate::config::PopulateConfig;
use crate::format::{format_value, Formatted};
use crate::lookup::{CategoryPools, CodeLookup};
use crate::model::{DataItem, PopulationReport};
use crate::normalize::CategoryTable;
use crate::result::collect_report;
use crate::scanner::{scan_workbook, TemplateScan};
use crate::writer::{clear_residue, write_token, WriteOutcome};

/// A planned replacement of one token occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWrite {
    pub location: CellId,
    pub token: String,
    pub value: Formatted,
    /// Item the value came from.
    pub item_id: String,
}

/// Outcome of specific-code resolution.
#[derive(Debug, Clone, Default)]
pub struct CodePass {
    pub writes: Vec<TokenWrite>,
    /// Ids of items placed by code.
    pub consumed: BTreeSet<String>,
    /// Distinct tokens resolved, first-seen order.
    pub matched: Vec<String>,
    /// Distinct specific-code tokens with no item, first-seen order.
    pub unmatched: Vec<String>,
}

/// Outcome of category fallback resolution.
#[derive(Debug, Clone, Default)]
pub struct FallbackPass {
    pub writes: Vec<TokenWrite>,
    /// Consumed ids carried in, plus items placed into default rows.
    pub consumed: BTreeSet<String>,
    pub fallbacks_inserted: usize,
    pub rows_visited: usize,
}

/// Pass 1. Resolve every specific-code token against the lookup table.
pub fn resolve_codes(scan: &TemplateScan, lookup: &CodeLookup<'_>) -> CodePass {
    let mut pass = CodePass::default();
    let mut seen_matched = HashSet::new();
    let mut seen_unmatched = HashSet::new();

    for (cell, token) in scan.specific_tokens() {
        match lookup.lookup(&token.text) {
            Some(item) => {
                pass.writes.push(TokenWrite {
                    location: cell.location,
                    token: token.text.clone(),
                    value: format_value(item),
                    item_id: item.id.clone(),
                });
                pass.consumed.insert(item.id.clone());
                if seen_matched.insert(token.text.as_str()) {
                    pass.matched.push(token.text.clone());
                }
            }
            None => {
                if seen_unmatched.insert(token.text.as_str()) {
                    pass.unmatched.push(token.text.clone());
                }
            }
        }
    }
    pass
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupKey {
    sheet: usize,
    category: String,
    numbered: bool,
}

/// Pass 2. Fill fallback rows from category pools.
///
/// Rows are grouped by (sheet, category, default or numbered) and each group
/// takes pool items in input order, one per row, in row order. Default
/// groups skip items already consumed and record what they place; numbered
/// groups draw from the full pool.
pub fn resolve_fallbacks(
    rows: &[FallbackRow],
    pools: &CategoryPools<'_>,
    table: &CategoryTable,
    consumed: &BTreeSet<String>,
) -> FallbackPass {
    let mut groups: Vec<(GroupKey, Vec<&FallbackRow>)> = Vec::new();
    for row in rows {
        let key = GroupKey {
            sheet: row.sheet,
            category: row.category.clone(),
            numbered: row.slot.is_numbered(),
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    let mut pass = FallbackPass {
        consumed: consumed.clone(),
        ..FallbackPass::default()
    };

    for (key, members) in groups {
        pass.rows_visited += members.len();
        let pool = pools.resolve(&key.category, table);
        let available: Vec<&DataItem> = if key.numbered {
            pool.to_vec()
        } else {
            pool.iter()
                .copied()
                .filter(|item| !pass.consumed.contains(&item.id))
                .collect()
        };
        log::debug!(
            "fallback group {}/{} ({}): {} row(s), {} item(s) available",
            key.sheet + 1,
            key.category,
            if key.numbered { "numbered" } else { "default" },
            members.len(),
            available.len()
        );

        for (row, item) in members.iter().zip(available) {
            if let Some(site) = &row.name_cell {
                pass.writes.push(TokenWrite {
                    location: site.location,
                    token: site.token.clone(),
                    value: Formatted::Text(item.original_name.clone()),
                    item_id: item.id.clone(),
                });
            }
            if let Some(site) = &row.value_cell {
                pass.writes.push(TokenWrite {
                    location: site.location,
                    token: site.token.clone(),
                    value: format_value(item),
                    item_id: item.id.clone(),
                });
            }
            if !key.numbered {
                pass.consumed.insert(item.id.clone());
            }
            pass.fallbacks_inserted += 1;
        }
    }
    pass
}

/// Pass 3 plan: every cell still carrying a token.
pub fn plan_residue(scan: &TemplateScan) -> Vec<CellId> {
    scan.cells.iter().map(|c| c.location).collect()
}

/// Apply planned writes in order. Returns how many landed.
pub fn apply_writes<W: WorkbookModel + ?Sized>(workbook: &mut W, writes: &[TokenWrite]) -> usize {
    let mut applied = 0;
    for w in writes {
        match write_token(workbook, w.location, &w.token, &w.value) {
            WriteOutcome::Missing => {
                log::warn!("token {} no longer present at {}", w.token, w.location);
            }
            WriteOutcome::WholeCell | WriteOutcome::Embedded => applied += 1,
        }
    }
    applied
}

/// Run all three passes over a workbook in place.
pub fn run<W: WorkbookModel + ?Sized>(
    workbook: &mut W,
    items: &[DataItem],
    config: &PopulateConfig,
) -> PopulationReport {
    run_with_table(workbook, items, &config.category_table())
}

/// Same as [`run`] with a prebuilt category table.
pub fn run_with_table<W: WorkbookModel + ?Sized>(
    workbook: &mut W,
    items: &[DataItem],
    table: &CategoryTable,
) -> PopulationReport {
    let scan = scan_workbook(&*workbook);
    let lookup = CodeLookup::build(items);
    let pools = CategoryPools::build(items, table);

    // Pass 1
    let codes = resolve_codes(&scan, &lookup);
    let applied = apply_writes(workbook, &codes.writes);
    log::debug!(
        "pass 1: {} write(s), {} matched, {} unmatched",
        applied,
        codes.matched.len(),
        codes.unmatched.len()
    );

    // Pass 2
    let rows = aggregate_fallback_rows(&scan);
    let fallbacks = resolve_fallbacks(&rows, &pools, table, &codes.consumed);
    let applied = apply_writes(workbook, &fallbacks.writes);
    log::debug!(
        "pass 2: {} row(s) visited, {} filled, {} write(s)",
        fallbacks.rows_visited,
        fallbacks.fallbacks_inserted,
        applied
    );

    // Pass 3
    let residue = plan_residue(&scan_workbook(&*workbook));
    let cleared = residue.into_iter().filter(|&at| clear_residue(workbook, at)).count();
    log::debug!("pass 3: {cleared} cell(s) cleared");

    collect_report(codes, &fallbacks, cleared)
}
