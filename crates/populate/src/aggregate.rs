use std::collections::BTreeMap;

use sheetfill_engine::CellId;

use crate::scanner::{FieldKind, Slot, TemplateScan};

/// A token occurrence a fallback row will write into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSite {
    pub location: CellId,
    pub token: String,
}

/// One template row's name/value placeholders for a category slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRow {
    pub sheet: usize,
    pub sheet_name: String,
    pub row: usize,
    pub category: String,
    pub slot: Slot,
    pub name_cell: Option<TokenSite>,
    pub value_cell: Option<TokenSite>,
}

/// Sort key: sheet name, row ascending, default slot before numbered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RowKey {
    sheet_name: String,
    sheet: usize,
    row: usize,
    slot: Slot,
    category: String,
}

/// Group fallback tokens by (sheet, row, category, slot).
///
/// Each row keeps the first name cell and the first value cell seen in scan
/// order; further duplicates on the same row are left for residue cleanup.
pub fn aggregate_fallback_rows(scan: &TemplateScan) -> Vec<FallbackRow> {
    let mut groups: BTreeMap<RowKey, FallbackRow> = BTreeMap::new();

    for (cell, token, fallback) in scan.fallback_tokens() {
        let at = cell.location;
        let key = RowKey {
            sheet_name: cell.sheet_name.clone(),
            sheet: at.sheet,
            row: at.row,
            slot: fallback.slot,
            category: fallback.category.clone(),
        };
        let entry = groups.entry(key).or_insert_with(|| FallbackRow {
            sheet: at.sheet,
            sheet_name: cell.sheet_name.clone(),
            row: at.row,
            category: fallback.category.clone(),
            slot: fallback.slot,
            name_cell: None,
            value_cell: None,
        });
        let target = match fallback.field {
            FieldKind::Name => &mut entry.name_cell,
            FieldKind::Value => &mut entry.value_cell,
        };
        if target.is_none() {
            *target = Some(TokenSite { location: at, token: token.text.clone() });
        }
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan_workbook;
    use sheetfill_engine::{Cell, CellValue, Sheet, Workbook};

    fn text(s: &str) -> Cell {
        Cell::with_value(CellValue::Text(s.into()))
    }

    #[test]
    fn rows_pair_name_and_value_cells() {
        let mut sheet = Sheet::new("Appraisal");
        for (i, row) in [4usize, 5, 6].iter().enumerate() {
            let n = i + 1;
            sheet.load_cell(*row, 0, text(&format!("<all.professional.fees.name.{n}>")));
            sheet.load_cell(*row, 2, text(&format!("<all.professional.fees.value.{n}>")));
        }
        let wb = Workbook::from_sheets(vec![sheet]);
        let rows = aggregate_fallback_rows(&scan_workbook(&wb));

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].row, 4);
        assert_eq!(rows[0].slot, Slot::Numbered(1));
        assert_eq!(rows[0].name_cell.as_ref().unwrap().location, CellId::new(0, 4, 0));
        assert_eq!(rows[0].value_cell.as_ref().unwrap().location, CellId::new(0, 4, 2));
        assert_eq!(rows[2].value_cell.as_ref().unwrap().token, "<all.professional.fees.value.3>");
    }

    #[test]
    fn ordering_sheet_row_slot() {
        let mut b = Sheet::new("B");
        b.load_cell(0, 0, text("<all.fees.value>"));
        let mut a = Sheet::new("A");
        a.load_cell(3, 0, text("<all.fees.value.2>"));
        a.load_cell(3, 1, text("<all.fees.value>"));
        a.load_cell(1, 0, text("<all.fees.name.1>"));
        // B comes first in tab order but sorts after A by name
        let wb = Workbook::from_sheets(vec![b, a]);
        let rows = aggregate_fallback_rows(&scan_workbook(&wb));

        let order: Vec<(&str, usize, Slot)> =
            rows.iter().map(|r| (r.sheet_name.as_str(), r.row, r.slot)).collect();
        assert_eq!(
            order,
            vec![
                ("A", 1, Slot::Numbered(1)),
                ("A", 3, Slot::Default),
                ("A", 3, Slot::Numbered(2)),
                ("B", 0, Slot::Default),
            ]
        );
        assert!(rows[0].value_cell.is_none());
    }

    #[test]
    fn different_categories_on_one_row_stay_apart() {
        let mut sheet = Sheet::new("S");
        sheet.load_cell(0, 0, text("<all.fees.name>"));
        sheet.load_cell(0, 1, text("<all.costs.name>"));
        let wb = Workbook::from_sheets(vec![sheet]);
        let rows = aggregate_fallback_rows(&scan_workbook(&wb));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "costs");
        assert_eq!(rows[1].category, "fees");
    }
}
