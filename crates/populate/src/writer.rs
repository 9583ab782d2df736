//! Cell writes that replace content and leave the cell style untouched.

use sheetfill_engine::{CellId, CellValue, WorkbookModel};

use crate::format::Formatted;
use crate::scanner::{find_tokens, flatten_cell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The token was the whole cell; the cell now holds the typed value.
    WholeCell,
    /// The token was replaced inside longer text or formula source.
    Embedded,
    /// The token is no longer present in the cell.
    Missing,
}

/// Replace `token` in the cell at `at` with `value`.
///
/// When the trimmed cell text is exactly the token the cell takes the typed
/// value (a formula is replaced). Otherwise the first occurrence is replaced
/// in place: literal text stays text, formula source stays a formula.
pub fn write_token<W: WorkbookModel + ?Sized>(
    workbook: &mut W,
    at: CellId,
    token: &str,
    value: &Formatted,
) -> WriteOutcome {
    let Some(cell) = workbook.cell(at.sheet, at.row, at.col) else {
        return WriteOutcome::Missing;
    };
    let text = flatten_cell(cell);
    let is_formula = cell.formula.is_some();

    if text.trim() == token {
        workbook.set_value(at.sheet, at.row, at.col, value.to_cell_value());
        return WriteOutcome::WholeCell;
    }
    let Some(pos) = text.find(token) else {
        return WriteOutcome::Missing;
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..pos]);
    if is_formula {
        out.push_str(&formula_operand(&text, pos, value));
    } else {
        out.push_str(&value.to_text());
    }
    out.push_str(&text[pos + token.len()..]);

    if is_formula {
        workbook.set_formula(at.sheet, at.row, at.col, out);
    } else {
        workbook.set_value(at.sheet, at.row, at.col, CellValue::Text(out));
    }
    WriteOutcome::Embedded
}

/// Text for a value spliced into formula source at byte offset `pos`.
/// Inside a string literal the raw text is used (quotes doubled); outside,
/// numbers are bare and text becomes a string literal.
fn formula_operand(formula: &str, pos: usize, value: &Formatted) -> String {
    let in_literal = formula[..pos].matches('"').count() % 2 == 1;
    match value {
        Formatted::Number(_) if !in_literal => value.to_text(),
        _ => {
            let escaped = value.to_text().replace('"', "\"\"");
            if in_literal {
                escaped
            } else {
                format!("\"{escaped}\"")
            }
        }
    }
}

/// Remove leftover tokens from a cell. Returns true if the cell changed.
///
/// A cell whose text is only tokens (and whitespace) is emptied, as is any
/// formula still carrying a token. Text with tokens embedded has them
/// stripped, repeatedly until none remain, and is trimmed.
pub fn clear_residue<W: WorkbookModel + ?Sized>(workbook: &mut W, at: CellId) -> bool {
    let Some(cell) = workbook.cell(at.sheet, at.row, at.col) else {
        return false;
    };
    let is_formula = cell.formula.is_some();
    let mut text = flatten_cell(cell);
    if find_tokens(&text, is_formula).is_empty() {
        return false;
    }
    if is_formula {
        workbook.set_value(at.sheet, at.row, at.col, CellValue::Empty);
        return true;
    }

    loop {
        let spans = find_tokens(&text, false);
        if spans.is_empty() {
            break;
        }
        let mut stripped = String::with_capacity(text.len());
        let mut last = 0;
        for (start, end) in spans {
            stripped.push_str(&text[last..start]);
            last = end;
        }
        stripped.push_str(&text[last..]);
        text = stripped;
    }

    let trimmed = text.trim();
    let value = if trimmed.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(trimmed.to_string())
    };
    workbook.set_value(at.sheet, at.row, at.col, value);
    true
}
