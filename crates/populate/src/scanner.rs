//! Placeholder discovery.
//!
//! Every cell of every sheet's used range is flattened to text and searched
//! for `<...>` tokens. Tokens are classified as specific item codes or as
//! category fallbacks (`<all.<category>.name>`, `<all.<category>.value.2>`).

use once_cell::sync::Lazy;
use regex::Regex;

use sheetfill_engine::{Cell, CellId, WorkbookModel};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").expect("token pattern"));

static FALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^all\.(.+)\.(name|value)(?:\.(\d+))?$").expect("fallback pattern")
});

/// Which half of a fallback row a token fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Name,
    Value,
}

/// Default sorts before any numbered slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Default,
    Numbered(u32),
}

impl Slot {
    pub fn is_numbered(&self) -> bool {
        matches!(self, Slot::Numbered(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackToken {
    /// Category path as written in the template, lowercased.
    pub category: String,
    pub field: FieldKind,
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClass {
    SpecificCode,
    Fallback(FallbackToken),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text including the angle brackets.
    pub text: String,
    pub class: TokenClass,
}

impl Token {
    pub fn is_fallback(&self) -> bool {
        matches!(self.class, TokenClass::Fallback(_))
    }
}

/// A cell holding at least one token.
#[derive(Debug, Clone)]
pub struct ScannedCell {
    pub location: CellId,
    pub sheet_name: String,
    pub text: String,
    pub is_formula: bool,
    pub tokens: Vec<Token>,
}

/// Tokens found in a workbook, in sheet then row-major order.
#[derive(Debug, Clone, Default)]
pub struct TemplateScan {
    pub cells: Vec<ScannedCell>,
}

impl TemplateScan {
    pub fn token_count(&self) -> usize {
        self.cells.iter().map(|c| c.tokens.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every specific-code token with its cell.
    pub fn specific_tokens(&self) -> impl Iterator<Item = (&ScannedCell, &Token)> {
        self.cells
            .iter()
            .flat_map(|c| c.tokens.iter().map(move |t| (c, t)))
            .filter(|(_, t)| t.class == TokenClass::SpecificCode)
    }

    /// Every fallback token with its cell.
    pub fn fallback_tokens(&self) -> impl Iterator<Item = (&ScannedCell, &Token, &FallbackToken)> {
        self.cells.iter().flat_map(|c| {
            c.tokens.iter().filter_map(move |t| match &t.class {
                TokenClass::Fallback(f) => Some((c, t, f)),
                TokenClass::SpecificCode => None,
            })
        })
    }
}

/// Plain text of a cell: formula source for formula cells, otherwise the
/// text, joined rich-text runs or hyperlink display text. Other values
/// flatten to an empty string.
pub fn flatten_cell(cell: &Cell) -> String {
    if let Some(formula) = &cell.formula {
        return formula.clone();
    }
    cell.value.as_text().unwrap_or_default()
}

/// Non-overlapping token spans, left to right.
///
/// Inside formula source the inner text is restricted to name characters,
/// so comparisons like `IF(A1<0,"a",B1>0)` are not read as tokens.
pub fn find_tokens(text: &str, is_formula: bool) -> Vec<(usize, usize)> {
    if !text.contains('<') {
        return Vec::new();
    }
    TOKEN_RE
        .find_iter(text)
        .filter(|m| !is_formula || is_name_like(&text[m.start() + 1..m.end() - 1]))
        .map(|m| (m.start(), m.end()))
        .collect()
}

fn is_name_like(inner: &str) -> bool {
    !inner.trim().is_empty()
        && inner
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
}

/// Classify a token (with or without brackets).
pub fn classify(token: &str) -> TokenClass {
    let inner = token.trim().trim_start_matches('<').trim_end_matches('>').trim();
    let Some(caps) = FALLBACK_RE.captures(inner) else {
        return TokenClass::SpecificCode;
    };
    let field = if caps[2].eq_ignore_ascii_case("name") {
        FieldKind::Name
    } else {
        FieldKind::Value
    };
    let slot = match caps.get(3) {
        None => Slot::Default,
        Some(n) => match n.as_str().parse::<u32>() {
            Ok(n) => Slot::Numbered(n),
            // out-of-range slot numbers read as plain codes
            Err(_) => return TokenClass::SpecificCode,
        },
    };
    TokenClass::Fallback(FallbackToken {
        category: caps[1].to_lowercase(),
        field,
        slot,
    })
}

/// Tokens in one cell, or None when the cell holds none.
pub fn scan_cell(cell: &Cell) -> Option<(String, Vec<Token>)> {
    let text = flatten_cell(cell);
    let spans = find_tokens(&text, cell.formula.is_some());
    if spans.is_empty() {
        return None;
    }
    let tokens = spans
        .into_iter()
        .map(|(start, end)| {
            let token = &text[start..end];
            Token {
                text: token.to_string(),
                class: classify(token),
            }
        })
        .collect();
    Some((text, tokens))
}

/// Walk the stored cells inside every sheet's used range, row by row, and
/// collect the token-bearing ones.
pub fn scan_workbook<W: WorkbookModel + ?Sized>(workbook: &W) -> TemplateScan {
    let mut cells = Vec::new();
    for sheet in 0..workbook.sheet_count() {
        let Some(range) = workbook.used_range(sheet) else {
            continue;
        };
        let sheet_name = workbook.sheet_name(sheet).unwrap_or_default().to_string();
        for ((row, col), cell) in workbook.cells(sheet).filter(|&((r, c), _)| range.contains(r, c)) {
            if let Some((text, tokens)) = scan_cell(cell) {
                cells.push(ScannedCell {
                    location: CellId::new(sheet, row, col),
                    sheet_name: sheet_name.clone(),
                    text,
                    is_formula: cell.formula.is_some(),
                    tokens,
                });
            }
        }
    }
    log::debug!(
        "scan: {} token(s) in {} cell(s)",
        cells.iter().map(|c: &ScannedCell| c.tokens.len()).sum::<usize>(),
        cells.len()
    );
    TemplateScan { cells }
}
