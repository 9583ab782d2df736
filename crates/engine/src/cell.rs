use serde::{Deserialize, Serialize};

/// One formatted run of a rich-text cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextRun {
    pub text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Rich text, run order preserved
    RichText(Vec<TextRun>),
    /// Hyperlink with its display text
    Hyperlink { text: String, target: String },
    /// Error literal such as `#REF!`
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::RichText(runs) => runs.iter().all(|r| r.text.is_empty()),
            _ => false,
        }
    }

    /// Text carried by string-like values. Numbers, booleans and errors have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::RichText(runs) => Some(runs.iter().map(|r| r.text.as_str()).collect()),
            CellValue::Hyperlink { text, .. } => Some(text.clone()),
            _ => None,
        }
    }

}

/// Shortest round-trip text for a number; integral values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Formula source without the leading `=`
    pub formula: Option<String>,
    /// Index into the package style table. Opaque to the model.
    pub style_id: Option<u32>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: CellValue) -> Self {
        Self { value, ..Self::default() }
    }

    pub fn with_formula(formula: impl Into<String>) -> Self {
        Self { formula: Some(formula.into()), ..Self::default() }
    }

    pub fn styled(mut self, style_id: u32) -> Self {
        self.style_id = Some(style_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.formula.is_none() && self.value.is_empty()
    }

    /// Replace the value, dropping any formula. Style is left as is.
    pub fn set_value(&mut self, value: CellValue) {
        self.value = value;
        self.formula = None;
    }

    /// Replace the formula, dropping the cached result. Style is left as is.
    pub fn set_formula(&mut self, formula: impl Into<String>) {
        self.formula = Some(formula.into());
        self.value = CellValue::Empty;
    }
}
