use serde_json::Value;

use sheetfill_engine::{format_number, CellValue};

use crate::model::{DataItem, DataType};

/// A value ready to be written to a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Formatted {
    Number(f64),
    Text(String),
}

impl Formatted {
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            Formatted::Number(n) => CellValue::Number(*n),
            Formatted::Text(s) => CellValue::Text(s.clone()),
        }
    }

    /// Text used when the value is spliced into surrounding text.
    pub fn to_text(&self) -> String {
        match self {
            Formatted::Number(n) => format_number(*n),
            Formatted::Text(s) => s.clone(),
        }
    }
}

/// Format an item's value per its data type. Never fails.
pub fn format_value(item: &DataItem) -> Formatted {
    match item.data_type {
        DataType::Currency | DataType::Number => Formatted::Number(numeric_or_zero(item)),
        DataType::Percentage => {
            let n = numeric_or_zero(item);
            Formatted::Number(if n.abs() > 1.0 { n / 100.0 } else { n })
        }
        DataType::String => Formatted::Text(stringify(&item.value)),
    }
}

fn numeric_or_zero(item: &DataItem) -> f64 {
    parse_numeric(&item.value).unwrap_or_else(|| {
        log::warn!(
            "item '{}' ({}): value {} is not numeric, writing 0",
            item.id,
            item.original_name,
            item.value
        );
        0.0
    })
}

/// Lenient numeric parse. Accepts JSON numbers and strings such as
/// `"£1,250,000"`, `" 12.5 "` or `"5%"`. Returns None for anything else,
/// including non-finite results.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric_str(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_numeric_str(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    let (negative, rest) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let rest = rest
        .strip_prefix(['£', '$', '€'])
        .unwrap_or(rest);
    let rest = rest.strip_suffix('%').unwrap_or(rest);
    if rest.is_empty() {
        return None;
    }
    let n: f64 = rest.parse().ok()?;
    Some(if negative { -n } else { n })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format_number(f),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MappingStatus;
    use serde_json::json;

    fn item(value: Value, data_type: DataType) -> DataItem {
        DataItem {
            id: "i".into(),
            original_name: "Item".into(),
            item_code: None,
            value,
            data_type,
            category: String::new(),
            mapping_status: MappingStatus::Confirmed,
            confidence: None,
        }
    }

    #[test]
    fn percentage_conversion() {
        assert_eq!(format_value(&item(json!(5), DataType::Percentage)), Formatted::Number(0.05));
        assert_eq!(format_value(&item(json!(0.05), DataType::Percentage)), Formatted::Number(0.05));
        assert_eq!(format_value(&item(json!("20%"), DataType::Percentage)), Formatted::Number(0.2));
        assert_eq!(format_value(&item(json!(1), DataType::Percentage)), Formatted::Number(1.0));
        assert_eq!(format_value(&item(json!(-15), DataType::Percentage)), Formatted::Number(-0.15));
    }

    #[test]
    fn currency_and_number() {
        assert_eq!(format_value(&item(json!(500000), DataType::Currency)), Formatted::Number(500000.0));
        assert_eq!(
            format_value(&item(json!("£1,250,000"), DataType::Currency)),
            Formatted::Number(1_250_000.0)
        );
        assert_eq!(format_value(&item(json!(" -$12.50 "), DataType::Number)), Formatted::Number(-12.5));
    }

    #[test]
    fn unparseable_numbers_default_to_zero() {
        for v in [json!("n/a"), json!(null), json!(true), json!([1]), json!(""), json!("£"), json!("1e999")] {
            assert_eq!(format_value(&item(v.clone(), DataType::Currency)), Formatted::Number(0.0), "{v}");
        }
    }

    #[test]
    fn strings_pass_through() {
        assert_eq!(
            format_value(&item(json!("Smith & Co"), DataType::String)),
            Formatted::Text("Smith & Co".into())
        );
        assert_eq!(format_value(&item(json!(725000), DataType::String)), Formatted::Text("725000".into()));
        assert_eq!(format_value(&item(json!(null), DataType::String)), Formatted::Text(String::new()));
    }

    #[test]
    fn spliced_text() {
        assert_eq!(Formatted::Number(725000.0).to_text(), "725000");
        assert_eq!(Formatted::Number(0.05).to_text(), "0.05");
        assert_eq!(Formatted::Text("x".into()).to_cell_value(), CellValue::Text("x".into()));
    }
}
