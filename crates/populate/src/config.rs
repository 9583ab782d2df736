use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::PopulateError;
use crate::normalize::CategoryTable;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulateConfig {
    /// Extra label → canonical key entries, merged over the built-in table.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    /// Skip the built-in table and use only `synonyms`.
    #[serde(default)]
    pub replace_builtin: bool,
}

impl PopulateConfig {
    /// Parse a TOML config string.
    pub fn from_toml(s: &str) -> Result<Self, PopulateError> {
        let config: Self = toml::from_str(s).map_err(|e| PopulateError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<(), PopulateError> {
        for (label, canonical) in &self.synonyms {
            if label.trim().is_empty() {
                return Err(PopulateError::ConfigValidation(
                    "synonym labels must not be empty".into(),
                ));
            }
            let canonical = canonical.trim();
            if canonical.is_empty() {
                return Err(PopulateError::ConfigValidation(format!(
                    "synonym '{label}' maps to an empty category key"
                )));
            }
            if canonical.chars().any(char::is_whitespace) {
                return Err(PopulateError::ConfigValidation(format!(
                    "synonym '{label}' maps to '{canonical}', category keys must not contain whitespace"
                )));
            }
        }
        Ok(())
    }

    /// Build the immutable table handed to the engine.
    pub fn category_table(&self) -> CategoryTable {
        let base = if self.replace_builtin {
            CategoryTable::empty()
        } else {
            CategoryTable::builtin()
        };
        base.with_synonyms(self.synonyms.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_synonyms() {
        let config = PopulateConfig::from_toml(
            r#"
            [synonyms]
            "legal fees" = "professional.fees"
            "s106" = "planning.costs"
            "#,
        )
        .unwrap();
        assert_eq!(config.synonyms.len(), 2);
        let table = config.category_table();
        assert_eq!(table.normalize("Legal Fees"), "professional.fees");
        assert_eq!(table.normalize("S106"), "planning.costs");
        assert_eq!(table.normalize("profesional fees"), "professional.fees");
    }

    #[test]
    fn empty_config_is_builtin_only() {
        let config = PopulateConfig::from_toml("").unwrap();
        assert!(config.synonyms.is_empty());
        assert_eq!(config.category_table().len(), CategoryTable::builtin().len());
    }

    #[test]
    fn replace_builtin_drops_defaults() {
        let config = PopulateConfig::from_toml(
            r#"
            replace_builtin = true
            [synonyms]
            "legal" = "professional.fees"
            "#,
        )
        .unwrap();
        let table = config.category_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.normalize("Construction"), "construction");
    }

    #[test]
    fn whitespace_in_key_rejected() {
        let err = PopulateConfig::from_toml(
            r#"
            [synonyms]
            "legal" = "professional fees"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PopulateError::ConfigValidation(_)));
    }

    #[test]
    fn empty_key_rejected() {
        let err = PopulateConfig::from_toml(
            r#"
            [synonyms]
            "legal" = "  "
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty category key"));
    }

    #[test]
    fn unknown_field_is_parse_error() {
        let err = PopulateConfig::from_toml("strict = true").unwrap_err();
        assert!(matches!(err, PopulateError::ConfigParse(_)));
    }
}
