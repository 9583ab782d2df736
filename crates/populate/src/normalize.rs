//! Category label normalization.
//!
//! Upstream categories are free text typed by people and models alike, so
//! the same bucket arrives as "Professional Fees", "profesional fees" or
//! "Prof fees". A [`CategoryTable`] maps known spellings onto one canonical
//! key and derives a dotted key for everything else.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Built-in spellings, keyed by the normalized lookup form.
const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    // professional fees
    ("professional fees", "professional.fees"),
    ("profesional fees", "professional.fees"),
    ("professioal fees", "professional.fees"),
    ("proffesional fees", "professional.fees"),
    ("professional fee", "professional.fees"),
    ("professional", "professional.fees"),
    ("profesional", "professional.fees"),
    ("professioal", "professional.fees"),
    ("prof fees", "professional.fees"),
    ("fees", "professional.fees"),
    // construction
    ("construction", "construction.costs"),
    ("construction costs", "construction.costs"),
    ("construction cost", "construction.costs"),
    ("constrution costs", "construction.costs"),
    ("build costs", "construction.costs"),
    ("build cost", "construction.costs"),
    ("build", "construction.costs"),
    ("works", "construction.costs"),
    // disposal
    ("disposal", "disposal.costs"),
    ("disposal fees", "disposal.costs"),
    ("disposal costs", "disposal.costs"),
    ("disposal cost", "disposal.costs"),
    ("sales costs", "disposal.costs"),
    ("selling costs", "disposal.costs"),
    // acquisition
    ("acquisition", "acquisition.costs"),
    ("acquisition costs", "acquisition.costs"),
    ("acquisition cost", "acquisition.costs"),
    ("aquisition costs", "acquisition.costs"),
    ("purchase costs", "acquisition.costs"),
    ("purchase", "acquisition.costs"),
    // finance
    ("finance", "finance.costs"),
    ("finance costs", "finance.costs"),
    ("finance cost", "finance.costs"),
    ("financing costs", "finance.costs"),
    ("interest", "finance.costs"),
    // everything else
    ("other", "other.costs"),
    ("other costs", "other.costs"),
    ("misc", "other.costs"),
    ("miscellaneous", "other.costs"),
    ("contingency", "other.costs"),
];

static BUILTIN: Lazy<CategoryTable> = Lazy::new(CategoryTable::builtin);

/// Immutable synonym table. Build once, share by reference.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    entries: HashMap<String, String>,
}

impl CategoryTable {
    /// An empty table: every label takes the dotted fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::empty().with_synonyms(
            BUILTIN_SYNONYMS.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    /// Add or replace entries. Keys are matched after lowercasing and
    /// collapsing whitespace, the same as lookups.
    pub fn with_synonyms<I>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (label, canonical) in synonyms {
            self.entries.insert(lookup_form(&label), canonical.trim().to_string());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical key for a raw label. Total and deterministic.
    pub fn normalize(&self, raw: &str) -> String {
        let key = lookup_form(raw);
        if let Some(canonical) = self.entries.get(&key) {
            return canonical.clone();
        }
        key.replace(' ', ".")
    }
}

/// Normalize against the built-in table only.
pub fn normalize_category(raw: &str) -> String {
    BUILTIN.normalize(raw)
}

/// Lowercase, trim, and collapse whitespace runs to single spaces.
fn lookup_form(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
