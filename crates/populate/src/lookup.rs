use std::collections::HashMap;

use crate::model::DataItem;
use crate::normalize::CategoryTable;

/// Strip surrounding whitespace and angle brackets from a code or token.
pub fn strip_brackets(code: &str) -> &str {
    code.trim().trim_start_matches('<').trim_end_matches('>').trim()
}

/// Item-code index over eligible items.
///
/// Three tiers are consulted in order: the code exactly as written, the code
/// without brackets, and a lowercase shadow of both. The first item to claim
/// a key keeps it.
#[derive(Debug, Default)]
pub struct CodeLookup<'a> {
    exact: HashMap<&'a str, &'a DataItem>,
    stripped: HashMap<&'a str, &'a DataItem>,
    lower: HashMap<String, &'a DataItem>,
}

impl<'a> CodeLookup<'a> {
    pub fn build(items: &'a [DataItem]) -> Self {
        let mut lookup = Self::default();
        for item in items.iter().filter(|i| i.is_eligible()) {
            let Some(code) = item.code() else {
                continue;
            };
            if let Some(first) = lookup.exact.get(code) {
                log::warn!(
                    "item code {code} is used by both '{}' and '{}', keeping the first",
                    first.id,
                    item.id
                );
                continue;
            }
            lookup.exact.insert(code, item);
            let bare = strip_brackets(code);
            lookup.stripped.entry(bare).or_insert(item);
            lookup.lower.entry(code.to_lowercase()).or_insert(item);
            lookup.lower.entry(bare.to_lowercase()).or_insert(item);
        }
        lookup
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn lookup(&self, token: &str) -> Option<&'a DataItem> {
        let bare = strip_brackets(token);
        self.exact
            .get(token)
            .or_else(|| self.stripped.get(bare))
            .or_else(|| self.lower.get(&token.to_lowercase()))
            .or_else(|| self.lower.get(&bare.to_lowercase()))
            .copied()
    }
}

/// Eligible items partitioned by canonical category, in input order.
#[derive(Debug, Default)]
pub struct CategoryPools<'a> {
    pools: HashMap<String, Vec<&'a DataItem>>,
}

impl<'a> CategoryPools<'a> {
    pub fn build(items: &'a [DataItem], table: &CategoryTable) -> Self {
        let mut pools: HashMap<String, Vec<&'a DataItem>> = HashMap::new();
        for item in items.iter().filter(|i| i.is_eligible()) {
            pools.entry(table.normalize(&item.category)).or_default().push(item);
        }
        Self { pools }
    }

    /// Pool for a template category: the literal path first, then its
    /// normalized form.
    pub fn resolve(&self, category: &str, table: &CategoryTable) -> &[&'a DataItem] {
        if let Some(pool) = self.pools.get(category) {
            return pool;
        }
        self.pools
            .get(&table.normalize(category))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn category_count(&self) -> usize {
        self.pools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, MappingStatus};

    fn item(id: &str, code: Option<&str>, category: &str, status: MappingStatus) -> DataItem {
        DataItem {
            id: id.into(),
            original_name: format!("item {id}"),
            item_code: code.map(str::to_string),
            value: serde_json::json!(1),
            data_type: DataType::Number,
            category: category.into(),
            mapping_status: status,
            confidence: None,
        }
    }

    #[test]
    fn lookup_tiers() {
        let items = vec![
            item("a", Some("<site.purchase.price>"), "", MappingStatus::Confirmed),
            item("b", Some("Total.Cost"), "", MappingStatus::Matched),
        ];
        let lookup = CodeLookup::build(&items);
        assert_eq!(lookup.len(), 2);
        // exact
        assert_eq!(lookup.lookup("<site.purchase.price>").unwrap().id, "a");
        // bracket-stripped
        assert_eq!(lookup.lookup("<Total.Cost>").unwrap().id, "b");
        // case-insensitive
        assert_eq!(lookup.lookup("<SITE.PURCHASE.PRICE>").unwrap().id, "a");
        assert_eq!(lookup.lookup("<total.cost>").unwrap().id, "b");
        assert!(lookup.lookup("<unknown.code>").is_none());
    }

    #[test]
    fn ineligible_and_codeless_items_are_skipped() {
        let items = vec![
            item("a", Some("<x>"), "", MappingStatus::Suggested),
            item("b", None, "", MappingStatus::Confirmed),
            item("c", Some(""), "", MappingStatus::Confirmed),
        ];
        let lookup = CodeLookup::build(&items);
        assert!(lookup.is_empty());
        assert!(lookup.lookup("<x>").is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let items = vec![
            item("first", Some("<dup>"), "", MappingStatus::Confirmed),
            item("second", Some("<dup>"), "", MappingStatus::Confirmed),
            item("third", Some("DUP"), "", MappingStatus::Confirmed),
        ];
        let lookup = CodeLookup::build(&items);
        assert_eq!(lookup.lookup("<dup>").unwrap().id, "first");
        assert_eq!(lookup.lookup("<DUP>").unwrap().id, "third");
        assert_eq!(lookup.lookup("<Dup>").unwrap().id, "first");
    }

    #[test]
    fn pools_by_normalized_category() {
        let items = vec![
            item("1", None, "Profesional Fees", MappingStatus::Confirmed),
            item("2", None, "professional", MappingStatus::Matched),
            item("3", None, "Professional Fees", MappingStatus::PendingReview),
            item("4", None, "Planning Obligations", MappingStatus::Confirmed),
        ];
        let table = CategoryTable::builtin();
        let pools = CategoryPools::build(&items, &table);
        assert_eq!(pools.category_count(), 2);

        let fees: Vec<&str> = pools
            .resolve("professional.fees", &table)
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(fees, vec!["1", "2"]);
        assert_eq!(pools.resolve("planning obligations", &table).len(), 1);
        assert!(pools.resolve("marketing", &table).is_empty());
    }
}
