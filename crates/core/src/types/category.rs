//! Categories derived from the free-text product type.
//!
//! Categories are not stored anywhere. They are computed once per catalog
//! scan from each product's `productType`, and both the category listing and
//! the category bulk-apply read from the same [`CategoryIndex`].

use std::collections::HashMap;

use serde::Serialize;

use super::id::ProductGid;

/// Label given to products whose type is unset or blank.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Normalize a raw product type into a category label.
#[must_use]
pub fn category_label(product_type: Option<&str>) -> &str {
    match product_type {
        Some(t) if !t.trim().is_empty() => t,
        _ => UNCATEGORIZED,
    }
}

/// One category in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Display name (the first spelling seen for this group).
    pub name: String,
    pub product_count: usize,
    pub products: Vec<ProductGid>,
}

/// Products grouped by category for one catalog scan.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    /// Exact label for every product, in catalog order.
    labelled: Vec<(ProductGid, String)>,
}

impl CategoryIndex {
    /// Build the index from `(product id, product type)` pairs.
    pub fn build<'a, I>(products: I) -> Self
    where
        I: IntoIterator<Item = (&'a ProductGid, Option<&'a str>)>,
    {
        let labelled = products
            .into_iter()
            .map(|(id, product_type)| (id.clone(), category_label(product_type).to_string()))
            .collect();
        Self { labelled }
    }

    /// Number of products scanned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labelled.len()
    }

    /// Whether the scan found no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labelled.is_empty()
    }

    /// Products whose label equals `label` exactly (case-sensitive).
    pub fn members_exact<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ProductGid> + 'a {
        self.labelled
            .iter()
            .filter(move |(_, l)| l == label)
            .map(|(id, _)| id)
    }

    /// Category listing, grouped case-insensitively.
    ///
    /// Sorted by product count (descending), then name. When `search` is
    /// given only categories whose name contains it (case-insensitive) are
    /// returned.
    #[must_use]
    pub fn categories(&self, search: Option<&str>) -> Vec<Category> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Category> = HashMap::new();

        for (id, label) in &self.labelled {
            let key = label.to_lowercase();
            let entry = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Category {
                    name: label.clone(),
                    product_count: 0,
                    products: Vec::new(),
                }
            });
            entry.product_count += 1;
            entry.products.push(id.clone());
        }

        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut categories: Vec<Category> = order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .filter(|c| {
                needle
                    .as_ref()
                    .is_none_or(|n| c.name.to_lowercase().contains(n.as_str()))
            })
            .collect();

        categories.sort_by(|a, b| {
            b.product_count
                .cmp(&a.product_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        categories
    }
}
