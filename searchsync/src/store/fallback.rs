// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Degraded-mode matching shared by the primary store implementations
//!
//! Rows go through the same mapper and filters as indexed documents, so a
//! fallback result never contains an inactive or unmappable entity.

use crate::document::{DocumentMapper, EntityRow, SearchDocument};
use crate::search::{FacetCounts, FacetQuery, SearchPage, SearchQuery};

/// Name hits outrank brand hits; prefix hits outrank inner substrings.
fn fallback_score(doc: &SearchDocument, needle: &str) -> Option<u32> {
    let mut score = 0;
    for (field, weight) in [(&doc.name, 4), (&doc.brand, 2)] {
        let haystack = field.to_lowercase();
        if haystack.starts_with(needle) {
            score += weight + 1;
        } else if haystack.contains(needle) {
            score += weight;
        }
    }
    (score > 0).then_some(score)
}

pub fn search_rows<'a, I>(rows: I, query: &SearchQuery) -> SearchPage
where
    I: IntoIterator<Item = &'a EntityRow>,
{
    let mapper = DocumentMapper::new();
    let needle = query
        .text
        .as_deref()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty());

    let scored: Vec<(u32, SearchDocument)> = rows
        .into_iter()
        .filter_map(|row| mapper.map(row).ok())
        .filter(|doc| query.filters.matches(doc))
        .filter_map(|doc| match &needle {
            None => Some((0, doc)),
            Some(needle) => fallback_score(&doc, needle).map(|s| (s, doc)),
        })
        .collect();

    SearchPage::from_scored(scored, query)
}

pub fn facet_rows<'a, I>(rows: I, query: &FacetQuery) -> FacetCounts
where
    I: IntoIterator<Item = &'a EntityRow>,
{
    let mapper = DocumentMapper::new();
    let mut counts = FacetCounts::default();
    for doc in rows.into_iter().filter_map(|row| mapper.map(row).ok()) {
        if query.matches(&doc) {
            counts.accumulate(&doc);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<EntityRow> {
        vec![
            EntityRow::new("p1", "Classic Hoodie").with_brand("Northwind"),
            EntityRow::new("p2", "Trail Shoe").with_brand("HoodieCo"),
            EntityRow::new("p3", "Zip HOODIE")
                .with_brand("Acme")
                .with_active(false),
            EntityRow::new("p4", "Rain Jacket").with_brand("Acme"),
        ]
    }

    #[test]
    fn test_search_rows_matches_name_or_brand_case_insensitively() {
        let rows = rows();
        let page = search_rows(&rows, &SearchQuery::text("hoodie"));

        let ids: Vec<_> = page.hits.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(page.total, 2);
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_search_rows_without_text_lists_active_rows() {
        let rows = rows();
        let page = search_rows(&rows, &SearchQuery::default());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_facet_rows_skip_inactive() {
        let rows = rows();
        let counts = facet_rows(&rows, &FacetQuery::default());
        assert_eq!(counts.brands.get("Acme"), Some(&1));
        assert_eq!(counts.brands.get("Northwind"), Some(&1));
    }
}
