// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query, filter and result types shared by the search engine and the
//! primary-store fallback

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::document::SearchDocument;

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "relevance" => Ok(SortOrder::Relevance),
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "newest" => Ok(SortOrder::Newest),
            other => Err(format!(
                "Unknown sort order: {}. Valid options: relevance, price_asc, price_desc, newest",
                other
            )),
        }
    }
}

/// Structured filters. Values within one field are OR-ed, fields are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub brands: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub materials: Vec<String>,
    pub tags: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock: bool,
}

impl SearchFilters {
    /// Whether a document passes every filter. Inactive documents never pass.
    pub fn matches(&self, doc: &SearchDocument) -> bool {
        if !doc.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            let in_sub = doc
                .subcategories
                .iter()
                .any(|s| s.eq_ignore_ascii_case(category));
            if !doc.category.eq_ignore_ascii_case(category) && !in_sub {
                return false;
            }
        }
        if !self.brands.is_empty() && !any_eq(&self.brands, std::slice::from_ref(&doc.brand)) {
            return false;
        }
        if !self.colors.is_empty() && !any_eq(&self.colors, &doc.colors) {
            return false;
        }
        if !self.sizes.is_empty() && !any_eq(&self.sizes, &doc.sizes) {
            return false;
        }
        if !self.materials.is_empty() && !any_eq(&self.materials, &doc.materials) {
            return false;
        }
        if !self.tags.is_empty() && !any_eq(&self.tags, &doc.tags) {
            return false;
        }
        if let Some(min) = self.min_price {
            if doc.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if doc.price > max {
                return false;
            }
        }
        if self.in_stock && !doc.in_stock() {
            return false;
        }
        true
    }
}

fn any_eq(wanted: &[String], have: &[String]) -> bool {
    wanted
        .iter()
        .any(|w| have.iter().any(|h| h.eq_ignore_ascii_case(w)))
}

/// A full-text and/or filtered search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub filters: SearchFilters,
    pub sort: SortOrder,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            filters: SearchFilters::default(),
            sort: SortOrder::Relevance,
            page: 1,
            limit: 24,
        }
    }
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub hits: Vec<SearchDocument>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl SearchPage {
    /// Sort scored candidates and cut the requested page.
    ///
    /// Ties break on id so pages are stable across calls.
    pub fn from_scored(mut scored: Vec<(u32, SearchDocument)>, query: &SearchQuery) -> Self {
        scored.sort_by(|(sa, a), (sb, b)| {
            let primary = match query.sort {
                SortOrder::Relevance => sb.cmp(sa).then(b.created_at.cmp(&a.created_at)),
                SortOrder::PriceAsc => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
                SortOrder::PriceDesc => b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal),
                SortOrder::Newest => b.created_at.cmp(&a.created_at),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = scored.len();
        let hits = scored
            .into_iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .map(|(_, doc)| doc)
            .collect();

        SearchPage {
            hits,
            total,
            page: query.page,
            limit: query.limit,
        }
    }
}

/// Facet count request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetQuery {
    pub category: Option<String>,
}

impl FacetQuery {
    pub fn matches(&self, doc: &SearchDocument) -> bool {
        let filters = SearchFilters {
            category: self.category.clone(),
            ..SearchFilters::default()
        };
        filters.matches(doc)
    }
}

/// Value → document count per facet field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCounts {
    pub brands: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
    pub colors: BTreeMap<String, usize>,
    pub sizes: BTreeMap<String, usize>,
    pub materials: BTreeMap<String, usize>,
    pub tags: BTreeMap<String, usize>,
}

impl FacetCounts {
    pub fn accumulate(&mut self, doc: &SearchDocument) {
        fn bump(map: &mut BTreeMap<String, usize>, value: &str) {
            if !value.is_empty() {
                *map.entry(value.to_string()).or_default() += 1;
            }
        }

        bump(&mut self.brands, &doc.brand);
        bump(&mut self.categories, &doc.category);
        for color in &doc.colors {
            bump(&mut self.colors, color);
        }
        for size in &doc.sizes {
            bump(&mut self.sizes, size);
        }
        for material in &doc.materials {
            bump(&mut self.materials, material);
        }
        for tag in &doc.tags {
            bump(&mut self.tags, tag);
        }
    }
}
