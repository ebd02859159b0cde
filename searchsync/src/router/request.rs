// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read requests and their validation
//!
//! Raw parameters arrive as strings. They are validated and normalized
//! (trimmed, lowercased, list values sorted and deduplicated) before any
//! cache or engine access, so two spellings of the same request share a
//! cache key and bad input never reaches a backend.

use serde::{Deserialize, Serialize};

use super::errors::RouterError;
use super::router_config::RouterConfig;
use crate::cache::{CacheKeyBuilder, ContentTier};
use crate::search::{FacetQuery, SearchFilters, SearchQuery, SortOrder};

const MAX_ID_LEN: usize = 128;

/// Raw search parameters, as received on the query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    /// Comma separated
    pub brand: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub material: Option<String>,
    pub tag: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub in_stock: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self, config: &RouterConfig) -> Result<SearchQuery, RouterError> {
        let text = match normalize_text(self.q.as_deref()) {
            Some(text) if text.chars().count() > config.max_query_len => {
                return Err(RouterError::invalid(
                    "q",
                    format!("must be at most {} characters", config.max_query_len),
                ));
            }
            other => other,
        };

        let min_price = parse_price("min_price", self.min_price.as_deref())?;
        let max_price = parse_price("max_price", self.max_price.as_deref())?;
        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(RouterError::invalid(
                    "min_price",
                    "must not exceed max_price",
                ));
            }
        }

        let filters = SearchFilters {
            category: normalize_text(self.category.as_deref()),
            brands: parse_list("brand", self.brand.as_deref(), config)?,
            colors: parse_list("color", self.color.as_deref(), config)?,
            sizes: parse_list("size", self.size.as_deref(), config)?,
            materials: parse_list("material", self.material.as_deref(), config)?,
            tags: parse_list("tag", self.tag.as_deref(), config)?,
            min_price,
            max_price,
            in_stock: parse_bool("in_stock", self.in_stock.as_deref())?,
        };

        let sort = match self.sort.as_deref() {
            None => SortOrder::default(),
            Some(raw) => raw
                .parse::<SortOrder>()
                .map_err(|e| RouterError::invalid("sort", e))?,
        };

        let page = parse_bounded("page", self.page.as_deref(), 1, 1, config.max_page)?;
        let limit = parse_bounded(
            "limit",
            self.limit.as_deref(),
            config.default_limit,
            1,
            config.max_limit,
        )?;

        Ok(SearchQuery {
            text,
            filters,
            sort,
            page,
            limit,
        })
    }
}

/// Raw facet parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetParams {
    pub category: Option<String>,
}

impl FacetParams {
    pub fn validate(&self) -> FacetQuery {
        FacetQuery {
            category: normalize_text(self.category.as_deref()),
        }
    }
}

/// Validate an entity id: 1..=128 characters of `[A-Za-z0-9_-]`
pub fn validate_entity_id(raw: &str) -> Result<String, RouterError> {
    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(RouterError::invalid(
            "id",
            format!("must be 1 to {} characters", MAX_ID_LEN),
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(RouterError::invalid("id", "may only contain [A-Za-z0-9_-]"));
    }
    Ok(id.to_string())
}

/// A validated read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryRequest {
    Search(SearchQuery),
    Entity { id: String },
    Facets(FacetQuery),
}

impl QueryRequest {
    /// Content tier, which selects namespace, TTL and CDN windows.
    /// Searches without text are listings.
    pub fn tier(&self) -> ContentTier {
        match self {
            QueryRequest::Search(query) if query.text.is_some() => ContentTier::Search,
            QueryRequest::Search(_) => ContentTier::Listing,
            QueryRequest::Entity { .. } => ContentTier::Entity,
            QueryRequest::Facets(_) => ContentTier::Facets,
        }
    }

    pub fn cache_key(&self, builder: &CacheKeyBuilder) -> Option<String> {
        let namespace = self.tier().namespace();
        match self {
            QueryRequest::Entity { id } => Some(builder.entity_key(id)),
            QueryRequest::Search(query) => builder.build_for(namespace, query).ok(),
            QueryRequest::Facets(query) => builder.build_for(namespace, query).ok(),
        }
    }
}

fn normalize_text(raw: Option<&str>) -> Option<String> {
    let joined = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then(|| joined.to_lowercase())
}

fn parse_list(
    field: &str,
    raw: Option<&str>,
    config: &RouterConfig,
) -> Result<Vec<String>, RouterError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let mut values: Vec<String> = raw
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    if values.len() > config.max_filter_values {
        return Err(RouterError::invalid(
            field,
            format!("accepts at most {} values", config.max_filter_values),
        ));
    }
    Ok(values)
}

fn parse_price(field: &str, raw: Option<&str>) -> Result<Option<f64>, RouterError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(RouterError::invalid(field, "must be a non-negative number")),
    }
}

fn parse_bool(field: &str, raw: Option<&str>) -> Result<bool, RouterError> {
    match raw.map(|r| r.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(_) => Err(RouterError::invalid(field, "must be true or false")),
    }
}

fn parse_bounded(
    field: &str,
    raw: Option<&str>,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32, RouterError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(RouterError::invalid(
            field,
            format!("must be an integer between {} and {}", min, max),
        )),
    }
}
