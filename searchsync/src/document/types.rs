// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity rows and search documents
//!
//! [`EntityRow`] is what the primary store hands us: every field optional and
//! loosely typed, because rows arrive both from table scans and from change
//! feed snapshots. [`SearchDocument`] is the normalized, schema-safe shape the
//! search engine stores.

use serde::{Deserialize, Serialize};

/// Normalized document stored in a search index generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub materials: Vec<String>,
    pub tags: Vec<String>,
    pub price: f64,
    pub stock_quantity: u64,
    pub is_active: bool,
    /// Epoch millis, used for recency sort
    pub created_at: i64,
}

impl SearchDocument {
    /// Text fields considered by full-text matching, with their weights
    pub fn weighted_fields(&self) -> Vec<(&str, u32)> {
        let mut fields = vec![
            (self.name.as_str(), 4),
            (self.brand.as_str(), 3),
            (self.category.as_str(), 2),
        ];
        for value in self
            .subcategories
            .iter()
            .chain(self.tags.iter())
            .chain(self.colors.iter())
            .chain(self.materials.iter())
        {
            fields.push((value.as_str(), 1));
        }
        fields
    }

    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

/// Raw entity row as read from the primary store or a change snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub subcategories: Option<ListField>,
    pub colors: Option<ListField>,
    pub sizes: Option<ListField>,
    pub materials: Option<ListField>,
    pub tags: Option<ListField>,
    pub price: Option<NumericField>,
    pub stock_quantity: Option<NumericField>,
    pub is_active: Option<bool>,
    pub created_at: Option<TimestampField>,
}

impl EntityRow {
    /// Convenience constructor used by collaborators and tests
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(NumericField::Number(price));
        self
    }

    pub fn with_stock(mut self, quantity: i64) -> Self {
        self.stock_quantity = Some(NumericField::Number(quantity as f64));
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = Some(ListField::from_slice(tags));
        self
    }

    pub fn with_colors(mut self, colors: &[&str]) -> Self {
        self.colors = Some(ListField::from_slice(colors));
        self
    }

    pub fn with_sizes(mut self, sizes: &[&str]) -> Self {
        self.sizes = Some(ListField::from_slice(sizes));
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    pub fn with_created_at(mut self, millis: i64) -> Self {
        self.created_at = Some(TimestampField::Millis(millis));
        self
    }

    /// Trimmed id, if present and non-empty
    pub fn entity_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// List-valued column: either a JSON array or a comma separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListField {
    List(Vec<Option<String>>),
    Csv(String),
}

impl ListField {
    pub fn from_slice(values: &[&str]) -> Self {
        ListField::List(values.iter().map(|v| Some(v.to_string())).collect())
    }
}

/// Numeric column that may be serialized as a number or a decimal string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

/// Timestamp column: epoch millis or an RFC 3339 string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampField {
    Millis(i64),
    Text(String),
}
