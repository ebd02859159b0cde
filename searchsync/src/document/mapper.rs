// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Entity row → search document mapping
//!
//! The mapper is pure: no I/O, no clock, no logging. Callers decide what to
//! do with a [`MapError`] (the listener dead-letters the event, the rebuild
//! counts the row as skipped).

use rayon::prelude::*;
use thiserror::Error;

use super::types::{EntityRow, ListField, NumericField, SearchDocument, TimestampField};

/// Structurally invalid input row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Row '{id}' is missing required field '{field}'")]
    MissingFieldForId { id: String, field: &'static str },
}

impl MapError {
    pub fn field(&self) -> &'static str {
        match self {
            MapError::MissingField { field } | MapError::MissingFieldForId { field, .. } => field,
        }
    }
}

/// Stateless row mapper
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMapper;

impl DocumentMapper {
    pub fn new() -> Self {
        Self
    }

    /// Map a single row.
    ///
    /// Defaults for absent fields: empty string for `brand`/`category`, empty
    /// lists, `price = 0.0`, `stock_quantity = 0`, `is_active = true`,
    /// `created_at = 0`. Negative or non-finite numbers clamp to zero.
    pub fn map(&self, row: &EntityRow) -> Result<SearchDocument, MapError> {
        let id = row
            .entity_id()
            .ok_or(MapError::MissingField { field: "id" })?
            .to_string();

        let name = match non_empty(row.name.as_deref()) {
            Some(name) => name,
            None => return Err(MapError::MissingFieldForId { id, field: "name" }),
        };

        Ok(SearchDocument {
            id,
            name,
            brand: non_empty(row.brand.as_deref()).unwrap_or_default(),
            category: non_empty(row.category.as_deref()).unwrap_or_default(),
            subcategories: normalize_list(row.subcategories.as_ref()),
            colors: normalize_list(row.colors.as_ref()),
            sizes: normalize_list(row.sizes.as_ref()),
            materials: normalize_list(row.materials.as_ref()),
            tags: normalize_list(row.tags.as_ref()),
            price: normalize_price(row.price.as_ref()),
            stock_quantity: normalize_quantity(row.stock_quantity.as_ref()),
            is_active: row.is_active.unwrap_or(true),
            created_at: normalize_timestamp(row.created_at.as_ref()),
        })
    }

    /// Map a batch in parallel, splitting successes from failures.
    ///
    /// Output order follows input order for both halves.
    pub fn map_batch(
        &self,
        rows: &[EntityRow],
    ) -> (Vec<SearchDocument>, Vec<(Option<String>, MapError)>) {
        let mapped: Vec<_> = rows
            .par_iter()
            .map(|row| (row.entity_id().map(str::to_string), self.map(row)))
            .collect();

        let mut documents = Vec::with_capacity(mapped.len());
        let mut failures = Vec::new();
        for (id, result) in mapped {
            match result {
                Ok(doc) => documents.push(doc),
                Err(err) => failures.push((id, err)),
            }
        }
        (documents, failures)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_list(field: Option<&ListField>) -> Vec<String> {
    let raw: Vec<String> = match field {
        None => return Vec::new(),
        Some(ListField::List(items)) => items.iter().flatten().cloned().collect(),
        Some(ListField::Csv(text)) => text.split(',').map(str::to_string).collect(),
    };

    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if !out.iter().any(|existing| existing.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

fn numeric_value(field: Option<&NumericField>) -> Option<f64> {
    match field? {
        NumericField::Number(n) => Some(*n),
        NumericField::Text(text) => text.trim().parse::<f64>().ok(),
    }
}

fn normalize_price(field: Option<&NumericField>) -> f64 {
    match numeric_value(field) {
        Some(price) if price.is_finite() && price > 0.0 => price,
        _ => 0.0,
    }
}

fn normalize_quantity(field: Option<&NumericField>) -> u64 {
    match numeric_value(field) {
        Some(qty) if qty.is_finite() && qty > 0.0 => qty.trunc() as u64,
        _ => 0,
    }
}

fn normalize_timestamp(field: Option<&TimestampField>) -> i64 {
    match field {
        None => 0,
        Some(TimestampField::Millis(ms)) => (*ms).max(0),
        Some(TimestampField::Text(text)) => chrono::DateTime::parse_from_rfc3339(text.trim())
            .map(|dt| dt.timestamp_millis().max(0))
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_minimal_row_uses_defaults() {
        let doc = DocumentMapper::new()
            .map(&EntityRow::new("p1", "Classic Hoodie"))
            .unwrap();

        assert_eq!(doc.id, "p1");
        assert_eq!(doc.name, "Classic Hoodie");
        assert_eq!(doc.brand, "");
        assert!(doc.tags.is_empty());
        assert_eq!(doc.price, 0.0);
        assert_eq!(doc.stock_quantity, 0);
        assert!(doc.is_active);
        assert_eq!(doc.created_at, 0);
    }

    #[test]
    fn test_map_rejects_missing_id_and_name() {
        let mapper = DocumentMapper::new();

        let err = mapper.map(&EntityRow::default()).unwrap_err();
        assert_eq!(err, MapError::MissingField { field: "id" });

        let mut row = EntityRow::new("p2", "   ");
        let err = mapper.map(&row).unwrap_err();
        assert_eq!(err.field(), "name");

        row.id = Some("  ".to_string());
        row.name = Some("Named".to_string());
        assert_eq!(mapper.map(&row).unwrap_err().field(), "id");
    }

    #[test]
    fn test_map_normalizes_lists() {
        let row: EntityRow = serde_json::from_value(serde_json::json!({
            "id": "p3",
            "name": "Runner",
            "colors": ["Red", null, " red ", "Blue", ""],
            "sizes": "S, M ,,L",
            "tags": null
        }))
        .unwrap();

        let doc = DocumentMapper::new().map(&row).unwrap();
        assert_eq!(doc.colors, vec!["Red", "Blue"]);
        assert_eq!(doc.sizes, vec!["S", "M", "L"]);
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_map_parses_loose_numbers_and_timestamps() {
        let row: EntityRow = serde_json::from_value(serde_json::json!({
            "id": "p4",
            "name": "Boot",
            "price": "129.50",
            "stock_quantity": -3,
            "is_active": false,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        let doc = DocumentMapper::new().map(&row).unwrap();
        assert_eq!(doc.price, 129.5);
        assert_eq!(doc.stock_quantity, 0);
        assert!(!doc.is_active);
        assert_eq!(doc.created_at, 1_704_067_200_000);
    }

    #[test]
    fn test_map_is_deterministic() {
        let row = EntityRow::new("p5", "Tee")
            .with_tags(&["cotton", "summer"])
            .with_price(19.0);
        let mapper = DocumentMapper::new();
        assert_eq!(mapper.map(&row).unwrap(), mapper.map(&row).unwrap());
    }

    #[test]
    fn test_map_batch_splits_failures() {
        let rows = vec![
            EntityRow::new("a", "A"),
            EntityRow::default(),
            EntityRow::new("c", ""),
            EntityRow::new("d", "D"),
        ];

        let (docs, failures) = DocumentMapper::new().map_batch(&rows);
        assert_eq!(
            docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "d"]
        );
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, None);
        assert_eq!(failures[1].0.as_deref(), Some("c"));
    }
}
