// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Index generation naming
//!
//! Generations are `{base}_{version}`; a rebuild in progress populates
//! `{base}_{version}_temp`. The base name itself is the alias user traffic
//! reads through, which is why it may not contain `_`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const TEMP_SUFFIX: &str = "_temp";

/// A promoted, queryable generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub name: String,
    pub version: u64,
    pub activated_at: DateTime<Utc>,
}

impl Generation {
    pub fn new(base: &str, version: u64) -> Self {
        Self {
            name: generation_name(base, version),
            version,
            activated_at: Utc::now(),
        }
    }
}

pub fn generation_name(base: &str, version: u64) -> String {
    format!("{}_{}", base, version)
}

pub fn temp_name(base: &str, version: u64) -> String {
    format!("{}_{}{}", base, version, TEMP_SUFFIX)
}

/// Parsed index name belonging to `base`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedName {
    pub version: u64,
    pub temp: bool,
}

/// Recognize `{base}_{n}` and `{base}_{n}_temp`
pub fn parse_name(base: &str, name: &str) -> Option<ParsedName> {
    let rest = name.strip_prefix(base)?.strip_prefix('_')?;
    let (digits, temp) = match rest.strip_suffix(TEMP_SUFFIX) {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits
        .parse()
        .ok()
        .map(|version| ParsedName { version, temp })
}
