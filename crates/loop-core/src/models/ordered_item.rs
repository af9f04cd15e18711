//! Ordered collection item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for an ordered item, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifies a sibling group whose members share one dense order sequence.
///
/// Collection types (`snomed`, `category`, `persona`) are the common
/// partitions, but any non-empty key works, e.g. a taxonomy parent id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub const SNOMED: &'static str = "snomed";
    pub const CATEGORY: &'static str = "category";
    pub const PERSONA: &'static str = "persona";

    /// Create a partition key, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "Partition key must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn snomed() -> Self {
        Self(Self::SNOMED.to_string())
    }

    #[must_use]
    pub fn category() -> Self {
        Self(Self::CATEGORY.to_string())
    }

    #[must_use]
    pub fn persona() -> Self {
        Self(Self::PERSONA.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartitionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A member of an ordered partition (SNOMED code, category, persona, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    /// Unique identifier
    pub id: ItemId,
    /// Sibling group this item is ordered within
    pub partition: PartitionKey,
    /// Display name (for SNOMED collections, the code)
    pub name: String,
    /// 1-based position within the partition
    pub order: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl OrderedItem {
    /// Create a new item at the requested position
    #[must_use]
    pub fn new(partition: PartitionKey, name: impl Into<String>, order: i64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: ItemId::new(),
            partition,
            name: name.into(),
            order,
            created_at: now,
            updated_at: now,
        }
    }
}
