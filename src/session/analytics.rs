//! Typed per-item analytics and session snapshots.

use super::history::HistoryItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A metadata value attached to a history item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetaValue {
    Text(String),
    Number(f64),
    Flag(bool),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for MetaValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaValue::Text(s) => f.write_str(s),
            MetaValue::Number(n) => write!(f, "{n}"),
            MetaValue::Flag(b) => write!(f, "{b}"),
            MetaValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// Analytics for one distinct history content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    /// Times the content was inserted or reused.
    pub usage_count: u64,
    /// Highest current weight among the items holding this content.
    pub weight: f64,
    pub tags: BTreeSet<String>,
    pub metadata: BTreeMap<String, MetaValue>,
}

impl ItemStats {
    /// Fold `other` into `self`: usage counts add, tags and metadata unite
    /// (existing metadata keys win).
    pub(crate) fn absorb(&mut self, other: ItemStats) {
        self.usage_count += other.usage_count;
        self.weight = self.weight.max(other.weight);
        self.tags.extend(other.tags);
        for (key, value) in other.metadata {
            self.metadata.entry(key).or_insert(value);
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub topic: String,
    pub variables: BTreeMap<String, String>,
    pub requests: Vec<HistoryItem>,
    pub responses: Vec<HistoryItem>,
    pub thats: Vec<HistoryItem>,
    pub stats: BTreeMap<String, ItemStats>,
}
