//! Bounded FIFO histories.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Request,
    Response,
    That,
}

impl HistoryKind {
    pub const ALL: [HistoryKind; 3] = [HistoryKind::Request, HistoryKind::Response, HistoryKind::That];

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryKind::Request => "request",
            HistoryKind::Response => "response",
            HistoryKind::That => "that",
        }
    }
}

/// One remembered turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub content: String,
    /// Session-wide insertion counter; lower is older across all histories.
    pub seq: u64,
    /// Whether `content` was truncated by compression.
    pub compressed: bool,
}

/// A history capped at `max_depth` items; the oldest item leaves first.
#[derive(Debug, Clone)]
pub struct History {
    kind: HistoryKind,
    items: VecDeque<HistoryItem>,
    max_depth: usize,
}

impl History {
    pub(crate) fn new(kind: HistoryKind, max_depth: usize) -> Self {
        History { kind, items: VecDeque::with_capacity(max_depth.min(64)), max_depth }
    }

    pub fn kind(&self) -> HistoryKind {
        self.kind
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryItem> {
        self.items.iter()
    }

    /// Item `n` back, 1-based (1 = most recent).
    pub fn latest(&self, n: usize) -> Option<&HistoryItem> {
        if n == 0 || n > self.items.len() {
            return None;
        }
        self.items.get(self.items.len() - n)
    }

    /// Contents, oldest first.
    pub fn contents(&self) -> Vec<String> {
        self.items.iter().map(|i| i.content.clone()).collect()
    }

    pub fn contains(&self, content: &str) -> bool {
        self.items.iter().any(|i| i.content == content)
    }

    /// Append `item`, returning whatever fell off the front.
    pub(crate) fn push(&mut self, item: HistoryItem) -> Vec<HistoryItem> {
        self.items.push_back(item);
        let mut evicted = Vec::new();
        while self.items.len() > self.max_depth {
            match self.items.pop_front() {
                Some(old) => evicted.push(old),
                None => break,
            }
        }
        evicted
    }

    pub(crate) fn remove_seq(&mut self, seq: u64) -> Option<HistoryItem> {
        let pos = self.items.iter().position(|i| i.seq == seq)?;
        self.items.remove(pos)
    }

    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut HistoryItem> {
        self.items.iter_mut()
    }
}
