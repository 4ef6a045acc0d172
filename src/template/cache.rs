//! Response cache.
//!
//! Keys are SHA-256 digests over everything a deterministic template can
//! observe:
//!
//! ```text
//! template text | wildcard slots | locals (sorted) | session variables (sorted)
//!               | that history (self-matching templates) | topic | session id | knowledge-base generation
//! ```
//!
//! Entries are evicted first-in, first-out once `capacity` is reached.

use super::context::VariableContext;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        TemplateCache { capacity, ..TemplateCache::default() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.entries.remove(&old);
                }
                None => break,
            }
        }
    }

    /// Cache key for evaluating `template` in `ctx`. The that history only
    /// matters to templates that self-match.
    pub(crate) fn key(template: &str, ctx: &VariableContext<'_>, with_that: bool) -> String {
        let mut hasher = Sha256::new();
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        field(template.as_bytes());
        for (slot, value) in ctx.wildcards.iter() {
            field(slot.as_bytes());
            field(value.as_bytes());
        }
        field(b"locals");
        for (k, v) in sorted(ctx.locals.iter()) {
            field(k.as_bytes());
            field(v.as_bytes());
        }
        field(b"session");
        if let Some(session) = ctx.session.as_deref() {
            field(session.id().as_bytes());
            for (k, v) in sorted(session.variables().iter()) {
                field(k.as_bytes());
                field(v.as_bytes());
            }
            if with_that {
                field(b"that");
                for that in session.that_history() {
                    field(that.as_bytes());
                }
            }
        }
        field(ctx.topic.as_bytes());
        field(&ctx.kb.generation().to_le_bytes());

        format!("{:x}", hasher.finalize())
    }
}

fn sorted<'a>(iter: impl Iterator<Item = (&'a String, &'a String)>) -> Vec<(&'a String, &'a String)> {
    let mut items: Vec<_> = iter.collect();
    items.sort();
    items
}
