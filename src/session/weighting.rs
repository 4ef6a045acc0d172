//! Usage weighting, pruning and compression.
//!
//! ```text
//! weight(item) = usage_count(content) * decay ^ age
//! age          = distance from the newest item of the same history (newest = 0)
//! ```
//!
//! With weighting disabled every item weighs its plain usage count.
//!
//! ## Invariants
//!
//! - Pruning evicts in ascending weight order (older first on ties), so no
//!   retained item weighs less than any item evicted in the same pass.
//! - Analytics exist only for content still held by some history.

use super::history::HistoryKind;
use super::ChatSession;
use serde::Serialize;

/// One item removed by [`ChatSession::prune`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvictedItem {
    pub kind: HistoryKind,
    pub content: String,
    pub seq: u64,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    /// Evicted items, lowest weight first.
    pub evicted: Vec<EvictedItem>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }

    /// Heaviest evicted weight; every retained item weighs at least this much.
    pub fn cutoff(&self) -> Option<f64> {
        self.evicted.iter().map(|e| e.weight).fold(None, |acc, w| Some(acc.map_or(w, |a: f64| a.max(w))))
    }
}

/// Weight of an item used `usage` times and `age` steps from the newest.
pub(crate) fn item_weight(usage: u64, age: usize, decay: f64) -> f64 {
    usage as f64 * decay.powi(age.min(i32::MAX as usize) as i32)
}

impl ChatSession {
    fn decay(&self) -> f64 {
        if self.config.enable_weighting { self.config.decay() } else { 1.0 }
    }

    /// Current weight of every item across all histories.
    pub fn item_weights(&self) -> Vec<EvictedItem> {
        let decay = self.decay();
        let mut out = Vec::with_capacity(self.total_items());
        for kind in HistoryKind::ALL {
            let history = self.history(kind);
            let len = history.len();
            for (i, item) in history.iter().enumerate() {
                let usage = self.stats.get(&item.content).map_or(0, |s| s.usage_count);
                out.push(EvictedItem {
                    kind,
                    content: item.content.clone(),
                    seq: item.seq,
                    weight: item_weight(usage, len - 1 - i, decay),
                });
            }
        }
        out
    }

    pub(super) fn refresh_weights(&mut self) {
        for stats in self.stats.values_mut() {
            stats.weight = 0.0;
        }
        for item in self.item_weights() {
            if let Some(stats) = self.stats.get_mut(&item.content) {
                stats.weight = stats.weight.max(item.weight);
            }
        }
    }

    /// Evict the globally lightest items until the total is within
    /// `max_total_context`.
    pub fn prune(&mut self) -> PruneReport {
        let total = self.total_items();
        let max = self.config.max_total_context;
        if total <= max {
            return PruneReport::default();
        }

        let mut items = self.item_weights();
        items.sort_by(|a, b| a.weight.total_cmp(&b.weight).then(a.seq.cmp(&b.seq)));
        items.truncate(total - max);

        for item in &items {
            self.history_mut(item.kind).remove_seq(item.seq);
        }
        for item in &items {
            self.forget_if_unused(&item.content);
        }
        self.refresh_weights();

        tracing::debug!(session = %self.id, evicted = items.len(), "pruned session context");
        PruneReport { evicted: items }
    }

    /// Truncate the oldest items beyond `compression_threshold`. Returns how
    /// many items were shortened.
    ///
    /// The newest "that" is never shortened: it is what the next input's
    /// that-clauses match against. Contents that collapse onto the same
    /// prefix share one merged analytics record.
    pub fn compress(&mut self) -> usize {
        let total = self.total_items();
        let threshold = self.config.compression_threshold;
        if total <= threshold {
            return 0;
        }

        let newest_that = self.history(HistoryKind::That).latest(1).map(|item| item.seq);
        let mut oldest: Vec<(HistoryKind, u64)> = HistoryKind::ALL
            .iter()
            .flat_map(|&kind| self.history(kind).iter().map(move |item| (kind, item.seq)))
            .filter(|&(kind, seq)| !(kind == HistoryKind::That && Some(seq) == newest_that))
            .collect();
        oldest.sort_by_key(|&(_, seq)| seq);
        oldest.truncate(total - threshold);

        let keep = self.config.compressed_length;
        let mut shortened = 0;
        let mut renamed: Vec<(String, String)> = Vec::new();

        for (kind, seq) in oldest {
            for item in self.history_mut(kind).items_mut() {
                if item.seq != seq || item.compressed {
                    continue;
                }
                item.compressed = true;
                if item.content.chars().count() > keep {
                    let short: String = item.content.chars().take(keep).collect::<String>() + "…";
                    renamed.push((std::mem::replace(&mut item.content, short.clone()), short));
                    shortened += 1;
                }
            }
        }

        renamed.sort();
        renamed.dedup();
        for (old, new) in renamed {
            let Some(stats) = self.stats.get(&old).cloned() else {
                continue;
            };
            self.stats.entry(new).or_default().absorb(stats);
            self.forget_if_unused(&old);
        }
        shortened
    }
}
