//! Match and template metrics.
//!
//! Small structs used to observe and debug how a response was produced.
//!
//! The intended usage is:
//!
//! - `PatternMatcher::find` always fills [`MatchMetrics`]; it is cheap (a
//!   strategy tag, a few counters and one timer).
//! - `TemplateEngine::evaluate_with_metrics` collects per-pass timings for
//!   profiling the tag pipeline.
//! - `Bot::respond_verbose` bundles both for the CLI's `--verbose` report.
//!
//! ## Design notes
//!
//! - `MatchMetrics::ranked` holds every candidate that matched during a scan,
//!   best first. It is empty for the exact and indexed strategies, which stop
//!   at the first hit.

use crate::CategoryId;
use std::time::Duration;

// --- Matching ------------------------------------------------------------------

/// Which step of the match algorithm produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// A `$` exact pattern.
    Exact,
    /// Direct composite-key lookup.
    Indexed,
    /// Priority-ranked scan over all categories.
    #[default]
    Scan,
    /// The `DEFAULT` fallback category.
    Default,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Indexed => "indexed",
            MatchStrategy::Scan => "scan",
            MatchStrategy::Default => "default",
        }
    }
}

/// One matching candidate seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    pub id: CategoryId,
    pub pattern: String,
    pub score: u64,
}

#[derive(Debug, Default, Clone)]
pub struct MatchMetrics {
    pub strategy: MatchStrategy,
    /// Categories whose pattern was actually tested.
    pub considered: usize,
    /// Categories skipped by the required-word gate.
    pub gated: usize,
    /// Categories that matched (input, topic and that).
    pub matched: usize,
    /// Elapsed time for `PatternMatcher::find`.
    pub duration: Duration,
    /// Matching candidates, best first (scan strategy only).
    pub ranked: Vec<RankedCandidate>,
}

// --- Templates -----------------------------------------------------------------

/// Timing for one tag handler pass.
#[derive(Debug, Clone)]
pub struct PassMetrics {
    /// Handler name (`star`, `variables`, ...).
    pub handler: &'static str,
    /// Self-match depth the pass ran at (0 = top-level template).
    pub depth: usize,
    /// Elements the handler rewrote.
    pub processed: usize,
    pub duration: Duration,
}

#[derive(Debug, Default, Clone)]
pub struct TemplateMetrics {
    /// Passes in execution order, including those of nested evaluations.
    pub passes: Vec<PassMetrics>,
    /// Whether the response came from the cache.
    pub cache_hit: bool,
    pub total: Duration,
}
