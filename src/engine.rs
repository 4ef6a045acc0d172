//! Pattern matching engine.
//!
//! This module is the *public entry point* for matching. It is split into
//! focused submodules under `src/engine/` while keeping public paths stable
//! (for example `crate::engine::PatternMatcher` and `crate::engine::WildcardMask`).
//!
//! ## How the parts work together
//!
//! At a high level, answering "which category handles this input?" is a
//! pipeline:
//!
//! ```text
//! categories ──┐
//!              │  CompiledCategory::compile     (pattern.rs, on insert)
//!              │    - tokens + WildcardMask
//!              │    - static score              (priority.rs)
//!              └───────────────┬──────────────
//!                              │
//! input ── InputTrigger::scan ─┼─ skip categories missing a literal word
//!          (trigger.rs)        │
//!                              v
//!                   PatternMatcher::find (matcher.rs)
//!                     - `$` exact pass
//!                     - composite-key lookup
//!                     - ranked scan: topic -> that -> pattern
//!                     - DEFAULT fallback
//!                              │
//!                              v
//!                   MatchResult { category, wildcards, metrics }
//! ```
//!
//! ## Responsibilities by module
//!
//! - `pattern.rs`: tokenizes pattern text, expands `<bot>` properties, builds
//!   the anchored regex and extracts captures.
//! - `priority.rs`: the `WildcardMask` bitflags and the scoring function.
//! - `trigger.rs`: scans the normalized input into a word set for gating.
//! - `matcher.rs`: performs the four match passes and merges captures.
//! - `metrics.rs`: timing/debug data for matches and template passes.
//!
//! ## Public surface
//!
//! Most code interacts with the engine via:
//!
//! - [`PatternMatcher`] and [`MatchQuery`]
//! - [`MatchResult`] (winning category, captures, metrics)
//! - [`WildcardMask`] (wildcard kinds present in a pattern)
//!
//! ## Adding a new wildcard kind
//!
//! Add a `WildcardMask` bit, teach `pattern.rs` to tokenize it and emit its
//! regex piece, and give it a band in `priority::band`.

#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pattern.rs"]
mod pattern;
#[path = "engine/priority.rs"]
mod priority;
#[path = "engine/trigger.rs"]
mod trigger;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use matcher::{MatchQuery, MatchResult, PatternMatcher};
pub use metrics::{MatchMetrics, MatchStrategy, PassMetrics, RankedCandidate, TemplateMetrics};
pub(crate) use pattern::CompiledCategory;
pub use priority::WildcardMask;
