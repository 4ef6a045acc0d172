//! Match priority.
//!
//! Every compiled category carries a static score; when several categories
//! match the same input the highest score wins and equal scores fall back to
//! declaration order (lower `CategoryId` first).
//!
//! ```text
//! score = that bonus                      (1e8, + 5e5 exact that | 2e5 wildcard that, + 1e5 explicit index)
//!       + topic bonus                     (5e7)
//!       + band(pattern) * 1e6             ($=6  #=5  exact=4  _/set=3  ^=2  *=1)
//!       + (10 - captures) * 1e4           (fewer wildcards is better)
//!       + 1e3 if the last token is a wildcard
//! ```
//!
//! ## Invariants
//!
//! - For two patterns differing only in wildcard kind the band order
//!   `$ > # > exact > _ > ^ > *` is strict.
//! - The that bonus exceeds any achievable pattern-only score, and the topic
//!   bonus exceeds any pattern band difference.

use super::pattern::CompiledPattern;
use crate::MAX_CAPTURES;

bitflags::bitflags! {
    /// Kinds of wildcard present in a pattern.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WildcardMask: u8 {
        const DOLLAR     = 1 << 0;
        const HASH       = 1 << 1;
        const UNDERSCORE = 1 << 2;
        const CARET      = 1 << 3;
        const STAR       = 1 << 4;
        const SET        = 1 << 5;
    }
}

pub const THAT_BONUS: u64 = 100_000_000;
pub const THAT_EXACT_BONUS: u64 = 500_000;
pub const THAT_WILDCARD_BONUS: u64 = 200_000;
pub const THAT_INDEX_BONUS: u64 = 100_000;
pub const TOPIC_BONUS: u64 = 50_000_000;

const BAND_WEIGHT: u64 = 1_000_000;
const CAPTURE_WEIGHT: u64 = 10_000;
const TRAILING_WILDCARD_BONUS: u64 = 1_000;

/// Priority band of a wildcard mask. Presence is checked in band order, so a
/// pattern holding both `_` and `*` lands in the `_` band.
pub fn band(mask: WildcardMask) -> u64 {
    if mask.contains(WildcardMask::DOLLAR) {
        6
    } else if mask.contains(WildcardMask::HASH) {
        5
    } else if mask.is_empty() {
        4
    } else if mask.intersects(WildcardMask::UNDERSCORE | WildcardMask::SET) {
        3
    } else if mask.contains(WildcardMask::CARET) {
        2
    } else {
        1
    }
}

/// Score of a pattern on its own (no that/topic bonus).
pub(crate) fn pattern_score(pattern: &CompiledPattern) -> u64 {
    let captures = pattern.capture_count().min(MAX_CAPTURES) as u64;
    let mut score = band(pattern.mask()) * BAND_WEIGHT + (MAX_CAPTURES as u64 + 1 - captures) * CAPTURE_WEIGHT;
    if pattern.ends_with_wildcard() {
        score += TRAILING_WILDCARD_BONUS;
    }
    score
}

/// Full static score of a category.
pub(crate) fn category_score(
    pattern: &CompiledPattern,
    that: Option<&CompiledPattern>,
    that_index: usize,
    topic: Option<&CompiledPattern>,
) -> u64 {
    let mut score = pattern_score(pattern);
    if let Some(that) = that {
        score += THAT_BONUS;
        score += if that.mask().is_empty() { THAT_EXACT_BONUS } else { THAT_WILDCARD_BONUS };
        if that_index != 0 {
            score += THAT_INDEX_BONUS;
        }
    }
    if topic.is_some() {
        score += TOPIC_BONUS;
    }
    score
}
