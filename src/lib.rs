//! A rule-based conversational engine.
//!
//! A [`KnowledgeBase`] holds pattern→template rules ([`Category`]) plus sets,
//! maps, lists, arrays, variables and bot properties. The [`PatternMatcher`]
//! picks the single best category for an input given the current topic and
//! the bot's previous utterances, the [`TemplateEngine`] executes the winning
//! template's tag language, and [`ChatSession`] keeps bounded, weighted turn
//! histories per conversation.
//!
//! [`Bot`] wires the pieces together:
//!
//! ```
//! use colloquy::{Bot, Category, ChatSession, KnowledgeBase};
//!
//! let mut kb = KnowledgeBase::new();
//! kb.add_category(Category::new("HELLO *", "Hi <star/>!")).unwrap();
//!
//! let mut bot = Bot::new(kb);
//! let mut session = ChatSession::new("demo");
//! let reply = bot.respond(&mut session, "hello world").unwrap();
//! assert_eq!(reply.text, "Hi world!");
//! ```

#[macro_use]
mod macros;
mod api;
mod collaborators;
mod config;
mod engine;
mod error;
mod knowledge;
mod normalize;
mod session;
mod template;

pub use api::{Bot, FALLBACK_RESPONSE, Reply, ReplyDetails};
pub use collaborators::{Collaborators, ExternalService, RulePersistence};
pub use config::{ContextConfig, EngineConfig};
pub use engine::{
    MatchMetrics, MatchQuery, MatchResult, MatchStrategy, PassMetrics, PatternMatcher, RankedCandidate,
    TemplateMetrics, WildcardMask,
};
pub use error::{ConfigError, MatchError, PatternError, ScopeError, ServiceError};
pub use knowledge::KnowledgeBase;
pub use normalize::{Substitutions, light_normalize, normalize, pattern_key};
pub use session::{
    ChatSession, EvictedItem, History, HistoryItem, HistoryKind, ItemStats, MetaValue, PruneReport, SessionSnapshot,
};
pub use template::{Scope, TemplateCache, TemplateEngine, VariableContext};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of captures a single pattern (or that/topic clause) may produce.
pub const MAX_CAPTURES: usize = 9;

/// Largest explicit that-index a category may declare.
pub const MAX_THAT_INDEX: usize = 10;

/// Reserved pattern used when nothing else matches.
pub const DEFAULT_PATTERN: &str = "DEFAULT";

// --- Categories ---------------------------------------------------------------

/// Stable identifier of a category: an index into the knowledge base's arena.
///
/// Ids are never reused or invalidated; re-learning a category with the same
/// composite key replaces it in place and keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub usize);

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One pattern→template rule, optionally scoped by topic and by the bot's
/// previous utterance ("that").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Input pattern (wildcard grammar).
    pub pattern: String,
    /// Response template (tag grammar).
    pub template: String,
    /// Pattern the bot's previous utterance must match.
    #[serde(default)]
    pub that: Option<String>,
    /// Which previous utterance `that` refers to: 0 = most recent, 1..=10 = exact distance back.
    #[serde(default)]
    pub that_index: usize,
    /// Pattern the current topic must match.
    #[serde(default)]
    pub topic: Option<String>,
}

impl Category {
    pub fn new(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Category { pattern: pattern.into(), template: template.into(), that: None, that_index: 0, topic: None }
    }

    pub fn with_that(mut self, that: impl Into<String>) -> Self {
        self.that = Some(that.into());
        self
    }

    /// Restrict the that-clause to the utterance exactly `index` turns back.
    pub fn with_that_index(mut self, index: usize) -> Self {
        self.that_index = index;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Composite index key:
    /// `pattern [ "|THAT:" that [ "|THATINDEX:" n ] ] [ "|TOPIC:" topic ]`.
    pub fn key(&self) -> String {
        let mut key = pattern_key(&self.pattern);
        if let Some(that) = self.that.as_deref().filter(|t| !t.trim().is_empty()) {
            key.push_str("|THAT:");
            key.push_str(&pattern_key(that));
            if self.that_index != 0 {
                key.push_str("|THATINDEX:");
                key.push_str(&self.that_index.to_string());
            }
        }
        if let Some(topic) = self.topic.as_deref().filter(|t| !t.trim().is_empty()) {
            key.push_str("|TOPIC:");
            key.push_str(&pattern_key(topic));
        }
        key
    }
}

// --- Wildcard captures --------------------------------------------------------

/// Where a capture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    Input,
    That,
    Topic,
}

impl CaptureSource {
    fn prefix(self) -> &'static str {
        match self {
            CaptureSource::Input => "star",
            CaptureSource::That => "that_star",
            CaptureSource::Topic => "topic_star",
        }
    }

    /// Slot name for the 1-based capture `index`, e.g. `star1`, `that_star2`.
    pub fn slot(self, index: usize) -> String {
        format!("{}{}", self.prefix(), index)
    }
}

/// Captured wildcard values keyed by slot name (`star1`, `that_star1`, ...).
///
/// Values keep the casing of the original text even though matching itself
/// is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WildcardSet {
    slots: BTreeMap<String, String>,
}

impl WildcardSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from the ordered captures of one source.
    pub fn from_captures(source: CaptureSource, captures: &[String]) -> Self {
        let mut set = WildcardSet::new();
        set.extend_from(source, captures);
        set
    }

    pub(crate) fn extend_from(&mut self, source: CaptureSource, captures: &[String]) {
        for (i, value) in captures.iter().take(MAX_CAPTURES).enumerate() {
            self.slots.insert(source.slot(i + 1), value.clone());
        }
    }

    /// Merge captures from all three sources. On a shared slot name that
    /// captures win over topic captures, which win over input captures.
    pub fn merged(input: &[String], topic: &[String], that: &[String]) -> Self {
        let mut set = WildcardSet::new();
        set.extend_from(CaptureSource::Input, input);
        set.extend_from(CaptureSource::Topic, topic);
        set.extend_from(CaptureSource::That, that);
        set
    }

    pub fn insert(&mut self, slot: impl Into<String>, value: impl Into<String>) {
        self.slots.insert(slot.into(), value.into());
    }

    pub fn get(&self, slot: &str) -> Option<&str> {
        self.slots.get(slot).map(String::as_str)
    }

    /// Capture `index` (1-based) of `source`.
    pub fn capture(&self, source: CaptureSource, index: usize) -> Option<&str> {
        self.get(&source.slot(index))
    }

    /// Shorthand for input capture `index` (1-based).
    pub fn star(&self, index: usize) -> Option<&str> {
        self.capture(CaptureSource::Input, index)
    }

    /// Number of captures from `source`.
    pub fn count(&self, source: CaptureSource) -> usize {
        let prefix = source.prefix();
        self.slots
            .keys()
            .filter(|k| k.strip_prefix(prefix).is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit())))
            .count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_includes_that_index_only_when_explicit() {
        let plain = Category::new("yes", "ok").with_that("do you like cats");
        assert_eq!(plain.key(), "YES|THAT:DO YOU LIKE CATS");

        let indexed = plain.clone().with_that_index(2).with_topic("pets");
        assert_eq!(indexed.key(), "YES|THAT:DO YOU LIKE CATS|THATINDEX:2|TOPIC:PETS");
    }

    #[test]
    fn wildcard_merge_prefers_that_then_topic() {
        let set = WildcardSet::merged(&["a".into(), "b".into()], &["t".into()], &["x".into()]);
        assert_eq!(set.star(1), Some("a"));
        assert_eq!(set.star(2), Some("b"));
        assert_eq!(set.capture(CaptureSource::Topic, 1), Some("t"));
        assert_eq!(set.capture(CaptureSource::That, 1), Some("x"));
        assert_eq!(set.count(CaptureSource::Input), 2);
        assert_eq!(set.count(CaptureSource::That), 1);
    }
}
