//! Best-match search.
//!
//! This module is the operational core of the engine: given an input, the
//! current topic and the bot's recent utterances it selects the single best
//! category in the knowledge base.
//!
//! ## Pass structure
//!
//! ```text
//! (1) exact pass       -> `$` patterns whose body equals the input
//! (2) indexed lookup   -> composite key (input, most recent that, topic)
//! (3) ranked scan      -> trigger gate, then topic -> that -> pattern, best score wins
//! (4) fallback         -> the `DEFAULT` category, star1 = whole input
//! ```
//!
//! Passes 1 and 2 stop at the first acceptable hit; pass 3 collects every
//! match and sorts by `(score desc, id asc)`, so the result is deterministic
//! for a given knowledge base.
//!
//! ## That history
//!
//! `MatchQuery::that_history` is ordered oldest first. A category with
//! that-index 0 or 1 is checked against the most recent utterance (or the one
//! `MatchQuery::that_index` points at); index `N` checks the utterance exactly
//! `N` turns back and nothing else.
//!
//! ## Captures
//!
//! Every clause is matched twice: once against the upper-cased form to decide
//! the match, then against the case-preserving light form to recover captures
//! with their original casing. Both forms share word boundaries, so the
//! second run only fails if a set member differs by more than case.

use super::metrics::{MatchMetrics, MatchStrategy, RankedCandidate};
use super::pattern::{CompiledCategory, CompiledPattern};
use super::trigger::InputTrigger;
use crate::error::MatchError;
use crate::knowledge::KnowledgeBase;
use crate::normalize::{light_normalize, normalize};
use crate::{Category, CategoryId, DEFAULT_PATTERN, WildcardSet};
use std::time::Instant;

/// Everything the matcher needs to know about one turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchQuery<'q> {
    pub input: &'q str,
    pub topic: Option<&'q str>,
    /// Previous bot utterances, oldest first.
    pub that_history: &'q [String],
    /// Distance back used for categories without an explicit that-index.
    pub that_index: Option<usize>,
}

impl<'q> MatchQuery<'q> {
    pub fn new(input: &'q str) -> Self {
        MatchQuery { input, ..MatchQuery::default() }
    }

    pub fn with_topic(mut self, topic: &'q str) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn with_that_history(mut self, history: &'q [String]) -> Self {
        self.that_history = history;
        self
    }

    pub fn with_that_index(mut self, index: usize) -> Self {
        self.that_index = Some(index);
        self
    }

    /// Utterance `distance` turns back (1 = most recent).
    fn that_at(&self, distance: usize) -> Option<&'q str> {
        let distance = distance.max(1);
        let len = self.that_history.len();
        if distance > len { None } else { Some(self.that_history[len - distance].as_str()) }
    }

    fn that_for(&self, category_index: usize) -> Option<&'q str> {
        match category_index {
            0 => self.that_at(self.that_index.unwrap_or(1)),
            n => self.that_at(n),
        }
    }
}

/// The winning category and its captures.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub id: CategoryId,
    pub category: Category,
    pub wildcards: WildcardSet,
    pub score: u64,
    /// The previous utterance a that-clause matched, if any.
    pub that_used: Option<String>,
    pub metrics: MatchMetrics,
}

/// Text in both normalized forms.
#[derive(Debug, Default)]
struct Subject {
    full: String,
    light: String,
}

impl Subject {
    fn new(text: &str) -> Self {
        let light = light_normalize(text);
        Subject { full: normalize(&light), light }
    }
}

/// A category that passed every clause.
#[derive(Debug)]
struct Candidate {
    id: CategoryId,
    score: u64,
    input: Vec<String>,
    topic: Vec<String>,
    that: Vec<String>,
    that_used: Option<String>,
}

/// Selects the best category for a [`MatchQuery`].
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> PatternMatcher<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        PatternMatcher { kb }
    }

    pub fn find(&self, query: &MatchQuery<'_>) -> Result<MatchResult, MatchError> {
        let started = Instant::now();
        let input = Subject::new(query.input);
        let topic = Subject::new(query.topic.unwrap_or_default());
        let mut metrics = MatchMetrics::default();

        let found = self
            .exact_pass(query, &input, &topic, &mut metrics)
            .map(|c| (c, MatchStrategy::Exact))
            .or_else(|| match self.indexed_lookup(query, &input, &topic, &mut metrics) {
                // An index hit stands unless a better-scored category also matches.
                Some(hit) => match self.scan(query, &input, &topic, Some(&hit), &mut metrics) {
                    Some(better) => Some((better, MatchStrategy::Scan)),
                    None => Some((hit, MatchStrategy::Indexed)),
                },
                None => self.scan(query, &input, &topic, None, &mut metrics).map(|c| (c, MatchStrategy::Scan)),
            })
            .or_else(|| self.fallback(&input).map(|c| (c, MatchStrategy::Default)));

        let Some((candidate, strategy)) = found else {
            tracing::debug!(input = %input.full, considered = metrics.considered, "no category matched");
            return Err(MatchError::NoMatch { input: query.input.to_string() });
        };
        let Some(category) = self.kb.category(candidate.id) else {
            return Err(MatchError::NoMatch { input: query.input.to_string() });
        };

        metrics.strategy = strategy;
        metrics.duration = started.elapsed();
        tracing::debug!(
            strategy = strategy.as_str(),
            id = %candidate.id,
            pattern = %category.pattern,
            score = candidate.score,
            "matched"
        );

        Ok(MatchResult {
            id: candidate.id,
            category: category.clone(),
            wildcards: WildcardSet::merged(&candidate.input, &candidate.topic, &candidate.that),
            score: candidate.score,
            that_used: candidate.that_used,
            metrics,
        })
    }

    /// Pass 1: `$` patterns.
    fn exact_pass(
        &self,
        query: &MatchQuery<'_>,
        input: &Subject,
        topic: &Subject,
        metrics: &mut MatchMetrics,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (id, compiled) in self.kb.compiled_iter() {
            if compiled.pattern.exact() != Some(input.full.as_str()) {
                continue;
            }
            metrics.considered += 1;
            if let Some(candidate) = self.evaluate(id, compiled, query, input, topic) {
                metrics.matched += 1;
                if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Pass 2: direct composite-key lookup.
    fn indexed_lookup(
        &self,
        query: &MatchQuery<'_>,
        input: &Subject,
        topic: &Subject,
        metrics: &mut MatchMetrics,
    ) -> Option<Candidate> {
        if input.full.is_empty() {
            return None;
        }
        let that = query.that_for(0).map(normalize).filter(|t| !t.is_empty());
        let topic_key = (!topic.full.is_empty()).then(|| topic.full.clone());

        // Most specific key first; a rule without a that or topic clause is
        // indexed without that part.
        let mut keys: Vec<String> = Vec::with_capacity(4);
        for (that, topic_key) in [
            (that.clone(), topic_key.clone()),
            (that, None),
            (None, topic_key),
            (None, None),
        ] {
            let shape = Category { that, topic: topic_key, ..Category::new(input.full.as_str(), "") };
            let key = shape.key();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        for key in &keys {
            let Some(id) = self.kb.lookup(key) else {
                continue;
            };
            let Some(compiled) = self.kb.compiled(id) else {
                continue;
            };
            if compiled.that_index > 1 || compiled.pattern.exact().is_some() {
                continue;
            }
            metrics.considered += 1;
            if let Some(candidate) = self.evaluate(id, compiled, query, input, topic) {
                metrics.matched += 1;
                return Some(candidate);
            }
        }
        None
    }

    /// Pass 3: gated scan over every category. With a `floor` only
    /// categories that would rank above it are tried.
    fn scan(
        &self,
        query: &MatchQuery<'_>,
        input: &Subject,
        topic: &Subject,
        floor: Option<&Candidate>,
        metrics: &mut MatchMetrics,
    ) -> Option<Candidate> {
        let trigger = InputTrigger::scan(&input.full);
        let mut candidates: Vec<Candidate> = Vec::new();

        for (id, compiled) in self.kb.compiled_iter() {
            if compiled.pattern.exact().is_some() {
                continue;
            }
            if floor.is_some_and(|f| (compiled.score, f.id) <= (f.score, id)) {
                continue;
            }
            if !trigger.admits(compiled.pattern.required_words()) {
                metrics.gated += 1;
                continue;
            }
            metrics.considered += 1;
            if let Some(candidate) = self.evaluate(id, compiled, query, input, topic) {
                candidates.push(candidate);
            }
        }

        metrics.matched += candidates.len();
        candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        metrics.ranked = candidates
            .iter()
            .filter_map(|c| {
                let compiled = self.kb.compiled(c.id)?;
                Some(RankedCandidate { id: c.id, pattern: compiled.pattern.source().to_string(), score: c.score })
            })
            .collect();

        candidates.into_iter().next()
    }

    /// Pass 4: the reserved `DEFAULT` category.
    fn fallback(&self, input: &Subject) -> Option<Candidate> {
        let id = self.kb.lookup(DEFAULT_PATTERN)?;
        let score = self.kb.compiled(id).map(|c| c.score).unwrap_or_default();
        Some(Candidate {
            id,
            score,
            input: vec![input.light.clone()],
            topic: Vec::new(),
            that: Vec::new(),
            that_used: None,
        })
    }

    /// Check topic, then that, then the input pattern.
    fn evaluate(
        &self,
        id: CategoryId,
        compiled: &CompiledCategory,
        query: &MatchQuery<'_>,
        input: &Subject,
        topic: &Subject,
    ) -> Option<Candidate> {
        let topic_caps = match &compiled.topic {
            Some(pattern) => self.capture(pattern, topic)?,
            None => Vec::new(),
        };

        let (that_caps, that_used) = match &compiled.that {
            Some(pattern) => {
                let utterance = query.that_for(compiled.that_index)?;
                let caps = self.capture(pattern, &Subject::new(utterance))?;
                (caps, Some(utterance.to_string()))
            }
            None => (Vec::new(), None),
        };

        let input_caps = self.capture(&compiled.pattern, input)?;

        Some(Candidate { id, score: compiled.score, input: input_caps, topic: topic_caps, that: that_caps, that_used })
    }

    /// Match on the full form, then recover original casing from the light form.
    fn capture(&self, pattern: &CompiledPattern, subject: &Subject) -> Option<Vec<String>> {
        let full = pattern.captures(self.kb, &subject.full)?;
        match pattern.captures(self.kb, &subject.light) {
            Some(light) if light.len() == full.len() => Some(light),
            _ => Some(full),
        }
    }
}
