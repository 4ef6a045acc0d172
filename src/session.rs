//! Per-conversation state.
//!
//! A [`ChatSession`] owns session variables, the current topic and three
//! bounded histories:
//!
//! ```text
//! requests   user inputs                 (max_request_depth)
//! responses  bot replies                 (max_response_depth)
//! thats      last sentence of each reply (max_that_depth)
//! ```
//!
//! Every insertion updates the content's usage count, then (when enabled)
//! compresses old items past `compression_threshold`, prunes the lowest
//! weights past `max_total_context` and refreshes weights. See
//! `session/weighting.rs` for the weighting rules.
//!
//! Sessions are caller-owned and never reach a terminal state.

#[path = "session/analytics.rs"]
mod analytics;
#[path = "session/history.rs"]
mod history;
#[path = "session/weighting.rs"]
mod weighting;

pub use analytics::{ItemStats, MetaValue, SessionSnapshot};
pub use history::{History, HistoryItem, HistoryKind};
pub use weighting::{EvictedItem, PruneReport};

use crate::config::ContextConfig;
use crate::normalize::last_sentence;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    variables: HashMap<String, String>,
    topic: String,
    config: ContextConfig,
    requests: History,
    responses: History,
    thats: History,
    stats: HashMap<String, ItemStats>,
    seq: u64,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, ContextConfig::default())
    }

    pub fn with_config(id: impl Into<String>, config: ContextConfig) -> Self {
        let now = Utc::now();
        ChatSession {
            id: id.into(),
            created_at: now,
            last_activity: now,
            variables: HashMap::new(),
            topic: String::new(),
            requests: History::new(HistoryKind::Request, config.max_request_depth),
            responses: History::new(HistoryKind::Response, config.max_response_depth),
            thats: History::new(HistoryKind::That, config.max_that_depth),
            config,
            stats: HashMap::new(),
            seq: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    // --- Topic and variables -----------------------------------------------------

    /// Current topic; empty when none was set.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        self.variables.insert(name.trim().to_lowercase(), value.into());
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    // --- Histories ---------------------------------------------------------------

    pub fn add_request(&mut self, input: &str) {
        self.record(HistoryKind::Request, input.trim().to_string());
    }

    /// Record a bot reply; its last sentence also becomes the newest "that".
    pub fn add_response(&mut self, response: &str) {
        self.record(HistoryKind::Response, response.trim().to_string());
        let that = last_sentence(response);
        if !that.is_empty() {
            self.record(HistoryKind::That, that);
        }
    }

    pub fn history(&self, kind: HistoryKind) -> &History {
        match kind {
            HistoryKind::Request => &self.requests,
            HistoryKind::Response => &self.responses,
            HistoryKind::That => &self.thats,
        }
    }

    fn history_mut(&mut self, kind: HistoryKind) -> &mut History {
        match kind {
            HistoryKind::Request => &mut self.requests,
            HistoryKind::Response => &mut self.responses,
            HistoryKind::That => &mut self.thats,
        }
    }

    /// User input `n` turns back (1 = most recent).
    pub fn request(&self, n: usize) -> Option<&str> {
        self.requests.latest(n).map(|i| i.content.as_str())
    }

    /// Bot reply `n` turns back (1 = most recent).
    pub fn response(&self, n: usize) -> Option<&str> {
        self.responses.latest(n).map(|i| i.content.as_str())
    }

    /// "That" utterance `n` turns back (1 = most recent).
    pub fn that(&self, n: usize) -> Option<&str> {
        self.thats.latest(n).map(|i| i.content.as_str())
    }

    /// That history, oldest first, as the matcher expects it.
    pub fn that_history(&self) -> Vec<String> {
        self.thats.contents()
    }

    pub fn total_items(&self) -> usize {
        self.requests.len() + self.responses.len() + self.thats.len()
    }

    fn contains_anywhere(&self, content: &str) -> bool {
        HistoryKind::ALL.iter().any(|&k| self.history(k).contains(content))
    }

    fn record(&mut self, kind: HistoryKind, content: String) {
        self.seq += 1;
        let seq = self.seq;
        self.last_activity = Utc::now();
        self.stats.entry(content.clone()).or_default().usage_count += 1;

        let evicted = self.history_mut(kind).push(HistoryItem { content, seq, compressed: false });
        for item in evicted {
            self.forget_if_unused(&item.content);
        }

        if self.config.enable_compression && self.total_items() > self.config.compression_threshold {
            self.compress();
        }
        if self.config.enable_pruning && self.total_items() > self.config.max_total_context {
            self.prune();
        }
        self.refresh_weights();
    }

    fn forget_if_unused(&mut self, content: &str) {
        if !self.contains_anywhere(content) {
            self.stats.remove(content);
        }
    }

    // --- Analytics ---------------------------------------------------------------

    /// Count one more use of `content` (e.g. a that-clause matched it).
    /// Returns false when nothing in the histories holds that content.
    pub fn touch(&mut self, content: &str) -> bool {
        let Some(stats) = self.stats.get_mut(content) else {
            return false;
        };
        stats.usage_count += 1;
        self.refresh_weights();
        true
    }

    pub fn stats(&self, content: &str) -> Option<&ItemStats> {
        self.stats.get(content)
    }

    pub fn tag(&mut self, content: &str, tag: impl Into<String>) -> bool {
        match self.stats.get_mut(content) {
            Some(stats) => stats.tags.insert(tag.into()),
            None => false,
        }
    }

    pub fn set_metadata(&mut self, content: &str, key: impl Into<String>, value: MetaValue) -> bool {
        match self.stats.get_mut(content) {
            Some(stats) => {
                stats.metadata.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            topic: self.topic.clone(),
            variables: self.variables.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            requests: self.requests.iter().cloned().collect(),
            responses: self.responses.iter().cloned().collect(),
            thats: self.thats.iter().cloned().collect(),
            stats: self.stats.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_feeds_that_history() {
        let mut session = ChatSession::new("s");
        session.add_request("hi");
        session.add_response("Hello there. Do you like cats?");
        assert_eq!(session.request(1), Some("hi"));
        assert_eq!(session.response(1), Some("Hello there. Do you like cats?"));
        assert_eq!(session.that(1), Some("Do you like cats"));
        assert_eq!(session.that_history(), ["Do you like cats"]);
    }

    #[test]
    fn each_record_takes_the_next_sequence_number() {
        let mut session = ChatSession::new("s");
        session.add_request("hi");
        session.add_response("Hello. Nice day!");
        session.add_request("hi");

        let seqs = |kind| session.history(kind).iter().map(|i| i.seq).collect::<Vec<_>>();
        assert_eq!(seqs(HistoryKind::Request), [1, 4]);
        assert_eq!(seqs(HistoryKind::Response), [2]);
        assert_eq!(seqs(HistoryKind::That), [3]);
        assert_eq!(session.stats("hi").map(|s| s.usage_count), Some(2));
        assert!(session.last_activity() >= session.created_at());
    }

    #[test]
    fn histories_respect_their_own_depths() {
        let config = ContextConfig {
            max_request_depth: 2,
            max_response_depth: 3,
            max_that_depth: 1,
            enable_compression: false,
            enable_pruning: false,
            ..ContextConfig::default()
        };
        let mut session = ChatSession::with_config("s", config);
        for i in 0..10 {
            session.add_request(&format!("question {i}"));
            session.add_response(&format!("answer {i}"));
        }
        assert_eq!(session.history(HistoryKind::Request).contents(), ["question 8", "question 9"]);
        assert_eq!(session.history(HistoryKind::Response).len(), 3);
        assert_eq!(session.that_history(), ["answer 9"]);
        // Evicted contents take their analytics with them.
        assert!(session.stats("question 0").is_none());
        assert!(session.stats("question 9").is_some());
    }

    #[test]
    fn usage_counts_and_touch() {
        let mut session = ChatSession::new("s");
        session.add_request("again");
        session.add_request("again");
        assert_eq!(session.stats("again").unwrap().usage_count, 2);
        assert!(session.touch("again"));
        assert_eq!(session.stats("again").unwrap().usage_count, 3);
        assert!(!session.touch("never said"));
    }

    #[test]
    fn variables_are_case_insensitive_and_snapshot_is_serializable() {
        let mut session = ChatSession::new("abc");
        session.set_variable("Name", "Alice");
        session.set_topic("PETS");
        session.add_request("hi");
        session.tag("hi", "greeting");
        session.set_metadata("hi", "score", MetaValue::Number(1.0));
        assert_eq!(session.variable("name"), Some("Alice"));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.id, "abc");
        assert_eq!(snapshot.topic, "PETS");
        assert!(snapshot.stats["hi"].tags.contains("greeting"));
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.requests, snapshot.requests);
        assert_eq!(back.stats["hi"].metadata["score"], MetaValue::Number(1.0));
    }
}
