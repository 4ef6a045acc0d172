//! Variable context for one template evaluation.
//!
//! Read precedence, highest first:
//!
//! ```text
//! locals -> wildcard slots (star1, that_star1, ...) -> session (topic included)
//!        -> knowledge-base globals -> bot properties
//! ```
//!
//! Writes go to local, session or global scope. Properties are read-only from
//! templates; a write attempt is rejected with [`ScopeError::ReadOnly`].
//! Writing `topic` also moves the conversation's topic.

use super::cache::TemplateCache;
use crate::collaborators::Collaborators;
use crate::error::ScopeError;
use crate::knowledge::KnowledgeBase;
use crate::session::ChatSession;
use crate::WildcardSet;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

/// Where a variable is read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    Session,
    Global,
    Property,
}

impl Scope {
    /// Parse a `scope="..."` attribute.
    pub fn parse(s: &str) -> Option<Scope> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "var" => Some(Scope::Local),
            "session" | "user" | "predicate" => Some(Scope::Session),
            "global" | "bot-global" => Some(Scope::Global),
            "property" | "bot" => Some(Scope::Property),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Session => "session",
            Scope::Global => "global",
            Scope::Property => "property",
        }
    }
}

/// Everything a template can read or change while it runs.
///
/// Created once per top-level evaluation and passed by reference through
/// nested self-matches, so locals set in one rule are visible in the rules
/// it delegates to.
pub struct VariableContext<'c> {
    pub locals: HashMap<String, String>,
    pub wildcards: WildcardSet,
    pub session: Option<&'c mut ChatSession>,
    pub topic: String,
    pub kb: &'c mut KnowledgeBase,
    pub cache: &'c mut TemplateCache,
    pub collaborators: &'c Collaborators,
    /// Self-match nesting depth.
    pub depth: usize,
    pub rng: StdRng,
    /// Set when the evaluation did something a cached replay would skip
    /// (a write, a random pick, a clock read, ...).
    pub volatile: bool,
}

impl<'c> VariableContext<'c> {
    pub fn new(kb: &'c mut KnowledgeBase, cache: &'c mut TemplateCache, collaborators: &'c Collaborators) -> Self {
        VariableContext {
            locals: HashMap::new(),
            wildcards: WildcardSet::new(),
            session: None,
            topic: String::new(),
            kb,
            cache,
            collaborators,
            depth: 0,
            rng: StdRng::from_entropy(),
            volatile: false,
        }
    }

    /// Attach a session; the context topic starts as the session's topic.
    pub fn with_session(mut self, session: &'c mut ChatSession) -> Self {
        self.topic = session.topic().to_string();
        self.session = Some(session);
        self
    }

    pub fn with_wildcards(mut self, wildcards: WildcardSet) -> Self {
        self.wildcards = wildcards;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Resolve `name` through every readable scope.
    pub fn get(&self, name: &str) -> Option<String> {
        let key = name.trim().to_lowercase();
        if let Some(v) = self.locals.get(&key) {
            return Some(v.clone());
        }
        if let Some(v) = self.wildcards.get(&key) {
            return Some(v.to_string());
        }
        if key == "topic" && !self.topic.is_empty() {
            return Some(self.topic.clone());
        }
        if let Some(v) = self.session.as_deref().and_then(|s| s.variable(&key)) {
            return Some(v.to_string());
        }
        if let Some(v) = self.kb.variable(&key) {
            return Some(v.to_string());
        }
        self.kb.property(&key).map(str::to_string)
    }

    /// Read from one scope only.
    pub fn get_in(&self, scope: Scope, name: &str) -> Option<String> {
        let key = name.trim().to_lowercase();
        match scope {
            Scope::Local => self.locals.get(&key).cloned(),
            Scope::Session => match &self.session {
                Some(s) if key == "topic" => Some(s.topic().to_string()),
                Some(s) => s.variable(&key).map(str::to_string),
                None => None,
            },
            Scope::Global => self.kb.variable(&key).map(str::to_string),
            Scope::Property => self.kb.property(&key).map(str::to_string),
        }
    }

    /// Write `value` to `scope`. Session writes without an attached session
    /// land in global scope.
    pub fn set(&mut self, scope: Scope, name: &str, value: &str) -> Result<(), ScopeError> {
        let key = name.trim().to_lowercase();
        if scope == Scope::Property {
            return Err(ScopeError::ReadOnly { name: key });
        }
        self.volatile = true;

        if key == "topic" && scope != Scope::Local {
            self.topic = value.to_string();
            if let Some(session) = self.session.as_deref_mut() {
                session.set_topic(value);
            }
            return Ok(());
        }

        match scope {
            Scope::Local => {
                self.locals.insert(key, value.to_string());
            }
            Scope::Session => match self.session.as_deref_mut() {
                Some(session) => session.set_variable(&key, value),
                None => self.kb.set_variable(&key, value),
            },
            Scope::Global | Scope::Property => self.kb.set_variable(&key, value),
        }
        Ok(())
    }

    /// Default write scope for `name=`: the session when attached, else global.
    pub fn named_scope(&self) -> Scope {
        if self.session.is_some() { Scope::Session } else { Scope::Global }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref().map(ChatSession::id)
    }
}

impl std::fmt::Debug for VariableContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableContext")
            .field("locals", &self.locals)
            .field("wildcards", &self.wildcards)
            .field("session", &self.session_id())
            .field("topic", &self.topic)
            .field("depth", &self.depth)
            .field("volatile", &self.volatile)
            .finish_non_exhaustive()
    }
}
