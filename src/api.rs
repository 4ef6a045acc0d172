use crate::collaborators::{Collaborators, ExternalService, RulePersistence};
use crate::config::EngineConfig;
use crate::engine::{MatchMetrics, MatchQuery, PatternMatcher, TemplateMetrics};
use crate::error::MatchError;
use crate::knowledge::KnowledgeBase;
use crate::session::ChatSession;
use crate::template::{TemplateCache, TemplateEngine, VariableContext};
use crate::{Category, CategoryId};
use std::time::{Duration, Instant};

/// Reply used by [`Bot::respond_or_default`] when the knowledge base has no
/// `default-response` property.
pub const FALLBACK_RESPONSE: &str = "I have no answer for that.";

/// A knowledge base plus the engine state needed to answer with it.
///
/// `respond` takes `&mut self`: learning, collection tags and the response
/// cache all mutate shared state, so one conversation turn runs at a time.
#[derive(Debug)]
pub struct Bot {
    kb: KnowledgeBase,
    engine: TemplateEngine,
    cache: TemplateCache,
    collaborators: Collaborators,
    turns: u64,
}

/// Result of [`Bot::respond`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Final response text, whitespace-normalized.
    pub text: String,
    /// Category that produced the reply; `None` for the default response.
    pub category: Option<CategoryId>,
    /// Matching plus template evaluation.
    pub elapsed: Duration,
}

/// Result of [`Bot::respond_verbose`].
///
/// Meant for debugging and performance inspection: how the category was
/// picked and what each template pass cost.
#[derive(Debug, Clone)]
pub struct ReplyDetails {
    pub reply: Reply,
    /// Pattern of the winning category.
    pub pattern: String,
    pub matching: MatchMetrics,
    pub template: TemplateMetrics,
}

impl Bot {
    pub fn new(kb: KnowledgeBase) -> Self {
        Bot::with_config(kb, EngineConfig::default())
    }

    pub fn with_config(kb: KnowledgeBase, config: EngineConfig) -> Self {
        let cache = TemplateCache::new(config.cache_capacity);
        Bot { kb, engine: TemplateEngine::new(config), cache, collaborators: Collaborators::default(), turns: 0 }
    }

    /// Collaborator answering `<sraix>`.
    pub fn with_service(mut self, service: impl ExternalService + 'static) -> Self {
        self.collaborators.service = Some(Box::new(service));
        self
    }

    /// Collaborator storing categories learned with `<learnf>`.
    pub fn with_persistence(mut self, persistence: impl RulePersistence + 'static) -> Self {
        self.collaborators.persistence = Some(Box::new(persistence));
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Shorthand for `knowledge_mut().add_category(..)`.
    pub fn learn(&mut self, category: Category) -> Result<CategoryId, crate::PatternError> {
        self.kb.add_category(category)
    }

    /// Answer `input` within `session`.
    ///
    /// The input is recorded in the session's request history whether or not
    /// anything matches, so `<request/>` in the winning template sees it.
    ///
    /// # Example
    /// ```
    /// use colloquy::{Bot, Category, ChatSession, KnowledgeBase};
    ///
    /// let mut kb = KnowledgeBase::new();
    /// kb.add_category(Category::new("ASK", "Do you like cats?")).unwrap();
    /// kb.add_category(Category::new("YES", "Great!").with_that("DO YOU LIKE CATS")).unwrap();
    /// kb.add_category(Category::new("YES", "Yes what?")).unwrap();
    ///
    /// let mut bot = Bot::new(kb);
    /// let mut session = ChatSession::new("doc");
    /// bot.respond(&mut session, "ask").unwrap();
    /// assert_eq!(bot.respond(&mut session, "yes").unwrap().text, "Great!");
    /// assert_eq!(bot.respond(&mut session, "yes").unwrap().text, "Yes what?");
    /// ```
    pub fn respond(&mut self, session: &mut ChatSession, input: &str) -> Result<Reply, MatchError> {
        self.respond_verbose(session, input).map(|details| details.reply)
    }

    /// Like [`respond`](Self::respond) but never fails: a miss answers with
    /// the `default-response` property or [`FALLBACK_RESPONSE`].
    pub fn respond_or_default(&mut self, session: &mut ChatSession, input: &str) -> Reply {
        let start = Instant::now();
        match self.respond(session, input) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(%err, "answering with the default response");
                let text = self.kb.property("default-response").unwrap_or(FALLBACK_RESPONSE).to_string();
                session.add_response(&text);
                Reply { text, category: None, elapsed: start.elapsed() }
            }
        }
    }

    /// [`respond`](Self::respond) plus matcher and template metrics.
    pub fn respond_verbose(&mut self, session: &mut ChatSession, input: &str) -> Result<ReplyDetails, MatchError> {
        let start = Instant::now();

        let that_history = session.that_history();
        let topic = session.topic().to_string();
        let found = {
            let mut query = MatchQuery::new(input).with_that_history(&that_history);
            if !topic.is_empty() {
                query = query.with_topic(&topic);
            }
            PatternMatcher::new(&self.kb).find(&query)
        };
        session.add_request(input);
        let result = found?;

        if let Some(that) = &result.that_used {
            session.touch(that);
        }

        self.turns += 1;
        let seed = self.engine.config().random_seed.map(|seed| seed.wrapping_add(self.turns));
        let (text, template) = {
            let mut ctx = VariableContext::new(&mut self.kb, &mut self.cache, &self.collaborators)
                .with_session(session)
                .with_wildcards(result.wildcards);
            if let Some(seed) = seed {
                ctx = ctx.with_seed(seed);
            }
            self.engine.evaluate_with_metrics(&result.category.template, &mut ctx)
        };
        session.add_response(&text);

        tracing::debug!(
            session = session.id(),
            category = %result.id,
            strategy = result.metrics.strategy.as_str(),
            "responded"
        );
        Ok(ReplyDetails {
            reply: Reply { text, category: Some(result.id), elapsed: start.elapsed() },
            pattern: result.category.pattern,
            matching: result.metrics,
            template,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStrategy;

    fn bot(categories: &[(&str, &str)]) -> Bot {
        let mut kb = KnowledgeBase::new();
        for (pattern, template) in categories {
            kb.add_category(Category::new(*pattern, *template)).unwrap();
        }
        Bot::new(kb)
    }

    #[test]
    fn respond_records_both_sides_of_the_turn() {
        let mut bot = bot(&[("MY NAME IS *", "<think><set name=\"name\"><star/></set></think>Hi <get name=\"name\"/>!")]);
        let mut session = ChatSession::new("s");

        let reply = bot.respond(&mut session, "My name is Ada.").unwrap();
        assert_eq!(reply.text, "Hi Ada!");
        assert!(reply.category.is_some());
        assert_eq!(session.variable("name"), Some("Ada"));
        assert_eq!(session.request(1), Some("My name is Ada."));
        assert_eq!(session.response(1), Some("Hi Ada!"));
        assert_eq!(session.that(1), Some("Hi Ada"));
    }

    #[test]
    fn that_clause_follows_the_previous_reply() {
        let mut bot = bot(&[("ASK", "Do you like cats?"), ("YES", "Yes what?")]);
        bot.learn(Category::new("YES", "Great!").with_that("DO YOU LIKE CATS")).unwrap();
        let mut session = ChatSession::new("s");

        bot.respond(&mut session, "ask").unwrap();
        assert_eq!(bot.respond(&mut session, "Yes!").unwrap().text, "Great!");
        // The matched "that" counts as one more use.
        assert_eq!(session.stats("Do you like cats").map(|s| s.usage_count), Some(2));
        assert_eq!(bot.respond(&mut session, "yes").unwrap().text, "Yes what?");
    }

    #[test]
    fn that_clause_matches_under_aggressive_compression() {
        let mut bot = bot(&[("ASK", "Sure thing. Do you like cats?"), ("YES", "Yes what?")]);
        bot.learn(Category::new("YES", "Great!").with_that("DO YOU LIKE CATS")).unwrap();
        let config = crate::ContextConfig {
            compression_threshold: 0,
            compressed_length: 3,
            enable_pruning: false,
            ..crate::ContextConfig::default()
        };
        let mut session = ChatSession::with_config("s", config);

        bot.respond(&mut session, "ask").unwrap();
        assert_eq!(bot.respond(&mut session, "yes").unwrap().text, "Great!");
        assert_eq!(bot.respond(&mut session, "yes").unwrap().text, "Yes what?");
    }

    #[test]
    fn misses_are_recorded_and_can_fall_back() {
        let mut bot = bot(&[("HELLO", "Hi")]);
        let mut session = ChatSession::new("s");

        let err = bot.respond(&mut session, "something else").unwrap_err();
        assert!(matches!(err, MatchError::NoMatch { .. }));
        assert_eq!(session.request(1), Some("something else"));

        let reply = bot.respond_or_default(&mut session, "still nothing");
        assert_eq!(reply.text, FALLBACK_RESPONSE);
        assert_eq!(reply.category, None);

        bot.knowledge_mut().set_property("default-response", "Hmm.");
        assert_eq!(bot.respond_or_default(&mut session, "nope").text, "Hmm.");
        assert_eq!(session.response(1), Some("Hmm."));
    }

    #[test]
    fn topic_set_by_a_template_scopes_the_next_match() {
        let mut bot = bot(&[("LET US TALK ABOUT *", "<think><set name=\"topic\"><star/></set></think>OK.")]);
        bot.learn(Category::new("WHAT DO YOU THINK", "I love them.").with_topic("CATS")).unwrap();
        bot.learn(Category::new("WHAT DO YOU THINK", "About what?")).unwrap();
        let mut session = ChatSession::new("s");

        assert_eq!(bot.respond(&mut session, "what do you think").unwrap().text, "About what?");
        bot.respond(&mut session, "let us talk about cats").unwrap();
        assert_eq!(session.topic(), "cats");
        assert_eq!(bot.respond(&mut session, "what do you think").unwrap().text, "I love them.");
    }

    #[test]
    fn verbose_reports_strategy_and_passes() {
        let mut bot = bot(&[("HELLO *", "<uppercase><star/></uppercase>")]);
        let mut session = ChatSession::new("s");

        let details = bot.respond_verbose(&mut session, "hello world").unwrap();
        assert_eq!(details.reply.text, "WORLD");
        assert_eq!(details.pattern, "HELLO *");
        assert_eq!(details.matching.strategy, MatchStrategy::Scan);
        assert!(details.template.passes.iter().any(|p| p.handler == "text"));
        assert!(details.reply.elapsed >= details.template.total);
    }

    #[test]
    fn seeded_bots_pick_the_same_random_items() {
        let template = "<random><li>a</li><li>b</li><li>c</li><li>d</li></random>";
        let config = EngineConfig { random_seed: Some(42), ..EngineConfig::default() };
        let run = || {
            let mut kb = KnowledgeBase::new();
            kb.add_category(Category::new("PICK", template)).unwrap();
            let mut bot = Bot::with_config(kb, config.clone());
            let mut session = ChatSession::new("r");
            (0..8).map(|_| bot.respond(&mut session, "pick").unwrap().text).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn repeated_pure_replies_come_from_the_cache() {
        let mut bot = bot(&[("HELLO", "Hi <bot name=\"name\"/>")]);
        bot.knowledge_mut().set_property("name", "Ada");
        let mut session = ChatSession::new("s");

        bot.respond(&mut session, "hello").unwrap();
        bot.respond(&mut session, "hello").unwrap();
        assert_eq!(bot.cache().hits(), 1);
    }
}
