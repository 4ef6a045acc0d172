//! Tag handler registry and the pass runner.
//!
//! Each [`TagHandler`] owns a handful of tag names. A pass walks the tree in
//! document order and hands every element the handler accepts to
//! [`TagHandler::process`], which returns the nodes that replace it. Elements
//! the handler does not own are descended into, except for deferred subtrees:
//!
//! ```text
//! think | condition | random | learn | learnf
//! ```
//!
//! Their content only runs when the owning handler decides it should (the
//! chosen `li`, the learned category's `eval`s, ...), and then through the
//! whole pipeline via [`Runtime::evaluate_nodes`].

use super::TemplateEngine;
use super::context::VariableContext;
use super::handlers::{
    CollectionHandler, ConditionHandler, HistoryHandler, LearnHandler, NormalizationHandler, SelfMatchHandler,
    StarHandler, SubstitutionHandler, SystemHandler, TemporalHandler, TextHandler, VariableHandler,
};
use super::node::{Element, Node, any_element, render};
use super::parser::parse;
use crate::engine::{MatchQuery, MatchStrategy, PassMetrics, PatternMatcher};
use crate::normalize::squash_whitespace;
use crate::session::ChatSession;
use std::time::Instant;

/// Tags whose content is opaque to passes that do not own them.
pub(crate) const DEFERRED_TAGS: &[&str] = &["think", "condition", "random", "learn", "learnf"];

pub(crate) trait TagHandler: Send + Sync {
    /// Pass name used in metrics and logs.
    fn name(&self) -> &'static str;

    fn tags(&self) -> &'static [&'static str];

    fn should_process(&self, el: &Element) -> bool {
        self.tags().contains(&el.name.as_str())
    }

    /// Replace `el` with its result.
    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node>;
}

/// Handlers in pipeline order.
pub(crate) struct Registry {
    handlers: Vec<Box<dyn TagHandler>>,
}

impl Registry {
    pub fn standard() -> Self {
        let handlers: Vec<Box<dyn TagHandler>> = vec![
            Box::new(StarHandler),
            Box::new(VariableHandler),
            Box::new(SelfMatchHandler),
            Box::new(LearnHandler),
            Box::new(ConditionHandler),
            Box::new(TemporalHandler),
            Box::new(CollectionHandler),
            Box::new(SubstitutionHandler),
            Box::new(TextHandler),
            Box::new(NormalizationHandler),
            Box::new(SystemHandler),
            Box::new(HistoryHandler),
        ];
        Registry { handlers }
    }

    pub fn handlers(&self) -> &[Box<dyn TagHandler>] {
        &self.handlers
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// State of one top-level evaluation, shared by every nested pass.
pub(crate) struct Runtime<'e, 'c> {
    pub engine: &'e TemplateEngine,
    pub ctx: &'e mut VariableContext<'c>,
    pub passes: Vec<PassMetrics>,
}

impl<'e, 'c> Runtime<'e, 'c> {
    pub fn new(engine: &'e TemplateEngine, ctx: &'e mut VariableContext<'c>) -> Self {
        Runtime { engine, ctx, passes: Vec::new() }
    }

    /// Run every pass over `nodes`, skipping passes with nothing to do.
    pub fn run_pipeline(&mut self, mut nodes: Vec<Node>) -> Vec<Node> {
        let engine = self.engine;
        for handler in engine.registry.handlers() {
            let handler = handler.as_ref();
            if !any_element(&nodes, &|el| handler.should_process(el)) {
                continue;
            }
            let start = Instant::now();
            let mut processed = 0;
            nodes = self.rewrite(handler, nodes, &mut processed);
            let duration = start.elapsed();
            tracing::trace!(pass = handler.name(), depth = self.ctx.depth, processed, ?duration, "template pass");
            self.passes.push(PassMetrics { handler: handler.name(), depth: self.ctx.depth, processed, duration });
        }
        nodes
    }

    fn rewrite(&mut self, handler: &dyn TagHandler, nodes: Vec<Node>, processed: &mut usize) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Element(el) if handler.should_process(&el) => {
                    *processed += 1;
                    out.extend(handler.process(el, self));
                }
                Node::Element(el) if DEFERRED_TAGS.contains(&el.name.as_str()) => out.push(Node::Element(el)),
                Node::Element(mut el) => {
                    el.children = self.rewrite(handler, std::mem::take(&mut el.children), processed);
                    out.push(Node::Element(el));
                }
                text @ Node::Text(_) => out.push(text),
            }
        }
        out
    }

    /// Fully evaluate `nodes` and flatten the result to text.
    pub fn evaluate_nodes(&mut self, nodes: Vec<Node>) -> String {
        let nodes = self.run_pipeline(nodes);
        squash_whitespace(&render(&nodes))
    }

    /// Evaluate an element's content.
    pub fn content(&mut self, el: &Element) -> String {
        self.evaluate_nodes(el.children.clone())
    }

    /// Content with the named attribute-carrying children removed.
    pub fn content_without(&mut self, el: &Element, names: &[&str]) -> String {
        let nodes = el
            .children
            .iter()
            .filter(|n| !matches!(n, Node::Element(child) if names.contains(&child.name.as_str())))
            .cloned()
            .collect();
        self.evaluate_nodes(nodes)
    }

    /// Attribute `name`, or the evaluated content of a child element of that
    /// name (`<get><name><star/></name></get>`).
    pub fn attr(&mut self, el: &Element, name: &str) -> Option<String> {
        if let Some(value) = el.attr(name) {
            return Some(value.to_string());
        }
        let child = el.element(name)?.children.clone();
        Some(self.evaluate_nodes(child))
    }

    pub fn evaluate_template(&mut self, template: &str) -> String {
        self.evaluate_nodes(parse(template))
    }

    /// Match `text` as if it were user input and evaluate the winner's
    /// template with its own wildcards and this runtime's variables.
    ///
    /// Returns `None` when nothing but the fallback matches or when the
    /// nesting limit is reached.
    pub fn self_match(&mut self, text: &str) -> Option<String> {
        let max = self.engine.max_loops(self.ctx.kb);
        if self.ctx.depth >= max {
            tracing::warn!(depth = self.ctx.depth, max, input = text, "self-match depth limit reached");
            return None;
        }

        let that_history = self.ctx.session.as_deref().map(ChatSession::that_history).unwrap_or_default();
        let topic = self.ctx.topic.clone();
        let found = {
            let mut query = MatchQuery::new(text).with_that_history(&that_history);
            if !topic.is_empty() {
                query = query.with_topic(&topic);
            }
            PatternMatcher::new(self.ctx.kb).find(&query)
        };
        let result = match found {
            Ok(result) if result.metrics.strategy != MatchStrategy::Default => result,
            _ => {
                tracing::debug!(input = text, "self-match found no category");
                return None;
            }
        };

        tracing::debug!(input = text, category = %result.id, depth = self.ctx.depth + 1, "self-match");
        let saved = std::mem::replace(&mut self.ctx.wildcards, result.wildcards);
        self.ctx.depth += 1;
        let out = self.evaluate_template(&result.category.template);
        self.ctx.depth -= 1;
        self.ctx.wildcards = saved;
        Some(out)
    }
}

/// A single text node.
pub(crate) fn text(value: impl Into<String>) -> Vec<Node> {
    vec![Node::Text(value.into())]
}

/// Nothing.
pub(crate) fn empty() -> Vec<Node> {
    Vec::new()
}

/// `el` left in the output unresolved.
pub(crate) fn unresolved(el: Element) -> Vec<Node> {
    vec![Node::Element(el)]
}
