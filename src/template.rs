//! Template execution.
//!
//! A template is parsed once into a [`Node`](node::Node) tree and rewritten by
//! a fixed sequence of tag passes. Each pass replaces the elements it owns with
//! their results; text it does not recognize passes through untouched.
//!
//! ```text
//! parse ──► star ──► variables ──► srai ──► learn ──► condition ──► temporal
//!                                                                      │
//!   render ◄── history ◄── system ◄── normalization ◄── text ◄── substitution ◄── collections
//! ```
//!
//! The order is load-bearing: captures and variables resolve before `srai`
//! sees its query, and text transforms see content that earlier passes have
//! already expanded. Within a pass elements are visited in document order,
//! so `<set>` runs before a later `<get>` of the same name.
//!
//! ## Self-match
//!
//! `<srai>` re-runs the matcher on its content and evaluates the winning
//! template with fresh wildcards but the same [`VariableContext`]. Nesting is
//! bounded by `max_loops`; a miss or an exceeded bound leaves the tag in the
//! output as markup.
//!
//! ## Caching
//!
//! Top-level results are cached under a digest of the template and everything
//! it can read (see [`TemplateCache`]). Templates with `list`, `array` or
//! `condition` tags bypass the cache, and so does any evaluation that wrote
//! state, consulted the clock or the RNG, or read history.

#[path = "template/cache.rs"]
mod cache;
#[path = "template/context.rs"]
mod context;
#[path = "template/handlers.rs"]
mod handlers;
#[path = "template/node.rs"]
mod node;
#[path = "template/parser.rs"]
mod parser;
#[path = "template/registry.rs"]
mod registry;


pub use cache::TemplateCache;
pub use context::{Scope, VariableContext};

use crate::config::EngineConfig;
use crate::engine::TemplateMetrics;
use crate::knowledge::KnowledgeBase;
use crate::normalize::squash_whitespace;
use node::{any_element, render};
use registry::{Registry, Runtime};
use std::time::Instant;

/// Tags whose effect depends on state the cache key does not cover.
const UNCACHEABLE_TAGS: &[&str] = &["list", "array", "condition"];

#[derive(Debug)]
pub struct TemplateEngine {
    registry: Registry,
    config: EngineConfig,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        TemplateEngine::new(EngineConfig::default())
    }
}

impl TemplateEngine {
    pub fn new(config: EngineConfig) -> Self {
        TemplateEngine { registry: Registry::standard(), config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pass names in execution order.
    pub fn passes(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Effective self-match bound: the `max_loops` property when it parses,
    /// else the configured value.
    pub fn max_loops(&self, kb: &KnowledgeBase) -> usize {
        kb.property("max_loops").and_then(|v| v.trim().parse().ok()).unwrap_or(self.config.max_loops)
    }

    /// Evaluate `template` to its final text.
    pub fn evaluate(&self, template: &str, ctx: &mut VariableContext<'_>) -> String {
        self.evaluate_with_metrics(template, ctx).0
    }

    pub fn evaluate_with_metrics(&self, template: &str, ctx: &mut VariableContext<'_>) -> (String, TemplateMetrics) {
        let start = Instant::now();
        let nodes = parser::parse(template);

        let cacheable =
            self.config.cache_enabled && !any_element(&nodes, &|el| UNCACHEABLE_TAGS.contains(&el.name.as_str()));
        let self_matches = any_element(&nodes, &|el| matches!(el.name.as_str(), "sr" | "srai"));
        let key = cacheable.then(|| TemplateCache::key(template, ctx, self_matches));
        if let Some(key) = &key {
            if let Some(hit) = ctx.cache.get(key) {
                tracing::debug!(key = key.as_str(), "template cache hit");
                return (hit, TemplateMetrics { passes: Vec::new(), cache_hit: true, total: start.elapsed() });
            }
        }

        ctx.volatile = false;
        let mut rt = Runtime::new(self, ctx);
        let nodes = rt.run_pipeline(nodes);
        let passes = rt.passes;
        let out = squash_whitespace(&render(&nodes));

        if let Some(key) = key {
            if !ctx.volatile {
                ctx.cache.insert(key, out.clone());
            }
        }
        (out, TemplateMetrics { passes, cache_hit: false, total: start.elapsed() })
    }

    /// Match `input` as a self-match would and evaluate the winning template
    /// in `ctx`. `None` when nothing matches or the nesting bound is reached.
    pub fn self_match(&self, input: &str, ctx: &mut VariableContext<'_>) -> Option<String> {
        Runtime::new(self, ctx).self_match(input)
    }
}
