//! Runtime learning.
//!
//! ```text
//! <learn>
//!   <category>
//!     <pattern>MY NAME IS <eval><star/></eval></pattern>
//!     <template>Hello <star/>, nice to meet you again.</template>
//!   </category>
//! </learn>
//! ```
//!
//! Only `<eval>` subtrees run at learn time; everything else in the pattern,
//! that, topic and template is stored as written; an `index` attribute on
//! `<that>` carries over as the category's that index. `<learnf>` additionally
//! hands each category to the persistence collaborator.

use crate::Category;
use crate::template::node::{Element, Node, render};
use crate::template::registry::{Runtime, TagHandler, empty, text};

pub(crate) struct LearnHandler;

impl TagHandler for LearnHandler {
    fn name(&self) -> &'static str {
        "learn"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["learn", "learnf", "eval"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        if el.name == "eval" {
            return text(rt.content(&el));
        }

        rt.ctx.volatile = true;
        let persist = el.name == "learnf";
        for category in el.elements("category") {
            let Some(category) = build(category, rt) else {
                tracing::warn!("learned category has no pattern or template");
                continue;
            };
            match rt.ctx.kb.add_category(category.clone()) {
                Ok(id) => tracing::debug!(category = %id, pattern = category.pattern.as_str(), "learned category"),
                Err(err) => {
                    tracing::warn!(%err, "learned category rejected");
                    continue;
                }
            }
            if persist {
                if let Err(err) = rt.ctx.collaborators.persist(&category) {
                    tracing::warn!(%err, pattern = category.pattern.as_str(), "persisting learned category failed");
                }
            }
        }
        empty()
    }
}

fn build(el: &Element, rt: &mut Runtime<'_, '_>) -> Option<Category> {
    let pattern = clause(el, "pattern", rt)?;
    let template = clause(el, "template", rt)?;
    let mut category = Category::new(pattern, template);
    if let Some(that) = clause(el, "that", rt).filter(|t| !t.is_empty()) {
        category = category.with_that(that);
        if let Some(index) = el.element("that").and_then(|t| t.attr("index")) {
            match index.trim().parse::<usize>() {
                Ok(index) => category = category.with_that_index(index),
                Err(_) => tracing::warn!(index, "ignoring non-numeric that index on learned category"),
            }
        }
    }
    if let Some(topic) = clause(el, "topic", rt).filter(|t| !t.is_empty()) {
        category = category.with_topic(topic);
    }
    Some(category)
}

fn clause(el: &Element, name: &str, rt: &mut Runtime<'_, '_>) -> Option<String> {
    let children = el.element(name)?.children.clone();
    Some(render(&expand_eval(children, rt)).trim().to_string())
}

/// Replace every `<eval>` subtree with its evaluated text.
fn expand_eval(nodes: Vec<Node>, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Element(el) if el.name == "eval" => Node::Text(rt.evaluate_nodes(el.children)),
            Node::Element(mut el) => {
                el.children = expand_eval(std::mem::take(&mut el.children), rt);
                Node::Element(el)
            }
            other => other,
        })
        .collect()
}
