//! Variable and property access: `set`, `get`, `bot`, `property`, `topic`,
//! `think` and `name`.
//!
//! ```text
//! <set var="x">..</set>        local
//! <set name="x">..</set>       session when attached, else global
//! <set name="x" scope="global">..</set>
//! <get name="x"/>              locals -> captures -> session -> globals -> properties
//! ```
//!
//! A `set` carrying an `operation` attribute is a collection operation and
//! belongs to the collections pass.

use crate::template::context::Scope;
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, empty, text};

pub(crate) struct VariableHandler;

impl TagHandler for VariableHandler {
    fn name(&self) -> &'static str {
        "variables"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["set", "get", "bot", "property", "topic", "think", "name"]
    }

    fn should_process(&self, el: &Element) -> bool {
        match el.name.as_str() {
            "set" => !el.has_attr("operation"),
            // `<name>x</name>` names the target of an enclosing tag.
            "name" => el.children.is_empty(),
            other => self.tags().contains(&other),
        }
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        match el.name.as_str() {
            "set" => set(&el, rt),
            "get" => get(&el, rt),
            "bot" | "property" => {
                let name = rt.attr(&el, "name").unwrap_or_default();
                text(property_or_default(&el, rt, &name))
            }
            "name" => text(property_or_default(&el, rt, "name")),
            "topic" => topic(&el, rt),
            "think" => {
                rt.content(&el);
                empty()
            }
            _ => vec![Node::Element(el)],
        }
    }
}

/// Target of a write or read: `var` is local, `name` follows the context's
/// default, and `scope` overrides either.
fn target(el: &Element, rt: &mut Runtime<'_, '_>) -> Option<(Scope, String)> {
    let (mut scope, name) = match rt.attr(el, "var") {
        Some(var) => (Scope::Local, var),
        None => (rt.ctx.named_scope(), rt.attr(el, "name")?),
    };
    if let Some(explicit) = el.attr("scope").and_then(Scope::parse) {
        scope = explicit;
    }
    Some((scope, name))
}

fn set(el: &Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    let Some((scope, name)) = target(el, rt) else {
        tracing::debug!("<set> without a name");
        return empty();
    };
    let value = rt.content_without(el, &["name", "var"]);
    match rt.ctx.set(scope, &name, &value) {
        Ok(()) => text(value),
        Err(err) => {
            tracing::warn!(%err, scope = scope.as_str(), "template write rejected");
            empty()
        }
    }
}

fn get(el: &Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    let explicit = el.attr("scope").and_then(Scope::parse);
    let value = match (rt.attr(el, "var"), explicit) {
        (Some(var), _) => rt.ctx.get_in(Scope::Local, &var),
        (None, Some(scope)) => rt.attr(el, "name").and_then(|name| rt.ctx.get_in(scope, &name)),
        (None, None) => rt.attr(el, "name").and_then(|name| rt.ctx.get(&name)),
    };
    text(value.or_else(|| el.attr("default").map(str::to_string)).unwrap_or_default())
}

fn property_or_default(el: &Element, rt: &Runtime<'_, '_>, name: &str) -> String {
    rt.ctx
        .kb
        .property(name)
        .map(str::to_string)
        .or_else(|| el.attr("default").map(str::to_string))
        .unwrap_or_default()
}

/// `<topic/>` reads the current topic; `<topic>x</topic>` moves it.
fn topic(el: &Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    if el.is_empty() {
        return text(rt.ctx.topic.clone());
    }
    let value = rt.content(el);
    if let Err(err) = rt.ctx.set(Scope::Session, "topic", &value) {
        tracing::warn!(%err, "topic write rejected");
    }
    empty()
}
