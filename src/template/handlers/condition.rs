//! `<condition>` in its three shapes:
//!
//! ```text
//! <condition name="mood" value="happy">..</condition>          block
//! <condition name="mood"><li value="happy">..</li><li>..</li></condition>
//! <condition><li name="mood" value="happy">..</li><li>..</li></condition>
//! ```
//!
//! `var=` reads a local instead of `name=`. Values compare case-insensitively
//! after whitespace normalization; `value="*"` accepts any bound, non-empty
//! value; an `li` without a value is the default branch. Only the selected
//! branch is evaluated.

use crate::normalize::squash_whitespace;
use crate::template::context::Scope;
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, empty, text};

const ATTRIBUTE_CHILDREN: &[&str] = &["name", "var", "value"];

pub(crate) struct ConditionHandler;

impl TagHandler for ConditionHandler {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["condition"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let shared = Subject::of(&el, rt);

        if el.element("li").is_none() {
            let Some(subject) = shared else {
                return empty();
            };
            let expected = rt.attr(&el, "value");
            return if subject.matches(rt, expected.as_deref()) {
                text(rt.content_without(&el, ATTRIBUTE_CHILDREN))
            } else {
                empty()
            };
        }

        for li in el.elements("li") {
            let expected = rt.attr(li, "value");
            let Some(expected) = expected else {
                return text(rt.content_without(li, ATTRIBUTE_CHILDREN));
            };
            let Some(subject) = Subject::of(li, rt).or_else(|| shared.clone()) else {
                continue;
            };
            if subject.matches(rt, Some(&expected)) {
                return text(rt.content_without(li, ATTRIBUTE_CHILDREN));
            }
        }
        empty()
    }
}

/// The variable a condition tests.
#[derive(Clone)]
enum Subject {
    Local(String),
    Named(String),
}

impl Subject {
    fn of(el: &Element, rt: &mut Runtime<'_, '_>) -> Option<Subject> {
        if let Some(var) = rt.attr(el, "var") {
            return Some(Subject::Local(var));
        }
        rt.attr(el, "name").map(Subject::Named)
    }

    fn value(&self, rt: &Runtime<'_, '_>) -> Option<String> {
        match self {
            Subject::Local(name) => rt.ctx.get_in(Scope::Local, name),
            Subject::Named(name) => rt.ctx.get(name),
        }
    }

    fn matches(&self, rt: &Runtime<'_, '_>, expected: Option<&str>) -> bool {
        let actual = self.value(rt).map(|v| squash_whitespace(&v)).unwrap_or_default();
        match expected.map(squash_whitespace) {
            None => false,
            Some(expected) if expected == "*" => !actual.is_empty(),
            Some(expected) => actual.to_lowercase() == expected.to_lowercase(),
        }
    }
}
