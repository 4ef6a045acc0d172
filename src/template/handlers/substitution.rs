use crate::normalize::{GENDER, PERSON, PERSON2, Substitutions};
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

/// `<person>`, `<person2>`, `<gender>`: word swaps from the knowledge-base
/// map of the same name when one is loaded, else the built-in English tables.
/// An empty tag applies to the first input capture.
pub(crate) struct SubstitutionHandler;

impl TagHandler for SubstitutionHandler {
    fn name(&self) -> &'static str {
        "substitution"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["person", "person2", "gender"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let input = if el.is_empty() {
            rt.ctx.wildcards.star(1).unwrap_or_default().to_string()
        } else {
            rt.content(&el)
        };

        if let Some(map) = rt.ctx.kb.map(&el.name).filter(|m| !m.is_empty()) {
            return text(Substitutions::from_map(map).apply(&input));
        }
        let table: &Substitutions = match el.name.as_str() {
            "person2" => &*PERSON2,
            "gender" => &*GENDER,
            _ => &*PERSON,
        };
        text(table.apply(&input))
    }
}
