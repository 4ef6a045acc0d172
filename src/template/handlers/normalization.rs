use crate::normalize::{DENORMAL, NORMAL, Substitutions, normalize};
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

/// `<normalize>` expands contractions and abbreviations (`normal` map) and
/// then fully normalizes; `<denormalize>` applies the `denormal` map.
pub(crate) struct NormalizationHandler;

impl TagHandler for NormalizationHandler {
    fn name(&self) -> &'static str {
        "normalization"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["normalize", "denormalize"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let content = rt.content(&el);
        let (map_name, builtin): (&str, &Substitutions) =
            if el.name == "normalize" { ("normal", &*NORMAL) } else { ("denormal", &*DENORMAL) };

        let substituted = match rt.ctx.kb.map(map_name).filter(|m| !m.is_empty()) {
            Some(map) => Substitutions::from_map(map).apply(&content),
            None => builtin.apply(&content),
        };
        if el.name == "normalize" { text(normalize(&substituted)) } else { text(substituted) }
    }
}
