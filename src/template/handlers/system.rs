use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

/// `<size/>`, `<version/>`, `<id/>`, `<vocabulary/>`, `<program/>`.
pub(crate) struct SystemHandler;

impl TagHandler for SystemHandler {
    fn name(&self) -> &'static str {
        "system"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["size", "version", "id", "vocabulary", "program"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let kb = &*rt.ctx.kb;
        match el.name.as_str() {
            "size" => text(kb.len().to_string()),
            "version" => text(kb.property("version").unwrap_or(env!("CARGO_PKG_VERSION"))),
            "id" => text(rt.ctx.session_id().unwrap_or_default()),
            "vocabulary" => text(kb.vocabulary().len().to_string()),
            _ => text(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
        }
    }
}
