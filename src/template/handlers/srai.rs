//! Self-match: `<srai>`, `<sr/>` and the external `<sraix>`.
//!
//! A failed lookup keeps the tag in the output so the miss stays visible.

use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text, unresolved};

pub(crate) struct SelfMatchHandler;

impl TagHandler for SelfMatchHandler {
    fn name(&self) -> &'static str {
        "srai"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["sr", "srai", "sraix"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        match el.name.as_str() {
            "sr" => {
                let query = rt.ctx.wildcards.star(1).unwrap_or_default().to_string();
                match rt.self_match(&query) {
                    Some(reply) => text(reply),
                    None => unresolved(el),
                }
            }
            "sraix" => sraix(el, rt),
            _ => {
                let query = rt.content(&el);
                match rt.self_match(&query) {
                    Some(reply) => text(reply),
                    None => unresolved(Element { children: text(query), ..el }),
                }
            }
        }
    }
}

fn sraix(el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    let service = el.attr("service").or_else(|| el.attr("bot")).unwrap_or("default").to_string();
    let query = rt.content(&el);
    rt.ctx.volatile = true;

    match rt.ctx.collaborators.call_service(&service, &query) {
        Ok(reply) => text(reply),
        Err(err) => {
            tracing::warn!(%err, service = service.as_str(), "external service call failed");
            unresolved(Element { children: text(query), ..el })
        }
    }
}
