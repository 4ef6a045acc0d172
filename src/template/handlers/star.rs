use super::index_attr;
use crate::CaptureSource;
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

/// `<star/>`, `<thatstar/>`, `<topicstar/>` with an optional 1-based `index`.
/// An unbound capture yields empty text.
pub(crate) struct StarHandler;

impl TagHandler for StarHandler {
    fn name(&self) -> &'static str {
        "star"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["star", "thatstar", "topicstar"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let source = match el.name.as_str() {
            "thatstar" => CaptureSource::That,
            "topicstar" => CaptureSource::Topic,
            _ => CaptureSource::Input,
        };
        text(rt.ctx.wildcards.capture(source, index_attr(&el)).unwrap_or_default())
    }
}
