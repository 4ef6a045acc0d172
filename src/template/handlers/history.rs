//! Conversation history: `<request/>`, `<input/>`, `<response/>`, `<that/>`.
//!
//! Indices are 1-based from the most recent item. `<that index="n,s"/>` picks
//! sentence `s` of response `n`, counting sentences from the end so `1,1` is
//! the last sentence of the last response. Out-of-range reads yield empty
//! text.

use super::index_attr;
use crate::normalize::light_normalize;
use crate::session::ChatSession;
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

pub(crate) struct HistoryHandler;

impl TagHandler for HistoryHandler {
    fn name(&self) -> &'static str {
        "history"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["request", "input", "response", "that"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        rt.ctx.volatile = true;
        let Some(session) = rt.ctx.session.as_deref() else {
            return text("");
        };
        let value = match el.name.as_str() {
            "request" | "input" => session.request(index_attr(&el)).map(str::to_string),
            "response" => session.response(index_attr(&el)).map(str::to_string),
            _ => that(session, el.attr("index")),
        };
        text(value.unwrap_or_default())
    }
}

fn that(session: &ChatSession, index: Option<&str>) -> Option<String> {
    let positive = |s: &str| s.trim().parse::<usize>().ok().filter(|&n| n > 0);
    let index = index.unwrap_or_default();
    let (turn, sentence) = match index.split_once(',') {
        Some((turn, sentence)) => (turn, Some(sentence)),
        None => (index, None),
    };
    let turn = positive(turn).unwrap_or(1);
    let Some(sentence) = sentence else {
        return session.that(turn).map(str::to_string);
    };

    let from_end = positive(sentence).unwrap_or(1);
    let sentences: Vec<String> =
        session.response(turn)?.split(['.', '!', '?']).map(light_normalize).filter(|s| !s.is_empty()).collect();
    sentences.len().checked_sub(from_end).and_then(|i| sentences.get(i).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn that_index_selects_turn_and_sentence() {
        let mut session = ChatSession::new("h");
        session.add_response("Hello. How are you?");
        session.add_response("Nice! Do you like cats?");

        assert_eq!(that(&session, None).as_deref(), Some("Do you like cats"));
        assert_eq!(that(&session, Some("2")).as_deref(), Some("How are you"));
        assert_eq!(that(&session, Some("1,2")).as_deref(), Some("Nice"));
        assert_eq!(that(&session, Some("2,1")).as_deref(), Some("How are you"));
        assert_eq!(that(&session, Some("2,3")), None);
        assert_eq!(that(&session, Some("5")), None);
    }
}
