//! Case and word transforms over evaluated content.

use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, text};

pub(crate) struct TextHandler;

impl TagHandler for TextHandler {
    fn name(&self) -> &'static str {
        "text"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["uppercase", "lowercase", "formal", "sentence", "explode", "first", "rest"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let content = if el.is_empty() {
            rt.ctx.wildcards.star(1).unwrap_or_default().to_string()
        } else {
            rt.content(&el)
        };
        text(transform(&el.name, &content))
    }
}

pub(crate) fn transform(tag: &str, s: &str) -> String {
    match tag {
        "uppercase" => s.to_uppercase(),
        "lowercase" => s.to_lowercase(),
        "formal" => s.split_whitespace().map(capitalize).collect::<Vec<_>>().join(" "),
        "sentence" => upper_first(s),
        "explode" => s.chars().filter(|c| !c.is_whitespace()).map(String::from).collect::<Vec<_>>().join(" "),
        "first" => s.split_whitespace().next().unwrap_or_default().to_string(),
        "rest" => s.split_whitespace().skip(1).collect::<Vec<_>>().join(" "),
        _ => s.to_string(),
    }
}

/// Upper-case the first character and keep the rest as written.
fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms() {
        assert_eq!(transform("formal", "ada LOVELACE"), "Ada Lovelace");
        assert_eq!(transform("sentence", "hello NASA"), "Hello NASA");
        assert_eq!(transform("sentence", "ça va"), "Ça va");
        assert_eq!(transform("explode", "ab c"), "a b c");
        assert_eq!(transform("first", "one two three"), "one");
        assert_eq!(transform("rest", "one two three"), "two three");
        assert_eq!(transform("rest", "one"), "");
    }
}
