//! Recursive-descent template parser.
//!
//! Produces a [`Node`] tree from template markup. The parser never fails:
//!
//! - an unclosed tag closes at the end of its parent (or of the input),
//! - a closing tag with no open counterpart stays literal text,
//! - a `<` that does not start a well-formed tag stays literal text,
//! - comments are dropped.
//!
//! Same-named nesting (`<condition>` inside `<condition>`) is handled by the
//! recursion itself: each element consumes exactly up to its own closing tag.

use super::node::{Element, Node};

pub(crate) fn parse(input: &str) -> Vec<Node> {
    let mut parser = Parser { src: input, pos: 0, open: Vec::new() };
    parser.nodes_until(None)
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
    /// Names of the currently open elements, outermost first.
    open: Vec<String>,
}

enum Tag {
    Open(Element, bool),
    Close(String),
}

impl<'s> Parser<'s> {
    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    /// Parse content until the closing tag of `parent` (consumed) or the end.
    fn nodes_until(&mut self, parent: Option<&str>) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();

        while self.pos < self.src.len() {
            let rest = self.rest();

            if rest.starts_with("<!--") {
                self.pos += rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
                continue;
            }

            if rest.starts_with('<') {
                match self.tag() {
                    Some((Tag::Open(mut el, self_closing), len)) => {
                        self.pos += len;
                        if !self_closing {
                            self.open.push(el.name.clone());
                            el.children = self.nodes_until(Some(&el.name));
                            self.open.pop();
                        }
                        nodes.push(Node::Element(el));
                        continue;
                    }
                    Some((Tag::Close(name), len)) => {
                        if parent == Some(name.as_str()) {
                            self.pos += len;
                            return nodes;
                        }
                        if self.open.iter().any(|n| *n == name) {
                            // Closes an ancestor: end this element implicitly.
                            return nodes;
                        }
                        push_text(&mut nodes, &rest[..len]);
                        self.pos += len;
                        continue;
                    }
                    None => {
                        push_text(&mut nodes, "<");
                        self.pos += 1;
                        continue;
                    }
                }
            }

            let end = rest.find('<').unwrap_or(rest.len());
            push_text(&mut nodes, &rest[..end]);
            self.pos += end;
        }

        nodes
    }

    fn tag(&self) -> Option<(Tag, usize)> {
        let rest = self.rest();
        if let Some(caps) = regex!(r"^</\s*([A-Za-z_][\w\-.:]*)\s*>").captures(rest) {
            return Some((Tag::Close(caps[1].to_ascii_lowercase()), caps[0].len()));
        }

        let caps = regex!(r#"^<([A-Za-z_][\w\-.:]*)((?:\s+[\w\-.:]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/?)>"#)
            .captures(rest)?;
        let mut el = Element::new(caps[1].to_ascii_lowercase());
        for attr in regex!(r#"([\w\-.:]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).captures_iter(&caps[2]) {
            let value = attr.get(2).or_else(|| attr.get(3)).map(|m| m.as_str()).unwrap_or_default();
            el.attrs.push((attr[1].to_ascii_lowercase(), value.to_string()));
        }
        Some((Tag::Open(el, !caps[3].is_empty()), caps[0].len()))
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}
