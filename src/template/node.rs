//! Template tree.

/// A parsed template fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Text(String),
    Element(Element),
}

/// A tag with its attributes and content. Names are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element { name: name.into(), ..Element::default() }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Child elements named `name`, in document order.
    pub fn elements<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |n| match n {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements(name).next()
    }

    /// Attribute `name`, or else the literal text of a child element of that
    /// name (`<get><name>x</name></get>`).
    pub fn attr_or_child(&self, name: &str) -> Option<String> {
        if let Some(value) = self.attr(name) {
            return Some(value.to_string());
        }
        self.element(name).map(|el| text_of(&el.children).trim().to_string())
    }

    /// Content with the attribute-carrying child `name` removed.
    pub fn children_without(&self, name: &str) -> Vec<Node> {
        self.children.iter().filter(|n| !matches!(n, Node::Element(el) if el.name == name)).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|n| matches!(n, Node::Text(t) if t.trim().is_empty()))
    }
}

/// Serialize nodes back to markup. Resolved content is plain text; elements
/// still present are written out as tags.
pub(crate) fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    render_into(nodes, &mut out);
    out
}

fn render_into(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
                if el.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    render_into(&el.children, out);
                    out.push_str("</");
                    out.push_str(&el.name);
                    out.push('>');
                }
            }
        }
    }
}

/// Text content only, ignoring markup.
pub(crate) fn text_of(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => out.push_str(&text_of(&el.children)),
        }
    }
    out
}

/// Whether any element in the tree satisfies `pred`.
pub(crate) fn any_element(nodes: &[Node], pred: &dyn Fn(&Element) -> bool) -> bool {
    nodes.iter().any(|n| match n {
        Node::Text(_) => false,
        Node::Element(el) => pred(el) || any_element(&el.children, pred),
    })
}
