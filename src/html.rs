/// Markup-agnostic output of the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// Markup passed through verbatim
    Raw(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    /// `None` marks a boolean attribute
    pub attrs: Vec<(&'static str, Option<String>)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, Some(value.into())));
        self
    }

    /// Boolean attribute, written without a value
    pub fn flag(mut self, name: &'static str) -> Self {
        self.attrs.push((name, None));
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

const VOID_TAGS: &[&str] = &["br", "hr", "img", "meta", "link"];

/// Serialize nodes to HTML
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    nodes_to_html(nodes, &mut out);
    out
}

fn nodes_to_html(nodes: &[Node], out: &mut String) {
    for node in nodes {
        node_to_html(node, out);
    }
}

fn node_to_html(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => {
            html_escape::encode_text_to_string(text, out);
        }
        Node::Raw(markup) => out.push_str(markup),
        Node::Element(element) => element_to_html(element, out),
    }
}

fn element_to_html(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            html_escape::encode_double_quoted_attribute_to_string(value, out);
            out.push('"');
        }
    }
    out.push('>');

    if VOID_TAGS.contains(&element.tag) {
        return;
    }

    nodes_to_html(&element.children, out);
    out.push_str("</");
    out.push_str(element.tag);
    out.push('>');
}
