//! Owned HTML tree for parsed decks.
//!
//! Decks are parsed with `tl` and converted into an owned tree so cache
//! entries outlive the source text and slides can be cloned into isolated
//! fragments.
//!
//! Text nodes keep their source form (entities untouched) and are written back
//! verbatim. Attribute values are entity-decoded on import and escaped on output.

use crate::utils::html::{escape_attr, is_void_element, unescape};

// =============================================================================
// Node types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Serialized text (already escaped / raw for `style` and `script`).
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let kept: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        let joined = kept.join(" ");
        self.set_attr("class", joined);
    }

    /// Direct element children.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Depth-first pre-order walk over this element and its descendants.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        for child in self.child_elements() {
            child.walk(f);
        }
    }

    /// Mutable depth-first walk.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.walk_mut(f);
            }
        }
    }

    /// First element (self included) matching `pred`, in document order.
    pub fn find(&self, pred: &impl Fn(&Element) -> bool) -> Option<&Element> {
        if pred(self) {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find(pred))
    }

    /// All elements (self included) matching `pred`, in document order.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
        let mut found = Vec::new();
        self.walk(&mut |e| {
            if pred(e) {
                found.push(e);
            }
        });
        found
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    pub fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            if !v.is_empty() {
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
        }
        out.push('>');

        if is_void_element(&self.name) {
            return;
        }

        for child in &self.children {
            match child {
                Node::Element(e) => e.write_html(out),
                Node::Text(t) => out.push_str(t),
            }
        }

        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

// =============================================================================
// Document
// =============================================================================

/// Parsed document. `root` is a synthetic `#document` element holding the
/// top-level nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse HTML text into an owned tree.
    pub fn parse(html: &str) -> Result<Self, tl::ParseError> {
        let dom = tl::parse(html, tl::ParserOptions::default())?;
        let parser = dom.parser();

        let mut root = Element::new("#document");
        for handle in dom.children() {
            if let Some(node) = convert(*handle, parser) {
                root.children.push(node);
            }
        }
        Ok(Self { root })
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.root.find(&|e: &Element| e.attr("id") == Some(id))
    }

    pub fn find(&self, pred: &impl Fn(&Element) -> bool) -> Option<&Element> {
        self.root.find(pred)
    }

    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
        self.root.find_all(pred)
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        self.root.walk_mut(f);
    }
}

/// Convert a tl node handle into an owned node.
fn convert(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<Node> {
    let node = handle.get(parser)?;

    match node {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_lowercase();
            // <!DOCTYPE>, processing instructions
            if name.starts_with('!') || name.starts_with('?') {
                return None;
            }

            let mut elem = Element::new(name);
            for (key, value) in tag.attributes().iter() {
                let key: &str = key.as_ref();
                let value = value
                    .map(|v| unescape(v.as_ref()).into_owned())
                    .unwrap_or_default();
                elem.set_attr(&key.to_ascii_lowercase(), value);
            }

            for child in tag.children().top().iter() {
                if let Some(node) = convert(*child, parser) {
                    elem.children.push(node);
                }
            }

            Some(Node::Element(elem))
        }
        tl::Node::Raw(bytes) => Some(Node::Text(bytes.as_utf8_str().into_owned())),
        tl::Node::Comment(_) => None,
    }
}
