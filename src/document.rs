//! In-memory page tree.
//!
//! A [`Document`] is an arena of nodes addressed by [`NodeId`]. The tree is
//! owned by whoever hosts the page; the augmentor only reads it and inserts
//! new elements. Nodes are never freed: a detached node keeps its id and its
//! own subtree, it is simply no longer reachable from the root.

use std::fmt;

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A rendered page held in memory.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever created, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_owned()))
    }

    pub fn create_doctype(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Doctype(text.to_owned()))
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Tag name of an element, `None` for any other node kind.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set (or replace) an attribute. No-op on non-element nodes.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(i) => attrs[i].1 = value.to_owned(),
                None => attrs.push((name.to_ascii_lowercase(), value.to_owned())),
            }
        }
    }

    /// Whether the element's `class` attribute lists `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Remove `id` from its parent. The node and its subtree stay valid.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `child` into `parent` right before `reference`. Falls back to
    /// appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let siblings = &mut self.nodes[parent.0].children;
        match siblings.iter().position(|c| *c == reference) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
    }

    /// True when the node can be reached from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Pre-order walk over every node below `id` (excluding `id` itself).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Literal text below `id`, markup excluded. A `<br>` reads as a line
    /// break, the way it renders.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = &self.nodes[id.0].data {
            return text.clone();
        }
        self.descendants(id)
            .filter_map(|n| match self.data(n) {
                NodeData::Text(text) => Some(text.as_str()),
                NodeData::Element { tag, .. } if tag == "br" => Some("\n"),
                _ => None,
            })
            .collect()
    }

    /// Set the text of an element whose only child is a text node, reusing
    /// that node. Any other shape goes through [`Document::set_text_content`].
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let &[only] = self.nodes[id.0].children.as_slice()
            && let NodeData::Text(current) = &mut self.nodes[only.0].data
        {
            text.clone_into(current);
            return;
        }
        self.set_text_content(id, text);
    }

    /// Replace every child of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let old = std::mem::take(&mut self.nodes[id.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre_with_code(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let pre = doc.create_element("pre");
        let code = doc.create_element("code");
        let t = doc.create_text(text);
        doc.append_child(code, t);
        doc.append_child(pre, code);
        doc.append_child(doc.root(), pre);
        (pre, code)
    }

    #[test]
    fn test_descendants_preorder() {
        let mut doc = Document::new();
        let (pre, code) = pre_with_code(&mut doc, "x");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p);
        let walked: Vec<NodeId> = doc.descendants(doc.root()).collect();
        assert_eq!(walked[0], pre);
        assert_eq!(walked[1], code);
        assert_eq!(walked[3], p);
        assert_eq!(walked.len(), 4);
    }

    #[test]
    fn test_text_content_concatenates() {
        let mut doc = Document::new();
        let (_, code) = pre_with_code(&mut doc, "let a = 1;");
        let span = doc.create_element("span");
        let t = doc.create_text("\nlet b = 2;");
        doc.append_child(span, t);
        doc.append_child(code, span);
        assert_eq!(doc.text_content(code), "let a = 1;\nlet b = 2;");
    }

    #[test]
    fn test_insert_before_and_prepend() {
        let mut doc = Document::new();
        let (pre, code) = pre_with_code(&mut doc, "x");
        let a = doc.create_element("button");
        doc.insert_before(doc.root(), a, pre);
        assert_eq!(doc.children(doc.root()), &[a, pre]);
        let b = doc.create_element("button");
        doc.prepend_child(pre, b);
        assert_eq!(doc.children(pre), &[b, code]);
        assert_eq!(doc.parent(b), Some(pre));
    }

    #[test]
    fn test_detach_orphans_subtree() {
        let mut doc = Document::new();
        let (pre, code) = pre_with_code(&mut doc, "x");
        assert!(doc.is_attached(code));
        doc.detach(pre);
        assert!(!doc.is_attached(code));
        assert!(doc.children(doc.root()).is_empty());
        assert_eq!(doc.text_content(code), "x");
    }

    #[test]
    fn test_class_and_attrs() {
        let mut doc = Document::new();
        let div = doc.create_element("DIV");
        doc.set_attr(div, "class", "language-rust highlighter-rouge");
        assert_eq!(doc.tag(div), Some("div"));
        assert!(doc.has_class(div, "highlighter-rouge"));
        assert!(!doc.has_class(div, "highlight"));
        doc.set_attr(div, "CLASS", "highlight");
        assert!(doc.has_class(div, "highlight"));
    }

    #[test]
    fn test_br_reads_as_newline() {
        let mut doc = Document::new();
        let (_, code) = pre_with_code(&mut doc, "a");
        let br = doc.create_element("br");
        doc.append_child(code, br);
        let b = doc.create_text("b");
        doc.append_child(code, b);
        assert_eq!(doc.text_content(code), "a\nb");
    }

    #[test]
    fn test_set_text_reuses_node() {
        let mut doc = Document::new();
        let b = doc.create_element("button");
        doc.append_child(doc.root(), b);
        doc.set_text(b, "Copy");
        let count = doc.node_count();
        for _ in 0..10 {
            doc.set_text(b, "Copied!");
            doc.set_text(b, "Copy");
        }
        assert_eq!(doc.node_count(), count);
        assert_eq!(doc.children(b).len(), 1);
        assert_eq!(doc.text_content(b), "Copy");
    }

    #[test]
    fn test_set_text_content_replaces_children() {
        let mut doc = Document::new();
        let b = doc.create_element("button");
        doc.append_child(doc.root(), b);
        doc.set_text_content(b, "Copy");
        doc.set_text_content(b, "Copied!");
        assert_eq!(doc.children(b).len(), 1);
        assert_eq!(doc.text_content(b), "Copied!");
    }
}
