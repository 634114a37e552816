//! Structured queries over rendered page markup.
//!
//! The markup is parsed once with html5ever and flattened into an arena of
//! owned nodes in document order, so node ids compare by position and the
//! tree can cross `.await` points.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::ops::ControlFlow;

/// Index of a node in the arena. Smaller ids come first in the document.
pub type NodeId = usize;

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "p", "div", "li", "ul", "ol", "dl", "dt", "dd", "table", "thead", "tbody",
    "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "center", "hr",
    "section",
];

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct TreeNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A piece of a labeled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFragment {
    /// Bare text between nodes.
    Text(String),
    /// Link text, with the link's `title` attribute.
    Link { text: String, title: Option<String> },
}

impl ValueFragment {
    pub fn text(&self) -> &str {
        match self {
            ValueFragment::Text(t) => t,
            ValueFragment::Link { text, .. } => text,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, ValueFragment::Link { .. })
    }
}

/// Parsed page markup.
#[derive(Debug, Clone)]
pub struct PageTree {
    nodes: Vec<TreeNode>,
}

impl PageTree {
    /// Parse rendered HTML. html5ever recovers from any malformed input.
    pub fn parse(markup: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(markup);
        let mut tree = Self { nodes: Vec::new() };
        tree.push_nodes(&dom.document);
        tree
    }

    /// Flatten the DOM in pre-order. Walks with an explicit stack so deeply
    /// nested markup cannot exhaust the thread stack.
    fn push_nodes(&mut self, root: &Handle) {
        let mut stack: Vec<(Handle, Option<NodeId>)> = vec![(root.clone(), None)];

        while let Some((handle, parent)) = stack.pop() {
            let kind = match &handle.data {
                NodeData::Document => NodeKind::Element {
                    tag: "#document".to_string(),
                    attrs: Vec::new(),
                },
                NodeData::Element { name, attrs, .. } => NodeKind::Element {
                    tag: name.local.to_ascii_lowercase().to_string(),
                    attrs: attrs
                        .borrow()
                        .iter()
                        .map(|a| (a.name.local.to_string(), a.value.to_string()))
                        .collect(),
                },
                NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
                _ => continue,
            };

            let id = self.nodes.len();
            self.nodes.push(TreeNode {
                kind,
                parent,
                children: Vec::new(),
            });
            if let Some(p) = parent {
                self.nodes[p].children.push(id);
            }

            // reversed so the first child is popped next
            for child in handle.children.borrow().iter().rev() {
                stack.push((child.clone(), Some(id)));
            }
        }
    }

    // -------------------------------------------------------------------------
    // Node accessors
    // -------------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn siblings_after(&self, id: NodeId) -> &[NodeId] {
        let Some(parent) = self.parent(id) else {
            return &[];
        };
        let siblings = self.children(parent);
        match siblings.iter().position(|&s| s == id) {
            Some(pos) => &siblings[pos + 1..],
            None => &[],
        }
    }

    /// Elements with the given tag, in document order.
    pub fn elements<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        (0..self.nodes.len()).filter(move |&id| self.tag(id) == Some(tag))
    }

    /// Whitespace-normalized text of a node and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_raw_text(id, &mut raw);
        normalize_ws(&raw)
    }

    fn collect_raw_text(&self, id: NodeId, out: &mut String) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match &self.nodes[node].kind {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::Element { .. } => stack.extend(self.children(node).iter().rev()),
            }
        }
    }

    /// Text of a node keeping its line structure: `br` and block
    /// boundaries become line breaks, blank lines are dropped.
    pub fn block_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_lines(id, &mut raw);
        raw.lines()
            .map(normalize_ws)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn collect_lines(&self, id: NodeId, out: &mut String) {
        enum Step {
            Enter(NodeId),
            CloseBlock,
        }

        let mut stack = vec![Step::Enter(id)];
        while let Some(step) = stack.pop() {
            let node = match step {
                Step::CloseBlock => {
                    out.push('\n');
                    continue;
                }
                Step::Enter(node) => node,
            };
            match &self.nodes[node].kind {
                NodeKind::Text(t) => {
                    out.extend(t.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
                }
                NodeKind::Element { tag, .. } => {
                    if tag == "br" {
                        out.push('\n');
                        continue;
                    }
                    if is_block_tag(tag) {
                        out.push('\n');
                        stack.push(Step::CloseBlock);
                    }
                    stack.extend(self.children(node).iter().rev().map(|&c| Step::Enter(c)));
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Labels and values
    // -------------------------------------------------------------------------

    fn is_block(&self, id: NodeId) -> bool {
        match self.tag(id) {
            Some(tag) => tag == "#document" || is_block_tag(tag),
            None => false,
        }
    }

    /// Nearest block-level ancestor of a node.
    pub fn enclosing_block(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.parent(id);
        while let Some(node) = cursor {
            if self.is_block(node) {
                return Some(node);
            }
            cursor = self.parent(node);
        }
        None
    }

    /// Label name of a bold node ending with a colon ("Composer:" -> "Composer").
    pub fn label_name(&self, id: NodeId) -> Option<String> {
        if !matches!(self.tag(id), Some("b") | Some("strong")) {
            return None;
        }
        let text = self.text(id);
        let name = text.strip_suffix(':')?.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// Every label node in document order, with its name.
    pub fn labels(&self) -> Vec<(NodeId, String)> {
        (0..self.nodes.len())
            .filter_map(|id| self.label_name(id).map(|name| (id, name)))
            .collect()
    }

    /// Text and link nodes following a label, up to the next label,
    /// line break or block boundary.
    pub fn values_after(&self, label: NodeId) -> Vec<ValueFragment> {
        let mut out = Vec::new();
        let mut cursor = label;

        loop {
            for &sibling in self.siblings_after(cursor) {
                if self.collect_value(sibling, &mut out).is_break() {
                    return out;
                }
            }
            // label wrapped in an inline element: keep reading after the wrapper
            match self.parent(cursor) {
                Some(parent) if !self.is_block(parent) => cursor = parent,
                _ => return out,
            }
        }
    }

    fn collect_value(&self, id: NodeId, out: &mut Vec<ValueFragment>) -> ControlFlow<()> {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match &self.nodes[node].kind {
                NodeKind::Text(t) => {
                    let text = normalize_ws(t);
                    if !text.is_empty() {
                        out.push(ValueFragment::Text(text));
                    }
                }
                NodeKind::Element { tag, .. } => {
                    if tag == "br" || is_block_tag(tag) || self.label_name(node).is_some() {
                        return ControlFlow::Break(());
                    }
                    if tag == "a" {
                        let text = self.text(node);
                        if !text.is_empty() {
                            out.push(ValueFragment::Link {
                                text,
                                title: self.attr(node, "title").map(str::to_string),
                            });
                        }
                        continue;
                    }
                    stack.extend(self.children(node).iter().rev());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Collapse whitespace runs (including non-breaking spaces) and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
