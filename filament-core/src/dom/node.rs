//! Document Nodes
//!
//! This module defines the node handle that lives in the host document.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;

use super::document::{DocumentStats, StructuralOp};

/// Unique identifier for a node in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// The kind of node in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// A tagged element carrying attributes, style and listeners.
    Element { tag: String },

    /// Literal text.
    Text { content: String },

    /// Invisible marker. Placeholders render as empty comments.
    Comment { content: String },

    /// A detached container whose children move into the parent on insert.
    /// A fragment is empty once it has been inserted.
    Fragment,
}

/// An event delivered to listeners by [`Node::dispatch`].
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// Event listener attached to an element.
pub type EventHandler = Rc<dyn Fn(&Event)>;

struct NodeData {
    id: NodeId,
    kind: NodeKind,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: IndexMap<String, SmallVec<[EventHandler; 1]>>,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
    stats: Rc<DocumentStats>,
}

/// Shared handle to a document node.
///
/// Parents own their children; children point back weakly. All structural
/// operations silently do nothing when the node they need is detached.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    pub(crate) fn new(kind: NodeKind, stats: Rc<DocumentStats>) -> Self {
        stats.record(StructuralOp::Created);
        Self(Rc::new(RefCell::new(NodeData {
            id: NodeId::new(),
            kind,
            attributes: IndexMap::new(),
            style: IndexMap::new(),
            listeners: IndexMap::new(),
            parent: Weak::new(),
            children: Vec::new(),
            stats,
        })))
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.0.borrow().id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    /// Tag name for elements.
    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Comment { .. })
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Fragment)
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Concatenated text of this node and its descendants. Comments
    /// contribute nothing.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text { content } => out.push_str(content),
            NodeKind::Comment { .. } => {}
            NodeKind::Element { .. } | NodeKind::Fragment => {
                for child in &data.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Replace the content of a text node. Other kinds are left untouched.
    pub fn set_text(&self, text: impl Into<String>) {
        if let NodeKind::Text { content } = &mut self.0.borrow_mut().kind {
            *content = text.into();
        }
    }

    // ------------------------------------------------------------------
    // Attributes, style, listeners
    // ------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attributes.get(name).cloned()
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.borrow_mut().attributes.shift_remove(name)
    }

    pub fn style_property(&self, name: &str) -> Option<String> {
        self.0.borrow().style.get(name).cloned()
    }

    pub fn set_style(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0.borrow_mut().style.insert(name.into(), value.into());
    }

    pub fn add_listener(&self, event: impl Into<String>, handler: EventHandler) {
        self.0
            .borrow_mut()
            .listeners
            .entry(event.into())
            .or_default()
            .push(handler);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.0
            .borrow()
            .listeners
            .get(event)
            .map_or(0, |handlers| handlers.len())
    }

    /// Invoke every listener registered for `event` on this node. Returns
    /// how many ran. Events do not bubble.
    pub fn dispatch(&self, event: &str) -> usize {
        let (target, handlers) = {
            let data = self.0.borrow();
            let handlers: SmallVec<[EventHandler; 2]> = data
                .listeners
                .get(event)
                .map(|handlers| handlers.iter().cloned().collect())
                .unwrap_or_default();
            (data.id, handlers)
        };

        let event = Event {
            name: event.to_string(),
            target,
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.borrow().children.first().cloned()
    }

    /// The topmost ancestor (the node itself when detached).
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Append `child` as the last child. Fragments contribute their
    /// children instead of themselves.
    pub fn append_child(&self, child: &Node) {
        if self.ptr_eq(child) {
            return;
        }
        let incoming = child.take_for_insert();
        let at = self.child_count();
        self.splice_children(at, incoming);
        self.bump(StructuralOp::Appended);
    }

    /// Insert `node` immediately after this node. Does nothing when this
    /// node has no parent.
    pub fn insert_after(&self, node: &Node) -> bool {
        if self.ptr_eq(node) {
            return false;
        }
        if self.parent().is_none() {
            tracing::trace!(anchor = %self.id(), "insert_after on detached node ignored");
            return false;
        }

        let incoming = node.take_for_insert();
        // Taking `node` may have shifted our position within the same parent.
        let Some(parent) = self.parent() else {
            return false;
        };
        let Some(index) = parent.index_of(self) else {
            return false;
        };
        parent.splice_children(index + 1, incoming);
        self.bump(StructuralOp::Inserted);
        true
    }

    /// Put `node` where this node is and detach this node. Does nothing
    /// when this node has no parent.
    pub fn replace_with(&self, node: &Node) -> bool {
        if self.ptr_eq(node) {
            return true;
        }
        if self.parent().is_none() {
            tracing::trace!(target_node = %self.id(), "replace_with on detached node ignored");
            return false;
        }

        let incoming = node.take_for_insert();
        let Some((parent, index)) = self.detach() else {
            return false;
        };
        parent.splice_children(index, incoming);
        self.bump(StructuralOp::Replaced);
        true
    }

    /// Detach from the parent. Returns `false` if already detached.
    pub fn remove(&self) -> bool {
        if self.detach().is_some() {
            self.bump(StructuralOp::Removed);
            true
        } else {
            false
        }
    }

    /// Depth-first search including this node.
    pub fn find(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<Node> {
        if predicate(self) {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find(predicate))
    }

    fn index_of(&self, child: &Node) -> Option<usize> {
        self.0
            .borrow()
            .children
            .iter()
            .position(|candidate| candidate.ptr_eq(child))
    }

    fn detach(&self) -> Option<(Node, usize)> {
        let parent = self.parent()?;
        let index = parent.index_of(self)?;
        parent.0.borrow_mut().children.remove(index);
        self.0.borrow_mut().parent = Weak::new();
        Some((parent, index))
    }

    /// The nodes that inserting `self` actually moves.
    fn take_for_insert(&self) -> Vec<Node> {
        if self.is_fragment() {
            let children = std::mem::take(&mut self.0.borrow_mut().children);
            for child in &children {
                child.0.borrow_mut().parent = Weak::new();
            }
            children
        } else {
            self.detach();
            vec![self.clone()]
        }
    }

    fn splice_children(&self, at: usize, nodes: Vec<Node>) {
        for node in &nodes {
            node.0.borrow_mut().parent = Rc::downgrade(&self.0);
        }
        let mut data = self.0.borrow_mut();
        let at = at.min(data.children.len());
        let tail = data.children.split_off(at);
        data.children.extend(nodes);
        data.children.extend(tail);
    }

    fn bump(&self, op: StructuralOp) {
        let stats = Rc::clone(&self.0.borrow().stats);
        stats.record(op);
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the subtree as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text { content } => out.push_str(&escape(content, false)),
            NodeKind::Comment { content } => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
            NodeKind::Fragment => {
                for child in &data.children {
                    child.write_html(out);
                }
            }
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &data.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
                }
                if !data.style.is_empty() {
                    let style: Vec<String> = data
                        .style
                        .iter()
                        .map(|(name, value)| format!("{name}: {value};"))
                        .collect();
                    out.push_str(&format!(" style=\"{}\"", escape(&style.join(" "), true)));
                }
                out.push('>');
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Structured copy of the subtree for assertions and JSON dumps.
    pub fn snapshot(&self) -> NodeSnapshot {
        let data = self.0.borrow();
        NodeSnapshot {
            id: data.id,
            kind: data.kind.clone(),
            attributes: data.attributes.clone(),
            style: data.style.clone(),
            listeners: data.listeners.keys().cloned().collect(),
            children: data.children.iter().map(Node::snapshot).collect(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_struct("Node")
                .field("id", &data.id)
                .field("kind", &data.kind)
                .field("children", &data.children.len())
                .finish(),
            Err(_) => f.write_str("Node(<borrowed>)"),
        }
    }
}

/// Serializable view of a node subtree.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub style: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
