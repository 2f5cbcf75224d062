//! The host document.

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;

use super::node::{Node, NodeKind, NodeSnapshot};

/// Structural operations counted by [`DocumentStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StructuralOp {
    Created,
    Appended,
    Inserted,
    Replaced,
    Removed,
}

/// Running counters of structural operations on one document.
#[derive(Debug, Default)]
pub struct DocumentStats {
    created: Cell<usize>,
    appended: Cell<usize>,
    inserted: Cell<usize>,
    replaced: Cell<usize>,
    removed: Cell<usize>,
}

impl DocumentStats {
    pub(crate) fn record(&self, op: StructuralOp) {
        let cell = match op {
            StructuralOp::Created => &self.created,
            StructuralOp::Appended => &self.appended,
            StructuralOp::Inserted => &self.inserted,
            StructuralOp::Replaced => &self.replaced,
            StructuralOp::Removed => &self.removed,
        };
        cell.set(cell.get() + 1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.get(),
            appended: self.appended.get(),
            inserted: self.inserted.get(),
            replaced: self.replaced.get(),
            removed: self.removed.get(),
        }
    }
}

/// Point-in-time copy of [`DocumentStats`].
///
/// `appended` counts children added during the render cascade,
/// `inserted` counts siblings placed after a live node, `replaced` counts
/// in-place swaps and `removed` counts detachments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub created: usize,
    pub appended: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub removed: usize,
}

impl StatsSnapshot {
    /// Operations performed between `earlier` and `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.saturating_sub(earlier.created),
            appended: self.appended.saturating_sub(earlier.appended),
            inserted: self.inserted.saturating_sub(earlier.inserted),
            replaced: self.replaced.saturating_sub(earlier.replaced),
            removed: self.removed.saturating_sub(earlier.removed),
        }
    }
}

/// An in-memory document with a `body` root.
///
/// Cloning shares the document.
#[derive(Clone, Debug)]
pub struct Document {
    body: Node,
    stats: Rc<DocumentStats>,
}

impl Document {
    pub fn new() -> Self {
        let stats = Rc::new(DocumentStats::default());
        let body = Node::new(
            NodeKind::Element {
                tag: "body".to_string(),
            },
            Rc::clone(&stats),
        );
        Self { body, stats }
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Node {
        Node::new(NodeKind::Element { tag: tag.into() }, self.shared_stats())
    }

    pub fn create_text(&self, content: impl Into<String>) -> Node {
        Node::new(
            NodeKind::Text {
                content: content.into(),
            },
            self.shared_stats(),
        )
    }

    pub fn create_comment(&self, content: impl Into<String>) -> Node {
        Node::new(
            NodeKind::Comment {
                content: content.into(),
            },
            self.shared_stats(),
        )
    }

    pub fn create_fragment(&self) -> Node {
        Node::new(NodeKind::Fragment, self.shared_stats())
    }

    fn shared_stats(&self) -> Rc<DocumentStats> {
        Rc::clone(&self.stats)
    }

    /// Current operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether `node` is attached under this document's body.
    pub fn contains(&self, node: &Node) -> bool {
        node.root().ptr_eq(&self.body)
    }

    /// Inner HTML of the body.
    pub fn to_html(&self) -> String {
        self.body.children().iter().map(Node::to_html).collect()
    }

    pub fn text_content(&self) -> String {
        self.body.text_content()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        self.body.snapshot()
    }

    /// The body subtree as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    pub fn find(&self, predicate: impl Fn(&Node) -> bool) -> Option<Node> {
        self.body.find(&predicate)
    }

    /// First element whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
        self.find(|node| node.attribute("id").as_deref() == Some(id))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_structural_operations() {
        let doc = Document::new();
        let before = doc.stats();

        let a = doc.create_text("a");
        doc.body().append_child(&a);
        a.insert_after(&doc.create_text("b"));
        a.replace_with(&doc.create_text("c"));
        doc.body().first_child().unwrap().remove();

        let delta = doc.stats().since(&before);
        assert_eq!(
            delta,
            StatsSnapshot {
                created: 3,
                appended: 1,
                inserted: 1,
                replaced: 1,
                removed: 1,
            }
        );
        assert_eq!(doc.text_content(), "b");
    }

    #[test]
    fn contains_tracks_attachment() {
        let doc = Document::new();
        let div = doc.create_element("div");
        assert!(!doc.contains(&div));

        doc.body().append_child(&div);
        assert!(doc.contains(&div));

        div.remove();
        assert!(!doc.contains(&div));
    }

    #[test]
    fn json_snapshot_serializes_tree() {
        let doc = Document::new();
        let p = doc.create_element("p");
        p.set_attribute("id", "greeting");
        p.append_child(&doc.create_text("hi"));
        doc.body().append_child(&p);

        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "element");
        assert_eq!(json["tag"], "body");
        assert_eq!(json["children"][0]["attributes"]["id"], "greeting");
        assert_eq!(json["children"][0]["children"][0]["content"], "hi");
        assert!(doc.get_element_by_id("greeting").is_some());
    }
}
