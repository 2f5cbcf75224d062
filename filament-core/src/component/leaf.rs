//! Leaf components and the element factory.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{bind, Binding, Component, ComponentId, Conditional, CustomComponent, Lifecycle, List};
use crate::dom::{Document, Event, EventHandler, Node};
use crate::reactive::ReactiveContext;

/// A child passed to [`ElementBuilder::child`].
///
/// Anything that is not a component ends up as a text node.
pub enum Child {
    Component(Component),
    Text(String),
    Many(Vec<Child>),
}

impl Child {
    /// Text that follows the signals read by `getter`.
    ///
    /// The getter runs inside a binding, so each write that affects it swaps
    /// in a fresh text node.
    pub fn dynamic<F>(getter: F) -> Child
    where
        F: Fn(&ReactiveContext) -> String + 'static,
    {
        Child::Component(bind(move |cx| text(getter(cx))))
    }

    fn flatten_into(self, out: &mut Vec<LeafChild>) {
        match self {
            Child::Component(component) => out.push(LeafChild::Component(component)),
            Child::Text(content) => out.push(LeafChild::Text(content)),
            Child::Many(children) => {
                for child in children {
                    child.flatten_into(out);
                }
            }
        }
    }
}

impl From<Component> for Child {
    fn from(component: Component) -> Self {
        Child::Component(component)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Component(builder.build())
    }
}

impl From<CustomComponent> for Child {
    fn from(custom: CustomComponent) -> Self {
        Child::Component(custom.into())
    }
}

impl From<Binding> for Child {
    fn from(binding: Binding) -> Self {
        Child::Component(binding.into())
    }
}

impl From<Conditional> for Child {
    fn from(conditional: Conditional) -> Self {
        Child::Component(conditional.into())
    }
}

impl From<List> for Child {
    fn from(list: List) -> Self {
        Child::Component(list.into())
    }
}

impl From<&str> for Child {
    fn from(content: &str) -> Self {
        Child::Text(content.to_string())
    }
}

impl From<String> for Child {
    fn from(content: String) -> Self {
        Child::Text(content)
    }
}

impl From<super::PropValue> for Child {
    fn from(value: super::PropValue) -> Self {
        Child::Text(value.to_text())
    }
}

macro_rules! text_child_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

text_child_from!(bool, char, i32, i64, u32, u64, usize, f32, f64);

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Child::Many(children.into_iter().map(Into::into).collect())
    }
}

enum LeafChild {
    Component(Component),
    Text(String),
}

enum LeafKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        style: IndexMap<String, String>,
        listeners: Vec<(String, EventHandler)>,
        children: Vec<LeafChild>,
    },
    Text(String),
    Placeholder,
}

struct LeafInner {
    id: ComponentId,
    kind: LeafKind,
    node: RefCell<Option<Node>>,
    doc: RefCell<Option<Document>>,
}

/// A component that owns exactly one document node.
#[derive(Clone)]
pub struct Leaf(Rc<LeafInner>);

impl Leaf {
    fn new(kind: LeafKind) -> Self {
        Self(Rc::new(LeafInner {
            id: ComponentId::next(),
            kind,
            node: RefCell::new(None),
            doc: RefCell::new(None),
        }))
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(LeafKind::Text(content.into()))
    }

    pub fn placeholder() -> Self {
        Self::new(LeafKind::Placeholder)
    }

    /// The node from the last render, while it is live.
    pub fn node(&self) -> Option<Node> {
        self.0.node.borrow().clone()
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.0.kind, LeafKind::Placeholder)
    }

    fn child_components(&self) -> impl Iterator<Item = &Component> {
        let children: &[LeafChild] = match &self.0.kind {
            LeafKind::Element { children, .. } => children,
            _ => &[],
        };
        children.iter().filter_map(|child| match child {
            LeafChild::Component(component) => Some(component),
            LeafChild::Text(_) => None,
        })
    }

    fn create_node(&self, doc: &Document) -> Node {
        match &self.0.kind {
            LeafKind::Text(content) => doc.create_text(content.as_str()),
            LeafKind::Placeholder => doc.create_comment(""),
            LeafKind::Element {
                tag,
                attributes,
                style,
                listeners,
                children,
            } => {
                let element = doc.create_element(tag.as_str());
                for (name, value) in attributes {
                    element.set_attribute(name.as_str(), value.as_str());
                }
                for (name, value) in style {
                    element.set_style(name.as_str(), value.as_str());
                }
                for (event, handler) in listeners {
                    element.add_listener(event.as_str(), Rc::clone(handler));
                }
                for child in children {
                    let node = match child {
                        LeafChild::Component(component) => component.render(doc),
                        LeafChild::Text(content) => doc.create_text(content.as_str()),
                    };
                    element.append_child(&node);
                }
                element
            }
        }
    }
}

impl Lifecycle for Leaf {
    fn id(&self) -> ComponentId {
        self.0.id
    }

    fn render(&self, doc: &Document) -> Node {
        let node = self.create_node(doc);
        *self.0.node.borrow_mut() = Some(node.clone());
        *self.0.doc.borrow_mut() = Some(doc.clone());
        node
    }

    fn destroy(&self) {
        if let Some(node) = self.node() {
            node.remove();
        }
        self.teardown();
    }

    fn replace(&self, next: &Component) {
        let (Some(node), Some(doc)) = (self.node(), self.0.doc.borrow().clone()) else {
            tracing::trace!(component = %self.0.id, "replace on unrendered leaf ignored");
            return;
        };
        let incoming = next.render(&doc);
        node.replace_with(&incoming);
        self.teardown();
    }

    fn append(&self, next: &Component) {
        let (Some(node), Some(doc)) = (self.node(), self.0.doc.borrow().clone()) else {
            tracing::trace!(component = %self.0.id, "append on unrendered leaf ignored");
            return;
        };
        let incoming = next.render(&doc);
        node.insert_after(&incoming);
    }

    fn teardown(&self) {
        self.0.node.borrow_mut().take();
        self.0.doc.borrow_mut().take();
        for child in self.child_components() {
            child.teardown();
        }
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.kind {
            LeafKind::Element { tag, .. } => tag.as_str(),
            LeafKind::Text(_) => "#text",
            LeafKind::Placeholder => "#placeholder",
        };
        f.debug_struct("Leaf")
            .field("id", &self.0.id)
            .field("kind", &kind)
            .field("live", &self.0.node.borrow().is_some())
            .finish()
    }
}

/// A text leaf.
pub fn text(content: impl Into<String>) -> Component {
    Leaf::text(content).into()
}

/// An invisible leaf used to hold a position in the document.
pub fn placeholder() -> Component {
    Leaf::placeholder().into()
}

/// Start building an element leaf.
///
/// ```
/// use filament_core::component::{element, mount};
/// use filament_core::dom::Document;
///
/// let doc = Document::new();
/// let card = element("div")
///     .attr("class", "card")
///     .style("color", "red")
///     .child(element("h1").child("Title"))
///     .child(42);
///
/// let _mounted = mount(&doc, doc.body(), card);
/// assert_eq!(
///     doc.to_html(),
///     "<div class=\"card\" style=\"color: red;\"><h1>Title</h1>42</div>"
/// );
/// ```
pub fn element(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into(),
        attributes: IndexMap::new(),
        style: IndexMap::new(),
        listeners: Vec::new(),
        children: Vec::new(),
    }
}

/// Builder returned by [`element`].
pub struct ElementBuilder {
    tag: String,
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<LeafChild>,
}

impl ElementBuilder {
    pub fn attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(name.into(), value.to_string());
        self
    }

    /// Set the attribute only when `value` is present.
    pub fn attr_opt<V: ToString>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn style(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.style.insert(name.into(), value.to_string());
        self
    }

    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        self.listeners.push((event.into(), Rc::new(handler)));
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        child.into().flatten_into(&mut self.children);
        self
    }

    pub fn children<I, C>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        for child in children {
            child.into().flatten_into(&mut self.children);
        }
        self
    }

    pub fn build(self) -> Component {
        Leaf::new(LeafKind::Element {
            tag: self.tag,
            attributes: self.attributes,
            style: self.style,
            listeners: self.listeners,
            children: self.children,
        })
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::mount;
    use crate::reactive::Signal;
    use std::cell::Cell;

    #[test]
    fn element_renders_attributes_style_and_children() {
        let doc = Document::new();
        let list = element("ul")
            .attr("id", "items")
            .attr_opt("title", None::<&str>)
            .child(vec![element("li").child("a"), element("li").child("b")])
            .child(3.5);

        let _mounted = mount(&doc, doc.body(), list);

        assert_eq!(doc.to_html(), "<ul id=\"items\"><li>a</li><li>b</li>3.5</ul>");
    }

    #[test]
    fn listeners_attach_to_rendered_node() {
        let doc = Document::new();
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();
        let button = element("button")
            .attr("id", "go")
            .on("click", move |_| clicks_clone.set(clicks_clone.get() + 1));

        let _mounted = mount(&doc, doc.body(), button);
        let node = doc.get_element_by_id("go").unwrap();
        node.dispatch("click");
        node.dispatch("click");

        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn dynamic_text_follows_signal() {
        let doc = Document::new();
        let count = Signal::new(1);
        let reader = count.clone();

        let _mounted = mount(
            &doc,
            doc.body(),
            element("span").child(Child::dynamic(move |cx| format!("count: {}", reader.get(cx)))),
        );
        assert_eq!(doc.text_content(), "count: 1");

        count.set(2);
        assert_eq!(doc.text_content(), "count: 2");
    }

    #[test]
    fn leaf_replace_swaps_node_in_place() {
        let doc = Document::new();
        let old = Leaf::text("old");
        doc.body().append_child(&doc.create_text("["));
        let _mounted = mount(&doc, doc.body(), old.clone());
        doc.body().append_child(&doc.create_text("]"));

        old.replace(&text("new"));

        assert_eq!(doc.text_content(), "[new]");
        assert!(old.node().is_none());
    }

    #[test]
    fn unrendered_leaf_ignores_replace_and_append() {
        let doc = Document::new();
        let leaf = Leaf::placeholder();
        let before = doc.stats();

        leaf.replace(&text("x"));
        leaf.append(&text("y"));

        assert_eq!(doc.stats(), before);
    }

    #[test]
    fn destroy_detaches_node() {
        let doc = Document::new();
        let leaf = Leaf::text("bye");
        let _mounted = mount(&doc, doc.body(), leaf.clone());

        leaf.destroy();

        assert_eq!(doc.body().child_count(), 0);
        assert!(leaf.node().is_none());
    }
}
