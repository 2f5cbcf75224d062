//! Components
//!
//! Everything renderable is a [`Component`]: a closed set of variants that
//! share the [`Lifecycle`] interface.
//!
//! - [`Leaf`]: owns exactly one document node (element, text, placeholder).
//! - [`CustomComponent`]: an instance of a `component(...)` definition,
//!   with hook state, props and a serial shared by its definition.
//! - [`Binding`], [`Conditional`], [`List`]: structural components. They own
//!   no node; they delegate to whichever children currently represent them
//!   and swap those children when the signals they track change.
//!
//! # Rendering
//!
//! Construction has no side effects. [`Lifecycle::render`] starts the render
//! cascade: each component renders its children top-down and returns the
//! node (or fragment) that represents it. From then on the tree is live and
//! signal writes re-enter the structural components directly.
//!
//! # Replacement
//!
//! `replace(next)` renders `next`, puts its output where the receiver's
//! output is, and tears the receiver down. `append(next)` renders `next`
//! right after the receiver's output. Both are no-ops on a component that
//! has nothing live.

mod bind;
mod custom;
mod each;
mod hooks;
mod leaf;
mod props;
mod show;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dom::{Document, Node};

pub use bind::{bind, Binding};
pub use custom::{component, CustomComponent, Definition};
pub use each::{each, List, ReconcileReport};
pub use hooks::Tools;
pub use leaf::{element, placeholder, text, Child, ElementBuilder, Leaf};
pub use props::{PropBag, PropValue, Props};
pub use show::{show, Conditional};

/// Unique identifier of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Identity shared by every instance of one component definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Serial(u64);

impl Serial {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serial#{}", self.0)
    }
}

/// The capability set every component variant implements.
pub trait Lifecycle {
    /// Identity of this instance.
    fn id(&self) -> ComponentId;

    /// Materialize the component into the document and return the node
    /// representing it. Structural components may return a fragment.
    fn render(&self, doc: &Document) -> Node;

    /// Detach the live output and release everything the component holds.
    fn destroy(&self);

    /// Render `next` in place of this component's output, then tear this
    /// component down.
    fn replace(&self, next: &Component);

    /// Render `next` immediately after this component's output.
    fn append(&self, next: &Component);

    /// Release subscriptions and run cleanups without touching the
    /// document. Used when the output has already been detached by an
    /// ancestor.
    fn teardown(&self);
}

/// A renderable value.
#[derive(Clone)]
pub enum Component {
    Leaf(Leaf),
    Custom(CustomComponent),
    Binding(Binding),
    Conditional(Conditional),
    List(List),
}

impl Component {
    /// A text leaf.
    pub fn text(content: impl Into<String>) -> Component {
        text(content)
    }

    /// An invisible placeholder leaf.
    pub fn placeholder() -> Component {
        placeholder()
    }

    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Leaf(_) => "leaf",
            Component::Custom(_) => "custom",
            Component::Binding(_) => "binding",
            Component::Conditional(_) => "conditional",
            Component::List(_) => "list",
        }
    }

    /// Whether both values are the same instance.
    pub fn is(&self, other: &Component) -> bool {
        self.id() == other.id()
    }

    pub fn as_custom(&self) -> Option<&CustomComponent> {
        match self {
            Component::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Component::List(list) => Some(list),
            _ => None,
        }
    }

    fn as_lifecycle(&self) -> &dyn Lifecycle {
        match self {
            Component::Leaf(leaf) => leaf,
            Component::Custom(custom) => custom,
            Component::Binding(binding) => binding,
            Component::Conditional(conditional) => conditional,
            Component::List(list) => list,
        }
    }
}

impl Lifecycle for Component {
    fn id(&self) -> ComponentId {
        self.as_lifecycle().id()
    }

    fn render(&self, doc: &Document) -> Node {
        self.as_lifecycle().render(doc)
    }

    fn destroy(&self) {
        self.as_lifecycle().destroy();
    }

    fn replace(&self, next: &Component) {
        self.as_lifecycle().replace(next);
    }

    fn append(&self, next: &Component) {
        self.as_lifecycle().append(next);
    }

    fn teardown(&self) {
        self.as_lifecycle().teardown();
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{}({})", self.kind(), self.id())
    }
}

impl From<Leaf> for Component {
    fn from(leaf: Leaf) -> Self {
        Component::Leaf(leaf)
    }
}

impl From<CustomComponent> for Component {
    fn from(custom: CustomComponent) -> Self {
        Component::Custom(custom)
    }
}

impl From<Binding> for Component {
    fn from(binding: Binding) -> Self {
        Component::Binding(binding)
    }
}

impl From<Conditional> for Component {
    fn from(conditional: Conditional) -> Self {
        Component::Conditional(conditional)
    }
}

impl From<List> for Component {
    fn from(list: List) -> Self {
        Component::List(list)
    }
}

impl From<ElementBuilder> for Component {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

impl From<&str> for Component {
    fn from(content: &str) -> Self {
        text(content)
    }
}

impl From<String> for Component {
    fn from(content: String) -> Self {
        text(content)
    }
}

/// A component tree rendered into a parent node.
///
/// The tree is owned by the signals it reads, not by this handle: dropping
/// the handle leaves it live and reactive. Only [`unmount`](Self::unmount)
/// detaches it and releases its subscriptions.
#[derive(Debug)]
#[must_use = "the tree stays mounted until `unmount` is called on this handle"]
pub struct Mounted {
    component: Component,
}

impl Mounted {
    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Destroy the tree, detaching its output and running its cleanups.
    pub fn unmount(self) {
        tracing::debug!(component = %self.component.id(), "unmounting");
        self.component.destroy();
    }
}

/// Run the render cascade for `component` and append the result to
/// `parent`.
pub fn mount(doc: &Document, parent: &Node, component: impl Into<Component>) -> Mounted {
    let component = component.into();
    let node = component.render(doc);
    parent.append_child(&node);
    tracing::debug!(component = %component.id(), kind = component.kind(), "mounted");
    Mounted { component }
}
