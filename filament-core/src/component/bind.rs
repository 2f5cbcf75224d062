//! Single-child reactive binding.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Component, ComponentId, Lifecycle};
use crate::dom::{Document, Node};
use crate::reactive::{track, ReactiveContext, Subscriber, Subscription};

type Compute = Box<dyn Fn(&ReactiveContext) -> Component>;

struct BindingInner {
    id: ComponentId,
    owner: Option<ComponentId>,
    compute: Compute,
    subscriber: RefCell<Option<Subscriber>>,
    subscription: RefCell<Option<Subscription>>,
    current: RefCell<Option<Component>>,
    doc: RefCell<Option<Document>>,
}

/// A component whose single child is recomputed from signals.
///
/// The child is swapped with `replace` whenever a re-evaluation yields a
/// different component instance.
#[derive(Clone)]
pub struct Binding(Rc<BindingInner>);

impl Binding {
    pub(crate) fn new<F>(compute: F, owner: Option<ComponentId>) -> Self
    where
        F: Fn(&ReactiveContext) -> Component + 'static,
    {
        Self(Rc::new(BindingInner {
            id: ComponentId::next(),
            owner,
            compute: Box::new(compute),
            subscriber: RefCell::new(None),
            subscription: RefCell::new(None),
            current: RefCell::new(None),
            doc: RefCell::new(None),
        }))
    }

    /// The child currently representing this binding.
    pub fn current(&self) -> Option<Component> {
        self.0.current.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        self.0.doc.borrow().is_some()
    }

    /// The subscriber re-running this binding. It owns the binding, so the
    /// signals it reads keep a live binding alive until `release`.
    fn subscriber(&self) -> Subscriber {
        let mut slot = self.0.subscriber.borrow_mut();
        slot.get_or_insert_with(|| {
            let this = self.clone();
            Subscriber::new(move || this.rerun())
        })
        .clone()
    }

    fn evaluate(&self) -> Component {
        let subscriber = self.subscriber();
        let previous = self.0.subscription.borrow_mut().take();
        let (component, subscription) = track(&subscriber, |cx| (self.0.compute)(cx));
        if let Some(previous) = previous {
            previous.supersede(&subscription);
        }
        *self.0.subscription.borrow_mut() = Some(subscription);
        component
    }

    fn rerun(&self) {
        if !self.is_live() {
            return;
        }

        let next = self.evaluate();
        let current = self.0.current.replace(Some(next.clone()));
        match current {
            Some(current) if current.is(&next) => {
                tracing::trace!(binding = %self.0.id, "binding produced the same child");
            }
            Some(current) => {
                tracing::debug!(
                    binding = %self.0.id,
                    owner = ?self.0.owner,
                    from = %current.id(),
                    to = %next.id(),
                    "binding replacing child"
                );
                current.replace(&next);
            }
            None => {}
        }
    }

    fn release(&self) {
        let subscription = self.0.subscription.borrow_mut().take();
        drop(subscription);
        self.0.subscriber.borrow_mut().take();
        self.0.doc.borrow_mut().take();
    }
}

impl Lifecycle for Binding {
    fn id(&self) -> ComponentId {
        self.0.id
    }

    fn render(&self, doc: &Document) -> Node {
        *self.0.doc.borrow_mut() = Some(doc.clone());
        let child = self.evaluate();
        *self.0.current.borrow_mut() = Some(child.clone());
        child.render(doc)
    }

    fn destroy(&self) {
        self.release();
        let current = self.0.current.borrow_mut().take();
        if let Some(current) = current {
            current.destroy();
        }
    }

    fn replace(&self, next: &Component) {
        let Some(current) = self.0.current.borrow_mut().take() else {
            tracing::trace!(binding = %self.0.id, "replace without a live child ignored");
            return;
        };
        self.release();
        current.replace(next);
    }

    fn append(&self, next: &Component) {
        match self.current() {
            Some(current) => current.append(next),
            None => tracing::trace!(binding = %self.0.id, "append without a live child ignored"),
        }
    }

    fn teardown(&self) {
        self.release();
        let current = self.0.current.borrow_mut().take();
        if let Some(current) = current {
            current.teardown();
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.0.id)
            .field("owner", &self.0.owner)
            .field("current", &self.current())
            .finish()
    }
}

/// Build a binding from a tracked callback.
///
/// ```
/// use filament_core::component::{bind, mount, text};
/// use filament_core::dom::Document;
/// use filament_core::reactive::Signal;
///
/// let doc = Document::new();
/// let name = Signal::new("world");
/// let reader = name.clone();
///
/// let _mounted = mount(&doc, doc.body(), bind(move |cx| text(format!("hello {}", reader.get(cx)))));
/// name.set("there");
/// assert_eq!(doc.text_content(), "hello there");
/// ```
pub fn bind<F>(compute: F) -> Component
where
    F: Fn(&ReactiveContext) -> Component + 'static,
{
    Binding::new(compute, None).into()
}
