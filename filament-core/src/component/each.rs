//! Positional list rendering.
//!
//! A list rebuilds its children from scratch on every evaluation and then
//! reconciles the fresh children against the live ones index by index:
//!
//! | old      | new      | action                                         |
//! |----------|----------|------------------------------------------------|
//! | `x`      | `x`      | keep (same instance)                           |
//! | custom A | custom A | reload the old instance with the new props     |
//! | any      | any      | replace old with new                           |
//! | -        | new      | append after the previous entry                |
//! | old      | -        | destroy                                        |
//!
//! "Custom A" means two instances of the same component definition. There
//! are no user keys: an instance keeps its hook state as long as its
//! position holds an instance of the same definition.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use super::{placeholder, Component, ComponentId, Lifecycle};
use crate::dom::{Document, Node};
use crate::reactive::{track, ReactiveContext, Subscriber, Subscription};

type Build = Box<dyn Fn(&ReactiveContext) -> Vec<Component>>;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub kept: usize,
    pub reloaded: usize,
    pub replaced: usize,
    pub appended: usize,
    pub destroyed: usize,
}

struct ListInner {
    id: ComponentId,
    owner: Option<ComponentId>,
    build: Build,
    subscriber: RefCell<Option<Subscriber>>,
    subscription: RefCell<Option<Subscription>>,
    children: RefCell<Vec<Component>>,
    doc: RefCell<Option<Document>>,
    last_report: Cell<ReconcileReport>,
}

/// A component rendering one child per item.
#[derive(Clone)]
pub struct List(Rc<ListInner>);

impl List {
    pub(crate) fn new<T, I, B>(items: I, builder: B, owner: Option<ComponentId>) -> Self
    where
        T: 'static,
        I: Fn(&ReactiveContext) -> Vec<T> + 'static,
        B: Fn(&T) -> Component + 'static,
    {
        let build: Build = Box::new(move |cx| {
            let children: Vec<Component> = items(cx).iter().map(&builder).collect();
            if children.is_empty() {
                vec![placeholder()]
            } else {
                children
            }
        });

        Self(Rc::new(ListInner {
            id: ComponentId::next(),
            owner,
            build,
            subscriber: RefCell::new(None),
            subscription: RefCell::new(None),
            children: RefCell::new(Vec::new()),
            doc: RefCell::new(None),
            last_report: Cell::new(ReconcileReport::default()),
        }))
    }

    /// The live children, in document order.
    pub fn children(&self) -> Vec<Component> {
        self.0.children.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.children.borrow().is_empty()
    }

    /// Report of the most recent reconciliation.
    pub fn last_report(&self) -> ReconcileReport {
        self.0.last_report.get()
    }

    fn subscriber(&self) -> Subscriber {
        let mut slot = self.0.subscriber.borrow_mut();
        slot.get_or_insert_with(|| {
            let this = self.clone();
            Subscriber::new(move || this.rerun())
        })
        .clone()
    }

    fn evaluate(&self) -> Vec<Component> {
        let subscriber = self.subscriber();
        let previous = self.0.subscription.borrow_mut().take();
        let (children, subscription) = track(&subscriber, |cx| (self.0.build)(cx));
        if let Some(previous) = previous {
            previous.supersede(&subscription);
        }
        *self.0.subscription.borrow_mut() = Some(subscription);
        children
    }

    fn rerun(&self) {
        if self.0.doc.borrow().is_none() {
            return;
        }

        let next = self.evaluate();
        let previous = std::mem::take(&mut *self.0.children.borrow_mut());
        let (children, report) = reconcile(previous, next);
        *self.0.children.borrow_mut() = children;
        self.0.last_report.set(report);

        tracing::debug!(
            list = %self.0.id,
            owner = ?self.0.owner,
            kept = report.kept,
            reloaded = report.reloaded,
            replaced = report.replaced,
            appended = report.appended,
            destroyed = report.destroyed,
            "list reconciled"
        );
    }

    fn release(&self) {
        let subscription = self.0.subscription.borrow_mut().take();
        drop(subscription);
        self.0.subscriber.borrow_mut().take();
        self.0.doc.borrow_mut().take();
    }
}

/// Positional reconciliation of `previous` against `next`. Returns the
/// children that are live afterwards.
fn reconcile(previous: Vec<Component>, next: Vec<Component>) -> (Vec<Component>, ReconcileReport) {
    let mut report = ReconcileReport::default();
    let mut live: Vec<Component> = Vec::with_capacity(next.len());
    let mut previous = previous.into_iter();
    let mut next = next.into_iter();

    loop {
        match (previous.next(), next.next()) {
            (Some(old), Some(new)) => {
                let kept = reconcile_pair(old, new, &mut report);
                live.push(kept);
            }
            (None, Some(new)) => {
                if let Some(anchor) = live.last() {
                    anchor.append(&new);
                }
                report.appended += 1;
                live.push(new);
            }
            (Some(old), None) => {
                old.destroy();
                report.destroyed += 1;
            }
            (None, None) => break,
        }
    }

    (live, report)
}

fn reconcile_pair(old: Component, new: Component, report: &mut ReconcileReport) -> Component {
    if old.is(&new) {
        report.kept += 1;
        return old;
    }

    if let (Component::Custom(live), Component::Custom(fresh)) = (&old, &new) {
        if live.serial() == fresh.serial() {
            live.reload_from(fresh);
            report.reloaded += 1;
            return old;
        }
    }

    old.replace(&new);
    report.replaced += 1;
    new
}

impl Lifecycle for List {
    fn id(&self) -> ComponentId {
        self.0.id
    }

    fn render(&self, doc: &Document) -> Node {
        *self.0.doc.borrow_mut() = Some(doc.clone());
        let children = self.evaluate();
        let fragment = doc.create_fragment();
        for child in &children {
            fragment.append_child(&child.render(doc));
        }
        *self.0.children.borrow_mut() = children;
        fragment
    }

    fn destroy(&self) {
        self.release();
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            child.destroy();
        }
    }

    fn replace(&self, next: &Component) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        let mut children = children.into_iter();
        let Some(first) = children.next() else {
            tracing::trace!(list = %self.0.id, "replace on empty list ignored");
            return;
        };
        self.release();
        first.replace(next);
        for rest in children {
            rest.destroy();
        }
    }

    fn append(&self, next: &Component) {
        let last = self.0.children.borrow().last().cloned();
        match last {
            Some(last) => last.append(next),
            None => tracing::trace!(list = %self.0.id, "append on empty list ignored"),
        }
    }

    fn teardown(&self) {
        self.release();
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            child.teardown();
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("id", &self.0.id)
            .field("owner", &self.0.owner)
            .field("children", &self.0.children.borrow().len())
            .field("last_report", &self.0.last_report.get())
            .finish()
    }
}

/// Render one child per item returned by `items`.
///
/// An empty list keeps an invisible placeholder in the document so later
/// items have somewhere to go.
pub fn each<T, I, B>(items: I, builder: B) -> Component
where
    T: 'static,
    I: Fn(&ReactiveContext) -> Vec<T> + 'static,
    B: Fn(&T) -> Component + 'static,
{
    List::new(items, builder, None).into()
}
