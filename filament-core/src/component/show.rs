//! Two-branch conditional rendering.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{placeholder, Component, ComponentId, Lifecycle};
use crate::dom::{Document, Node};
use crate::reactive::{track, ReactiveContext, Subscriber, Subscription};

type Predicate = Box<dyn Fn(&ReactiveContext) -> bool>;

struct ConditionalInner {
    id: ComponentId,
    owner: Option<ComponentId>,
    predicate: Predicate,
    when_true: Component,
    when_false: Component,
    subscriber: RefCell<Option<Subscriber>>,
    subscription: RefCell<Option<Subscription>>,
    active: RefCell<Option<Component>>,
    doc: RefCell<Option<Document>>,
}

/// A component showing one of two fixed branches.
///
/// Branches are built once, up front. Flipping the predicate back and forth
/// re-renders the same branch instances; a branch keeps its hook state
/// while it is hidden.
#[derive(Clone)]
pub struct Conditional(Rc<ConditionalInner>);

impl Conditional {
    pub(crate) fn new<P>(
        predicate: P,
        when_true: Component,
        when_false: Option<Component>,
        owner: Option<ComponentId>,
    ) -> Self
    where
        P: Fn(&ReactiveContext) -> bool + 'static,
    {
        Self(Rc::new(ConditionalInner {
            id: ComponentId::next(),
            owner,
            predicate: Box::new(predicate),
            when_true,
            when_false: when_false.unwrap_or_else(placeholder),
            subscriber: RefCell::new(None),
            subscription: RefCell::new(None),
            active: RefCell::new(None),
            doc: RefCell::new(None),
        }))
    }

    /// The branch currently rendered.
    pub fn active(&self) -> Option<Component> {
        self.0.active.borrow().clone()
    }

    pub fn when_true(&self) -> &Component {
        &self.0.when_true
    }

    pub fn when_false(&self) -> &Component {
        &self.0.when_false
    }

    fn subscriber(&self) -> Subscriber {
        let mut slot = self.0.subscriber.borrow_mut();
        slot.get_or_insert_with(|| {
            let this = self.clone();
            Subscriber::new(move || this.rerun())
        })
        .clone()
    }

    /// Evaluate the predicate. Signals it read last time keep their
    /// registration, so the conditional is notified ahead of the branch it
    /// rendered.
    fn choose(&self) -> Component {
        let subscriber = self.subscriber();
        let previous = self.0.subscription.borrow_mut().take();
        let (condition, subscription) = track(&subscriber, |cx| (self.0.predicate)(cx));
        if let Some(previous) = previous {
            previous.supersede(&subscription);
        }
        *self.0.subscription.borrow_mut() = Some(subscription);

        if condition {
            self.0.when_true.clone()
        } else {
            self.0.when_false.clone()
        }
    }

    fn rerun(&self) {
        if self.0.doc.borrow().is_none() {
            return;
        }

        let branch = self.choose();
        let active = self.active();
        match active {
            Some(active) if active.is(&branch) => {
                tracing::trace!(conditional = %self.0.id, "branch unchanged");
            }
            Some(active) => {
                tracing::debug!(
                    conditional = %self.0.id,
                    owner = ?self.0.owner,
                    from = %active.id(),
                    to = %branch.id(),
                    "switching branch"
                );
                *self.0.active.borrow_mut() = Some(branch.clone());
                active.replace(&branch);
            }
            None => {
                *self.0.active.borrow_mut() = Some(branch);
            }
        }
    }

    fn release(&self) {
        let subscription = self.0.subscription.borrow_mut().take();
        drop(subscription);
        self.0.subscriber.borrow_mut().take();
        self.0.doc.borrow_mut().take();
    }
}

impl Lifecycle for Conditional {
    fn id(&self) -> ComponentId {
        self.0.id
    }

    fn render(&self, doc: &Document) -> Node {
        *self.0.doc.borrow_mut() = Some(doc.clone());
        let branch = self.choose();
        *self.0.active.borrow_mut() = Some(branch.clone());
        branch.render(doc)
    }

    fn destroy(&self) {
        self.release();
        let active = self.0.active.borrow_mut().take();
        if let Some(active) = active {
            active.destroy();
        }
    }

    fn replace(&self, next: &Component) {
        let Some(active) = self.0.active.borrow_mut().take() else {
            tracing::trace!(conditional = %self.0.id, "replace without an active branch ignored");
            return;
        };
        self.release();
        active.replace(next);
    }

    fn append(&self, next: &Component) {
        match self.active() {
            Some(active) => active.append(next),
            None => tracing::trace!(conditional = %self.0.id, "append without an active branch ignored"),
        }
    }

    fn teardown(&self) {
        self.release();
        let active = self.0.active.borrow_mut().take();
        if let Some(active) = active {
            active.teardown();
        }
    }
}

impl fmt::Debug for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conditional")
            .field("id", &self.0.id)
            .field("owner", &self.0.owner)
            .field("active", &self.active())
            .finish()
    }
}

/// Render `when_true` while `predicate` holds and `when_false` (or an
/// invisible placeholder) otherwise.
pub fn show<P>(predicate: P, when_true: impl Into<Component>, when_false: Option<Component>) -> Component
where
    P: Fn(&ReactiveContext) -> bool + 'static,
{
    Conditional::new(predicate, when_true.into(), when_false, None).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{bind, element, mount, text};
    use crate::reactive::Signal;
    use std::cell::Cell;

    #[test]
    fn picks_initial_branch() {
        let doc = Document::new();
        let open = Signal::new(false);
        let reader = open.clone();
        let _mounted = mount(
            &doc,
            doc.body(),
            show(move |cx| reader.get(cx), text("open"), Some(text("closed"))),
        );
        assert_eq!(doc.text_content(), "closed");
    }

    #[test]
    fn missing_false_branch_renders_placeholder() {
        let doc = Document::new();
        let open = Signal::new(false);
        let reader = open.clone();
        let _mounted = mount(&doc, doc.body(), show(move |cx| reader.get(cx), element("b").child("hi"), None));

        assert_eq!(doc.to_html(), "<!---->");
        open.set(true);
        assert_eq!(doc.to_html(), "<b>hi</b>");
        open.set(false);
        assert_eq!(doc.to_html(), "<!---->");
    }

    #[test]
    fn unchanged_decision_does_not_replace() {
        let doc = Document::new();
        let count = Signal::new(1);
        let reader = count.clone();
        let _mounted = mount(
            &doc,
            doc.body(),
            show(move |cx| reader.get(cx) > 0, text("positive"), Some(text("other"))),
        );

        let before = doc.stats();
        count.set(2);
        count.set(3);
        assert_eq!(doc.stats().since(&before).replaced, 0);

        count.set(-1);
        assert_eq!(doc.stats().since(&before).replaced, 1);
        assert_eq!(doc.text_content(), "other");
    }

    #[test]
    fn branches_can_be_revived() {
        let doc = Document::new();
        let open = Signal::new(true);
        let reader = open.clone();
        let component = show(move |cx| reader.get(cx), text("a"), Some(text("b")));
        let _mounted = mount(&doc, doc.body(), component.clone());

        for expected in ["b", "a", "b", "a"] {
            open.update(|value| !*value);
            assert_eq!(doc.text_content(), expected);
        }
        assert_eq!(doc.body().child_count(), 1);
    }

    #[test]
    fn conditional_is_notified_before_its_branch() {
        let doc = Document::new();
        let ready = Signal::new(true);
        let value = Signal::new(Some(1));
        let stale = Rc::new(Cell::new(0));
        let (ready_reader, value_reader, child_reader) = (ready.clone(), value.clone(), value.clone());
        let stale_clone = stale.clone();
        let branch = bind(move |cx| match child_reader.get(cx) {
            Some(n) => text(n.to_string()),
            None => {
                stale_clone.set(stale_clone.get() + 1);
                placeholder()
            }
        });
        let _mounted = mount(
            &doc,
            doc.body(),
            show(
                move |cx| ready_reader.get(cx) && value_reader.get(cx).is_some(),
                branch,
                Some(text("waiting")),
            ),
        );

        // Re-running the predicate must not move it behind the branch.
        ready.set(true);
        value.set(None);

        assert_eq!(stale.get(), 0);
        assert_eq!(doc.text_content(), "waiting");
        assert_eq!(value.subscriber_count(), 1);
    }
}
