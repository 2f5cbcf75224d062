//! Reactive Context
//!
//! The reactive context represents one tracked evaluation: the subscriber
//! that should be re-run when something it read changes, and the
//! unsubscribe handles collected while it ran.
//!
//! # Implementation
//!
//! Contexts are passed explicitly. A tracked callback receives
//! `&ReactiveContext` and hands it to every signal it reads, so there is no
//! ambient "current listener" slot. Two evaluations can run nested inside
//! each other (a binding rendering a list, for example) without their
//! dependencies leaking into one another.
//!
//! When the evaluation finishes, the context is turned into a
//! [`Subscription`]. Dropping the subscription unsubscribes from every
//! signal that was read.

use std::cell::RefCell;
use std::fmt;

use smallvec::SmallVec;

use super::signal::SignalId;
use super::subscriber::{Subscriber, SubscriberId};

/// Deferred removal of one subscriber from one signal.
pub(crate) type Unsubscribe = Box<dyn FnOnce()>;

/// The context of a single tracked evaluation.
pub struct ReactiveContext {
    subscriber: Subscriber,
    /// Signal IDs read so far, in first-read order.
    dependencies: RefCell<SmallVec<[SignalId; 4]>>,
    unsubscribes: RefCell<SmallVec<[Unsubscribe; 4]>>,
}

impl ReactiveContext {
    /// Create a context that registers `subscriber` with every signal read
    /// through it.
    pub fn new(subscriber: Subscriber) -> Self {
        Self {
            subscriber,
            dependencies: RefCell::new(SmallVec::new()),
            unsubscribes: RefCell::new(SmallVec::new()),
        }
    }

    /// The subscriber being tracked.
    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    /// Get the current subscriber ID.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Whether `signal` was already read in this evaluation.
    pub fn is_tracking(&self, signal: SignalId) -> bool {
        self.dependencies.borrow().contains(&signal)
    }

    /// Record a dependency on the given signal.
    ///
    /// Called by signals when they are read. Repeated reads of the same
    /// signal keep only the first unsubscribe handle.
    pub(crate) fn track_dependency(&self, signal: SignalId, unsubscribe: Unsubscribe) {
        if self.is_tracking(signal) {
            return;
        }
        self.dependencies.borrow_mut().push(signal);
        self.unsubscribes.borrow_mut().push(unsubscribe);
    }

    /// Get the dependencies collected in this context.
    pub fn dependencies(&self) -> Vec<SignalId> {
        self.dependencies.borrow().to_vec()
    }

    /// Close the evaluation and keep its dependencies alive.
    pub fn finish(self) -> Subscription {
        Subscription {
            dependencies: self.dependencies.into_inner(),
            unsubscribes: self.unsubscribes.into_inner(),
        }
    }
}

impl fmt::Debug for ReactiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveContext")
            .field("subscriber", &self.subscriber.id())
            .field("dependencies", &self.dependencies.borrow())
            .finish()
    }
}

/// Run `f` as a tracked evaluation on behalf of `subscriber`.
///
/// Returns the callback's result and the subscription accrued while it ran.
pub fn track<R>(subscriber: &Subscriber, f: impl FnOnce(&ReactiveContext) -> R) -> (R, Subscription) {
    let cx = ReactiveContext::new(subscriber.clone());
    let result = f(&cx);
    (result, cx.finish())
}

/// The set of signal registrations produced by one tracked evaluation.
///
/// Unsubscribes from every dependency when dropped or cancelled.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dependencies: SmallVec<[SignalId; 4]>,
    unsubscribes: SmallVec<[Unsubscribe; 4]>,
}

impl Subscription {
    /// A subscription with no dependencies.
    pub fn empty() -> Self {
        Self {
            dependencies: SmallVec::new(),
            unsubscribes: SmallVec::new(),
        }
    }

    /// Signals this subscription listens to.
    pub fn dependencies(&self) -> &[SignalId] {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Unsubscribe now.
    pub fn cancel(self) {
        drop(self);
    }

    /// Hand over to `next`, a later evaluation by the same subscriber.
    ///
    /// Signals read by both evaluations keep the existing registration, and
    /// with it the subscriber's place in their notification order. Only the
    /// signals `next` no longer reads are unsubscribed.
    pub fn supersede(mut self, next: &Subscription) {
        let dependencies = std::mem::take(&mut self.dependencies);
        let unsubscribes = std::mem::take(&mut self.unsubscribes);
        for (signal, unsubscribe) in dependencies.into_iter().zip(unsubscribes) {
            if !next.dependencies.contains(&signal) {
                unsubscribe();
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for unsubscribe in self.unsubscribes.drain(..) {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
