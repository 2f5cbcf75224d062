//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read through a [`ReactiveContext`], the signal
//!    registers that context's subscriber and hands the context a way to
//!    undo the registration.
//!
//! 2. When a signal is written, every subscriber is invoked synchronously,
//!    in registration order, before the write returns.
//!
//! 3. There is no equality check and no batching: each write is exactly one
//!    notification pass.
//!
//! # Re-entrant writes
//!
//! A subscriber may write to the signal that is notifying it. Each such
//! write starts its own nested pass. Nesting is capped by the signal's
//! notification depth limit; a write past the limit is rejected and the
//! value is left untouched.
//!
//! # Threading
//!
//! Signals are `Rc`-based and deliberately `!Send`: the runtime is a single
//! call stack.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::{RuntimeConfig, DEFAULT_MAX_NOTIFY_DEPTH};
use crate::error::ReactiveError;

/// Unique identifier for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// Subscriber callbacks keyed by ID, in registration order.
type SubscriberMap = RefCell<IndexMap<SubscriberId, Rc<dyn Fn()>>>;

struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
    /// Behind its own `Rc` so unsubscribe handles can hold it weakly.
    subscribers: Rc<SubscriberMap>,
    /// Number of notification passes currently on the stack.
    depth: Cell<usize>,
    max_depth: usize,
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal clones the handle; all clones share one value and one
/// subscriber set.
///
/// # Example
///
/// ```rust
/// use filament_core::reactive::{track, Signal, Subscriber};
///
/// let count = Signal::new(0);
/// let listener = Subscriber::new(|| {});
///
/// // Reading through the context subscribes `listener`.
/// let (value, _subscription) = track(&listener, |cx| count.get(cx));
/// assert_eq!(value, 0);
///
/// count.set(5);
/// assert_eq!(count.get_untracked(), 5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self::with_max_depth(value, DEFAULT_MAX_NOTIFY_DEPTH)
    }

    /// Create a signal using the notification depth limit of `config`.
    pub fn with_config(value: T, config: &RuntimeConfig) -> Self {
        Self::with_max_depth(value, config.max_notify_depth)
    }

    fn with_max_depth(value: T, max_depth: usize) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: SignalId::next(),
                value: RefCell::new(value),
                subscribers: Rc::new(RefCell::new(IndexMap::new())),
                depth: Cell::new(0),
                max_depth: max_depth.max(1),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Register the context's subscriber without reading the value.
    pub fn track(&self, cx: &ReactiveContext) {
        if cx.is_tracking(self.inner.id) {
            return;
        }

        let subscriber = cx.subscriber();
        let subscriber_id = subscriber.id();
        // An existing registration keeps its place in the order.
        self.inner
            .subscribers
            .borrow_mut()
            .insert(subscriber_id, subscriber.callback());

        let subscribers = Rc::downgrade(&self.inner.subscribers);
        cx.track_dependency(
            self.inner.id,
            Box::new(move || {
                if let Some(subscribers) = subscribers.upgrade() {
                    subscribers.borrow_mut().shift_remove(&subscriber_id);
                }
            }),
        );
    }

    /// Get the current value, subscribing the context to future writes.
    pub fn get(&self, cx: &ReactiveContext) -> T
    where
        T: Clone,
    {
        self.track(cx);
        self.get_untracked()
    }

    /// Borrow the current value, subscribing the context to future writes.
    pub fn with<R>(&self, cx: &ReactiveContext, f: impl FnOnce(&T) -> R) -> R {
        self.track(cx);
        self.with_untracked(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without tracking dependencies.
    ///
    /// The value stays borrowed while `f` runs; writing to this signal from
    /// inside `f` panics.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set a new value and notify subscribers.
    ///
    /// A write rejected by the notification depth limit is logged and
    /// dropped; use [`try_set`](Self::try_set) to observe the rejection.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            tracing::error!(signal = %self.inner.id, %err, "signal write dropped");
        }
    }

    /// Set a new value and notify subscribers, failing if the write would
    /// nest notification past the depth limit.
    pub fn try_set(&self, value: T) -> Result<(), ReactiveError> {
        self.check_depth()?;
        *self.inner.value.borrow_mut() = value;
        self.notify_subscribers();
        Ok(())
    }

    /// Replace the value with a function of the previous one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        if let Err(err) = self.try_update(f) {
            tracing::error!(signal = %self.inner.id, %err, "signal update dropped");
        }
    }

    /// Fallible form of [`update`](Self::update).
    pub fn try_update<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(&T) -> T,
    {
        self.check_depth()?;
        let next = f(&self.inner.value.borrow());
        *self.inner.value.borrow_mut() = next;
        self.notify_subscribers();
        Ok(())
    }

    /// Register a subscriber directly, outside of any tracked evaluation.
    ///
    /// Subscribing the same subscriber twice keeps one registration.
    pub fn subscribe(&self, subscriber: &Subscriber) {
        self.inner
            .subscribers
            .borrow_mut()
            .insert(subscriber.id(), subscriber.callback());
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.inner
            .subscribers
            .borrow_mut()
            .shift_remove(&subscriber_id);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether both handles point at the same signal.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Split into a reader and a writer sharing this signal.
    pub fn split(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self.clone()))
    }

    fn check_depth(&self) -> Result<(), ReactiveError> {
        let depth = self.inner.depth.get();
        if depth >= self.inner.max_depth {
            return Err(ReactiveError::NotificationDepthExceeded {
                signal: self.inner.id,
                depth,
                limit: self.inner.max_depth,
            });
        }
        Ok(())
    }

    /// Notify all subscribers that the value has changed.
    ///
    /// The pass works on a snapshot of the subscriber set. Subscribers
    /// added during the pass wait for the next write; subscribers removed
    /// during the pass are skipped.
    fn notify_subscribers(&self) {
        let depth = self.inner.depth.get() + 1;
        self.inner.depth.set(depth);
        let _guard = DepthGuard(&self.inner.depth);

        let pass: SmallVec<[(SubscriberId, Rc<dyn Fn()>); 8]> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(id, notify)| (*id, Rc::clone(notify)))
            .collect();

        tracing::trace!(
            signal = %self.inner.id,
            subscribers = pass.len(),
            depth,
            "notifying subscribers"
        );

        for (id, notify) in pass {
            let still_subscribed = self.inner.subscribers.borrow().contains_key(&id);
            if still_subscribed {
                notify();
            }
        }
    }
}

/// Pops one notification level, even if a subscriber panics.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Signal");
        debug.field("id", &self.inner.id);
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<borrowed>"),
        };
        debug
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read half of a signal, as handed out by `Tools::signal`.
pub struct ReadSignal<T: 'static>(Signal<T>);

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> SignalId {
        self.0.id()
    }

    /// Get the current value, subscribing the context to future writes.
    pub fn get(&self, cx: &ReactiveContext) -> T
    where
        T: Clone,
    {
        self.0.get(cx)
    }

    pub fn with<R>(&self, cx: &ReactiveContext, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(cx, f)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.get_untracked()
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with_untracked(f)
    }

    pub fn track(&self, cx: &ReactiveContext) {
        self.0.track(cx);
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscriber_count()
    }

    /// The underlying signal.
    pub fn signal(&self) -> &Signal<T> {
        &self.0
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

/// Write half of a signal.
pub struct WriteSignal<T: 'static>(Signal<T>);

impl<T: 'static> WriteSignal<T> {
    pub fn id(&self) -> SignalId {
        self.0.id()
    }

    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    pub fn try_set(&self, value: T) -> Result<(), ReactiveError> {
        self.0.try_set(value)
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.0.update(f);
    }

    pub fn try_update<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(&T) -> T,
    {
        self.0.try_update(f)
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteSignal").field(&self.0).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::track;

    fn counter() -> (Rc<Cell<usize>>, Subscriber) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let subscriber = Subscriber::new(move || count_clone.set(count_clone.get() + 1));
        (count, subscriber)
    }

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get_untracked(), 0);

        signal.set(42);
        assert_eq!(signal.get_untracked(), 42);

        signal.set(7);
        assert_eq!(signal.get_untracked(), 7);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get_untracked(), 15);
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = Signal::new(0);
        let (calls, subscriber) = counter();
        signal.subscribe(&subscriber);

        assert_eq!(calls.get(), 0);

        signal.set(1);
        assert_eq!(calls.get(), 1);

        signal.set(2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn equal_writes_still_notify() {
        let signal = Signal::new(3);
        let (calls, subscriber) = counter();
        let (_, _subscription) = track(&subscriber, |cx| signal.get(cx));

        signal.set(3);
        signal.set(3);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let (calls, subscriber) = counter();
        signal.subscribe(&subscriber);

        signal.set(1);
        assert_eq!(calls.get(), 1);

        signal.unsubscribe(subscriber.id());
        signal.set(2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn notification_follows_registration_order() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subscribers: Vec<Subscriber> = (0..4)
            .map(|n| {
                let order = order.clone();
                Subscriber::new(move || order.borrow_mut().push(n))
            })
            .collect();
        for subscriber in &subscribers {
            signal.subscribe(subscriber);
        }

        signal.set(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn subscriber_removed_mid_pass_is_skipped() {
        let signal = Signal::new(0);
        let (late_calls, late) = counter();
        let late_id = late.id();

        let remover = {
            let signal = signal.clone();
            Subscriber::new(move || signal.unsubscribe(late_id))
        };
        signal.subscribe(&remover);
        signal.subscribe(&late);

        signal.set(1);
        assert_eq!(late_calls.get(), 0);
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn runaway_self_write_is_cut_off() {
        let signal = Signal::with_config(
            0,
            &RuntimeConfig {
                max_notify_depth: 4,
                ..RuntimeConfig::default()
            },
        );
        let writer = {
            let signal = signal.clone();
            Subscriber::new(move || signal.update(|v| v + 1))
        };
        signal.subscribe(&writer);

        signal.set(1);

        // One outer write plus three nested ones fit under the limit.
        assert_eq!(signal.get_untracked(), 4);
        assert!(signal.try_set(10).is_ok());
    }

    #[test]
    fn try_set_reports_depth() {
        let signal = Signal::with_config(
            0,
            &RuntimeConfig {
                max_notify_depth: 1,
                ..RuntimeConfig::default()
            },
        );
        let seen = Rc::new(RefCell::new(None));
        let writer = {
            let signal = signal.clone();
            let seen = seen.clone();
            Subscriber::new(move || *seen.borrow_mut() = Some(signal.try_set(99)))
        };
        signal.subscribe(&writer);

        signal.set(1);

        let seen = seen.borrow_mut().take();
        assert!(matches!(
            seen,
            Some(Err(ReactiveError::NotificationDepthExceeded { depth: 1, limit: 1, .. }))
        ));
        assert_eq!(signal.get_untracked(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get_untracked(), 42);

        signal2.set(100);
        assert_eq!(signal1.get_untracked(), 100);
        assert!(signal1.ptr_eq(&signal2));
    }

    #[test]
    fn split_halves_share_state() {
        let (read, write) = Signal::new(String::from("a")).split();
        write.update(|s| format!("{s}b"));
        assert_eq!(read.get_untracked(), "ab");
        assert_eq!(read.id(), write.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }
}
