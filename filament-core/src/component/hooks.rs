//! Hook slots and the tools handed to render functions.
//!
//! Hooks are indexed by call order. The first render of an instance
//! registers its slots; every later render must ask for the same slots in
//! the same order. What happens when it does not depends on
//! [`RuntimeConfig::strict_hooks`].

use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};

use super::{Binding, Component, ComponentId, Conditional, List};
use crate::config::RuntimeConfig;
use crate::error::{HookError, SlotKind};
use crate::reactive::{Cleanup, Deps, EffectTracker, ReactiveContext, ReadSignal, Signal, WriteSignal};

/// Effect queued by a render, run once the output is in the document.
pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

/// Per-instance hook storage.
#[derive(Default)]
pub(crate) struct HookState {
    /// `Signal<T>` per slot, type-erased.
    signals: Vec<Box<dyn Any>>,
    pub(crate) effects: Vec<EffectTracker>,
    pub(crate) mount_cleanups: Vec<Cleanup>,
    initialized: bool,
}

impl HookState {
    /// Take every pending cleanup and reset the effect trackers. Signal
    /// slots are kept.
    pub(crate) fn take_cleanups(&mut self) -> Vec<Cleanup> {
        let mut cleanups: Vec<Cleanup> = self.mount_cleanups.drain(..).collect();
        cleanups.extend(self.effects.iter_mut().filter_map(EffectTracker::dispose));
        cleanups
    }

    pub(crate) fn signal_slots(&self) -> usize {
        self.signals.len()
    }
}

pub(crate) struct PendingEffect {
    pub(crate) slot: usize,
    pub(crate) deps: Deps,
    pub(crate) run: EffectFn,
}

/// Work a render queued for after its output is materialized.
#[derive(Default)]
pub(crate) struct PendingWork {
    pub(crate) mounts: Vec<EffectFn>,
    pub(crate) effects: Vec<PendingEffect>,
}

/// Hooks available inside a component's render function.
///
/// ```
/// use filament_core::component::{component, element, mount, Child};
/// use filament_core::dom::Document;
///
/// let counter = component(|start: &i32, tools| {
///     let (count, set_count) = tools.signal(*start);
///     let reader = count.clone();
///     element("button")
///         .attr("id", "inc")
///         .on("click", move |_| set_count.update(|n| n + 1))
///         .child(Child::dynamic(move |cx| reader.get(cx).to_string()))
/// });
///
/// let doc = Document::new();
/// let _mounted = mount(&doc, doc.body(), counter.create(10));
/// doc.get_element_by_id("inc").unwrap().dispatch("click");
/// assert_eq!(doc.text_content(), "11");
/// ```
pub struct Tools<'a> {
    component: ComponentId,
    config: &'a RuntimeConfig,
    hooks: &'a RefCell<HookState>,
    first_render: bool,
    signal_cursor: Cell<usize>,
    effect_cursor: Cell<usize>,
    pending: RefCell<PendingWork>,
}

impl<'a> Tools<'a> {
    pub(crate) fn new(component: ComponentId, config: &'a RuntimeConfig, hooks: &'a RefCell<HookState>) -> Self {
        let first_render = !hooks.borrow().initialized;
        Self {
            component,
            config,
            hooks,
            first_render,
            signal_cursor: Cell::new(0),
            effect_cursor: Cell::new(0),
            pending: RefCell::new(PendingWork::default()),
        }
    }

    /// The instance being rendered.
    pub fn component_id(&self) -> ComponentId {
        self.component
    }

    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// State that survives re-renders of this instance.
    ///
    /// `initial` is only used by the first render.
    pub fn signal<T: 'static>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
        let index = self.signal_cursor.get();
        self.signal_cursor.set(index + 1);

        let mut hooks = self.hooks.borrow_mut();
        if !self.first_render {
            let registered = hooks.signals.len();
            match hooks.signals.get(index) {
                Some(slot) => {
                    if let Some(signal) = slot.downcast_ref::<Signal<T>>() {
                        return signal.split();
                    }
                    self.violation(HookError::SlotTypeMismatch {
                        component: self.component,
                        kind: SlotKind::Signal,
                        index,
                        expected: type_name::<T>(),
                    });
                }
                None => self.violation(HookError::SlotOverflow {
                    component: self.component,
                    kind: SlotKind::Signal,
                    index,
                    registered,
                }),
            }
        }

        let signal = Signal::with_config(initial, self.config);
        let slot: Box<dyn Any> = Box::new(signal.clone());
        if index < hooks.signals.len() {
            hooks.signals[index] = slot;
        } else {
            hooks.signals.push(slot);
        }
        signal.split()
    }

    /// Run `effect` once, after the first render's output is materialized.
    /// The returned cleanup runs when the instance is destroyed.
    pub fn mount<F>(&self, effect: F)
    where
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        if self.first_render {
            self.pending.borrow_mut().mounts.push(Box::new(effect));
        }
    }

    /// Run `effect` after render whenever `deps` differ from the previous
    /// run. Dependencies compare by identity.
    pub fn effect<D, F>(&self, deps: D, effect: F)
    where
        D: IntoIterator,
        D::Item: Into<super::PropValue>,
        F: FnOnce() -> Option<Cleanup> + 'static,
    {
        let deps: Deps = deps.into_iter().map(Into::into).collect();
        let index = self.effect_cursor.get();
        self.effect_cursor.set(index + 1);

        let mut hooks = self.hooks.borrow_mut();
        if index >= hooks.effects.len() {
            if !self.first_render {
                self.violation(HookError::SlotOverflow {
                    component: self.component,
                    kind: SlotKind::Effect,
                    index,
                    registered: hooks.effects.len(),
                });
            }
            hooks.effects.push(EffectTracker::new());
        }

        let should_run = hooks
            .effects
            .get(index)
            .is_some_and(|tracker| tracker.should_run(&deps));
        drop(hooks);

        if should_run {
            self.pending.borrow_mut().effects.push(PendingEffect {
                slot: index,
                deps,
                run: Box::new(effect),
            });
        }
    }

    /// [`bind`](super::bind) owned by this instance.
    pub fn bind<F>(&self, compute: F) -> Component
    where
        F: Fn(&ReactiveContext) -> Component + 'static,
    {
        Binding::new(compute, Some(self.component)).into()
    }

    /// [`show`](super::show) owned by this instance.
    pub fn show<P>(&self, predicate: P, when_true: impl Into<Component>, when_false: Option<Component>) -> Component
    where
        P: Fn(&ReactiveContext) -> bool + 'static,
    {
        Conditional::new(predicate, when_true.into(), when_false, Some(self.component)).into()
    }

    /// [`each`](super::each) owned by this instance.
    pub fn each<T, I, B>(&self, items: I, builder: B) -> Component
    where
        T: 'static,
        I: Fn(&ReactiveContext) -> Vec<T> + 'static,
        B: Fn(&T) -> Component + 'static,
    {
        List::new(items, builder, Some(self.component)).into()
    }

    /// Close the render: check slot counts and hand back the queued work.
    pub(crate) fn finish(self) -> PendingWork {
        let used = self.signal_cursor.get();
        let used_effects = self.effect_cursor.get();
        let mut hooks = self.hooks.borrow_mut();

        if self.first_render {
            hooks.initialized = true;
        } else {
            if used < hooks.signals.len() {
                self.violation(HookError::SlotCountChanged {
                    component: self.component,
                    kind: SlotKind::Signal,
                    used,
                    registered: hooks.signals.len(),
                });
                hooks.signals.truncate(used);
            }
            if used_effects < hooks.effects.len() {
                self.violation(HookError::SlotCountChanged {
                    component: self.component,
                    kind: SlotKind::Effect,
                    used: used_effects,
                    registered: hooks.effects.len(),
                });
                let dropped: Vec<EffectTracker> = hooks.effects.drain(used_effects..).collect();
                drop(hooks);
                for mut tracker in dropped {
                    if let Some(cleanup) = tracker.dispose() {
                        cleanup();
                    }
                }
            }
        }

        self.pending.into_inner()
    }

    fn violation(&self, error: HookError) {
        if self.config.strict_hooks {
            tracing::error!(component = %self.component, %error, "hook order violated");
            panic!("{error}");
        }
        tracing::warn!(component = %self.component, %error, "hook order violated, re-initializing slot");
    }
}
