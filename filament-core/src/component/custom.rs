//! Custom components.
//!
//! [`component`] turns a render function into a [`Definition`]. Every
//! instance created from a definition shares its [`Serial`]; lists use the
//! serial to decide whether a fresh instance at some position can be folded
//! into the live one with a props reload.
//!
//! # Lifecycle
//!
//! 1. `create(props)` allocates the instance. Nothing runs yet.
//! 2. `render(doc)` runs the render function, materializes its output, then
//!    runs the queued mount effects (first render only) and effect hooks.
//! 3. `reload(props)` re-runs the render function and swaps the output in
//!    place, unless the new props are the same as the current ones.
//! 4. `destroy()` detaches the output, runs the mount cleanups and the
//!    effect cleanups.
//!
//! An instance torn down by `replace` can be rendered again (a conditional
//! branch coming back, for instance). Its signal slots survive; effect hooks
//! run again, mount effects do not.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::hooks::{HookState, PendingWork, Tools};
use super::{placeholder, Component, ComponentId, Lifecycle, Props, Serial};
use crate::config::RuntimeConfig;
use crate::dom::{Document, Node};

type ErasedRender = Rc<dyn Fn(&dyn Any, &Tools) -> Component>;

/// A reusable component factory produced by [`component`].
pub struct Definition<P: Props> {
    serial: Serial,
    name: Rc<str>,
    config: RuntimeConfig,
    render: ErasedRender,
    _props: PhantomData<fn(P)>,
}

impl<P: Props> Definition<P> {
    /// Label used in logs.
    pub fn named(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Runtime settings for instances created from now on.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn serial(&self) -> Serial {
        self.serial
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Create an instance as a [`Component`].
    pub fn create(&self, props: P) -> Component {
        self.instance(props).into()
    }

    /// Create an instance.
    pub fn instance(&self, props: P) -> CustomComponent {
        CustomComponent(Rc::new(CustomInner {
            id: ComponentId::next(),
            serial: self.serial,
            name: Rc::clone(&self.name),
            config: self.config,
            props: RefCell::new(Rc::new(props) as Rc<dyn Any>),
            same_props: same_props::<P>,
            render: Rc::clone(&self.render),
            hooks: RefCell::new(HookState::default()),
            output: RefCell::new(None),
            doc: RefCell::new(None),
            render_count: Cell::new(0),
        }))
    }
}

impl<P: Props> Clone for Definition<P> {
    fn clone(&self) -> Self {
        Self {
            serial: self.serial,
            name: Rc::clone(&self.name),
            config: self.config,
            render: Rc::clone(&self.render),
            _props: PhantomData,
        }
    }
}

impl<P: Props> fmt::Debug for Definition<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("serial", &self.serial)
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

/// Wrap a render function into a component definition.
///
/// The render function receives the instance's current props and the
/// [`Tools`] for hooks. It may return anything convertible into a
/// [`Component`].
pub fn component<P, C, F>(render: F) -> Definition<P>
where
    P: Props,
    C: Into<Component>,
    F: Fn(&P, &Tools) -> C + 'static,
{
    let serial = Serial::next();
    let erased = erase(move |props, tools| match props.downcast_ref::<P>() {
        Some(props) => render(props, tools).into(),
        None => {
            tracing::error!(%serial, "props of the wrong type reached a render function");
            placeholder()
        }
    });

    Definition {
        serial,
        name: Rc::from(std::any::type_name::<F>()),
        config: RuntimeConfig::default(),
        render: erased,
        _props: PhantomData,
    }
}

fn erase<F>(render: F) -> ErasedRender
where
    F: Fn(&dyn Any, &Tools) -> Component + 'static,
{
    Rc::new(render)
}

fn same_props<P: Props>(current: &dyn Any, next: &dyn Any) -> bool {
    match (current.downcast_ref::<P>(), next.downcast_ref::<P>()) {
        (Some(current), Some(next)) => current.same(next),
        _ => false,
    }
}

struct CustomInner {
    id: ComponentId,
    serial: Serial,
    name: Rc<str>,
    config: RuntimeConfig,
    props: RefCell<Rc<dyn Any>>,
    same_props: fn(&dyn Any, &dyn Any) -> bool,
    render: ErasedRender,
    hooks: RefCell<HookState>,
    output: RefCell<Option<Component>>,
    doc: RefCell<Option<Document>>,
    render_count: Cell<usize>,
}

/// An instance of a component definition.
#[derive(Clone)]
pub struct CustomComponent(Rc<CustomInner>);

impl CustomComponent {
    pub fn serial(&self) -> Serial {
        self.0.serial
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// How many times the render function ran.
    pub fn render_count(&self) -> usize {
        self.0.render_count.get()
    }

    /// A copy of the current props, if they are a `P`.
    pub fn props<P: Props + Clone>(&self) -> Option<P> {
        self.0.props.borrow().downcast_ref::<P>().cloned()
    }

    /// The component currently representing this instance.
    pub fn output(&self) -> Option<Component> {
        self.0.output.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        self.0.doc.borrow().is_some()
    }

    /// Re-render with `props` unless they are the same as the current ones.
    pub fn reload<P: Props>(&self, props: P) {
        self.reload_erased(Rc::new(props));
    }

    /// Take over the props of another instance of the same definition.
    pub fn reload_from(&self, other: &CustomComponent) {
        if other.0.serial != self.0.serial {
            tracing::warn!(
                component = %self.0.id,
                serial = %self.0.serial,
                other = %other.0.serial,
                "reload from a different definition ignored"
            );
            return;
        }
        let props = Rc::clone(&other.0.props.borrow());
        self.reload_erased(props);
    }

    fn reload_erased(&self, next: Rc<dyn Any>) {
        let unchanged = {
            let current = self.0.props.borrow();
            (self.0.same_props)(&**current, &*next)
        };
        if unchanged {
            tracing::trace!(component = %self.0.id, "props unchanged, render skipped");
            return;
        }
        *self.0.props.borrow_mut() = next;

        let doc = self.0.doc.borrow().clone();
        let previous = self.output();
        let (Some(_), Some(previous)) = (doc, previous) else {
            tracing::trace!(component = %self.0.id, "props stored for the next render");
            return;
        };

        let (output, work) = self.run_render();
        *self.0.output.borrow_mut() = Some(output.clone());
        if previous.is(&output) {
            tracing::trace!(component = %self.0.id, "render returned the live output");
            self.flush(work);
            return;
        }
        tracing::debug!(
            component = %self.0.id,
            name = %self.0.name,
            from = %previous.id(),
            to = %output.id(),
            "reloaded"
        );
        previous.replace(&output);
        self.flush(work);
    }

    fn run_render(&self) -> (Component, PendingWork) {
        let props = Rc::clone(&self.0.props.borrow());
        let tools = Tools::new(self.0.id, &self.0.config, &self.0.hooks);
        let output = (self.0.render)(&*props, &tools);
        let work = tools.finish();
        self.0.render_count.set(self.0.render_count.get() + 1);
        (output, work)
    }

    fn flush(&self, work: PendingWork) {
        for mount in work.mounts {
            if let Some(cleanup) = mount() {
                self.0.hooks.borrow_mut().mount_cleanups.push(cleanup);
            }
        }

        for effect in work.effects {
            let previous = self
                .0
                .hooks
                .borrow_mut()
                .effects
                .get_mut(effect.slot)
                .and_then(|tracker| tracker.begin(effect.deps));
            if let Some(previous) = previous {
                previous();
            }
            let cleanup = (effect.run)();
            if let Some(tracker) = self.0.hooks.borrow_mut().effects.get_mut(effect.slot) {
                tracker.finish(cleanup);
            }
        }
    }

    fn release(&self) {
        self.0.doc.borrow_mut().take();
        let cleanups = self.0.hooks.borrow_mut().take_cleanups();
        for cleanup in cleanups {
            cleanup();
        }
    }
}

impl Lifecycle for CustomComponent {
    fn id(&self) -> ComponentId {
        self.0.id
    }

    fn render(&self, doc: &Document) -> Node {
        let stale = self.0.output.borrow_mut().take();
        if let Some(stale) = stale {
            stale.teardown();
        }
        *self.0.doc.borrow_mut() = Some(doc.clone());

        let (output, work) = self.run_render();
        *self.0.output.borrow_mut() = Some(output.clone());
        let node = output.render(doc);
        self.flush(work);
        node
    }

    fn destroy(&self) {
        let output = self.0.output.borrow_mut().take();
        if let Some(output) = output {
            output.destroy();
        }
        self.release();
    }

    fn replace(&self, next: &Component) {
        let Some(output) = self.0.output.borrow_mut().take() else {
            tracing::trace!(component = %self.0.id, "replace on unrendered component ignored");
            return;
        };
        output.replace(next);
        self.release();
    }

    fn append(&self, next: &Component) {
        match self.output() {
            Some(output) => output.append(next),
            None => tracing::trace!(component = %self.0.id, "append on unrendered component ignored"),
        }
    }

    fn teardown(&self) {
        let output = self.0.output.borrow_mut().take();
        if let Some(output) = output {
            output.teardown();
        }
        self.release();
    }
}

impl fmt::Debug for CustomComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomComponent")
            .field("id", &self.0.id)
            .field("serial", &self.0.serial)
            .field("name", &self.0.name)
            .field("render_count", &self.0.render_count.get())
            .field("signal_slots", &self.0.hooks.try_borrow().ok().map(|hooks| hooks.signal_slots()))
            .finish()
    }
}
