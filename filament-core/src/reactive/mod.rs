//! Reactive Primitives
//!
//! This module implements the reactive memory model: signals, the contexts
//! that track which signals an evaluation read, and the trackers behind
//! effect hooks.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal is read through
//! a [`ReactiveContext`], it registers that context's [`Subscriber`]. When
//! the signal is written, every subscriber runs before the write returns.
//!
//! ## Tracked evaluations
//!
//! [`track`] runs a callback with a fresh context and returns the
//! [`Subscription`] it accrued. The structural components (bindings,
//! conditionals, lists) are all built on this one function: they keep the
//! subscription while they are live and drop it when they are destroyed.
//!
//! ## Effect trackers
//!
//! An [`EffectTracker`] decides whether an effect hook must re-run by
//! comparing dependency lists by identity.
//!
//! # Implementation Notes
//!
//! There is no thread-local "current listener". The context is an explicit
//! argument to every tracked read, so nested evaluations cannot capture
//! each other's dependencies.

mod context;
mod effect;
mod signal;
mod subscriber;

pub use context::{track, ReactiveContext, Subscription};
pub use effect::{deps_changed, Cleanup, Deps, EffectTracker};
pub use signal::{ReadSignal, Signal, SignalId, WriteSignal};
pub use subscriber::{Subscriber, SubscriberId};
