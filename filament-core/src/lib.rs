//! Filament Core
//!
//! This crate provides the core runtime for the Filament reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, tracked evaluations, effect trackers)
//! - Stateful components with call-order hooks
//! - Structural primitives that bind signals to the document: a single-child
//!   binding, a two-branch conditional and a positional list
//! - An in-memory host document
//!
//! Updates are fine-grained: a signal write re-enters exactly the binding,
//! conditional or list that read it, which replaces only its own part of
//! the document. There is no virtual tree and no diffing pass.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signals and dependency tracking
//! - `component`: The component model, custom components and hooks, and
//!   the structural primitives
//! - `dom`: The document the components render into
//! - `config`: Runtime settings
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use filament_core::prelude::*;
//!
//! let todo_list = component(|_: &(), tools| {
//!     let (items, set_items) = tools.signal(vec!["write docs".to_string()]);
//!     let add = set_items.clone();
//!     element("div")
//!         .child(
//!             element("button")
//!                 .attr("id", "add")
//!                 .on("click", move |_| add.update(|items| {
//!                     let mut items = items.clone();
//!                     items.push(format!("task {}", items.len() + 1));
//!                     items
//!                 })),
//!         )
//!         .child(element("ul").child(tools.each(
//!             move |cx| items.get(cx),
//!             |item: &String| element("li").child(item.as_str()).build(),
//!         )))
//! });
//!
//! let doc = Document::new();
//! let _mounted = mount(&doc, doc.body(), todo_list.create(()));
//! doc.get_element_by_id("add").unwrap().dispatch("click");
//!
//! assert_eq!(
//!     doc.to_html(),
//!     "<div><button id=\"add\"></button><ul><li>write docs</li><li>task 2</li></ul></div>"
//! );
//! ```

pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod reactive;

/// Commonly used items.
pub mod prelude {
    pub use crate::component::{
        bind, component, each, element, mount, placeholder, show, text, Child, Component, CustomComponent,
        Definition, Lifecycle, Mounted, PropBag, PropValue, Props, Tools,
    };
    pub use crate::config::RuntimeConfig;
    pub use crate::dom::{Document, Node};
    pub use crate::reactive::{track, Cleanup, ReactiveContext, ReadSignal, Signal, Subscriber, WriteSignal};
}
