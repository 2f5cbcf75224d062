//! Integration Tests for the Component Runtime
//!
//! These tests mount component trees into a document and verify that signal
//! writes update exactly the parts of the document that depend on them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use filament_core::dom::StatsSnapshot;
use filament_core::prelude::*;

/// Counts invocations of a callback.
fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

fn bump(count: &Cell<usize>) {
    count.set(count.get() + 1);
}

fn list_node(doc: &Document) -> Node {
    doc.find(|node| node.tag().as_deref() == Some("ul"))
        .expect("list rendered")
}

/// Test that reads return the last write.
#[test]
fn signal_read_returns_last_write() {
    let signal = Signal::new(1);
    signal.set(2);
    signal.set(3);
    assert_eq!(signal.get_untracked(), 3);
}

/// Test that a subscriber runs once per write, even for equal values.
#[test]
fn subscriber_runs_once_per_write() {
    let signal = Signal::new(7);
    let (runs, runs_clone) = counter();
    let subscriber = Subscriber::new(move || bump(&runs_clone));

    let (_, subscription) = track(&subscriber, |cx| signal.get(cx));
    signal.set(7);
    signal.set(7);
    signal.set(8);

    assert_eq!(runs.get(), 3);
    drop(subscription);
}

/// Test that a binding replaces its node once per write and keeps exactly
/// one live node.
#[test]
fn binding_replaces_once_per_write() {
    let doc = Document::new();
    let count = Signal::new(0);
    let reader = count.clone();
    let _mounted = mount(&doc, doc.body(), bind(move |cx| text(format!("n={}", reader.get(cx)))));

    let before = doc.stats();
    for n in 1..=5 {
        count.set(n);
    }
    let delta = doc.stats().since(&before);

    assert_eq!(delta.replaced, 5);
    assert_eq!(delta.removed, 0);
    assert_eq!(doc.body().child_count(), 1);
    assert_eq!(doc.text_content(), "n=5");
}

/// Test that a conditional only swaps when the chosen branch changes.
#[test]
fn conditional_is_stable_while_decision_holds() {
    let doc = Document::new();
    let temperature = Signal::new(10);
    let reader = temperature.clone();
    let _mounted = mount(
        &doc,
        doc.body(),
        show(move |cx| reader.get(cx) > 25, text("hot"), Some(text("cold"))),
    );

    let before = doc.stats();
    temperature.set(12);
    temperature.set(20);
    assert_eq!(doc.stats().since(&before), StatsSnapshot::default());

    temperature.set(30);
    temperature.set(31);
    let delta = doc.stats().since(&before);
    assert_eq!(delta.replaced, 1);
    assert_eq!(doc.text_content(), "hot");
}

fn counter_row() -> Definition<i32> {
    component(|label: &i32, tools| {
        let (count, set_count) = tools.signal(0);
        let label = *label;
        element("li")
            .on("click", move |_| set_count.update(|n| n + 1))
            .child(Child::dynamic(move |cx| format!("{label}={};", count.get(cx))))
    })
    .named("counter-row")
}

/// Test that list state follows position, not item: reordering keeps each
/// position's counter and only changes the labels.
#[test]
fn list_reorder_keeps_state_by_position() {
    let doc = Document::new();
    let items = Signal::new(vec![1, 2, 3]);
    let reader = items.clone();
    let row = counter_row();
    let _mounted = mount(
        &doc,
        doc.body(),
        element("ul").child(each(move |cx| reader.get(cx), move |label: &i32| row.create(*label))),
    );

    let rows = list_node(&doc).children();
    rows[0].dispatch("click");
    rows[0].dispatch("click");
    rows[2].dispatch("click");
    assert_eq!(doc.text_content(), "1=2;2=0;3=1;");

    items.set(vec![3, 1, 2]);

    assert_eq!(doc.text_content(), "3=2;1=0;2=1;");
}

/// Test that growing a list by one appends once and touches nothing else.
#[test]
fn list_growth_appends_only() {
    let doc = Document::new();
    let items = Signal::new(vec!["a".to_string()]);
    let reader = items.clone();
    let row = component(|label: &String, _| element("li").child(label.as_str()));
    let _mounted = mount(
        &doc,
        doc.body(),
        element("ul").child(each(move |cx| reader.get(cx), move |label: &String| row.create(label.clone()))),
    );

    let before = doc.stats();
    items.set(vec!["a".to_string(), "b".to_string()]);
    let delta = doc.stats().since(&before);

    assert_eq!(delta.inserted, 1);
    assert_eq!(delta.replaced, 0);
    assert_eq!(delta.removed, 0);
    assert_eq!(doc.to_html(), "<ul><li>a</li><li>b</li></ul>");
}

/// Test that shrinking a list by one destroys exactly one child.
#[test]
fn list_shrink_destroys_one() {
    let doc = Document::new();
    let items = Signal::new(vec!["a".to_string(), "b".to_string()]);
    let reader = items.clone();
    let row = component(|label: &String, _| element("li").child(label.as_str()));
    let _mounted = mount(
        &doc,
        doc.body(),
        element("ul").child(each(move |cx| reader.get(cx), move |label: &String| row.create(label.clone()))),
    );

    let before = doc.stats();
    items.set(vec!["a".to_string()]);
    let delta = doc.stats().since(&before);

    assert_eq!(delta.removed, 1);
    assert_eq!(delta.replaced, 0);
    assert_eq!(delta.inserted, 0);
    assert_eq!(doc.to_html(), "<ul><li>a</li></ul>");
}

/// Test that reloading with shallow-equal props skips the render function,
/// both directly and through list reconciliation.
#[test]
fn prop_memoization_skips_render() {
    let doc = Document::new();
    let (renders, renders_clone) = counter();
    let payload = PropValue::shared(vec![1, 2, 3]);
    let card = component(move |props: &PropBag, _| {
        bump(&renders_clone);
        text(props.get("title").map(PropValue::to_text).unwrap_or_default())
    });

    let instance = card.instance(PropBag::new().with("title", "t").with("payload", payload.clone()));
    let _mounted = mount(&doc, doc.body(), instance.clone());
    instance.reload(PropBag::new().with("payload", payload.clone()).with("title", "t"));
    assert_eq!(renders.get(), 1);

    // A fresh allocation with equal contents is a change.
    instance.reload(PropBag::new().with("title", "t").with("payload", PropValue::shared(vec![1, 2, 3])));
    assert_eq!(renders.get(), 2);

    let tick = Signal::new(0);
    let reader = tick.clone();
    let list_renders = renders.clone();
    let list_card = card.clone();
    let _mounted = mount(
        &doc,
        doc.body(),
        each(
            move |cx| {
                reader.track(cx);
                vec!["x", "y"]
            },
            move |title: &&str| list_card.create(PropBag::new().with("title", *title)),
        ),
    );
    let after_mount = list_renders.get();
    tick.set(1);
    tick.set(2);
    assert_eq!(list_renders.get(), after_mount);
}

/// Test that mount effects run once per instance and their cleanup runs
/// once, at destroy.
#[test]
fn mount_once_cleanup_once() {
    let doc = Document::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = log.clone();
    let widget = component(move |n: &i32, tools| {
        let log = log_clone.clone();
        tools.mount(move || {
            log.borrow_mut().push("mount");
            let log = log.clone();
            Some(Box::new(move || log.borrow_mut().push("cleanup")) as Cleanup)
        });
        text(n.to_string())
    });

    let visible = Signal::new(true);
    let reader = visible.clone();
    let instance = widget.instance(1);
    let mounted = mount(&doc, doc.body(), show(move |cx| reader.get(cx), instance.clone(), None));

    instance.reload(2);
    instance.reload(3);
    assert_eq!(*log.borrow(), vec!["mount"]);

    mounted.unmount();
    visible.set(false);
    instance.destroy();
    assert_eq!(*log.borrow(), vec!["mount", "cleanup"]);
}

/// Test that a stateful component hidden and shown again by a conditional
/// keeps its signals, re-runs its effect hooks and skips its mount effect.
#[test]
fn revived_branch_keeps_state_and_reruns_effects() {
    let doc = Document::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = log.clone();
    let panel = component(move |_: &(), tools| {
        let (clicks, set_clicks) = tools.signal(0);
        let mount_log = log_clone.clone();
        tools.mount(move || {
            mount_log.borrow_mut().push("mount");
            None
        });
        let effect_log = log_clone.clone();
        tools.effect([0_i64], move || {
            effect_log.borrow_mut().push("effect");
            let effect_log = effect_log.clone();
            Some(Box::new(move || effect_log.borrow_mut().push("effect cleanup")) as Cleanup)
        });
        element("button")
            .attr("id", "panel")
            .on("click", move |_| set_clicks.update(|n| n + 1))
            .child(Child::dynamic(move |cx| clicks.get(cx).to_string()))
    });

    let visible = Signal::new(true);
    let reader = visible.clone();
    let _mounted = mount(
        &doc,
        doc.body(),
        show(move |cx| reader.get(cx), panel.create(()), Some(text("hidden"))),
    );

    let button = doc.get_element_by_id("panel").expect("panel rendered");
    button.dispatch("click");
    button.dispatch("click");
    assert_eq!(doc.text_content(), "2");

    visible.set(false);
    assert_eq!(doc.text_content(), "hidden");
    visible.set(true);

    assert_eq!(doc.text_content(), "2");
    assert_eq!(*log.borrow(), vec!["mount", "effect", "effect cleanup", "effect"]);
}

/// Test that the tree stays reactive after the mount handle is dropped.
#[test]
fn dropped_handle_keeps_tree_reactive() {
    let doc = Document::new();
    let items = Signal::new(vec![1, 2]);
    let visible = Signal::new(true);
    let (items_reader, visible_reader) = (items.clone(), visible.clone());
    drop(mount(
        &doc,
        doc.body(),
        show(
            move |cx| visible_reader.get(cx),
            element("ul").child(each(move |cx| items_reader.get(cx), |n: &i32| element("li").child(*n).build())),
            Some(text("hidden")),
        ),
    ));

    items.set(vec![1, 2, 3]);
    assert_eq!(doc.to_html(), "<ul><li>1</li><li>2</li><li>3</li></ul>");

    visible.set(false);
    assert_eq!(doc.to_html(), "hidden");
    // The hidden list no longer listens.
    assert_eq!(items.subscriber_count(), 0);

    visible.set(true);
    assert_eq!(doc.to_html(), "<ul><li>1</li><li>2</li><li>3</li></ul>");
    assert_eq!(items.subscriber_count(), 1);
}

/// Test that nested bindings track their own signals only.
#[test]
fn nested_bindings_do_not_cross_talk() {
    let doc = Document::new();
    let outer = Signal::new("outer");
    let inner = Signal::new(0);
    let (outer_runs, outer_runs_clone) = counter();
    let (inner_runs, inner_runs_clone) = counter();

    let (outer_reader, inner_reader) = (outer.clone(), inner.clone());
    let _mounted = mount(
        &doc,
        doc.body(),
        bind(move |cx| {
            bump(&outer_runs_clone);
            let inner_reader = inner_reader.clone();
            let inner_runs = inner_runs_clone.clone();
            element("div")
                .attr("class", outer_reader.get(cx))
                .child(bind(move |cx| {
                    bump(&inner_runs);
                    text(inner_reader.get(cx).to_string())
                }))
                .build()
        }),
    );

    inner.set(1);
    inner.set(2);
    assert_eq!((outer_runs.get(), inner_runs.get()), (1, 3));

    outer.set("changed");
    assert_eq!(outer_runs.get(), 2);
    assert_eq!(doc.to_html(), "<div class=\"changed\">2</div>");
    // The replaced inner binding no longer listens.
    assert_eq!(inner.subscriber_count(), 1);
}

/// Test that a self-feeding subscriber is cut off at the configured depth.
#[test]
fn runaway_writes_stop_at_configured_depth() {
    let config = RuntimeConfig::from_json(r#"{ "max_notify_depth": 3 }"#).unwrap();
    let signal = Signal::with_config(0, &config);
    let writer = signal.clone();
    let subscriber = Subscriber::new(move || writer.update(|n| n + 1));
    signal.subscribe(&subscriber);

    signal.set(1);

    // The outer write plus two nested ones; the third nested write is
    // rejected.
    assert_eq!(signal.get_untracked(), 3);
}

fn flaky_hooks() -> Definition<bool> {
    component(|extra: &bool, tools| {
        let _ = tools.signal(0);
        if *extra {
            let _ = tools.signal("extra");
        }
        text("flaky")
    })
}

/// Test that changing the number of hooks between renders panics by default.
#[test]
#[should_panic(expected = "signal slot 1")]
fn strict_hooks_reject_extra_slot() {
    let doc = Document::new();
    let instance = flaky_hooks().instance(false);
    let _mounted = mount(&doc, doc.body(), instance.clone());
    instance.reload(true);
}

/// Test that lenient hooks recover from slot changes.
#[test]
fn lenient_hooks_recover() {
    let doc = Document::new();
    let config = RuntimeConfig::from_json(r#"{ "strict_hooks": false }"#).unwrap();
    let instance = flaky_hooks().with_config(config).instance(false);
    let _mounted = mount(&doc, doc.body(), instance.clone());

    instance.reload(true);
    instance.reload(false);

    assert_eq!(instance.render_count(), 3);
    assert_eq!(doc.text_content(), "flaky");
}

/// Test that the document serializes what the components rendered.
#[test]
fn document_snapshot_reflects_updates() {
    let doc = Document::new();
    let name = Signal::new("Ada".to_string());
    let reader = name.clone();
    let _mounted = mount(
        &doc,
        doc.body(),
        element("p")
            .attr("id", "greeting")
            .child("Hello, ")
            .child(Child::dynamic(move |cx| reader.get(cx))),
    );

    name.set("Grace".to_string());

    let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
    let paragraph = &json["children"][0];
    assert_eq!(paragraph["attributes"]["id"], "greeting");
    assert_eq!(paragraph["children"][1]["content"], "Grace");
}
