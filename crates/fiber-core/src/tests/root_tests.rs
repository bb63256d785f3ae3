use super::*;
use crate::element::{make_node, Component, Props};
use crate::memory::MemoryApplier;
use crate::runtime::TestScheduler;
use crate::InstanceKind;
use std::cell::Cell;
use std::task::Context;

struct Harness {
    root: Root<MemoryApplier>,
    scheduler: Rc<TestScheduler>,
    container: NodeId,
}

impl Harness {
    fn new() -> Self {
        let mut applier = MemoryApplier::new();
        let container = applier.create_element("root");
        let scheduler = Rc::new(TestScheduler::default());
        let root = Root::with_scheduler(applier, container, scheduler.clone());
        Self {
            root,
            scheduler,
            container,
        }
    }

    fn html(&self) -> String {
        self.root.with_applier(|applier| applier.inner_html(self.container))
    }

    fn click(&self, tag: &str, index: usize) -> usize {
        self.root.with_applier(|applier| {
            let target = applier.find_by_tag(self.container, tag)[index];
            applier.dispatch_event(target, "click")
        })
    }

    /// Runs idle callbacks to completion, checking that at most one is ever
    /// outstanding.
    fn run(&self) -> usize {
        let mut ran = 0;
        while self.scheduler.run_next() {
            assert!(self.scheduler.pending() <= 1);
            ran += 1;
        }
        ran
    }
}

fn poll<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    let waker = futures_task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    Pin::new(future).poll(&mut cx)
}

fn counter() -> Component {
    Component::new("Counter", |scope, _props| {
        let (count, set_count) = scope.use_state(100i64);
        make_node(
            "div",
            Props::new(),
            [
                make_node("span", Props::new(), [count]),
                make_node(
                    "button",
                    Props::new().with_handler("onClick", move |_| set_count.update(|c| c + 1)),
                    ["Add"],
                ),
            ],
        )
    })
}

fn counter_element(component: &Component) -> Element {
    make_node(component, Props::new(), Vec::<Element>::new())
}

#[test]
fn renders_nested_host_description() {
    let harness = Harness::new();
    harness.root.render(make_node(
        "div",
        Props::new().with("id", "foo"),
        [
            make_node("div", Props::new().with("id", "bar"), ["Hello"]),
            make_node("button", Props::new(), ["Add"]),
        ],
    ));
    harness.run();
    assert_eq!(
        harness.html(),
        r#"<div id="foo"><div id="bar">Hello</div><button>Add</button></div>"#
    );
}

#[test]
fn one_unit_of_work_per_idle_callback() {
    let harness = Harness::new();
    let counter = counter();
    harness.root.render(counter_element(&counter));
    assert_eq!(harness.scheduler.pending(), 1);

    assert!(harness.scheduler.run_next());
    assert!(!harness.root.is_settled());
    assert_eq!(harness.html(), "");

    // root, Counter, div, span, text, button, text
    assert_eq!(harness.run() + 1, 7);
    assert!(harness.root.is_settled());
    assert_eq!(
        harness.html(),
        "<div><span>100</span><button>Add</button></div>"
    );
}

#[test]
fn rendering_the_same_description_twice_changes_nothing() {
    let harness = Harness::new();
    let element = || {
        make_node(
            "section",
            Props::new().with("className", "card"),
            [make_node("h1", Props::new(), ["Title"]), make_node("p", Props::new(), ["Body"])],
        )
    };
    harness.root.render(element());
    harness.run();
    harness.root.with_applier(|applier| applier.take_mutations());

    harness.root.render(element());
    harness.run();

    assert!(harness.root.with_applier(|applier| applier.take_mutations()).is_empty());
    assert_eq!(
        harness.html(),
        r#"<section class="card"><h1>Title</h1><p>Body</p></section>"#
    );
}

#[test]
fn state_update_round_trip() {
    let harness = Harness::new();
    let counter = counter();
    harness.root.render(counter_element(&counter));
    harness.run();

    assert_eq!(harness.click("button", 0), 1);
    harness.run();
    assert_eq!(
        harness.html(),
        "<div><span>101</span><button>Add</button></div>"
    );

    harness.click("button", 0);
    harness.run();
    assert_eq!(
        harness.html(),
        "<div><span>102</span><button>Add</button></div>"
    );
}

#[test]
fn update_pass_reuses_host_instances() {
    let harness = Harness::new();
    let counter = counter();
    harness.root.render(counter_element(&counter));
    harness.run();
    let before = harness
        .root
        .with_applier(|applier| applier.find_by_tag(harness.container, "span"));
    harness.root.with_applier(|applier| applier.take_mutations());

    harness.click("button", 0);
    harness.run();

    let mutations = harness.root.with_applier(|applier| applier.take_mutations());
    assert!(mutations.iter().all(|mutation| !mutation.is_structural()));
    let after = harness
        .root
        .with_applier(|applier| applier.find_by_tag(harness.container, "span"));
    assert_eq!(before, after);
}

#[test]
fn updates_queued_in_one_tick_are_folded_in_order() {
    let harness = Harness::new();
    let counter = counter();
    harness.root.render(counter_element(&counter));
    harness.run();

    harness.click("button", 0);
    harness.click("button", 0);
    harness.click("button", 0);
    harness.run();
    assert_eq!(
        harness.html(),
        "<div><span>103</span><button>Add</button></div>"
    );
}

#[test]
fn replaced_listener_no_longer_fires() {
    thread_local! {
        static FIRST: Cell<usize> = Cell::new(0);
        static SECOND: Cell<usize> = Cell::new(0);
    }
    let harness = Harness::new();
    let button = |second: bool| {
        let props = if second {
            Props::new().with_handler("onClick", |_| SECOND.with(|c| c.set(c.get() + 1)))
        } else {
            Props::new().with_handler("onClick", |_| FIRST.with(|c| c.set(c.get() + 1)))
        };
        make_node("button", props, ["Go"])
    };

    harness.root.render(button(false));
    harness.run();
    harness.click("button", 0);

    harness.root.render(button(true));
    harness.run();
    assert_eq!(harness.click("button", 0), 1);

    assert_eq!(FIRST.with(Cell::get), 1);
    assert_eq!(SECOND.with(Cell::get), 1);
}

#[test]
fn last_render_request_wins() {
    let harness = Harness::new();
    harness.root.render(make_node("p", Props::new(), ["first"]));
    harness.root.render(make_node("p", Props::new(), ["second"]));
    assert_eq!(harness.scheduler.pending(), 1);
    harness.run();
    assert_eq!(harness.html(), "<p>second</p>");
}

#[test]
fn request_during_a_pass_waits_for_its_commit() {
    let harness = Harness::new();
    harness.root.render(make_node("p", Props::new(), ["first"]));
    assert!(harness.scheduler.run_next());

    harness.root.render(make_node("p", Props::new(), ["second"]));
    assert!(harness.scheduler.run_next());
    assert_eq!(harness.html(), "");
    assert!(harness.scheduler.run_next());
    assert_eq!(harness.html(), "<p>first</p>");
    assert_eq!(harness.scheduler.pending(), 1);

    harness.run();
    assert_eq!(harness.html(), "<p>second</p>");
}

#[test]
fn flush_drives_a_default_scheduled_root() {
    let mut applier = MemoryApplier::new();
    let container = applier.create_element("root");
    let root = create_root(applier, container);
    let counter = counter();

    root.render(counter_element(&counter));
    assert!(!root.is_settled());
    root.flush().expect("flush");
    assert!(root.is_settled());

    root.with_applier(|applier| {
        let button = applier.find_by_tag(container, "button")[0];
        applier.dispatch_event(button, "click");
    });
    root.flush().expect("flush");
    assert_eq!(
        root.with_applier(|applier| applier.inner_html(container)),
        "<div><span>101</span><button>Add</button></div>"
    );
}

#[test]
fn act_settles_a_root_without_a_scheduler() {
    let mut applier = MemoryApplier::new();
    let container = applier.create_element("root");
    let root = create_root(applier, container);

    let mut settled = root.act(|| {
        root.render(make_node("p", Props::new(), ["hi"]));
    });
    assert!(matches!(poll(&mut settled), Poll::Ready(Ok(()))));
    assert!(root.is_settled());
    assert_eq!(
        root.with_applier(|applier| applier.inner_html(container)),
        "<p>hi</p>"
    );
}

#[test]
fn fiber_count_stays_within_two_generations() {
    let harness = Harness::new();
    let counter = counter();
    harness.root.render(counter_element(&counter));
    harness.run();
    let settled = harness.root.fiber_count();
    assert_eq!(settled, 7);

    for _ in 0..10 {
        harness.click("button", 0);
        while harness.scheduler.run_next() {
            assert!(harness.root.fiber_count() <= 2 * settled);
        }
        assert_eq!(harness.root.fiber_count(), settled);
    }
}

#[test]
fn settled_future_resolves_after_commit() {
    let harness = Harness::new();
    let counter = counter();
    let mut settled = harness
        .root
        .act(|| harness.root.render(counter_element(&counter)));
    assert!(poll(&mut settled).is_pending());

    harness.run();
    assert!(matches!(poll(&mut settled), Poll::Ready(Ok(()))));
}

#[test]
fn failed_pass_is_reported_and_abandoned() {
    let harness = Harness::new();
    harness.root.render(make_node(
        "div",
        Props::new(),
        [make_node("span", Props::new(), ["x"])],
    ));
    harness.run();
    let committed = harness.root.fiber_count();
    let (div, span) = harness.root.with_applier(|applier| {
        let div = applier.children(harness.container)[0];
        let span = applier.children(div)[0];
        applier.remove_child(div, span).expect("detach");
        (div, span)
    });

    let mut settled = harness.root.act(|| {
        harness
            .root
            .render(make_node("div", Props::new(), Vec::<Element>::new()))
    });
    harness.run();

    match poll(&mut settled) {
        Poll::Ready(Err(err)) => {
            assert_eq!(err, NodeError::NotAChild { parent: div, child: span })
        }
        other => panic!("unexpected poll result: {other:?}"),
    }
    assert!(harness.root.is_settled());
    assert_eq!(harness.root.fiber_count(), committed);
}

/// Host that rejects the next `set_text` once armed.
struct FlakyText {
    host: MemoryApplier,
    fail_next_text: bool,
}

impl Applier for FlakyText {
    fn create_instance(&mut self, kind: InstanceKind<'_>) -> Result<NodeId, NodeError> {
        self.host.create_instance(kind)
    }
    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.host.set_attribute(id, name, value)
    }
    fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), NodeError> {
        self.host.remove_attribute(id, name)
    }
    fn add_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &crate::EventHandler,
    ) -> Result<(), NodeError> {
        self.host.add_listener(id, event, handler)
    }
    fn remove_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &crate::EventHandler,
    ) -> Result<(), NodeError> {
        self.host.remove_listener(id, event, handler)
    }
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.host.append_child(parent, child)
    }
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.host.remove_child(parent, child)
    }
    fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), NodeError> {
        if std::mem::take(&mut self.fail_next_text) {
            return Err(NodeError::Missing { id });
        }
        self.host.set_text(id, value)
    }
    fn contains_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.host.contains_child(parent, child)
    }
}

#[test]
fn updates_from_a_failed_pass_are_not_lost() {
    thread_local! {
        static SETTER: std::cell::RefCell<Option<crate::SetState<i64>>> =
            std::cell::RefCell::new(None);
    }
    let shown = Component::new("Shown", |scope, _props| {
        let (count, set_count) = scope.use_state(100i64);
        SETTER.with(|slot| *slot.borrow_mut() = Some(set_count));
        make_node("div", Props::new(), [count])
    });

    let mut host = MemoryApplier::new();
    let container = host.create_element("root");
    let root = create_root(
        FlakyText {
            host,
            fail_next_text: false,
        },
        container,
    );
    let html = || root.with_applier(|applier| applier.host.inner_html(container));

    root.render(make_node(&shown, Props::new(), Vec::<Element>::new()));
    root.flush().expect("first pass");
    assert_eq!(html(), "<div>100</div>");
    let set_count = SETTER.with(|slot| slot.borrow().clone()).expect("setter");

    root.with_applier(|applier| applier.fail_next_text = true);
    set_count.update(|count| count + 1);
    assert!(matches!(root.flush(), Err(NodeError::Missing { .. })));
    assert_eq!(html(), "<div>100</div>");

    set_count.update(|count| count + 1);
    root.flush().expect("retry");
    assert_eq!(html(), "<div>102</div>");
}

#[test]
fn setter_outlives_its_root_harmlessly() {
    thread_local! {
        static SETTER: std::cell::RefCell<Option<crate::SetState<i64>>> =
            std::cell::RefCell::new(None);
    }
    let keeper = Component::new("Keeper", |scope, _props| {
        let (value, set_value) = scope.use_state(0i64);
        SETTER.with(|slot| *slot.borrow_mut() = Some(set_value));
        make_node("p", Props::new(), [value])
    });

    {
        let harness = Harness::new();
        harness.root.render(make_node(&keeper, Props::new(), Vec::<Element>::new()));
        harness.run();
        assert_eq!(harness.html(), "<p>0</p>");
    }

    let setter = SETTER.with(|slot| slot.borrow_mut().take()).expect("setter");
    setter.set(5);
    assert_eq!(setter.pending_len(), 0);
}

#[test]
#[should_panic(expected = "hooks must not be called conditionally")]
fn conditional_hooks_panic() {
    let toggled = Component::new("Toggled", |scope, props| {
        let (a, _) = scope.use_state(1i64);
        let mut total = a;
        if props.get("extra").is_some() {
            let (b, _) = scope.use_state(2i64);
            total += b;
        }
        make_node("p", Props::new(), [total])
    });
    let mut applier = MemoryApplier::new();
    let container = applier.create_element("root");
    let root = create_root(applier, container);

    root.render(make_node(&toggled, Props::new(), Vec::<Element>::new()));
    root.flush().expect("first");
    root.render(make_node(&toggled, Props::new().with("extra", true), Vec::<Element>::new()));
    let _ = root.flush();
}
