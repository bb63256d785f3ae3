use std::io::{self, BufRead, Write};
use std::time::Duration;

use fiber_core::{make_node, Component, Element, MemoryApplier, NodeId, Props, Root};
use fiber_runtime_std::StdRuntime;

const FRAME_BUDGET: Duration = Duration::from_millis(4);

fn counter_app() -> Component {
    Component::new("CounterApp", |scope, _props| {
        let (count, set_count) = scope.use_state(2i64);
        let increment = set_count.clone();
        let decrement = set_count;
        let items: Vec<Element> = (0..count.max(0))
            .map(|index| make_node("li", Props::new().with("key", index), [format!("item {index}")]))
            .collect();
        make_node(
            "div",
            Props::new().with("className", "counter"),
            [
                make_node("h1", Props::new(), [format!("Count: {count}")]),
                make_node(
                    "button",
                    Props::new().with_handler("onClick", move |_| increment.update(|c| c + 1)),
                    ["+"],
                ),
                make_node(
                    "button",
                    Props::new().with_handler("onClick", move |_| decrement.update(|c| c - 1)),
                    ["-"],
                ),
                make_node("ul", Props::new(), items),
            ],
        )
    })
}

/// Runs idle callbacks in frame-sized slices until the root has settled.
fn settle(runtime: &StdRuntime, root: &Root<MemoryApplier>) {
    let mut frames = 0;
    while !root.is_settled() {
        if runtime.run_for(FRAME_BUDGET) == 0 {
            break;
        }
        frames += 1;
    }
    if let Some(err) = root.take_error() {
        log::error!("render pass failed: {err}");
    }
    log::debug!("settled after {frames} frames, {} live fibers", root.fiber_count());
}

fn click(root: &Root<MemoryApplier>, container: NodeId, index: usize) {
    let handled = root.with_applier(|applier| {
        applier
            .find_by_tag(container, "button")
            .get(index)
            .map(|button| applier.dispatch_event(*button, "click"))
    });
    if handled.is_none() {
        log::warn!("no button at index {index}");
    }
}

fn main() {
    env_logger::init();

    println!("=== Fiber Reconciler Counter Example ===");
    println!("Commands: '+' increment, '-' decrement, 'd' dump tree, 'q' quit");
    println!();

    let runtime = StdRuntime::new();
    let mut applier = MemoryApplier::new();
    let container = applier.create_element("div");
    let root = runtime.create_root(applier, container);
    let app = counter_app();

    root.render(make_node(&app, Props::new(), Vec::<Element>::new()));
    settle(&runtime, &root);
    println!("{}", root.with_applier(|applier| applier.inner_html(container)));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("failed to read input: {err}");
                break;
            }
        };
        match line.trim() {
            "+" => click(&root, container, 0),
            "-" => click(&root, container, 1),
            "d" => {
                print!("{}", root.with_applier(|applier| applier.dump_tree(Some(container))));
                continue;
            }
            "q" => break,
            "" => continue,
            other => {
                log::warn!("unknown command `{other}`");
                continue;
            }
        }
        settle(&runtime, &root);
        println!("{}", root.with_applier(|applier| applier.inner_html(container)));
        if let Err(err) = io::stdout().flush() {
            log::warn!("failed to flush stdout: {err}");
        }
    }
}
