use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use fiber_core::{Element, MemoryApplier, Mutation, NodeError, NodeId, Root};
use fiber_runtime_std::StdRuntime;
use futures_task::ArcWake;

/// Records whether the settle future asked to be woken.
#[derive(Default)]
struct WakeFlag(AtomicBool);

impl ArcWake for WakeFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.store(true, Ordering::SeqCst);
    }
}

/// Headless harness for exercising roots in tests.
///
/// `TestRoot` owns a [`StdRuntime`] and an in-memory container. Every
/// interaction goes through [`TestRoot::act`], which runs the interaction
/// and then idle callbacks until the root has settled, so assertions always
/// observe a fully committed host tree.
pub struct TestRoot {
    runtime: StdRuntime,
    root: Root<MemoryApplier>,
    container: NodeId,
}

impl TestRoot {
    /// Create a new root over an empty `<div>` container.
    pub fn new() -> Self {
        let runtime = StdRuntime::new();
        let mut applier = MemoryApplier::new();
        let container = applier.create_element("div");
        let root = runtime.create_root(applier, container);
        Self {
            runtime,
            root,
            container,
        }
    }

    pub fn root(&self) -> &Root<MemoryApplier> {
        &self.root
    }

    pub fn runtime(&self) -> &StdRuntime {
        &self.runtime
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Run `f`, then drive idle callbacks until every pass it caused has
    /// committed.
    ///
    /// Panics if the root is unsettled while no callback is queued, which
    /// means a pass was lost.
    pub fn act(&self, f: impl FnOnce()) -> Result<(), NodeError> {
        let mut settled = self.root.act(f);
        let flag = Arc::new(WakeFlag::default());
        let waker = futures_task::waker(flag.clone());
        let mut cx = Context::from_waker(&waker);
        let scheduler = self.runtime.scheduler();
        loop {
            if let Poll::Ready(result) = Pin::new(&mut settled).poll(&mut cx) {
                return result;
            }
            // a wake means the last callback settled the root; poll again first
            if flag.0.swap(false, Ordering::SeqCst) {
                continue;
            }
            if !scheduler.run_next() {
                panic!("root is not settled but no idle callback is queued");
            }
        }
    }

    /// Render `element` into the container and wait for the commit.
    pub fn render(&self, element: Element) -> Result<(), NodeError> {
        self.act(|| self.root.render(element))
    }

    /// Serialized content of the container.
    pub fn inner_html(&self) -> String {
        self.root
            .with_applier(|applier| applier.inner_html(self.container))
    }

    /// Elements with `tag` under the container, in document order.
    pub fn query_all(&self, tag: &str) -> Vec<NodeId> {
        self.root
            .with_applier(|applier| applier.find_by_tag(self.container, tag))
    }

    /// Dispatch a click on `target` and wait for the resulting passes.
    pub fn click(&self, target: NodeId) -> Result<(), NodeError> {
        self.act(|| {
            self.dispatch(target, "click");
        })
    }

    /// Dispatch an event without waiting. Returns how many listeners ran.
    pub fn dispatch(&self, target: NodeId, event: &str) -> usize {
        self.root
            .with_applier(|applier| applier.dispatch_event(target, event))
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        self.root.with_applier(|applier| applier.take_mutations())
    }

    pub fn fiber_count(&self) -> usize {
        self.root.fiber_count()
    }

    /// Indented dump of the container, handy in assertion messages.
    pub fn dump_tree(&self) -> String {
        self.root
            .with_applier(|applier| applier.dump_tree(Some(self.container)))
    }
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestRoot`.
pub fn run_test_root<R>(f: impl FnOnce(&TestRoot) -> R) -> R {
    let root = TestRoot::new();
    f(&root)
}
