//! Render roots: one container, one applier, one runtime.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::element::Element;
use crate::platform::RuntimeScheduler;
use crate::runtime::{DefaultScheduler, Driver, Runtime, RuntimeHandle};
use crate::work::{Step, WorkState};
use crate::{Applier, NodeError, NodeId};

struct RootInner<A: Applier> {
    runtime: Runtime,
    work: RefCell<WorkState>,
    applier: RefCell<A>,
    container: NodeId,
    error: RefCell<Option<NodeError>>,
    /// No scheduler runs idle callbacks; passes run when the root is awaited
    /// or flushed.
    self_driven: bool,
}

impl<A: Applier> RootInner<A> {
    fn run_step(&self) -> Result<Step, NodeError> {
        let mut work = self.work.borrow_mut();
        let mut applier = self.applier.borrow_mut();
        let handle = self.runtime.handle();
        let result = work.step(
            || self.runtime.take_request(),
            self.container,
            &mut *applier,
            &handle,
        );
        if let Err(err) = &result {
            log::error!("render pass abandoned: {err}");
            work.abandon();
        }
        result
    }

    /// Body of every idle callback.
    fn on_idle(&self) {
        self.runtime.callback_fired();
        match self.run_step() {
            Ok(Step::Working) => self.runtime.request_work(),
            Ok(Step::Idle) | Ok(Step::Committed) => self.after_pass(),
            Err(err) => {
                *self.error.borrow_mut() = Some(err);
                self.after_pass();
            }
        }
    }

    fn after_pass(&self) {
        if self.runtime.has_request() {
            self.runtime.request_work();
        } else {
            self.runtime.wake_settled();
        }
    }

    fn is_settled(&self) -> bool {
        !self.work.borrow().in_flight() && !self.runtime.has_request()
    }

    /// Runs steps until nothing is in flight or requested.
    fn drain(&self) -> Result<(), NodeError> {
        if let Some(err) = self.error.borrow_mut().take() {
            return Err(err);
        }
        while self.run_step()? != Step::Idle {}
        self.runtime.wake_settled();
        Ok(())
    }
}

/// Entry point binding a container instance to a reconciler.
///
/// Cloning a `Root` yields another handle to the same root.
pub struct Root<A: Applier + 'static> {
    inner: Rc<RootInner<A>>,
}

impl<A: Applier + 'static> Clone for Root<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Creates a root over `container` with no idle scheduler. Its passes run
/// when a [`Settled`] future from [`Root::act`] is polled, or on
/// [`Root::flush`].
pub fn create_root<A: Applier + 'static>(applier: A, container: NodeId) -> Root<A> {
    Root::new(applier, container)
}

impl<A: Applier + 'static> Root<A> {
    pub fn new(applier: A, container: NodeId) -> Self {
        Self::build(applier, container, Rc::new(DefaultScheduler), true)
    }

    /// Creates a root whose passes run one unit of work per idle callback
    /// of `scheduler`.
    ///
    /// The scheduler must not run a callback from inside
    /// `request_idle_callback`.
    pub fn with_scheduler(
        applier: A,
        container: NodeId,
        scheduler: Rc<dyn RuntimeScheduler>,
    ) -> Self {
        Self::build(applier, container, scheduler, false)
    }

    fn build(
        applier: A,
        container: NodeId,
        scheduler: Rc<dyn RuntimeScheduler>,
        self_driven: bool,
    ) -> Self {
        let inner = Rc::new(RootInner {
            runtime: Runtime::new(scheduler),
            work: RefCell::new(WorkState::new()),
            applier: RefCell::new(applier),
            container,
            error: RefCell::new(None),
            self_driven,
        });
        let weak = Rc::downgrade(&inner);
        let driver: Driver = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_idle();
            }
        });
        inner.runtime.install_driver(driver);
        Self { inner }
    }

    /// Requests a pass rendering `element` into the container. A later call
    /// before the pass starts replaces this one.
    pub fn render(&self, element: Element) {
        log::debug!("render requested");
        self.inner.runtime.request_render(element);
    }

    /// Runs `f` and returns a future that resolves once every pass it
    /// caused has committed. On a root from [`create_root`] the passes run
    /// inside `poll`.
    pub fn act(&self, f: impl FnOnce()) -> Settled<A> {
        f();
        Settled {
            root: Rc::clone(&self.inner),
        }
    }

    /// Runs passes synchronously until the root is settled.
    pub fn flush(&self) -> Result<(), NodeError> {
        self.inner.drain()
    }

    /// No pass in flight and none requested.
    pub fn is_settled(&self) -> bool {
        self.inner.is_settled()
    }

    pub fn container(&self) -> NodeId {
        self.inner.container
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.inner.runtime.handle()
    }

    /// Borrows the applier. Must not be called from inside a component
    /// render.
    pub fn with_applier<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.inner.applier.borrow_mut())
    }

    /// Live fibers across the committed and in-flight generations.
    pub fn fiber_count(&self) -> usize {
        self.inner.work.borrow().fibers.len()
    }

    /// Error recorded by the last failed idle pass, if not yet observed.
    pub fn take_error(&self) -> Option<NodeError> {
        self.inner.error.borrow_mut().take()
    }
}

/// Resolves when the root is settled. Yields the error of a failed pass.
pub struct Settled<A: Applier + 'static> {
    root: Rc<RootInner<A>>,
}

impl<A: Applier + 'static> Future for Settled<A> {
    type Output = Result<(), NodeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let root = &self.root;
        if root.self_driven {
            return Poll::Ready(root.drain());
        }
        if let Some(err) = root.error.borrow_mut().take() {
            return Poll::Ready(Err(err));
        }
        if root.is_settled() {
            return Poll::Ready(Ok(()));
        }
        root.runtime.register_settle_waker(cx.waker());
        Poll::Pending
    }
}

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod tests;
