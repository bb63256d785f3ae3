use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::task::Waker;

use crate::element::Element;
use crate::platform::{IdleCallback, RuntimeScheduler};

/// What the next pass should render.
#[derive(Debug, Clone)]
pub enum RenderRequest {
    /// Render a new top-level description.
    Render(Element),
    /// Re-render the committed description, folding queued state updates.
    Rerender,
}

pub(crate) type Driver = Rc<dyn Fn()>;

struct RuntimeInner {
    scheduler: Rc<dyn RuntimeScheduler>,
    pending: RefCell<Option<RenderRequest>>,
    callback_requested: Cell<bool>,
    driver: RefCell<Option<Driver>>,
    settle_wakers: RefCell<Vec<Waker>>,
}

impl RuntimeInner {
    fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            pending: RefCell::new(None),
            callback_requested: Cell::new(false),
            driver: RefCell::new(None),
            settle_wakers: RefCell::new(Vec::new()),
        }
    }

    fn request_render(&self, element: Element) {
        *self.pending.borrow_mut() = Some(RenderRequest::Render(element));
        self.request_work();
    }

    fn request_rerender(&self) {
        {
            let mut pending = self.pending.borrow_mut();
            // a pending full render already re-runs every component
            if pending.is_none() {
                *pending = Some(RenderRequest::Rerender);
            }
        }
        self.request_work();
    }

    fn request_work(&self) {
        if self.callback_requested.get() {
            return;
        }
        let driver = self.driver.borrow().clone();
        if let Some(driver) = driver {
            self.callback_requested.set(true);
            let callback: IdleCallback = Box::new(move || driver());
            self.scheduler.request_idle_callback(callback);
        }
    }

    fn take_request(&self) -> Option<RenderRequest> {
        self.pending.borrow_mut().take()
    }

    fn has_request(&self) -> bool {
        self.pending.borrow().is_some()
    }

    fn wake_settled(&self) {
        let wakers: Vec<Waker> = self.settle_wakers.borrow_mut().drain(..).collect();
        for waker in wakers {
            waker.wake();
        }
    }
}

/// Shared scheduling state of one root: the pending render request and the
/// outstanding idle callback.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Rc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn has_request(&self) -> bool {
        self.inner.has_request()
    }

    pub(crate) fn install_driver(&self, driver: Driver) {
        *self.inner.driver.borrow_mut() = Some(driver);
    }

    pub(crate) fn request_render(&self, element: Element) {
        self.inner.request_render(element);
    }

    pub(crate) fn request_work(&self) {
        self.inner.request_work();
    }

    pub(crate) fn take_request(&self) -> Option<RenderRequest> {
        self.inner.take_request()
    }

    /// Marks the outstanding idle callback as consumed.
    pub(crate) fn callback_fired(&self) {
        self.inner.callback_requested.set(false);
    }

    pub(crate) fn register_settle_waker(&self, waker: &Waker) {
        let mut wakers = self.inner.settle_wakers.borrow_mut();
        if !wakers.iter().any(|existing| existing.will_wake(waker)) {
            wakers.push(waker.clone());
        }
    }

    pub(crate) fn wake_settled(&self) {
        self.inner.wake_settled();
    }
}

/// Weak handle held by state setters. It never keeps a root alive.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Ask for a pass that re-renders the committed description.
    pub fn request_rerender(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_rerender();
        }
    }

    pub fn has_request(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_request())
            .unwrap_or(false)
    }
}

/// Scheduler that drops every callback. Roots built on it run their passes
/// when awaited or on [`Root::flush`](crate::Root::flush).
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn request_idle_callback(&self, _callback: IdleCallback) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    callbacks: RefCell<std::collections::VecDeque<IdleCallback>>,
}

#[cfg(test)]
impl TestScheduler {
    pub fn pending(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn run_next(&self) -> bool {
        let next = self.callbacks.borrow_mut().pop_front();
        match next {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn request_idle_callback(&self, callback: IdleCallback) {
        self.callbacks.borrow_mut().push_back(callback);
    }
}
