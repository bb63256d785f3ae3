//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for `fiber-core`.
//! Idle callbacks are queued in order and run by the host loop through
//! [`StdScheduler::run_next`], [`StdScheduler::run_until_idle`] or a time
//! budgeted [`StdScheduler::run_for`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fiber_core::{Applier, IdleCallback, NodeId, Root, RuntimeScheduler};

/// Single-threaded FIFO scheduler for idle callbacks.
pub struct StdScheduler {
    callbacks: RefCell<VecDeque<IdleCallback>>,
    idle_requested: Cell<bool>,
    idle_waker: RefCell<Option<Rc<dyn Fn() + 'static>>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            callbacks: RefCell::new(VecDeque::new()),
            idle_requested: Cell::new(false),
            idle_waker: RefCell::new(None),
        }
    }

    /// Returns whether a callback has been requested since the last call.
    pub fn take_idle_request(&self) -> bool {
        self.idle_requested.replace(false)
    }

    /// Registers a waker invoked whenever a callback is queued.
    pub fn set_idle_waker(&self, waker: impl Fn() + 'static) {
        *self.idle_waker.borrow_mut() = Some(Rc::new(waker));
    }

    /// Clears any registered idle waker.
    pub fn clear_idle_waker(&self) {
        *self.idle_waker.borrow_mut() = None;
    }

    pub fn pending(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Runs the oldest queued callback. Returns `false` if none was queued.
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

    /// Runs callbacks, including ones queued while running, until the queue
    /// is empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        log::trace!("ran {ran} idle callbacks until idle");
        ran
    }

    /// Runs callbacks until the queue is empty or `budget` has elapsed. At
    /// least one queued callback always runs.
    pub fn run_for(&self, budget: Duration) -> usize {
        let deadline = Instant::now() + budget;
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
            if Instant::now() >= deadline {
                break;
            }
        }
        log::trace!(
            "ran {ran} idle callbacks within {budget:?}, {} left",
            self.pending()
        );
        ran
    }

    fn wake(&self) {
        let waker = self.idle_waker.borrow().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("pending", &self.pending())
            .field("idle_requested", &self.idle_requested.get())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn request_idle_callback(&self, callback: IdleCallback) {
        self.callbacks.borrow_mut().push_back(callback);
        self.idle_requested.set(true);
        self.wake();
    }
}

/// Convenience container owning the standard scheduler.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Rc<StdScheduler>,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        Self {
            scheduler: Rc::new(StdScheduler::default()),
        }
    }

    /// Returns the scheduler implementation.
    pub fn scheduler(&self) -> Rc<StdScheduler> {
        Rc::clone(&self.scheduler)
    }

    /// Creates a root driven by this runtime's idle callbacks.
    pub fn create_root<A: Applier + 'static>(&self, applier: A, container: NodeId) -> Root<A> {
        Root::with_scheduler(applier, container, self.scheduler.clone())
    }

    /// Returns whether a callback was requested since the last poll.
    pub fn take_idle_request(&self) -> bool {
        self.scheduler.take_idle_request()
    }

    /// Registers a waker to be called when a root requests an idle callback.
    pub fn set_idle_waker(&self, waker: impl Fn() + 'static) {
        self.scheduler.set_idle_waker(waker);
    }

    /// Clears any previously registered idle waker.
    pub fn clear_idle_waker(&self) {
        self.scheduler.clear_idle_waker();
    }

    pub fn run_until_idle(&self) -> usize {
        self.scheduler.run_until_idle()
    }

    pub fn run_for(&self, budget: Duration) -> usize {
        self.scheduler.run_for(budget)
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
