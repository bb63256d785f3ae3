//! Positional hook storage for function components.
//!
//! A [`HookScope`] is handed to a component's render function by the work
//! loop. Every hook call consumes the next slot; the record found at the same
//! slot in the previous generation seeds this generation's value. Slot
//! identity is purely positional, so hooks must be called in the same order
//! on every render.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::runtime::RuntimeHandle;

/// A queued state change.
pub enum Action<T> {
    Replace(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Action<T> {
    fn apply(self, current: T) -> T {
        match self {
            Action::Replace(value) => value,
            Action::Update(f) => f(&current),
        }
    }
}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(_) => f.write_str("Action::Replace"),
            Action::Update(_) => f.write_str("Action::Update"),
        }
    }
}

struct SetStateInner<T> {
    queue: RefCell<VecDeque<Action<T>>>,
    runtime: RuntimeHandle,
}

/// Update function returned by [`HookScope::use_state`].
///
/// The same `SetState` is returned on every render of its slot, so it can be
/// stored and compared across renders. Each call enqueues an action and asks
/// the root for a new pass; the action is folded in when that pass renders
/// the component.
pub struct SetState<T> {
    inner: Rc<SetStateInner<T>>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for SetState<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for SetState<T> {}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("pending", &self.inner.queue.borrow().len())
            .finish()
    }
}

impl<T: 'static> SetState<T> {
    fn new(runtime: RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(SetStateInner {
                queue: RefCell::new(VecDeque::new()),
                runtime,
            }),
        }
    }

    /// Replace the state with `value` on the next pass.
    pub fn set(&self, value: T) {
        self.dispatch(Action::Replace(value));
    }

    /// Compute the next state from the previous one on the next pass.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.dispatch(Action::Update(Box::new(f)));
    }

    pub fn dispatch(&self, action: Action<T>) {
        if !self.inner.runtime.is_alive() {
            log::warn!("state update dropped: its root no longer exists");
            return;
        }
        self.inner.queue.borrow_mut().push_back(action);
        self.inner.runtime.request_rerender();
    }

    pub fn pending_len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Applies every queued action to `value`. The flag reports whether any
    /// action was consumed.
    fn fold(&self, mut value: T) -> (T, bool) {
        let mut consumed = false;
        loop {
            // the borrow must end before the action runs; actions may enqueue more
            let next = self.inner.queue.borrow_mut().pop_front();
            match next {
                Some(action) => {
                    value = action.apply(value);
                    consumed = true;
                }
                None => return (value, consumed),
            }
        }
    }

    /// Puts a folded value back at the head of the queue so the next pass
    /// starts from it.
    fn requeue(&self, value: T) {
        self.inner
            .queue
            .borrow_mut()
            .push_front(Action::Replace(value));
    }
}

/// Dispatcher returned by [`HookScope::use_reducer`].
pub struct Dispatch<T, A> {
    set_state: SetState<T>,
    reducer: Rc<dyn Fn(&T, A) -> T>,
}

impl<T, A> Clone for Dispatch<T, A> {
    fn clone(&self) -> Self {
        Self {
            set_state: self.set_state.clone(),
            reducer: Rc::clone(&self.reducer),
        }
    }
}

impl<T, A> fmt::Debug for Dispatch<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("set_state", &self.set_state)
            .finish()
    }
}

impl<T: 'static, A: 'static> Dispatch<T, A> {
    pub fn dispatch(&self, action: A) {
        let reducer = Rc::clone(&self.reducer);
        self.set_state
            .update(move |previous| reducer(previous, action));
    }

    pub fn set_state(&self) -> &SetState<T> {
        &self.set_state
    }
}

struct StateSlot<T> {
    value: T,
    set_state: SetState<T>,
    /// Queued actions were consumed to produce `value`.
    folded: bool,
}

trait Slot {
    fn as_any(&self) -> &dyn Any;
    fn restore_queue(&self);
}

impl<T: Clone + 'static> Slot for StateSlot<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn restore_queue(&self) {
        if self.folded {
            self.set_state.requeue(self.value.clone());
        }
    }
}

/// One type-erased hook slot of a fiber.
pub(crate) struct HookRecord {
    slot: Box<dyn Slot>,
}

impl HookRecord {
    /// Returns updates consumed by an uncommitted render to their queue.
    pub(crate) fn restore_queue(&self) {
        self.slot.restore_queue();
    }
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HookRecord")
    }
}

/// Hook access for one render of one function component.
pub struct HookScope<'a> {
    component: &'static str,
    previous: &'a [HookRecord],
    records: Vec<HookRecord>,
    runtime: RuntimeHandle,
}

impl<'a> HookScope<'a> {
    pub(crate) fn new(
        component: &'static str,
        previous: &'a [HookRecord],
        runtime: RuntimeHandle,
    ) -> Self {
        Self {
            component,
            previous,
            records: Vec::with_capacity(previous.len()),
            runtime,
        }
    }

    /// Name of the component being rendered.
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// State slot. `initial` is used only on the first render of this slot.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, SetState<T>) {
        let index = self.records.len();
        let (value, set_state) = match self.previous.get(index) {
            Some(record) => {
                let Some(slot) = record.slot.as_any().downcast_ref::<StateSlot<T>>() else {
                    panic!(
                        "hook slot {index} of `{}` changed type between renders; \
                         hooks must be called in the same order on every render",
                        self.component
                    );
                };
                (slot.value.clone(), slot.set_state.clone())
            }
            None => (initial, SetState::new(self.runtime.clone())),
        };
        let (value, folded) = set_state.fold(value);
        self.records.push(HookRecord {
            slot: Box::new(StateSlot {
                value: value.clone(),
                set_state: set_state.clone(),
                folded,
            }),
        });
        (value, set_state)
    }

    /// Reducer slot built on [`HookScope::use_state`].
    pub fn use_reducer<T: Clone + 'static, A: 'static>(
        &mut self,
        reducer: impl Fn(&T, A) -> T + 'static,
        initial: T,
    ) -> (T, Dispatch<T, A>) {
        let (value, set_state) = self.use_state(initial);
        (
            value,
            Dispatch {
                set_state,
                reducer: Rc::new(reducer),
            },
        )
    }

    pub(crate) fn finish(self) -> Vec<HookRecord> {
        if !self.previous.is_empty() && self.previous.len() != self.records.len() {
            panic!(
                "`{}` called {} hooks but its previous render called {}; \
                 hooks must not be called conditionally",
                self.component,
                self.records.len(),
                self.previous.len()
            );
        }
        self.records
    }
}
