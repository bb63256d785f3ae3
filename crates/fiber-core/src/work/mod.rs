//! The resumable render pass.
//!
//! All progress lives in [`WorkState`]: the pending root, the next fiber to
//! process and the deletion list. A pass can therefore stop after any unit of
//! work and resume on the next idle callback without losing anything.

mod commit;
mod reconcile;

use std::rc::Rc;

use crate::element::{Element, Props};
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId, FiberKind};
use crate::hooks::{HookRecord, HookScope};
use crate::runtime::{RenderRequest, RuntimeHandle};
use crate::{Applier, InstanceKind, NodeError, NodeId};

/// Outcome of one scheduling step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    /// Nothing in flight and nothing requested.
    Idle,
    /// One fiber processed; more remain.
    Working,
    /// The pass finished and was committed.
    Committed,
}

#[derive(Debug, Default)]
pub(crate) struct WorkState {
    pub(crate) fibers: FiberArena,
    pub(crate) current: Option<FiberId>,
    pub(crate) wip_root: Option<FiberId>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) deletions: Vec<FiberId>,
}

impl WorkState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_flight(&self) -> bool {
        self.wip_root.is_some()
    }

    /// Builds the synthetic pending root for `request`. Returns `false` when
    /// there is nothing to render.
    pub(crate) fn start_pass(&mut self, request: RenderRequest, container: NodeId) -> bool {
        let props = match request {
            RenderRequest::Render(element) => Rc::new(Props::with_children(vec![element])),
            RenderRequest::Rerender => match self.current {
                Some(current) => Rc::clone(&self.fibers[current].props),
                None => {
                    log::debug!("re-render requested before the first commit; ignored");
                    return false;
                }
            },
        };
        let root = self
            .fibers
            .alloc(Fiber::root(container, props, self.current));
        self.deletions.clear();
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        log::debug!("render pass started at {root:?}");
        true
    }

    /// Processes exactly one fiber and returns the next one in document
    /// order, or `None` when the pending tree is complete.
    pub(crate) fn perform_unit_of_work(
        &mut self,
        id: FiberId,
        applier: &mut dyn Applier,
        runtime: &RuntimeHandle,
    ) -> Result<Option<FiberId>, NodeError> {
        let kind = self.fibers[id].kind.clone();
        let props = Rc::clone(&self.fibers[id].props);
        log::trace!("unit of work {id:?}: {kind:?}");

        let children: Vec<Element> = match &kind {
            FiberKind::Component(component) => {
                let (rendered, hooks) = {
                    let previous: &[HookRecord] = match self.fibers[id].alternate {
                        Some(alternate) => &self.fibers[alternate].hooks[..],
                        None => &[],
                    };
                    let mut scope = HookScope::new(component.name(), previous, runtime.clone());
                    let rendered = component.render(&mut scope, &props);
                    (rendered, scope.finish())
                };
                self.fibers[id].hooks = hooks;
                vec![rendered]
            }
            FiberKind::Host(tag) => {
                if self.fibers[id].instance.is_none() {
                    let instance = applier.create_instance(InstanceKind::Element(tag))?;
                    self.fibers[id].instance = Some(instance);
                }
                props.children().to_vec()
            }
            FiberKind::Text => {
                if self.fibers[id].instance.is_none() {
                    let instance = applier.create_instance(InstanceKind::Text)?;
                    self.fibers[id].instance = Some(instance);
                }
                Vec::new()
            }
            FiberKind::Root => props.children().to_vec(),
        };

        self.reconcile_children(id, &children);
        Ok(self.next_fiber(id))
    }

    /// First child, else the nearest ancestor's unvisited sibling.
    fn next_fiber(&self, id: FiberId) -> Option<FiberId> {
        if let Some(child) = self.fibers[id].child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some(sibling) = self.fibers[current].sibling {
                return Some(sibling);
            }
            cursor = self.fibers[current].parent;
        }
        None
    }

    /// Runs one step: starts a requested pass if idle, processes one fiber,
    /// and commits when the walk is exhausted.
    pub(crate) fn step(
        &mut self,
        request: impl FnOnce() -> Option<RenderRequest>,
        container: NodeId,
        applier: &mut dyn Applier,
        runtime: &RuntimeHandle,
    ) -> Result<Step, NodeError> {
        if !self.in_flight() {
            let Some(request) = request() else {
                return Ok(Step::Idle);
            };
            if !self.start_pass(request, container) {
                return Ok(Step::Idle);
            }
        }
        if let Some(unit) = self.next_unit {
            self.next_unit = self.perform_unit_of_work(unit, applier, runtime)?;
            if self.next_unit.is_some() {
                return Ok(Step::Working);
            }
        }
        self.commit_root(applier)?;
        Ok(Step::Committed)
    }

    /// Drops the in-flight pass after a failure. The committed tree stays
    /// current.
    pub(crate) fn abandon(&mut self) {
        for id in std::mem::take(&mut self.deletions) {
            if let Some(fiber) = self.fibers.get(id) {
                if fiber.effect == EffectTag::Deletion {
                    self.fibers[id].effect = EffectTag::None;
                }
            }
        }
        if let Some(root) = self.wip_root.take() {
            if self.fibers.get(root).is_some() {
                for id in self.fibers.subtree(root) {
                    if let Some(fiber) = self.fibers.release(id) {
                        for record in &fiber.hooks {
                            record.restore_queue();
                        }
                    }
                }
            }
        }
        self.next_unit = None;
    }
}

#[cfg(test)]
#[path = "../tests/work_tests.rs"]
mod tests;
