use crate::diff::{diff_props, PropChange};
use crate::element::Props;
use crate::fiber::{EffectTag, FiberId};
use crate::{Applier, NodeError, NodeId};

use super::WorkState;

fn apply_changes(
    applier: &mut dyn Applier,
    instance: NodeId,
    changes: Vec<PropChange<'_>>,
) -> Result<(), NodeError> {
    for change in changes {
        match change {
            PropChange::RemoveListener { event, handler } => {
                applier.remove_listener(instance, &event, handler)?
            }
            PropChange::RemoveAttribute { name } => applier.remove_attribute(instance, name)?,
            PropChange::SetAttribute { name, value } => {
                applier.set_attribute(instance, name, &value)?
            }
            PropChange::SetText { value } => applier.set_text(instance, &value)?,
            PropChange::AddListener { event, handler } => {
                applier.add_listener(instance, &event, handler)?
            }
        }
    }
    Ok(())
}

impl WorkState {
    /// Applies the finished pass to the host and promotes it to current.
    ///
    /// Runs as one step; nothing can observe the host between the first
    /// deletion and the promotion.
    pub(crate) fn commit_root(&mut self, applier: &mut dyn Applier) -> Result<(), NodeError> {
        let Some(root) = self.wip_root else {
            return Ok(());
        };

        let deletions = std::mem::take(&mut self.deletions);
        for &id in &deletions {
            self.commit_deletion(id, applier)?;
        }

        let order = self.fibers.subtree(root);
        for &id in order.iter().skip(1) {
            self.commit_work(id, applier)?;
        }

        self.promote(root, &order);
        log::debug!(
            "committed {root:?}: {} fibers, {} deletions",
            order.len(),
            deletions.len()
        );
        Ok(())
    }

    fn commit_work(&self, id: FiberId, applier: &mut dyn Applier) -> Result<(), NodeError> {
        let fiber = &self.fibers[id];
        // function components own no instance
        let Some(instance) = fiber.instance else {
            return Ok(());
        };
        let is_text = fiber.kind.is_text();
        match fiber.effect {
            EffectTag::Placement => {
                let empty = Props::new();
                apply_changes(applier, instance, diff_props(&empty, &fiber.props, is_text))?;
                let parent = self
                    .host_parent(id)
                    .ok_or(NodeError::Missing { id: instance })?;
                applier.append_child(parent, instance)?;
            }
            EffectTag::Update => {
                if let Some(alternate) = fiber.alternate {
                    let old = &self.fibers[alternate].props;
                    apply_changes(applier, instance, diff_props(old, &fiber.props, is_text))?;
                }
            }
            EffectTag::None | EffectTag::Deletion => {}
        }
        Ok(())
    }

    fn commit_deletion(&self, id: FiberId, applier: &mut dyn Applier) -> Result<(), NodeError> {
        let parent = match self.host_parent(id) {
            Some(parent) => parent,
            None => return Ok(()),
        };
        self.remove_host_subtree(id, parent, applier)
    }

    /// Removes the topmost host instances under `id` from `parent`, looking
    /// through function components that own none.
    fn remove_host_subtree(
        &self,
        id: FiberId,
        parent: NodeId,
        applier: &mut dyn Applier,
    ) -> Result<(), NodeError> {
        match self.fibers[id].instance {
            Some(instance) => {
                if !applier.contains_child(parent, instance) {
                    return Err(NodeError::NotAChild {
                        parent,
                        child: instance,
                    });
                }
                applier.remove_child(parent, instance)
            }
            None => {
                let mut child = self.fibers[id].child;
                while let Some(current) = child {
                    self.remove_host_subtree(current, parent, applier)?;
                    child = self.fibers[current].sibling;
                }
                Ok(())
            }
        }
    }

    /// Instance of the nearest ancestor that owns one.
    fn host_parent(&self, id: FiberId) -> Option<NodeId> {
        let mut cursor = self.fibers[id].parent;
        while let Some(parent) = cursor {
            if let Some(instance) = self.fibers[parent].instance {
                return Some(instance);
            }
            cursor = self.fibers[parent].parent;
        }
        None
    }

    /// Makes `root` current and releases the previous generation.
    fn promote(&mut self, root: FiberId, order: &[FiberId]) {
        for &id in order {
            let fiber = &mut self.fibers[id];
            fiber.alternate = None;
            fiber.effect = EffectTag::None;
        }
        if let Some(previous) = self.current.replace(root) {
            for id in self.fibers.subtree(previous) {
                self.fibers.release(id);
            }
        }
        self.wip_root = None;
        self.next_unit = None;
    }
}
