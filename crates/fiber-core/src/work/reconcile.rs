use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberId};

use super::WorkState;

impl WorkState {
    /// Pairs `elements` with the previous generation's children of `parent`
    /// by position and links the resulting fibers under `parent`.
    ///
    /// Position `i` is only ever compared with old position `i`. A matching
    /// type tag reuses the old host instance (`Update`); anything else is a
    /// `Placement`, and the old fiber at that position, as well as any old
    /// fiber past the end of `elements`, is queued for deletion.
    pub(crate) fn reconcile_children(&mut self, parent: FiberId, elements: &[Element]) {
        let mut old = self.fibers[parent]
            .alternate
            .and_then(|alternate| self.fibers[alternate].child);
        let mut previous: Option<FiberId> = None;

        for element in elements {
            let mut fiber = Fiber::from_element(element, parent);
            match old {
                Some(old_id) if self.fibers[old_id].kind.matches(element.kind()) => {
                    fiber.instance = self.fibers[old_id].instance;
                    fiber.alternate = Some(old_id);
                    fiber.effect = EffectTag::Update;
                }
                Some(old_id) => self.mark_deletion(old_id),
                None => {}
            }
            old = old.and_then(|old_id| self.fibers[old_id].sibling);

            let id = self.fibers.alloc(fiber);
            match previous {
                Some(previous) => self.fibers[previous].sibling = Some(id),
                None => self.fibers[parent].child = Some(id),
            }
            previous = Some(id);
        }

        while let Some(old_id) = old {
            self.mark_deletion(old_id);
            old = self.fibers[old_id].sibling;
        }
    }

    fn mark_deletion(&mut self, id: FiberId) {
        self.fibers[id].effect = EffectTag::Deletion;
        self.deletions.push(id);
    }
}
