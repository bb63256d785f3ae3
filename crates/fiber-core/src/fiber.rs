//! Fiber records and the arena that owns them.
//!
//! Tree links and the cross-generation `alternate` link are arena indices, so
//! no fiber owns another.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::element::{Component, Element, ElementType, Props};
use crate::hooks::HookRecord;
use crate::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(usize);

/// What a fiber stands for. Drives dispatch in the work loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FiberKind {
    /// Synthetic top-level fiber whose instance is the container.
    Root,
    Host(Rc<str>),
    Text,
    Component(Component),
}

impl FiberKind {
    pub fn matches(&self, element: &ElementType) -> bool {
        match (self, element) {
            (FiberKind::Host(tag), ElementType::Host(other)) => tag == other,
            (FiberKind::Text, ElementType::Text) => true,
            (FiberKind::Component(component), ElementType::Component(other)) => component == other,
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FiberKind::Text)
    }
}

impl From<&ElementType> for FiberKind {
    fn from(kind: &ElementType) -> Self {
        match kind {
            ElementType::Host(tag) => FiberKind::Host(Rc::clone(tag)),
            ElementType::Text => FiberKind::Text,
            ElementType::Component(component) => FiberKind::Component(component.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectTag {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

#[derive(Debug)]
pub struct Fiber {
    pub kind: FiberKind,
    pub props: Rc<Props>,
    pub instance: Option<NodeId>,
    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub alternate: Option<FiberId>,
    pub effect: EffectTag,
    pub(crate) hooks: Vec<HookRecord>,
}

impl Fiber {
    pub(crate) fn root(container: NodeId, props: Rc<Props>, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            props,
            instance: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate,
            effect: EffectTag::None,
            hooks: Vec::new(),
        }
    }

    pub(crate) fn from_element(element: &Element, parent: FiberId) -> Self {
        Self {
            kind: FiberKind::from(element.kind()),
            props: Rc::clone(element.props()),
            instance: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect: EffectTag::Placement,
            hooks: Vec::new(),
        }
    }
}

/// Index-addressed fiber storage with slot reuse.
#[derive(Debug, Default)]
pub struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<usize>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, fiber: Fiber) -> FiberId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(fiber);
                FiberId(index)
            }
            None => {
                self.slots.push(Some(fiber));
                FiberId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn release(&mut self, id: FiberId) -> Option<Fiber> {
        let fiber = self.slots.get_mut(id.0).and_then(Option::take);
        if fiber.is_some() {
            self.free.push(id.0);
        }
        fiber
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fibers of the subtree rooted at `root` in pre-order.
    pub fn subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let mut children = Vec::new();
            let mut child = self[id].child;
            while let Some(current) = child {
                children.push(current);
                child = self[current].sibling;
            }
            stack.extend(children.into_iter().rev());
        }
        order
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("fiber {id:?} was released"),
        }
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        match self.slots.get_mut(id.0).and_then(Option::as_mut) {
            Some(fiber) => fiber,
            None => panic!("fiber {id:?} was released"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{make_node, text};

    #[test]
    fn released_slots_are_reused() {
        let mut arena = FiberArena::new();
        let root = arena.alloc(Fiber::root(0, Rc::new(Props::new()), None));
        let child = arena.alloc(Fiber::from_element(&text("a"), root));
        assert_eq!(arena.len(), 2);

        assert!(arena.release(child).is_some());
        assert!(arena.release(child).is_none());
        assert_eq!(arena.len(), 1);

        let reused = arena.alloc(Fiber::from_element(&text("b"), root));
        assert_eq!(reused, child);
    }

    #[test]
    fn subtree_is_preorder() {
        let mut arena = FiberArena::new();
        let root = arena.alloc(Fiber::root(0, Rc::new(Props::new()), None));
        let div = make_node("div", Props::new(), Vec::<&str>::new());
        let a = arena.alloc(Fiber::from_element(&div, root));
        let a1 = arena.alloc(Fiber::from_element(&text("a1"), a));
        let b = arena.alloc(Fiber::from_element(&div, root));
        arena[root].child = Some(a);
        arena[a].sibling = Some(b);
        arena[a].child = Some(a1);

        assert_eq!(arena.subtree(root), vec![root, a, a1, b]);
    }

    #[test]
    fn kind_matching_compares_type_tags() {
        let host = FiberKind::Host(Rc::from("div"));
        assert!(host.matches(&ElementType::from("div")));
        assert!(!host.matches(&ElementType::from("span")));
        assert!(!host.matches(&ElementType::Text));
        assert!(FiberKind::Text.matches(&ElementType::Text));
    }
}
