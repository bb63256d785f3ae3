#![doc = r"Core runtime for a fiber-based incremental tree reconciler."]

pub mod collections;
pub mod diff;
pub mod element;
mod fiber;
pub mod hooks;
pub mod memory;
pub mod platform;
pub mod root;
pub mod runtime;
mod work;

pub use element::{
    make_node, text, Child, Component, Element, ElementType, Event, EventHandler, PropValue,
    Props,
};
pub use hooks::{Action, Dispatch, HookScope, SetState};
pub use memory::{MemoryApplier, Mutation};
pub use platform::{IdleCallback, RuntimeScheduler};
pub use root::{create_root, Root, Settled};
pub use runtime::{DefaultScheduler, RenderRequest, Runtime, RuntimeHandle};

#[cfg(test)]
pub use runtime::TestScheduler;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    TypeMismatch { id: NodeId, expected: &'static str },
    NotAChild { parent: NodeId, child: NodeId },
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "node {id} missing"),
            NodeError::TypeMismatch { id, expected } => {
                write!(f, "node {id} type mismatch; expected {expected}")
            }
            NodeError::NotAChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
        }
    }
}

impl std::error::Error for NodeError {}

/// Kind of host instance to create.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstanceKind<'a> {
    Element(&'a str),
    Text,
}

/// Host-mutation interface. The committer is the only caller of the
/// mutating methods; the work loop only creates detached instances.
pub trait Applier {
    fn create_instance(&mut self, kind: InstanceKind<'_>) -> Result<NodeId, NodeError>;
    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), NodeError>;
    fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), NodeError>;
    fn add_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError>;
    fn remove_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError>;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;
    fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), NodeError>;
    fn contains_child(&self, parent: NodeId, child: NodeId) -> bool;
}
