//! In-memory host tree.
//!
//! [`MemoryApplier`] is a DOM-like host used by tests, benchmarks and the
//! demo. Every mutation the committer applies is also appended to a log so
//! callers can assert exactly what a commit did.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::collections::ListenerMap;
use crate::element::{Event, EventHandler};
use crate::{Applier, InstanceKind, NodeError, NodeId};

/// One recorded host mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Create { id: NodeId, kind: String },
    SetAttribute { id: NodeId, name: String, value: String },
    RemoveAttribute { id: NodeId, name: String },
    AddListener { id: NodeId, event: String },
    RemoveListener { id: NodeId, event: String },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
    SetText { id: NodeId, value: String },
}

impl Mutation {
    /// Creation or attachment changes.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Mutation::Create { .. } | Mutation::AppendChild { .. } | Mutation::RemoveChild { .. }
        )
    }

    /// Attribute, listener or text content changes.
    pub fn is_property(&self) -> bool {
        !self.is_structural()
    }
}

#[derive(Default)]
struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    listeners: ListenerMap,
    children: Vec<NodeId>,
}

enum NodeData {
    Element(ElementData),
    Text(String),
}

struct MemoryNode {
    parent: Option<NodeId>,
    data: NodeData,
}

#[derive(Default)]
pub struct MemoryApplier {
    nodes: Vec<Option<MemoryNode>>,
    mutations: Vec<Mutation>,
}

impl MemoryApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached element, typically used as a root container. Not
    /// recorded in the mutation log.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(NodeData::Element(ElementData {
            tag: tag.to_owned(),
            ..ElementData::default()
        }))
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode { parent: None, data }));
        id
    }

    fn node(&self, id: NodeId) -> Result<&MemoryNode, NodeError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(NodeError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    fn element(&self, id: NodeId) -> Result<&ElementData, NodeError> {
        match &self.node(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(NodeError::TypeMismatch {
                id,
                expected: "element",
            }),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, NodeError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(NodeError::TypeMismatch {
                id,
                expected: "element",
            }),
        }
    }

    /// Number of live nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).ok().map(|element| element.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).ok()?.data {
            NodeData::Text(value) => Some(value),
            NodeData::Element(_) => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()?
            .attributes
            .get(name)
            .map(String::as_str)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.element(id)
            .map(|element| element.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    /// Listeners registered for `event` on `id`, in registration order.
    pub fn listeners(&self, id: NodeId, event: &str) -> Vec<EventHandler> {
        self.element(id)
            .ok()
            .and_then(|element| element.listeners.get(event).cloned())
            .unwrap_or_default()
    }

    /// Invokes every listener for `event` on `id`. The handlers are cloned out
    /// first, so they may freely schedule state updates.
    pub fn dispatch_event(&self, id: NodeId, event: &str) -> usize {
        let handlers = self.listeners(id, event);
        let payload = Event {
            name: event.to_owned(),
            target: id,
        };
        for handler in &handlers {
            handler.call(&payload);
        }
        handlers.len()
    }

    /// Descendants of `root` with the given tag, in document order.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if self.tag(id) == Some(tag) {
                found.push(id);
            }
            stack.extend(self.children(id).into_iter().rev());
        }
        found
    }

    /// Serialized children of `id`, like a DOM `innerHTML`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        for child in self.children(id) {
            self.write_html(&mut output, child);
        }
        output
    }

    /// Serialized node including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.write_html(&mut output, id);
        output
    }

    fn write_html(&self, output: &mut String, id: NodeId) {
        let Ok(node) = self.node(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(value) => escape_into(output, value, false),
            NodeData::Element(element) => {
                output.push('<');
                output.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    let _ = write!(output, " {name}=\"");
                    escape_into(output, value, true);
                    output.push('"');
                }
                output.push('>');
                for child in &element.children {
                    self.write_html(output, *child);
                }
                let _ = write!(output, "</{}>", element.tag);
            }
        }
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id).map(|node| &node.data) {
            Ok(NodeData::Element(element)) => {
                let _ = writeln!(output, "{indent}[{id}] <{}>", element.tag);
                for child in &element.children {
                    self.dump_node(output, *child, depth + 1);
                }
            }
            Ok(NodeData::Text(value)) => {
                let _ = writeln!(output, "{indent}[{id}] {value:?}");
            }
            Err(_) => {
                let _ = writeln!(output, "{indent}[{id}] (missing)");
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        if let NodeData::Element(element) = node.data {
            for child in element.children {
                self.release(child);
            }
        }
    }
}

fn escape_into(output: &mut String, value: &str, attribute: bool) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' if !attribute => output.push_str("&lt;"),
            '>' if !attribute => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            other => output.push(other),
        }
    }
}

impl Applier for MemoryApplier {
    fn create_instance(&mut self, kind: InstanceKind<'_>) -> Result<NodeId, NodeError> {
        let (data, label) = match kind {
            InstanceKind::Element(tag) => (
                NodeData::Element(ElementData {
                    tag: tag.to_owned(),
                    ..ElementData::default()
                }),
                tag.to_owned(),
            ),
            InstanceKind::Text => (NodeData::Text(String::new()), "#text".to_owned()),
        };
        let id = self.insert(data);
        self.mutations.push(Mutation::Create { id, kind: label });
        Ok(id)
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), NodeError> {
        self.element_mut(id)?
            .attributes
            .insert(name.to_owned(), value.to_owned());
        self.mutations.push(Mutation::SetAttribute {
            id,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), NodeError> {
        self.element_mut(id)?.attributes.shift_remove(name);
        self.mutations.push(Mutation::RemoveAttribute {
            id,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn add_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError> {
        self.element_mut(id)?
            .listeners
            .entry(event.to_owned())
            .or_default()
            .push(handler.clone());
        self.mutations.push(Mutation::AddListener {
            id,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        id: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError> {
        if let Some(handlers) = self.element_mut(id)?.listeners.get_mut(event) {
            handlers.retain(|existing| existing != handler);
        }
        self.mutations.push(Mutation::RemoveListener {
            id,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.element(parent)?;
        let previous_parent = self.node(child)?.parent;
        if let Some(previous) = previous_parent {
            if let Ok(element) = self.element_mut(previous) {
                element.children.retain(|existing| *existing != child);
            }
        }
        self.element_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let element = self.element_mut(parent)?;
        let Some(position) = element.children.iter().position(|id| *id == child) else {
            return Err(NodeError::NotAChild { parent, child });
        };
        element.children.remove(position);
        self.release(child);
        self.mutations.push(Mutation::RemoveChild { parent, child });
        Ok(())
    }

    fn set_text(&mut self, id: NodeId, value: &str) -> Result<(), NodeError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(text) => {
                text.clear();
                text.push_str(value);
            }
            NodeData::Element(_) => {
                return Err(NodeError::TypeMismatch { id, expected: "text" });
            }
        }
        self.mutations.push(Mutation::SetText {
            id,
            value: value.to_owned(),
        });
        Ok(())
    }

    fn contains_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.element(parent)
            .map(|element| element.children.contains(&child))
            .unwrap_or(false)
    }
}
