//! Boundary to the mutable host tree the engine renders into.

use std::fmt;

use indexmap::IndexMap;

use crate::collections::map::HashMap;
use crate::element::NODE_VALUE;
use crate::value::{EventHandler, Value};
use crate::HostError;

/// Host tree capability injected into a [`crate::Root`]. Every operation
/// either succeeds or aborts the current render pass.
pub trait HostTree {
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_node(&mut self, tag: &str) -> Result<Self::Node, HostError>;
    fn create_text_node(&mut self, text: &str) -> Result<Self::Node, HostError>;
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;
    fn replace_child(
        &mut self,
        parent: &Self::Node,
        old_child: &Self::Node,
        new_child: &Self::Node,
    ) -> Result<(), HostError>;
    fn set_property(&mut self, node: &Self::Node, name: &str, value: &Value)
        -> Result<(), HostError>;
    fn clear_property(&mut self, node: &Self::Node, name: &str) -> Result<(), HostError>;
    fn subscribe_event(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
    fn unsubscribe_event(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError>;
}

pub type HostNodeId = usize;

/// One mutation applied to a [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateNode { node: HostNodeId, tag: String },
    CreateText { node: HostNodeId },
    Append { parent: HostNodeId, child: HostNodeId },
    Remove { parent: HostNodeId, child: HostNodeId },
    Replace { parent: HostNodeId, old: HostNodeId, new: HostNodeId },
    SetProperty { node: HostNodeId, name: String },
    ClearProperty { node: HostNodeId, name: String },
    Subscribe { node: HostNodeId, event: String },
    Unsubscribe { node: HostNodeId, event: String },
}

#[derive(Debug, Clone)]
enum MemoryNodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, Value>,
        listeners: HashMap<String, Vec<EventHandler>>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<HostNodeId>,
    children: Vec<HostNodeId>,
}

/// In-memory host tree that records every mutation it receives.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>, // FUTURE(no_std): migrate to arena-backed node storage.
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with a single detached `tag` node to mount into.
    pub fn with_container(tag: &str) -> (Self, HostNodeId) {
        let mut host = Self::new();
        let container = host.push(MemoryNode {
            kind: MemoryNodeKind::Element {
                tag: tag.to_owned(),
                attributes: IndexMap::new(),
                listeners: HashMap::new(),
            },
            parent: None,
            children: Vec::new(),
        });
        (host, container)
    }

    fn push(&mut self, node: MemoryNode) -> HostNodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    fn node(&self, id: HostNodeId) -> Result<&MemoryNode, HostError> {
        self.nodes.get(id).ok_or(HostError::MissingNode {
            node: id.to_string(),
        })
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes.get_mut(id).ok_or(HostError::MissingNode {
            node: id.to_string(),
        })
    }

    fn container_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, HostError> {
        let node = self.node_mut(id)?;
        match node.kind {
            MemoryNodeKind::Element { .. } => Ok(node),
            MemoryNodeKind::Text(_) => Err(HostError::NotAContainer {
                node: id.to_string(),
            }),
        }
    }

    fn child_index(&self, parent: HostNodeId, child: HostNodeId) -> Result<usize, HostError> {
        self.node(parent)?
            .children
            .iter()
            .position(|&candidate| candidate == child)
            .ok_or(HostError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })
    }

    /// Unlinks `child` from whatever parent it currently has.
    fn detach(&mut self, child: HostNodeId) -> Result<(), HostError> {
        if let Some(previous) = self.node(child)?.parent {
            let index = self.child_index(previous, child)?;
            self.node_mut(previous)?.children.remove(index);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Nodes reachable from `root`, `root` included.
    pub fn len_from(&self, root: HostNodeId) -> usize {
        self.node(root)
            .map(|node| {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.len_from(child))
                    .sum::<usize>()
            })
            .unwrap_or(0)
    }

    /// Every node ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Mutations recorded since the last [`MemoryHost::take_ops`].
    pub fn mutation_count(&self) -> usize {
        self.ops.len()
    }

    pub fn children(&self, id: HostNodeId) -> Vec<HostNodeId> {
        self.nodes
            .get(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: HostNodeId) -> Option<HostNodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn tag(&self, id: HostNodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            MemoryNodeKind::Element { tag, .. } => Some(tag),
            MemoryNodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: HostNodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            MemoryNodeKind::Text(text) => Some(text),
            MemoryNodeKind::Element { .. } => None,
        }
    }

    pub fn attribute(&self, id: HostNodeId, name: &str) -> Option<&Value> {
        match &self.nodes.get(id)?.kind {
            MemoryNodeKind::Element { attributes, .. } => attributes.get(name),
            MemoryNodeKind::Text(_) => None,
        }
    }

    pub fn attributes(&self, id: HostNodeId) -> Vec<(String, Value)> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(MemoryNodeKind::Element { attributes, .. }) => attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Handlers currently subscribed to `event` on `id`.
    pub fn listeners(&self, id: HostNodeId, event: &str) -> Vec<EventHandler> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(MemoryNodeKind::Element { listeners, .. }) => {
                listeners.get(event).cloned().unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    /// Concatenated text of every text node under `id`, in document order.
    pub fn text_content(&self, id: HostNodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: HostNodeId, output: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if let MemoryNodeKind::Text(text) = &node.kind {
            output.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, output);
        }
    }

    pub fn dump_tree(&self, root: Option<HostNodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: HostNodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.nodes.get(id) else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
            return;
        };
        match &node.kind {
            MemoryNodeKind::Element {
                tag, attributes, ..
            } => {
                output.push_str(&format!("{indent}<{tag}"));
                for (name, value) in attributes {
                    output.push_str(&format!(" {name}=\"{value}\""));
                }
                output.push_str(">\n");
            }
            MemoryNodeKind::Text(text) => {
                output.push_str(&format!("{indent}{text:?}\n"));
            }
        }
        for &child in &node.children {
            self.dump_node(output, child, depth + 1);
        }
    }
}

impl HostTree for MemoryHost {
    type Node = HostNodeId;

    fn create_node(&mut self, tag: &str) -> Result<HostNodeId, HostError> {
        let node = self.push(MemoryNode {
            kind: MemoryNodeKind::Element {
                tag: tag.to_owned(),
                attributes: IndexMap::new(),
                listeners: HashMap::new(),
            },
            parent: None,
            children: Vec::new(),
        });
        self.ops.push(HostOp::CreateNode {
            node,
            tag: tag.to_owned(),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, text: &str) -> Result<HostNodeId, HostError> {
        let node = self.push(MemoryNode {
            kind: MemoryNodeKind::Text(text.to_owned()),
            parent: None,
            children: Vec::new(),
        });
        self.ops.push(HostOp::CreateText { node });
        Ok(node)
    }

    fn append_child(&mut self, parent: &HostNodeId, child: &HostNodeId) -> Result<(), HostError> {
        let (parent, child) = (*parent, *child);
        self.container_mut(parent)?;
        self.detach(child)?;
        self.container_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.ops.push(HostOp::Append { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: &HostNodeId, child: &HostNodeId) -> Result<(), HostError> {
        let (parent, child) = (*parent, *child);
        let index = self.child_index(parent, child)?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }

    fn replace_child(
        &mut self,
        parent: &HostNodeId,
        old_child: &HostNodeId,
        new_child: &HostNodeId,
    ) -> Result<(), HostError> {
        let (parent, old, new) = (*parent, *old_child, *new_child);
        self.child_index(parent, old)?;
        self.node(new)?;
        self.detach(new)?;
        let index = self.child_index(parent, old)?;
        self.node_mut(parent)?.children[index] = new;
        self.node_mut(old)?.parent = None;
        self.node_mut(new)?.parent = Some(parent);
        self.ops.push(HostOp::Replace { parent, old, new });
        Ok(())
    }

    fn set_property(&mut self, node: &HostNodeId, name: &str, value: &Value) -> Result<(), HostError> {
        let id = *node;
        match &mut self.node_mut(id)?.kind {
            MemoryNodeKind::Text(text) if name == NODE_VALUE => *text = value.to_string(),
            MemoryNodeKind::Text(_) => {
                return Err(HostError::Rejected(format!(
                    "text node {id} has no property `{name}`"
                )))
            }
            MemoryNodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_owned(), value.clone());
            }
        }
        self.ops.push(HostOp::SetProperty {
            node: id,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn clear_property(&mut self, node: &HostNodeId, name: &str) -> Result<(), HostError> {
        let id = *node;
        match &mut self.node_mut(id)?.kind {
            MemoryNodeKind::Text(text) if name == NODE_VALUE => text.clear(),
            MemoryNodeKind::Text(_) => {}
            MemoryNodeKind::Element { attributes, .. } => {
                attributes.shift_remove(name);
            }
        }
        self.ops.push(HostOp::ClearProperty {
            node: id,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn subscribe_event(
        &mut self,
        node: &HostNodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let id = *node;
        match &mut self.node_mut(id)?.kind {
            MemoryNodeKind::Element { listeners, .. } => {
                let entry = listeners.entry(event.to_owned()).or_default();
                // Same-handler subscriptions collapse, as with DOM listeners.
                if !entry.iter().any(|existing| existing.ptr_eq(handler)) {
                    entry.push(handler.clone());
                }
            }
            MemoryNodeKind::Text(_) => {
                return Err(HostError::Rejected(format!(
                    "text node {id} cannot receive `{event}` events"
                )))
            }
        }
        self.ops.push(HostOp::Subscribe {
            node: id,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn unsubscribe_event(
        &mut self,
        node: &HostNodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), HostError> {
        let id = *node;
        if let MemoryNodeKind::Element { listeners, .. } = &mut self.node_mut(id)?.kind {
            if let Some(entry) = listeners.get_mut(event) {
                entry.retain(|existing| !existing.ptr_eq(handler));
                if entry.is_empty() {
                    listeners.remove(event);
                }
            }
        }
        self.ops.push(HostOp::Unsubscribe {
            node: id,
            event: event.to_owned(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
