//! Shadow tree linking rendered elements to host nodes.
//!
//! Instances live in an [`InstanceStore`] arena and refer to each other by
//! [`InstanceId`]. Components hold only an id back to their instance, never a
//! reference, so the tree has a single owner.

use std::fmt;

use crate::component::{Component, Context, FunctionComponent};
use crate::element::Element;
use crate::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The live component object of a class instance together with its context.
pub struct ComponentState {
    pub(crate) component: Box<dyn Component>,
    pub(crate) cx: Context,
}

impl ComponentState {
    pub fn context(&self) -> &Context {
        &self.cx
    }
}

impl fmt::Debug for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentState")
            .field("cx", &self.cx)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum InstanceKind<N> {
    /// Host tag or text element; owns `node`.
    Host { node: N, children: Vec<InstanceId> },
    Function {
        function: FunctionComponent,
        child: InstanceId,
    },
    Class {
        state: ComponentState,
        child: InstanceId,
    },
}

#[derive(Debug)]
pub struct Instance<N> {
    pub(crate) element: Element,
    /// Host node this instance's output is attached under.
    pub(crate) parent: N,
    pub(crate) kind: InstanceKind<N>,
}

impl<N> Instance<N> {
    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn parent(&self) -> &N {
        &self.parent
    }

    pub fn kind(&self) -> &InstanceKind<N> {
        &self.kind
    }

    /// Host children, or the single rendered child of a composite.
    pub fn child_ids(&self) -> Vec<InstanceId> {
        match &self.kind {
            InstanceKind::Host { children, .. } => children.clone(),
            InstanceKind::Function { child, .. } | InstanceKind::Class { child, .. } => {
                vec![*child]
            }
        }
    }

    pub fn component(&self) -> Option<&ComponentState> {
        match &self.kind {
            InstanceKind::Class { state, .. } => Some(state),
            _ => None,
        }
    }
}

/// Arena of instances. Slots are never reused, so a stale id stays missing.
pub struct InstanceStore<N> {
    slots: Vec<Option<Instance<N>>>, // FUTURE(no_std): recycle freed slots behind generation tags.
}

impl<N> Default for InstanceStore<N> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<N: Clone> InstanceStore<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    pub fn get(&self, id: InstanceId) -> Result<&Instance<N>, RenderError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(RenderError::MissingInstance { id })
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Result<&mut Instance<N>, RenderError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(RenderError::MissingInstance { id })
    }

    /// Allocates an empty slot so a component can learn its id before the
    /// instance itself is complete.
    pub(crate) fn reserve(&mut self) -> InstanceId {
        let id = InstanceId(self.slots.len());
        self.slots.push(None);
        id
    }

    pub(crate) fn fill(&mut self, id: InstanceId, instance: Instance<N>) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = Some(instance);
        }
    }

    pub(crate) fn insert(&mut self, instance: Instance<N>) -> InstanceId {
        let id = self.reserve();
        self.fill(id, instance);
        id
    }

    /// Host node backing `id`: its own node for host instances, otherwise
    /// the node of the nearest host descendant along the composite chain.
    pub fn host_node(&self, id: InstanceId) -> Result<N, RenderError> {
        let mut current = id;
        loop {
            match &self.get(current)?.kind {
                InstanceKind::Host { node, .. } => return Ok(node.clone()),
                InstanceKind::Function { child, .. } | InstanceKind::Class { child, .. } => {
                    current = *child;
                }
            }
        }
    }

    /// Ids of the subtree rooted at `id` in pre-order (parents first).
    pub fn subtree(&self, id: InstanceId) -> Result<Vec<InstanceId>, RenderError> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let instance = self.get(current)?;
            order.push(current);
            stack.extend(instance.child_ids().into_iter().rev());
        }
        Ok(order)
    }

    /// Drops the subtree rooted at `id` from the arena.
    pub(crate) fn release(&mut self, id: InstanceId) -> Result<(), RenderError> {
        for current in self.subtree(id)? {
            if let Some(slot) = self.slots.get_mut(current.0) {
                slot.take();
            }
        }
        Ok(())
    }
}

impl<N: fmt::Debug + Clone> InstanceStore<N> {
    /// Indented description of the instance tree rooted at `root`.
    pub fn dump_tree(&self, root: Option<InstanceId>) -> String {
        let mut output = String::new();
        match root {
            Some(id) => self.dump_instance(&mut output, id, 0),
            None => output.push_str("(no root)\n"),
        }
        output
    }

    fn dump_instance(&self, output: &mut String, id: InstanceId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(instance) = self.get(id) else {
            output.push_str(&format!("{indent}[{id}] (missing)\n"));
            return;
        };
        let name = instance.element.element_type().name();
        match &instance.kind {
            InstanceKind::Host { node, .. } => {
                output.push_str(&format!("{indent}[{id}] {name} -> {node:?}\n"));
            }
            InstanceKind::Function { .. } | InstanceKind::Class { .. } => {
                output.push_str(&format!("{indent}[{id}] <{name}>\n"));
            }
        }
        for child in instance.child_ids() {
            self.dump_instance(output, child, depth + 1);
        }
    }
}
