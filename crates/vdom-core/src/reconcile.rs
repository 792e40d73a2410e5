//! Instantiation and reconciliation of the instance tree against a new
//! element tree.
//!
//! Children are matched by position only. Inserting at the front of a list
//! therefore shows up as every later sibling changing, not as a move.

use std::rc::Weak;

use crate::component::{Component, ComponentHandle, Context, Lifecycle, UpdateSink};
use crate::element::{Element, ElementType, Props};
use crate::host::HostTree;
use crate::instance::{ComponentState, Instance, InstanceId, InstanceKind, InstanceStore};
use crate::properties::update_properties;
use crate::RenderError;

pub(crate) struct Reconciler<'a, H: HostTree> {
    host: &'a mut H,
    store: &'a mut InstanceStore<H::Node>,
    sink: Weak<dyn UpdateSink>,
}

impl<'a, H: HostTree> Reconciler<'a, H> {
    pub(crate) fn new(
        host: &'a mut H,
        store: &'a mut InstanceStore<H::Node>,
        sink: Weak<dyn UpdateSink>,
    ) -> Self {
        Self { host, store, sink }
    }

    /// Brings the instance at `prev` in line with `next` under `parent` and
    /// returns the instance now occupying that position, if any.
    pub(crate) fn reconcile(
        &mut self,
        parent: &H::Node,
        prev: Option<InstanceId>,
        next: Option<&Element>,
    ) -> Result<Option<InstanceId>, RenderError> {
        match (prev, next) {
            (None, None) => Ok(None),
            (None, Some(element)) => self.mount(parent, element).map(Some),
            (Some(prev), None) => {
                self.unmount(parent, prev)?;
                Ok(None)
            }
            (Some(prev), Some(element)) => {
                let instance = self.store.get(prev)?;
                if instance.element.element_type() != element.element_type() {
                    return self.replace(parent, prev, element).map(Some);
                }
                if matches!(instance.kind, InstanceKind::Host { .. }) {
                    self.update_host(prev, element)?;
                } else {
                    self.update_composite(parent, prev, element)?;
                }
                Ok(Some(prev))
            }
        }
    }

    /// Builds a fresh instance subtree for `element`. Host nodes are created
    /// and filled but the subtree root is left detached.
    pub(crate) fn instantiate(
        &mut self,
        element: &Element,
        parent: &H::Node,
    ) -> Result<InstanceId, RenderError> {
        match element.element_type() {
            ElementType::Host(tag) => {
                if !is_valid_tag(tag) {
                    return Err(RenderError::UnrecognizedElementType { tag: tag.clone() });
                }
                let node = self.host.create_node(tag)?;
                self.instantiate_host(element, node, parent)
            }
            ElementType::Text => {
                let node = self.host.create_text_node("")?;
                self.instantiate_host(element, node, parent)
            }
            ElementType::Function(function) => {
                let rendered = function.call(element.props());
                let child = self.instantiate(&rendered, parent)?;
                Ok(self.store.insert(Instance {
                    element: element.clone(),
                    parent: parent.clone(),
                    kind: InstanceKind::Function {
                        function: function.clone(),
                        child,
                    },
                }))
            }
            ElementType::Class(class) => {
                let id = self.store.reserve();
                let handle = ComponentHandle::new(id, self.sink.clone());
                let mut cx = Context::new(element.props().clone(), handle);
                let component = class.construct(element.props());
                cx.merge_state(component.initial_state());
                let rendered = component.render(&cx);
                let child = self.instantiate(&rendered, parent)?;
                self.store.fill(
                    id,
                    Instance {
                        element: element.clone(),
                        parent: parent.clone(),
                        kind: InstanceKind::Class {
                            state: ComponentState { component, cx },
                            child,
                        },
                    },
                );
                Ok(id)
            }
        }
    }

    fn instantiate_host(
        &mut self,
        element: &Element,
        node: H::Node,
        parent: &H::Node,
    ) -> Result<InstanceId, RenderError> {
        let mut children = Vec::with_capacity(element.children().len());
        if let Err(err) = self.instantiate_children(element, &node, &mut children) {
            for child_id in children {
                self.discard(child_id);
            }
            return Err(err);
        }
        Ok(self.store.insert(Instance {
            element: element.clone(),
            parent: parent.clone(),
            kind: InstanceKind::Host { node, children },
        }))
    }

    /// Instantiates and appends every child of `element` under `node`,
    /// recording each id in `children` as soon as it exists.
    fn instantiate_children(
        &mut self,
        element: &Element,
        node: &H::Node,
        children: &mut Vec<InstanceId>,
    ) -> Result<(), RenderError> {
        update_properties(&mut *self.host, node, &Props::new(), element.props())?;
        for child in element.children() {
            let child_id = self.instantiate(child, node)?;
            children.push(child_id);
            let child_node = self.store.host_node(child_id)?;
            self.host.append_child(node, &child_node)?;
        }
        Ok(())
    }

    /// Releases a never-mounted subtree left behind by a failed instantiation.
    /// Its host nodes stay detached.
    fn discard(&mut self, id: InstanceId) {
        if let Err(err) = self.store.release(id) {
            log::warn!("could not release partial instance {id}: {err}");
        }
    }

    fn mount(&mut self, parent: &H::Node, element: &Element) -> Result<InstanceId, RenderError> {
        let id = self.instantiate(element, parent)?;
        self.will_mount(id)?;
        let node = self.store.host_node(id)?;
        log::trace!("mount {} as {node:?}", element.element_type().name());
        if let Err(err) = self.host.append_child(parent, &node) {
            self.discard(id);
            return Err(err.into());
        }
        self.did_mount(id)?;
        Ok(id)
    }

    fn unmount(&mut self, parent: &H::Node, id: InstanceId) -> Result<(), RenderError> {
        self.will_unmount(id)?;
        let node = self.store.host_node(id)?;
        log::trace!("unmount {id} ({node:?})");
        self.host.remove_child(parent, &node)?;
        self.store.release(id)
    }

    fn replace(
        &mut self,
        parent: &H::Node,
        prev: InstanceId,
        element: &Element,
    ) -> Result<InstanceId, RenderError> {
        log::debug!(
            "replacing {prev} ({} -> {})",
            self.store.get(prev)?.element.element_type().name(),
            element.element_type().name()
        );
        let id = self.instantiate(element, parent)?;
        self.will_unmount(prev)?;
        self.will_mount(id)?;
        let old_node = self.store.host_node(prev)?;
        let new_node = self.store.host_node(id)?;
        if let Err(err) = self.host.replace_child(parent, &old_node, &new_node) {
            self.discard(id);
            return Err(err.into());
        }
        self.store.release(prev)?;
        self.did_mount(id)?;
        Ok(id)
    }

    fn update_host(&mut self, id: InstanceId, element: &Element) -> Result<(), RenderError> {
        let instance = self.store.get(id)?;
        let prev_element = instance.element.clone();
        let (node, old_children) = match &instance.kind {
            InstanceKind::Host { node, children } => (node.clone(), children.clone()),
            _ => return Ok(()),
        };
        update_properties(&mut *self.host, &node, prev_element.props(), element.props())?;
        let (next_children, outcome) =
            match self.reconcile_children(&node, &old_children, element.children()) {
                Ok(children) => (children, Ok(())),
                Err((children, err)) => (children, Err(err)),
            };
        // Written back on failure too, so the next pass matches against live ids.
        let instance = self.store.get_mut(id)?;
        instance.element = element.clone();
        if let InstanceKind::Host { children, .. } = &mut instance.kind {
            *children = next_children;
        }
        outcome
    }

    /// On failure returns the children still attached under `node`: those
    /// reconciled so far, the one that failed if it survived, and the
    /// untouched tail.
    fn reconcile_children(
        &mut self,
        node: &H::Node,
        old_children: &[InstanceId],
        next_children: &[Element],
    ) -> Result<Vec<InstanceId>, (Vec<InstanceId>, RenderError)> {
        let count = old_children.len().max(next_children.len());
        let mut reconciled = Vec::with_capacity(next_children.len());
        for index in 0..count {
            let prev = old_children.get(index).copied();
            match self.reconcile(node, prev, next_children.get(index)) {
                Ok(Some(id)) => reconciled.push(id),
                Ok(None) => {}
                Err(err) => {
                    reconciled.extend(prev.filter(|&id| self.store.contains(id)));
                    reconciled.extend(old_children.iter().skip(index + 1).copied());
                    return Err((reconciled, err));
                }
            }
        }
        Ok(reconciled)
    }

    fn update_composite(
        &mut self,
        parent: &H::Node,
        id: InstanceId,
        element: &Element,
    ) -> Result<(), RenderError> {
        let (rendered, old_child) = {
            let instance = self.store.get_mut(id)?;
            match &mut instance.kind {
                InstanceKind::Host { .. } => return Ok(()),
                InstanceKind::Function { function, child } => {
                    if let ElementType::Function(next) = element.element_type() {
                        *function = next.clone();
                    }
                    (function.call(element.props()), *child)
                }
                InstanceKind::Class { state, child } => {
                    let proceed = state
                        .component
                        .should_component_update(&state.cx, element.props());
                    state.cx.set_props(element.props().clone());
                    if !proceed {
                        log::trace!("{id} skipped update");
                        instance.element = element.clone();
                        return Ok(());
                    }
                    (state.component.render(&state.cx), *child)
                }
            }
        };
        let next_child = self
            .reconcile(parent, Some(old_child), Some(&rendered))?
            .ok_or(RenderError::MissingInstance { id: old_child })?;
        let instance = self.store.get_mut(id)?;
        instance.element = element.clone();
        match &mut instance.kind {
            InstanceKind::Function { child, .. } | InstanceKind::Class { child, .. } => {
                *child = next_child;
            }
            InstanceKind::Host { .. } => {}
        }
        self.with_component(id, |component, cx| component.component_did_update(cx))
    }

    fn class_instances(&self, root: InstanceId) -> Result<Vec<InstanceId>, RenderError> {
        Ok(self
            .store
            .subtree(root)?
            .into_iter()
            .filter(|&id| {
                matches!(
                    self.store.get(id).map(|instance| &instance.kind),
                    Ok(InstanceKind::Class { .. })
                )
            })
            .collect())
    }

    fn with_component(
        &mut self,
        id: InstanceId,
        f: impl FnOnce(&mut dyn Component, &Context),
    ) -> Result<(), RenderError> {
        if let InstanceKind::Class { state, .. } = &mut self.store.get_mut(id)?.kind {
            let ComponentState { component, cx } = state;
            f(&mut **component, cx);
        }
        Ok(())
    }

    fn set_lifecycle(&self, id: InstanceId, status: Lifecycle) -> Result<(), RenderError> {
        if let Some(state) = self.store.get(id)?.component() {
            state.cx.handle_ref().set_lifecycle(status);
        }
        Ok(())
    }

    fn will_mount(&mut self, root: InstanceId) -> Result<(), RenderError> {
        for id in self.class_instances(root)? {
            log::trace!("will mount {id}");
            self.with_component(id, |component, cx| component.component_will_mount(cx))?;
        }
        Ok(())
    }

    fn did_mount(&mut self, root: InstanceId) -> Result<(), RenderError> {
        let ids = self.class_instances(root)?;
        for &id in &ids {
            self.set_lifecycle(id, Lifecycle::Mounted)?;
        }
        for &id in ids.iter().rev() {
            log::trace!("did mount {id}");
            self.with_component(id, |component, cx| component.component_did_mount(cx))?;
        }
        Ok(())
    }

    fn will_unmount(&mut self, root: InstanceId) -> Result<(), RenderError> {
        for id in self.class_instances(root)? {
            log::trace!("will unmount {id}");
            self.with_component(id, |component, cx| component.component_will_unmount(cx))?;
            self.set_lifecycle(id, Lifecycle::Unmounted)?;
        }
        Ok(())
    }
}

fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
