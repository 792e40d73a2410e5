//! Render root: owns one mount point and the tree last committed into it.
//!
//! A pass runs to completion before anything else touches the root. State
//! updates requested by mounted components while a pass is running (from
//! `component_did_mount`, `component_did_update` or a re-render) are queued
//! and committed one by one after the pass, before the call that started it
//! returns.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::component::{State, UpdateSink};
use crate::element::Element;
use crate::host::HostTree;
use crate::instance::{InstanceId, InstanceKind, InstanceStore};
use crate::reconcile::Reconciler;
use crate::RenderError;

struct RootCore<H: HostTree> {
    host: H,
    mount: H::Node,
    store: InstanceStore<H::Node>,
    current: Option<InstanceId>,
}

struct PendingUpdate {
    id: InstanceId,
    patch: State,
}

struct RootShared<H: HostTree> {
    core: RefCell<RootCore<H>>,
    pending: RefCell<VecDeque<PendingUpdate>>, // FUTURE(no_std): replace VecDeque with ring buffer.
    in_pass: Cell<bool>,
    sink: Weak<dyn UpdateSink>,
}

/// Marks a pass as running for as long as it lives.
struct PassGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> PassGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl<H: HostTree> RootShared<H> {
    fn flush_pending(&self, core: &mut RootCore<H>) -> Result<(), RenderError> {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(update) = next else {
                return Ok(());
            };
            if let Err(err) = self.apply_state(core, update) {
                self.pending.borrow_mut().clear();
                return Err(err);
            }
        }
    }

    fn apply_state(&self, core: &mut RootCore<H>, update: PendingUpdate) -> Result<(), RenderError> {
        let PendingUpdate { id, patch } = update;
        let RootCore { host, store, .. } = core;
        if !store.contains(id) {
            log::debug!("dropping state update for released instance {id}");
            return Ok(());
        }
        let instance = store.get_mut(id)?;
        let InstanceKind::Class { state, .. } = &mut instance.kind else {
            return Err(RenderError::MissingInstance { id });
        };
        state.cx.merge_state(patch);
        let element = instance.element.clone();
        let parent = instance.parent.clone();
        log::debug!("state update re-rendering {id}");
        Reconciler::new(host, store, self.sink.clone()).reconcile(&parent, Some(id), Some(&element))?;
        Ok(())
    }
}

impl<H: HostTree> UpdateSink for RootShared<H> {
    fn push_state(&self, id: InstanceId, patch: State) -> Result<(), RenderError> {
        if self.in_pass.get() {
            log::trace!("queueing state update for {id}");
            self.pending.borrow_mut().push_back(PendingUpdate { id, patch });
            return Ok(());
        }
        let mut core = self
            .core
            .try_borrow_mut()
            .map_err(|_| RenderError::ReentrantRender)?;
        let _pass = PassGuard::enter(&self.in_pass);
        self.pending.borrow_mut().push_back(PendingUpdate { id, patch });
        self.flush_pending(&mut core)
    }
}

/// Owns a host tree, a mount node inside it and the instance tree rendered
/// there. Independent roots never share state.
pub struct Root<H: HostTree + 'static> {
    shared: Rc<RootShared<H>>,
}

impl<H: HostTree + 'static> Root<H> {
    pub fn new(host: H, mount: H::Node) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<RootShared<H>>| {
            let sink: Weak<dyn UpdateSink> = weak.clone();
            RootShared {
                core: RefCell::new(RootCore {
                    host,
                    mount,
                    store: InstanceStore::new(),
                    current: None,
                }),
                pending: RefCell::new(VecDeque::new()),
                in_pass: Cell::new(false),
                sink,
            }
        });
        Self { shared }
    }

    /// Reconciles `element` against whatever was rendered before and keeps
    /// the result for the next call.
    pub fn render(&self, element: impl Into<Element>) -> Result<(), RenderError> {
        self.commit(Some(element.into()))
    }

    /// Removes everything rendered into the mount node.
    pub fn unmount(&self) -> Result<(), RenderError> {
        self.commit(None)
    }

    fn commit(&self, element: Option<Element>) -> Result<(), RenderError> {
        let mut core = self
            .shared
            .core
            .try_borrow_mut()
            .map_err(|_| RenderError::ReentrantRender)?;
        let _pass = PassGuard::enter(&self.shared.in_pass);
        let result = {
            let RootCore {
                host,
                mount,
                store,
                current,
            } = &mut *core;
            log::debug!(
                "render pass into {mount:?}: {}",
                element
                    .as_ref()
                    .map_or("(nothing)", |element| element.element_type().name())
            );
            let mut reconciler = Reconciler::new(host, store, self.shared.sink.clone());
            reconciler
                .reconcile(mount, *current, element.as_ref())
                .map(|next| *current = next)
        };
        if let Err(err) = result {
            self.shared.pending.borrow_mut().clear();
            return Err(err);
        }
        self.shared.flush_pending(&mut core)
    }

    /// Top-level instance of the committed tree.
    pub fn current(&self) -> Option<InstanceId> {
        self.shared.core.borrow().current
    }

    pub fn mount_node(&self) -> H::Node {
        self.shared.core.borrow().mount.clone()
    }

    /// Host node of the committed tree's top-level instance.
    pub fn root_host_node(&self) -> Result<Option<H::Node>, RenderError> {
        let core = self.shared.core.borrow();
        core.current.map(|id| core.store.host_node(id)).transpose()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> Result<R, RenderError> {
        let core = self
            .shared
            .core
            .try_borrow()
            .map_err(|_| RenderError::ReentrantRender)?;
        Ok(f(&core.host))
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> Result<R, RenderError> {
        let mut core = self
            .shared
            .core
            .try_borrow_mut()
            .map_err(|_| RenderError::ReentrantRender)?;
        Ok(f(&mut core.host))
    }

    pub fn with_store<R>(
        &self,
        f: impl FnOnce(&InstanceStore<H::Node>) -> R,
    ) -> Result<R, RenderError> {
        let core = self
            .shared
            .core
            .try_borrow()
            .map_err(|_| RenderError::ReentrantRender)?;
        Ok(f(&core.store))
    }
}

impl<H: HostTree + 'static> fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.core.try_borrow() {
            Ok(core) => f
                .debug_struct("Root")
                .field("mount", &core.mount)
                .field("current", &core.current)
                .field("instances", &core.store.len())
                .finish(),
            Err(_) => f.write_str("Root { <rendering> }"),
        }
    }
}

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod tests;
