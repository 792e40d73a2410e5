//! Component contract: stateless functions and stateful class components.

use std::any::{type_name, TypeId};
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::collections::map::HashMap;
use crate::element::{Element, Props};
use crate::instance::InstanceId;
use crate::value::Value;
use crate::RenderError;

/// A stateful component. Only [`Component::create`] and
/// [`Component::render`] are required; every lifecycle hook defaults to a
/// no-op, and a missing update guard means "always update".
pub trait Component: 'static {
    fn create(props: &Props) -> Self
    where
        Self: Sized;

    fn render(&self, cx: &Context) -> Element;

    /// State installed before the first render. Empty unless overridden.
    fn initial_state(&self) -> State {
        State::new()
    }

    fn should_component_update(&self, _cx: &Context, _next_props: &Props) -> bool {
        true
    }

    fn component_will_mount(&mut self, _cx: &Context) {}

    fn component_did_mount(&mut self, _cx: &Context) {}

    fn component_did_update(&mut self, _cx: &Context) {}

    fn component_will_unmount(&mut self, _cx: &Context) {}
}

/// Identity of a class component type. Two elements share a class when they
/// were built for the same Rust type.
#[derive(Clone, Copy)]
pub struct ComponentClass {
    type_id: TypeId,
    name: &'static str,
    construct: fn(&Props) -> Box<dyn Component>,
}

fn construct<C: Component>(props: &Props) -> Box<dyn Component> {
    Box::new(C::create(props))
}

impl ComponentClass {
    pub fn of<C: Component>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
            construct: construct::<C>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn construct(&self, props: &Props) -> Box<dyn Component> {
        (self.construct)(props)
    }
}

impl PartialEq for ComponentClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentClass").field(&self.name).finish()
    }
}

/// A stateless component. Identity is the type of the function or closure,
/// so the same closure expression matches itself across render passes.
/// Plain `fn` pointers all share one type and therefore one identity.
#[derive(Clone)]
pub struct FunctionComponent {
    type_id: TypeId,
    name: &'static str,
    render: Rc<dyn Fn(&Props) -> Element>,
}

impl FunctionComponent {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&Props) -> Element + 'static,
    {
        Self {
            type_id: TypeId::of::<F>(),
            name: type_name::<F>(),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, props: &Props) -> Element {
        (self.render)(props)
    }
}

impl PartialEq for FunctionComponent {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for FunctionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionComponent").field(&self.name).finish()
    }
}

/// Component-local state: a flat map merged shallowly by `set_state`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    values: HashMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shallow merge: keys in `patch` overwrite, all other keys are kept.
    pub fn merge(&mut self, patch: State) {
        self.values.extend(patch.values);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Constructed,
    Mounted,
    Unmounted,
}

/// Receives state updates on behalf of the root that owns an instance.
pub(crate) trait UpdateSink {
    fn push_state(&self, id: InstanceId, patch: State) -> Result<(), RenderError>;
}

/// Non-owning back-reference from a component to its instance.
#[derive(Clone)]
pub struct ComponentHandle {
    id: InstanceId,
    sink: Weak<dyn UpdateSink>,
    status: Rc<Cell<Lifecycle>>,
}

impl ComponentHandle {
    pub(crate) fn new(id: InstanceId, sink: Weak<dyn UpdateSink>) -> Self {
        Self {
            id,
            sink,
            status: Rc::new(Cell::new(Lifecycle::Constructed)),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.status.get()
    }

    pub(crate) fn set_lifecycle(&self, status: Lifecycle) {
        self.status.set(status);
    }

    /// Merges `patch` into the component's state and re-renders its subtree
    /// before returning. Inside an active pass the update is queued and
    /// committed once that pass completes.
    ///
    /// Only mounted components may update. Calls from the first `render` or
    /// from `component_will_mount` fail, as do calls after unmounting.
    pub fn set_state(&self, patch: State) -> Result<(), RenderError> {
        let status = self.status.get();
        if status != Lifecycle::Mounted {
            return Err(RenderError::InvalidLifecycleState {
                id: self.id,
                status,
            });
        }
        let sink = self
            .sink
            .upgrade()
            .ok_or(RenderError::InvalidLifecycleState {
                id: self.id,
                status,
            })?;
        sink.push_state(self.id, patch)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id)
            .field("status", &self.status.get())
            .finish()
    }
}

/// What a class component sees of itself: current props, state and a
/// handle for scheduling state updates.
#[derive(Debug)]
pub struct Context {
    props: Props,
    state: State,
    handle: ComponentHandle,
}

impl Context {
    pub(crate) fn new(props: Props, handle: ComponentHandle) -> Self {
        Self {
            props,
            state: State::new(),
            handle,
        }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn handle(&self) -> ComponentHandle {
        self.handle.clone()
    }

    pub fn set_state(&self, patch: State) -> Result<(), RenderError> {
        self.handle.set_state(patch)
    }

    pub(crate) fn handle_ref(&self) -> &ComponentHandle {
        &self.handle
    }

    pub(crate) fn set_props(&mut self, props: Props) {
        self.props = props;
    }

    pub(crate) fn merge_state(&mut self, patch: State) {
        self.state.merge(patch);
    }
}
