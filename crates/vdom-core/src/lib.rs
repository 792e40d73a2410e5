#![doc = r"Core reconciliation runtime: elements, the shadow instance tree and the host tree adapter."]

pub mod collections;
pub mod component;
pub mod element;
pub mod host;
pub mod instance;
pub mod properties;
mod reconcile;
pub mod root;
pub mod value;

pub use component::{
    Component, ComponentClass, ComponentHandle, Context, FunctionComponent, Lifecycle, State,
};
pub use element::{
    create_element, create_text_element, Child, Element, ElementBuilder, ElementType, Props,
    NODE_VALUE, TEXT_ELEMENT,
};
pub use host::{HostNodeId, HostOp, HostTree, MemoryHost};
pub use instance::{ComponentState, Instance, InstanceId, InstanceKind, InstanceStore};
pub use properties::{event_name, is_event_name, update_properties};
pub use root::Root;
pub use value::{Event, EventHandler, Value};

/// Failure reported by a [`HostTree`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("host node {node} missing")]
    MissingNode { node: String },
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },
    #[error("host node {node} cannot hold children")]
    NotAContainer { node: String },
    #[error("host rejected operation: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("unrecognized element type `{tag}`")]
    UnrecognizedElementType { tag: String },
    #[error("instance {id} is {status:?}; state updates need a mounted component")]
    InvalidLifecycleState { id: InstanceId, status: Lifecycle },
    #[error("instance {id} missing")]
    MissingInstance { id: InstanceId },
    #[error("render called while a pass is already running on this root")]
    ReentrantRender,
    #[error(transparent)]
    Host(#[from] HostError),
}
