//! Testing utilities and harness for vdom

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use vdom_core::{
        Component, Context, Element, Event, HostOp, Lifecycle, Props, RenderError, State, Value,
    };
}
