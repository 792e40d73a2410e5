//! Property reconciliation between two prop sets on one host node.
//!
//! Names starting with `on` are event subscriptions (`onClick` subscribes
//! to `click`); every other name is a plain property. Properties whose value
//! did not change are left alone, which makes re-rendering an unchanged tree
//! free of host mutations while producing the same end state as clearing
//! everything and setting it again.

use crate::element::Props;
use crate::host::HostTree;
use crate::value::Value;
use crate::HostError;

const EVENT_PREFIX: &str = "on";

pub fn is_event_name(name: &str) -> bool {
    name.len() > EVENT_PREFIX.len() && name.starts_with(EVENT_PREFIX)
}

/// `onClick` → `click`.
pub fn event_name(name: &str) -> String {
    name[EVENT_PREFIX.len()..].to_lowercase()
}

pub fn update_properties<H: HostTree>(
    host: &mut H,
    node: &H::Node,
    prev: &Props,
    next: &Props,
) -> Result<(), HostError> {
    for (name, prev_value) in prev.iter() {
        let next_value = next.get(name);
        if next_value == Some(prev_value) {
            continue;
        }
        if is_event_name(name) {
            if let Value::Handler(handler) = prev_value {
                let event = event_name(name);
                log::trace!("unsubscribe {event} on {node:?}");
                host.unsubscribe_event(node, &event, handler)?;
            }
        } else if next_value.is_none() {
            log::trace!("clear {name} on {node:?}");
            host.clear_property(node, name)?;
        }
    }

    for (name, value) in next.iter() {
        if prev.get(name) == Some(value) {
            continue;
        }
        if is_event_name(name) {
            match value {
                Value::Handler(handler) => {
                    let event = event_name(name);
                    log::trace!("subscribe {event} on {node:?}");
                    host.subscribe_event(node, &event, handler)?;
                }
                other => log::warn!("`{name}` looks like an event but holds {other:?}; skipped"),
            }
        } else {
            log::trace!("set {name} on {node:?}");
            host.set_property(node, name, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/properties_tests.rs"]
mod tests;
