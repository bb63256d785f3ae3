//! Property diffing between two generations of the same host fiber.

use crate::element::{EventHandler, PropValue, Props, CHILDREN, KEY, NODE_VALUE};

/// One host mutation required to move an instance from old to new props.
#[derive(Clone, Debug, PartialEq)]
pub enum PropChange<'a> {
    RemoveListener {
        event: String,
        handler: &'a EventHandler,
    },
    RemoveAttribute {
        name: &'a str,
    },
    SetAttribute {
        name: &'a str,
        value: String,
    },
    SetText {
        value: String,
    },
    AddListener {
        event: String,
        handler: &'a EventHandler,
    },
}

/// `onClick` style keys name listeners; the event is the lower-cased rest.
pub fn listener_event(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    if rest.chars().next()?.is_ascii_uppercase() {
        Some(rest.to_ascii_lowercase())
    } else {
        None
    }
}

/// Host attribute name for a property key.
pub fn attribute_name(key: &str) -> &str {
    match key {
        "className" => "class",
        other => other,
    }
}

fn is_reserved(key: &str) -> bool {
    key == CHILDREN || key == KEY
}

fn handler_of<'a>(key: &str, value: &'a PropValue) -> Option<&'a EventHandler> {
    let handler = value.as_handler();
    if handler.is_none() {
        log::warn!("listener property `{key}` does not hold a handler; skipped");
    }
    handler
}

/// Computes the changes from `old` to `new`.
///
/// Listener removals come first so a stale handler can never observe the
/// same commit that replaced it. For text instances only `nodeValue` is
/// considered and it is applied as literal content.
pub fn diff_props<'a>(old: &'a Props, new: &'a Props, is_text: bool) -> Vec<PropChange<'a>> {
    if std::ptr::eq(old, new) {
        return Vec::new();
    }

    if is_text {
        let old_value = old.get(NODE_VALUE);
        let new_value = new.get(NODE_VALUE);
        if old_value == new_value {
            return Vec::new();
        }
        let value = new_value
            .and_then(PropValue::to_attribute)
            .unwrap_or_default();
        return vec![PropChange::SetText { value }];
    }

    let mut removed_listeners = Vec::new();
    let mut removed_attributes = Vec::new();
    let mut set_attributes = Vec::new();
    let mut added_listeners = Vec::new();

    for (key, old_value) in old.iter() {
        if is_reserved(key) {
            continue;
        }
        let new_value = new.get(key);
        if new_value == Some(old_value) {
            continue;
        }
        match listener_event(key) {
            Some(event) => {
                if let Some(handler) = old_value.as_handler() {
                    removed_listeners.push(PropChange::RemoveListener { event, handler });
                }
            }
            None if new_value.is_none() => {
                removed_attributes.push(PropChange::RemoveAttribute {
                    name: attribute_name(key),
                });
            }
            None => {}
        }
    }

    for (key, new_value) in new.iter() {
        if is_reserved(key) {
            continue;
        }
        if old.get(key) == Some(new_value) {
            continue;
        }
        match listener_event(key) {
            Some(event) => {
                if let Some(handler) = handler_of(key, new_value) {
                    added_listeners.push(PropChange::AddListener { event, handler });
                }
            }
            None => match new_value.to_attribute() {
                Some(value) => set_attributes.push(PropChange::SetAttribute {
                    name: attribute_name(key),
                    value,
                }),
                None => {
                    log::warn!("handler under non-listener key `{key}` skipped");
                    if old.get(key).and_then(PropValue::to_attribute).is_some() {
                        removed_attributes.push(PropChange::RemoveAttribute {
                            name: attribute_name(key),
                        });
                    }
                }
            },
        }
    }

    let mut changes = removed_listeners;
    changes.extend(removed_attributes);
    changes.extend(set_attributes);
    changes.extend(added_listeners);
    changes
}
