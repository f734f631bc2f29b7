//! Property observation on top of named events.
//!
//! Observing property `p` means listening to the `"p:changed"` event.
//! Every change first fires the wildcard [`ALL_CHANGED`] event (with the
//! property name as its only argument) and then the property's own event.

use crate::error::{Error, Result};
use crate::events::{Events, Handler};
use crate::object::ObjectRef;
use crate::value::Value;

/// Wildcard event fired before every property-specific change event.
pub const ALL_CHANGED: &str = "all:changed";

/// Event name fired when `property` changes.
pub fn changed_event(property: &str) -> String {
	format!("{}:changed", property)
}

/// Property get/set with change notification.
///
/// `Events` is a supertrait, so an observable without an event table
/// cannot be expressed.
pub trait Observable: Events {
	/// Reads a property. Missing properties read as [`Value::Null`].
	fn get(&self, key: &str) -> Value;

	/// Writes a property, notifying observers only if the value is not
	/// [identical](Value::identical) to the current one.
	fn set<V: Into<Value>>(&self, key: &str, value: V) -> Result<()>;

	/// Registers `handler` for changes of `property`.
	fn add_observer(&self, property: &str, handler: Handler) {
		self.add_listener(&changed_event(property), handler, None);
	}

	/// Registers `handler` for changes of `property`, receiving `target`.
	fn add_observer_for(&self, property: &str, handler: Handler, target: &ObjectRef) {
		self.add_listener(&changed_event(property), handler, Some(target));
	}

	/// Removes a previously registered observer (identity match).
	fn remove_observer(&self, property: &str, handler: &Handler) {
		self.remove_listener(&changed_event(property), handler);
	}

	/// Fires the change events for `property` without writing it.
	fn property_did_change(&self, property: &str) -> Result<()> {
		self.send_event(ALL_CHANGED, &[Value::from(property)])?;
		self.send_event(&changed_event(property), &[])
	}
}

/// Registers an observer on a dynamically typed value.
///
/// Only objects carry the observable capability; any other value is a
/// programming error reported as [`Error::MissingCapability`].
pub fn observe(value: &Value, property: &str, handler: Handler) -> Result<()> {
	match value {
		Value::Object(object) => {
			object.add_observer(property, handler);
			Ok(())
		}
		_ => Err(Error::MissingCapability {
			capability: "observable",
			operation: format!("add_observer({})", property),
		}),
	}
}

/// Removes an observer from a dynamically typed value.
pub fn unobserve(value: &Value, property: &str, handler: &Handler) -> Result<()> {
	match value {
		Value::Object(object) => {
			object.remove_observer(property, handler);
			Ok(())
		}
		_ => Err(Error::MissingCapability {
			capability: "observable",
			operation: format!("remove_observer({})", property),
		}),
	}
}
