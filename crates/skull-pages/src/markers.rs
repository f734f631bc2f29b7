//! Marker registry for actions, bindings and collections.
//!
//! While a template is evaluated, helpers register what an element should
//! do and stamp the element with a marker attribute carrying the entry id.
//! After the markup is attached, the view scans for those attributes and
//! looks the entries up here.
//!
//! A registry belongs to one view. Ids come from a single counter, grow
//! monotonically and are never reused; entries are never removed and are
//! released together with the view.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use skull_core::{ObjectRef, PropertyPath, Value};

use crate::error::Result;
use crate::page::Page;
use crate::template::RenderScope;

/// Attribute marking an element with an action id.
pub const ACTION_ATTR: &str = "data-skull-action";

/// Attribute marking an element with a scalar binding id.
pub const BINDING_ATTR: &str = "data-skull-binding";

/// Attribute marking an element with a collection binding id.
pub const COLLECTION_ATTR: &str = "data-skull-collection";

/// Custom renderer for a bound value.
pub type BindingRender = Rc<dyn Fn(&mut RenderScope<'_>, &Value) -> Result<Page>>;

/// Renderer for one collection item; the scope's `this` is the item.
pub type ItemRender = Rc<dyn Fn(&mut RenderScope<'_>) -> Result<Page>>;

/// A declared DOM-event-to-method dispatch.
#[derive(Debug, Clone)]
pub struct ActionMarker {
	/// Method to call on the target.
	pub name: String,
	/// DOM event type that triggers it.
	pub event_type: String,
	/// Receiver of the call.
	pub target: ObjectRef,
	/// Whether the event keeps propagating after dispatch.
	pub bubbles: bool,
	/// Parameters appended after the DOM event.
	pub params: Vec<Value>,
}

/// A scalar binding of an element's content to a property path.
#[derive(Clone)]
pub struct BindingMarker {
	/// Object the path is resolved against.
	pub root: Value,
	/// Dotted path.
	pub path: PropertyPath,
	/// Custom renderer; the default renders the value as text.
	pub render: Option<BindingRender>,
	/// `this` for the custom renderer, defaulting to `root`.
	pub context: Option<Value>,
}

impl fmt::Debug for BindingMarker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BindingMarker")
			.field("path", &self.path)
			.field("custom_render", &self.render.is_some())
			.finish()
	}
}

/// A collection binding of an element's children to a list property.
#[derive(Clone)]
pub struct CollectionMarker {
	/// Object the path is resolved against.
	pub root: Value,
	/// Dotted path to the list or proxy.
	pub path: PropertyPath,
	/// Item renderer.
	pub item: ItemRender,
}

impl fmt::Debug for CollectionMarker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionMarker")
			.field("path", &self.path)
			.finish()
	}
}

/// Per-view marker tables.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
	next_id: Cell<u64>,
	actions: RefCell<HashMap<u64, Rc<ActionMarker>>>,
	bindings: RefCell<HashMap<u64, Rc<BindingMarker>>>,
	collections: RefCell<HashMap<u64, Rc<CollectionMarker>>>,
}

impl MarkerRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	fn allocate(&self) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		id
	}

	/// Registers an action and returns its id.
	pub fn register_action(&self, marker: ActionMarker) -> u64 {
		let id = self.allocate();
		self.actions.borrow_mut().insert(id, Rc::new(marker));
		id
	}

	/// Registers a scalar binding and returns its id.
	pub fn register_binding(&self, marker: BindingMarker) -> u64 {
		let id = self.allocate();
		self.bindings.borrow_mut().insert(id, Rc::new(marker));
		id
	}

	/// Registers a collection binding and returns its id.
	pub fn register_collection(&self, marker: CollectionMarker) -> u64 {
		let id = self.allocate();
		self.collections
			.borrow_mut()
			.insert(id, Rc::new(marker));
		id
	}

	/// Looks up an action.
	pub fn action(&self, id: u64) -> Option<Rc<ActionMarker>> {
		self.actions.borrow().get(&id).cloned()
	}

	/// Looks up a scalar binding.
	pub fn binding(&self, id: u64) -> Option<Rc<BindingMarker>> {
		self.bindings.borrow().get(&id).cloned()
	}

	/// Looks up a collection binding.
	pub fn collection(&self, id: u64) -> Option<Rc<CollectionMarker>> {
		self.collections.borrow().get(&id).cloned()
	}

	/// Total number of entries ever registered.
	pub fn len(&self) -> usize {
		self.actions.borrow().len() + self.bindings.borrow().len() + self.collections.borrow().len()
	}

	/// Whether nothing was registered yet.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Parses a marker attribute value.
pub fn parse_marker_id(value: &str) -> Option<u64> {
	value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use skull_core::Class;

	#[test]
	fn test_ids_are_unique_across_kinds() {
		let registry = MarkerRegistry::new();
		let target = Class::base().new_instance().unwrap();
		let root = Value::from(&target);

		let action = registry.register_action(ActionMarker {
			name: "save".to_string(),
			event_type: "click".to_string(),
			target,
			bubbles: false,
			params: Vec::new(),
		});
		let binding = registry.register_binding(BindingMarker {
			root: root.clone(),
			path: PropertyPath::parse("title").unwrap(),
			render: None,
			context: None,
		});
		let collection = registry.register_collection(CollectionMarker {
			root,
			path: PropertyPath::parse("items").unwrap(),
			item: Rc::new(|_: &mut RenderScope<'_>| -> Result<Page> { Ok(Page::empty()) }),
		});

		assert_eq!((action, binding, collection), (0, 1, 2));
		assert!(registry.action(action).is_some());
		assert!(registry.action(binding).is_none());
		assert!(registry.binding(binding).is_some());
		assert!(registry.collection(collection).is_some());
		assert_eq!(registry.len(), 3);
	}

	#[test]
	fn test_parse_marker_id() {
		assert_eq!(parse_marker_id("12"), Some(12));
		assert_eq!(parse_marker_id(" 3 "), Some(3));
		assert_eq!(parse_marker_id("x"), None);
	}
}
