//! Object instances.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::class::{Class, Invocation, Member, MethodFn};
use crate::error::{Error, Result};
use crate::events::{Events, Listeners};
use crate::observable::Observable;
use crate::value::Value;

pub(crate) struct ObjectInner {
	class: Rc<Class>,
	props: RefCell<IndexMap<String, Value>>,
	methods: RefCell<IndexMap<String, MethodFn>>,
	listeners: Listeners,
}

/// Shared handle to an object instance.
///
/// Cloning the handle does not copy the object; equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<ObjectInner>);

/// Non-owning handle to an object instance.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<ObjectInner>);

impl WeakObjectRef {
	/// Returns the object if it is still alive.
	pub fn upgrade(&self) -> Option<ObjectRef> {
		self.0.upgrade().map(ObjectRef)
	}
}

impl ObjectRef {
	pub(crate) fn allocate(class: Rc<Class>) -> Self {
		Self(Rc::new(ObjectInner {
			class,
			props: RefCell::new(IndexMap::new()),
			methods: RefCell::new(IndexMap::new()),
			listeners: Listeners::new(),
		}))
	}

	pub(crate) fn insert_own_property(&self, name: String, value: Value) {
		self.0.props.borrow_mut().insert(name, value);
	}

	pub(crate) fn insert_own_method(&self, name: String, method: MethodFn) {
		self.0.methods.borrow_mut().insert(name, method);
	}

	/// The instance's class.
	pub fn class(&self) -> &Rc<Class> {
		&self.0.class
	}

	/// Name of the instance's class.
	pub fn class_name(&self) -> &str {
		self.0.class.name()
	}

	/// Returns true if the instance's class is `class` or a subclass of it.
	pub fn is_kind_of(&self, class: &Rc<Class>) -> bool {
		self.0.class.is_subclass_of(class)
	}

	/// Identity comparison.
	pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Creates a non-owning handle.
	pub fn downgrade(&self) -> WeakObjectRef {
		WeakObjectRef(Rc::downgrade(&self.0))
	}

	/// Returns true if `method` is defined on the instance or its class chain.
	pub fn responds_to(&self, method: &str) -> bool {
		self.0.methods.borrow().contains_key(method) || self.0.class.has_method(method)
	}

	/// Returns true if `key` was set on the instance itself.
	pub fn has_own_property(&self, key: &str) -> bool {
		self.0.props.borrow().contains_key(key)
	}

	/// Invokes `method` with `args`.
	pub fn send(&self, method: &str, args: &[Value]) -> Result<Value> {
		let own = self.0.methods.borrow().get(method).cloned();
		if let Some(own) = own {
			let invocation = Invocation::new(self, method, Some(self.0.class.clone()));
			return own(&invocation, args);
		}

		match self.0.class.lookup_member(method) {
			Some((owner, Member::Method(implementation))) => {
				let invocation = Invocation::new(self, method, owner.parent().cloned());
				implementation(&invocation, args)
			}
			_ => Err(Error::MissingMethod {
				class: self.class_name().to_string(),
				method: method.to_string(),
			}),
		}
	}

	/// Reads a property from the instance or its class defaults, without delegation.
	fn lookup_property(&self, key: &str) -> Option<Value> {
		if let Some(value) = self.0.props.borrow().get(key) {
			return Some(value.clone());
		}
		match self.0.class.lookup_member(key) {
			Some((_, Member::Data(value))) => Some(value),
			_ => None,
		}
	}
}

impl Events for ObjectRef {
	fn listeners(&self) -> &Listeners {
		&self.0.listeners
	}

	fn event_source(&self) -> Option<ObjectRef> {
		Some(self.clone())
	}
}

impl Observable for ObjectRef {
	fn get(&self, key: &str) -> Value {
		if let Some(value) = self.lookup_property(key) {
			return value;
		}
		match self.0.class.delegate() {
			Some(delegate) if delegate != key => match self.get(delegate) {
				Value::Object(target) => target.get(key),
				Value::Map(map) => map.get(key).cloned().unwrap_or_default(),
				_ => Value::Null,
			},
			_ => Value::Null,
		}
	}

	fn set<V: Into<Value>>(&self, key: &str, value: V) -> Result<()> {
		let value = value.into();
		let current = self.lookup_property(key).unwrap_or_default();
		if current.identical(&value) {
			return Ok(());
		}
		self.0.props.borrow_mut().insert(key.to_string(), value);
		self.property_did_change(key)
	}
}

impl PartialEq for ObjectRef {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl fmt::Debug for ObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObjectRef")
			.field("class", &self.class_name())
			.field("props", &self.0.props.borrow().keys().collect::<Vec<_>>())
			.finish()
	}
}
