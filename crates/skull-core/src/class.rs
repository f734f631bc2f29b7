//! Class definitions with single inheritance and mixin composition.
//!
//! A [`Class`] is an immutable member table (data defaults and methods)
//! chained to a parent. New classes are produced with [`Class::extend`];
//! ancestors are never mutated.
//!
//! ```ignore
//! let controller = Class::extend(&Class::base(), "MoviesController")
//!     .property("page_num", 1)
//!     .method("next_page", |inv, _args| {
//!         let page = inv.this().get("page_num").as_i64().unwrap_or(1);
//!         inv.this().set("page_num", page + 1)?;
//!         Ok(Value::Null)
//!     })
//!     .observes("page_num", "load_page")
//!     .build();
//! let instance = controller.new_instance()?;
//! ```
//!
//! ## Overridden methods
//!
//! A method can reach the implementation it shadows through
//! [`Invocation::call_super`]. The invocation only exists for the duration
//! of the call, so a super reference can never outlive it.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::events::Handler;
use crate::object::ObjectRef;
use crate::observable::Observable;
use crate::value::Value;

/// Method implementation.
pub type MethodFn = Rc<dyn Fn(&Invocation<'_>, &[Value]) -> Result<Value>>;

/// An entry of a class member table.
#[derive(Clone)]
pub enum Member {
	/// Default property value.
	Data(Value),
	/// Method.
	Method(MethodFn),
}

impl fmt::Debug for Member {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Member::Data(value) => f.debug_tuple("Data").field(value).finish(),
			Member::Method(_) => f.write_str("Method(..)"),
		}
	}
}

/// A reusable property table: members plus observer declarations.
///
/// Mixins are merged left to right into a class definition. The same
/// shape is used for per-instance overrides passed to [`Class::create`].
#[derive(Clone, Debug, Default)]
pub struct Mixin {
	members: IndexMap<String, Member>,
	observes: Vec<(String, String)>,
}

/// Per-instance overrides accepted by [`Class::create`].
pub type Overrides = Mixin;

impl Mixin {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a data member.
	pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.members
			.insert(name.into(), Member::Data(value.into()));
		self
	}

	/// Adds a method.
	pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
	where
		F: Fn(&Invocation<'_>, &[Value]) -> Result<Value> + 'static,
	{
		self.members
			.insert(name.into(), Member::Method(Rc::new(method)));
		self
	}

	/// Declares that `method` observes changes of `property`.
	pub fn observes(mut self, property: impl Into<String>, method: impl Into<String>) -> Self {
		self.observes.push((property.into(), method.into()));
		self
	}

	/// Merges `other` over this table (later members win).
	pub fn merge(&mut self, other: &Mixin) {
		for (name, member) in &other.members {
			self.members.insert(name.clone(), member.clone());
		}
		self.observes.extend(other.observes.iter().cloned());
	}

	/// Looks up a member by name.
	pub fn member(&self, name: &str) -> Option<&Member> {
		self.members.get(name)
	}

	/// Observer declarations in declaration order.
	pub fn observer_declarations(&self) -> &[(String, String)] {
		&self.observes
	}
}

/// An immutable class definition.
pub struct Class {
	name: String,
	parent: Option<Rc<Class>>,
	table: Mixin,
	delegate: Option<String>,
}

thread_local! {
	static BASE_CLASS: Rc<Class> = Rc::new(Class {
		name: "Object".to_string(),
		parent: None,
		table: Mixin::new().method("initialize", |_, _| Ok(Value::Null)),
		delegate: None,
	});
}

impl Class {
	/// The root class every class descends from.
	pub fn base() -> Rc<Class> {
		BASE_CLASS.with(Rc::clone)
	}

	/// Starts the definition of a subclass of `parent`.
	pub fn extend(parent: &Rc<Class>, name: impl Into<String>) -> ClassBuilder {
		ClassBuilder {
			name: name.into(),
			parent: parent.clone(),
			table: Mixin::new(),
			delegate: None,
		}
	}

	/// Class name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Parent class, `None` for the root class.
	pub fn parent(&self) -> Option<&Rc<Class>> {
		self.parent.as_ref()
	}

	/// Returns true if this class is `other` or descends from it.
	pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<Class>) -> bool {
		let mut current = Some(self.clone());
		while let Some(class) = current {
			if Rc::ptr_eq(&class, other) {
				return true;
			}
			current = class.parent.clone();
		}
		false
	}

	/// Finds a member along the chain, returning the defining class.
	pub fn lookup_member(self: &Rc<Self>, name: &str) -> Option<(Rc<Class>, Member)> {
		let mut current = Some(self.clone());
		while let Some(class) = current {
			if let Some(member) = class.table.member(name) {
				return Some((class.clone(), member.clone()));
			}
			current = class.parent.clone();
		}
		None
	}

	/// Returns true if a method named `name` is defined along the chain.
	pub fn has_method(self: &Rc<Self>, name: &str) -> bool {
		matches!(self.lookup_member(name), Some((_, Member::Method(_))))
	}

	/// Property that unknown reads fall back to, inherited from ancestors.
	pub fn delegate(&self) -> Option<&str> {
		match &self.delegate {
			Some(prop) => Some(prop),
			None => self.parent.as_ref().and_then(|p| p.delegate()),
		}
	}

	/// Creates an instance with no overrides.
	pub fn new_instance(self: &Rc<Self>) -> Result<ObjectRef> {
		self.create(Overrides::new())
	}

	/// Creates an instance.
	///
	/// Order: allocate, merge `overrides` as own members, wire class-level
	/// observers (root class first), call `initialize`, then wire the
	/// observers declared in `overrides`.
	pub fn create(self: &Rc<Self>, overrides: Overrides) -> Result<ObjectRef> {
		let object = ObjectRef::allocate(self.clone());
		let Mixin { members, observes } = overrides;
		for (name, member) in members {
			match member {
				Member::Data(value) => object.insert_own_property(name, value),
				Member::Method(method) => object.insert_own_method(name, method),
			}
		}

		for (property, method) in self.observer_chain() {
			object.add_observer(&property, Handler::method(method));
		}

		object.send("initialize", &[])?;

		for (property, method) in observes {
			object.add_observer(&property, Handler::method(method));
		}

		tracing::trace!(class = %self.name, "created instance");
		Ok(object)
	}

	fn observer_chain(self: &Rc<Self>) -> Vec<(String, String)> {
		let mut chain = Vec::new();
		let mut current = Some(self.clone());
		while let Some(class) = current {
			chain.push(class.clone());
			current = class.parent.clone();
		}
		chain
			.iter()
			.rev()
			.flat_map(|class| class.table.observer_declarations().iter().cloned())
			.collect()
	}
}

impl fmt::Debug for Class {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Class")
			.field("name", &self.name)
			.field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
			.field("members", &self.table.members.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder returned by [`Class::extend`].
pub struct ClassBuilder {
	name: String,
	parent: Rc<Class>,
	table: Mixin,
	delegate: Option<String>,
}

impl ClassBuilder {
	/// Adds a default property value.
	pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.table = self.table.property(name, value);
		self
	}

	/// Adds a method.
	pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
	where
		F: Fn(&Invocation<'_>, &[Value]) -> Result<Value> + 'static,
	{
		self.table = self.table.method(name, method);
		self
	}

	/// Declares that `method` observes changes of `property` on every instance.
	pub fn observes(mut self, property: impl Into<String>, method: impl Into<String>) -> Self {
		self.table = self.table.observes(property, method);
		self
	}

	/// Merges a mixin over the members defined so far.
	pub fn mixin(mut self, mixin: &Mixin) -> Self {
		self.table.merge(mixin);
		self
	}

	/// Resolves reads of unknown properties against the value of `property`.
	pub fn delegate_to(mut self, property: impl Into<String>) -> Self {
		self.delegate = Some(property.into());
		self
	}

	/// Finishes the definition.
	pub fn build(self) -> Rc<Class> {
		Rc::new(Class {
			name: self.name,
			parent: Some(self.parent),
			table: self.table,
			delegate: self.delegate,
		})
	}
}

/// The running method call.
pub struct Invocation<'a> {
	this: &'a ObjectRef,
	name: &'a str,
	super_from: Option<Rc<Class>>,
}

impl<'a> Invocation<'a> {
	pub(crate) fn new(this: &'a ObjectRef, name: &'a str, super_from: Option<Rc<Class>>) -> Self {
		Self {
			this,
			name,
			super_from,
		}
	}

	/// The receiver.
	pub fn this(&self) -> &ObjectRef {
		self.this
	}

	/// Name of the running method.
	pub fn name(&self) -> &str {
		self.name
	}

	/// Calls the implementation this method overrides.
	pub fn call_super(&self, args: &[Value]) -> Result<Value> {
		let missing = || Error::MissingMethod {
			class: self.this.class_name().to_string(),
			method: format!("super.{}", self.name),
		};
		let start = self.super_from.as_ref().ok_or_else(missing)?;
		match start.lookup_member(self.name) {
			Some((owner, Member::Method(method))) => {
				let parent = owner.parent.clone();
				method(&Invocation::new(self.this, self.name, parent), args)
			}
			_ => Err(missing()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn greeter() -> Rc<Class> {
		Class::extend(&Class::base(), "Greeter")
			.property("greeting", "hello")
			.method("greet", |inv, _| {
				Ok(Value::from(format!("{}", inv.this().get("greeting"))))
			})
			.build()
	}

	#[test]
	fn test_extend_inherits_members() {
		let child = Class::extend(&greeter(), "Child").build();
		let instance = child.new_instance().unwrap();

		assert_eq!(instance.send("greet", &[]).unwrap().as_str(), Some("hello"));
		assert!(child.is_subclass_of(&Class::base()));
	}

	#[test]
	fn test_call_super_chains() {
		let child = Class::extend(&greeter(), "Loud")
			.method("greet", |inv, args| {
				let parent = inv.call_super(args)?;
				Ok(Value::from(format!("{}!", parent).to_uppercase()))
			})
			.build();
		let grandchild = Class::extend(&child, "Louder")
			.method("greet", |inv, args| {
				Ok(Value::from(format!("{}!", inv.call_super(args)?)))
			})
			.build();

		let instance = grandchild.new_instance().unwrap();
		assert_eq!(instance.send("greet", &[]).unwrap().as_str(), Some("HELLO!!"));
	}

	#[test]
	fn test_call_super_without_parent_method() {
		let class = Class::extend(&Class::base(), "Lonely")
			.method("speak", |inv, args| inv.call_super(args))
			.build();
		let instance = class.new_instance().unwrap();

		assert!(matches!(
			instance.send("speak", &[]),
			Err(Error::MissingMethod { .. })
		));
	}

	#[test]
	fn test_mixins_merge_left_to_right() {
		let first = Mixin::new().property("color", "red").property("size", 1);
		let second = Mixin::new().property("color", "blue");
		let class = Class::extend(&Class::base(), "Mixed")
			.mixin(&first)
			.mixin(&second)
			.build();
		let instance = class.new_instance().unwrap();

		assert_eq!(instance.get("color").as_str(), Some("blue"));
		assert_eq!(instance.get("size").as_i64(), Some(1));
	}

	#[test]
	fn test_extend_does_not_mutate_parent() {
		let parent = greeter();
		let _child = Class::extend(&parent, "Child")
			.property("greeting", "hi")
			.build();

		let instance = parent.new_instance().unwrap();
		assert_eq!(instance.get("greeting").as_str(), Some("hello"));
	}

	#[test]
	fn test_create_order() {
		let log = Rc::new(std::cell::RefCell::new(Vec::<String>::new()));
		let class = {
			let log_init = log.clone();
			let log_class = log.clone();
			Class::extend(&Class::base(), "Ordered")
				.observes("name", "class_observer")
				.method("class_observer", move |_, _| {
					log_class.borrow_mut().push("class".to_string());
					Ok(Value::Null)
				})
				.method("initialize", move |inv, _| {
					log_init.borrow_mut().push("initialize".to_string());
					// Override observers are not wired yet.
					inv.this().set("name", "from-initialize")?;
					Ok(Value::Null)
				})
				.build()
		};

		let log_instance = log.clone();
		let instance = class
			.create(
				Overrides::new()
					.property("name", "override")
					.observes("name", "instance_observer")
					.method("instance_observer", move |_, _| {
						log_instance.borrow_mut().push("instance".to_string());
						Ok(Value::Null)
					}),
			)
			.unwrap();

		assert_eq!(*log.borrow(), vec!["initialize", "class"]);

		log.borrow_mut().clear();
		instance.set("name", "later").unwrap();
		assert_eq!(*log.borrow(), vec!["class", "instance"]);
	}
}
