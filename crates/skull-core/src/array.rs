//! Uniform iteration over plain lists and (possibly lazily loaded) proxies.
//!
//! An array proxy is an object whose `content` property holds a list and
//! whose `is_loaded` flag says whether that content is final. Iterating an
//! unloaded proxy defers the callback until `is_loaded` becomes true.

use std::rc::Rc;

use crate::class::Class;
use crate::error::Result;
use crate::events::Handler;
use crate::object::ObjectRef;
use crate::observable::Observable;
use crate::value::Value;

/// Per-item callback used by [`for_each`].
pub type ItemCallback = Rc<dyn Fn(&Value) -> Result<()>>;

/// Property holding the proxied list.
pub const CONTENT: &str = "content";

/// Property holding the loaded flag.
pub const IS_LOADED: &str = "is_loaded";

thread_local! {
	static ARRAY_PROXY_CLASS: Rc<Class> = Class::extend(&Class::base(), "ArrayProxy")
		.property(CONTENT, Value::list(Vec::new()))
		.property(IS_LOADED, true)
		.build();
}

/// The array proxy base class.
pub struct ArrayProxy;

impl ArrayProxy {
	/// The shared `ArrayProxy` class.
	pub fn class() -> Rc<Class> {
		ARRAY_PROXY_CLASS.with(Rc::clone)
	}

	/// Creates a loaded proxy over `items`.
	pub fn with_items(items: Vec<Value>) -> Result<ObjectRef> {
		let proxy = Self::class().new_instance()?;
		proxy.set(CONTENT, Value::from(items))?;
		Ok(proxy)
	}

	/// Appends one item, or every item of a list, replacing `content`.
	///
	/// The content list is replaced rather than mutated, so observers of
	/// `content` are notified.
	pub fn append(proxy: &ObjectRef, items: Value) -> Result<()> {
		let mut content: Vec<Value> = proxy
			.get(CONTENT)
			.as_list()
			.map(<[Value]>::to_vec)
			.unwrap_or_default();
		match items {
			Value::List(list) => content.extend(list.iter().cloned()),
			item => content.push(item),
		}
		proxy.set(CONTENT, Value::from(content))
	}
}

/// Returns false only for proxies whose `is_loaded` flag is falsy.
pub fn is_loaded(value: &Value) -> bool {
	match value {
		Value::Object(object) => object.get(IS_LOADED).is_truthy(),
		_ => true,
	}
}

/// Snapshot of the items of a list or proxy. Other values have no items.
pub fn items(value: &Value) -> Vec<Value> {
	match value {
		Value::List(list) => list.as_ref().clone(),
		Value::Object(object) => object
			.get(CONTENT)
			.as_list()
			.map(<[Value]>::to_vec)
			.unwrap_or_default(),
		_ => Vec::new(),
	}
}

/// Number of items of a list or proxy.
pub fn len(value: &Value) -> usize {
	match value {
		Value::List(list) => list.len(),
		Value::Object(object) => object.get(CONTENT).as_list().map_or(0, <[Value]>::len),
		_ => 0,
	}
}

/// Calls `callback` for every item, in order.
///
/// For an unloaded proxy, iteration is deferred: an `is_loaded` observer
/// runs it once the flag turns true.
pub fn for_each(value: &Value, callback: ItemCallback) -> Result<()> {
	if let Value::Object(proxy) = value
		&& !is_loaded(value)
	{
		tracing::trace!(class = %proxy.class_name(), "deferring iteration until loaded");
		proxy.add_observer(
			IS_LOADED,
			Handler::new(move |event| {
				let Some(receiver) = event.receiver else {
					return Ok(());
				};
				let loaded = Value::Object(receiver.clone());
				if !is_loaded(&loaded) {
					return Ok(());
				}
				for item in items(&loaded) {
					callback(&item)?;
				}
				Ok(())
			}),
		);
		return Ok(());
	}

	for item in items(value) {
		callback(&item)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;

	fn collector() -> (Rc<RefCell<Vec<i64>>>, ItemCallback) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		let callback: ItemCallback = Rc::new(move |item: &Value| {
			sink.borrow_mut().push(item.as_i64().unwrap_or(-1));
			Ok(())
		});
		(seen, callback)
	}

	#[test]
	fn test_for_each_plain_list() {
		let (seen, callback) = collector();
		for_each(&Value::list(vec![Value::from(1), Value::from(2)]), callback).unwrap();
		assert_eq!(*seen.borrow(), vec![1, 2]);
	}

	#[test]
	fn test_for_each_defers_until_loaded() {
		let proxy = ArrayProxy::class().new_instance().unwrap();
		proxy.set(IS_LOADED, false).unwrap();
		let (seen, callback) = collector();

		for_each(&Value::from(&proxy), callback).unwrap();
		assert!(seen.borrow().is_empty());

		proxy
			.set(CONTENT, Value::list(vec![Value::from(4), Value::from(5)]))
			.unwrap();
		assert!(seen.borrow().is_empty());

		proxy.set(IS_LOADED, true).unwrap();
		assert_eq!(*seen.borrow(), vec![4, 5]);
	}

	#[test]
	fn test_append_single_and_many() {
		let proxy = ArrayProxy::with_items(vec![Value::from(1)]).unwrap();
		ArrayProxy::append(&proxy, Value::from(2)).unwrap();
		ArrayProxy::append(&proxy, Value::list(vec![Value::from(3), Value::from(4)])).unwrap();

		assert_eq!(len(&Value::from(&proxy)), 4);
	}

	#[test]
	fn test_non_collections_are_empty() {
		assert_eq!(len(&Value::from("abc")), 0);
		assert!(items(&Value::Null).is_empty());
		assert!(is_loaded(&Value::Null));
	}
}
