//! Models and the observable records a [`Store`](crate::store::Store) returns.
//!
//! A [`Record`] and a [`RecordArray`] wrap a [`PendingFetch`]. Both start
//! with `is_loaded` false. On resolution `content` is set first and
//! `is_loaded` flips to true afterwards, so `is_loaded` observers always
//! see the final content. Unresolved or failed fetches leave `is_loaded`
//! false.

use std::rc::Rc;

use skull_core::array::{self, CONTENT, IS_LOADED, ItemCallback};
use skull_core::{ArrayProxy, Class, ObjectRef, Observable, Value};

use crate::error::Result;
use crate::fetch::PendingFetch;

/// Hook sent to a record after its content arrived.
pub const RECORD_DID_LOAD: &str = "record_did_load";

/// A fetchable resource.
pub trait Model {
	/// Display name.
	fn name(&self) -> &str;

	/// List URL.
	fn url(&self) -> &str;

	/// URL of one record.
	fn record_url(&self, id: &str) -> String {
		format!("{}/{}", self.url().trim_end_matches('/'), urlencoding::encode(id))
	}

	/// Class records of this model are created from.
	fn record_class(&self) -> Rc<Class> {
		Record::class()
	}
}

/// A [`Model`] described by URLs.
#[derive(Debug, Clone)]
pub struct Resource {
	name: String,
	url: String,
	record_url: Option<String>,
	record_class: Option<Rc<Class>>,
}

impl Resource {
	/// A resource listed at `url`; records default to `url/{id}`.
	pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			url: url.into(),
			record_url: None,
			record_class: None,
		}
	}

	/// Record URL template; `{id}` is replaced by the encoded id.
	pub fn with_record_url(mut self, template: impl Into<String>) -> Self {
		self.record_url = Some(template.into());
		self
	}

	/// Record class, which should extend [`Record::class`].
	pub fn with_record_class(mut self, class: Rc<Class>) -> Self {
		self.record_class = Some(class);
		self
	}
}

impl Model for Resource {
	fn name(&self) -> &str {
		&self.name
	}

	fn url(&self) -> &str {
		&self.url
	}

	fn record_url(&self, id: &str) -> String {
		match &self.record_url {
			Some(template) => template.replace("{id}", &urlencoding::encode(id)),
			None => format!("{}/{}", self.url.trim_end_matches('/'), urlencoding::encode(id)),
		}
	}

	fn record_class(&self) -> Rc<Class> {
		self.record_class.clone().unwrap_or_else(Record::class)
	}
}

thread_local! {
	static RECORD_CLASS: Rc<Class> = Class::extend(&Class::base(), "Record")
		.property(CONTENT, Value::Null)
		.property(IS_LOADED, false)
		.method(RECORD_DID_LOAD, |_, _| Ok(Value::Null))
		.delegate_to(CONTENT)
		.build();

	static RECORD_ARRAY_CLASS: Rc<Class> = Class::extend(&ArrayProxy::class(), "RecordArray")
		.property(IS_LOADED, false)
		.build();
}

/// A single fetched record.
///
/// Reads of unknown properties fall through to `content`, so
/// `record.get("title")` works once loaded.
#[derive(Debug, Clone)]
pub struct Record {
	object: ObjectRef,
	fetch: Option<PendingFetch>,
}

impl Record {
	/// The `Record` class.
	pub fn class() -> Rc<Class> {
		RECORD_CLASS.with(Rc::clone)
	}

	/// Creates an unloaded record of `class` filled when `pending` resolves.
	pub fn from_fetch(class: &Rc<Class>, pending: &PendingFetch) -> Result<Self> {
		let object = class.new_instance()?;
		let target = object.clone();
		pending.on_success(move |json| {
			target.set(CONTENT, Value::from_json(json))?;
			target.set(IS_LOADED, true)?;
			target.send(RECORD_DID_LOAD, &[])?;
			Ok(())
		})?;
		Ok(Self {
			object,
			fetch: Some(pending.clone()),
		})
	}

	/// The record object.
	pub fn object(&self) -> &ObjectRef {
		&self.object
	}

	/// The originating fetch.
	pub fn fetch(&self) -> Option<&PendingFetch> {
		self.fetch.as_ref()
	}

	/// Whether the content arrived.
	pub fn is_loaded(&self) -> bool {
		self.object.get(IS_LOADED).is_truthy()
	}

	/// The payload, null until loaded.
	pub fn content(&self) -> Value {
		self.object.get(CONTENT)
	}

	/// Reads a property, falling through to the payload.
	pub fn get(&self, key: &str) -> Value {
		self.object.get(key)
	}
}

impl From<Record> for Value {
	fn from(record: Record) -> Self {
		Value::Object(record.object)
	}
}

/// A fetched collection of payloads.
#[derive(Debug, Clone)]
pub struct RecordArray {
	object: ObjectRef,
	fetch: Option<PendingFetch>,
}

impl RecordArray {
	/// The `RecordArray` class, an array proxy that starts unloaded.
	pub fn class() -> Rc<Class> {
		RECORD_ARRAY_CLASS.with(Rc::clone)
	}

	/// Creates an unloaded array filled when `pending` resolves.
	///
	/// A JSON array becomes the content list; any other payload becomes a
	/// one-element list.
	pub fn from_fetch(pending: &PendingFetch) -> Result<Self> {
		let object = Self::class().new_instance()?;
		let target = object.clone();
		pending.on_success(move |json| {
			let content = match Value::from_json(json) {
				list @ Value::List(_) => list,
				other => Value::list([other]),
			};
			target.set(CONTENT, content)?;
			target.set(IS_LOADED, true)?;
			Ok(())
		})?;
		Ok(Self {
			object,
			fetch: Some(pending.clone()),
		})
	}

	/// Creates a loaded array over `items`.
	pub fn loaded(items: Vec<Value>) -> Result<Self> {
		let object = Self::class().new_instance()?;
		object.set(CONTENT, Value::from(items))?;
		object.set(IS_LOADED, true)?;
		Ok(Self {
			object,
			fetch: None,
		})
	}

	/// The proxy object.
	pub fn object(&self) -> &ObjectRef {
		&self.object
	}

	/// The originating fetch.
	pub fn fetch(&self) -> Option<&PendingFetch> {
		self.fetch.as_ref()
	}

	/// Whether the content arrived.
	pub fn is_loaded(&self) -> bool {
		self.object.get(IS_LOADED).is_truthy()
	}

	/// Snapshot of the items.
	pub fn content(&self) -> Vec<Value> {
		array::items(&Value::from(&self.object))
	}

	/// Number of items.
	pub fn len(&self) -> usize {
		array::len(&Value::from(&self.object))
	}

	/// Whether there are no items.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Appends one item, or each item of a list.
	pub fn add(&self, items: impl Into<Value>) -> Result<()> {
		Ok(ArrayProxy::append(&self.object, items.into())?)
	}

	/// Iterates the items, deferring until loaded.
	pub fn for_each<F>(&self, callback: F) -> Result<()>
	where
		F: Fn(&Value) -> skull_core::Result<()> + 'static,
	{
		let callback: ItemCallback = Rc::new(callback);
		Ok(array::for_each(&Value::from(&self.object), callback)?)
	}
}

impl From<RecordArray> for Value {
	fn from(records: RecordArray) -> Self {
		Value::Object(records.object)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fetch::FetchRequest;
	use serde_json::json;
	use std::cell::RefCell;

	#[test]
	fn test_record_url_templates() {
		let plain = Resource::new("Movie", "/movies/");
		assert_eq!(plain.record_url("7"), "/movies/7");

		let templated = Resource::new("Movie", "/movies.json").with_record_url("/movies/{id}.json");
		assert_eq!(templated.record_url("a b"), "/movies/a%20b.json");
		assert!(Rc::ptr_eq(&templated.record_class(), &Record::class()));
	}

	#[test]
	fn test_record_loads_and_delegates() {
		let pending = PendingFetch::new(FetchRequest::get("/movies/7.json"));
		let record = Record::from_fetch(&Record::class(), &pending).unwrap();
		assert!(!record.is_loaded());
		assert!(record.get("title").is_null());

		pending.resolve(json!({"id": 7, "title": "Heat"})).unwrap();
		assert!(record.is_loaded());
		assert_eq!(record.get("title").as_str(), Some("Heat"));
		assert_eq!(record.content().as_map().map(|m| m.len()), Some(2));
	}

	#[test]
	fn test_record_did_load_hook() {
		let loaded = Rc::new(RefCell::new(Vec::new()));
		let sink = loaded.clone();
		let movie = Class::extend(&Record::class(), "Movie")
			.method(RECORD_DID_LOAD, move |inv, _| {
				sink.borrow_mut().push(inv.this().get("title").to_string());
				Ok(Value::Null)
			})
			.build();
		let pending = PendingFetch::new(FetchRequest::get("/movies/1.json"));
		Record::from_fetch(&movie, &pending).unwrap();

		pending.resolve(json!({"title": "Ronin"})).unwrap();
		assert_eq!(*loaded.borrow(), vec!["Ronin".to_string()]);
	}

	#[test]
	fn test_record_array_wraps_single_payload() {
		let pending = PendingFetch::new(FetchRequest::get("/movies.json"));
		let records = RecordArray::from_fetch(&pending).unwrap();
		pending.resolve(json!({"id": 1})).unwrap();
		assert_eq!(records.len(), 1);
	}

	#[test]
	fn test_record_array_add() {
		let records = RecordArray::loaded(vec![Value::from(1)]).unwrap();
		records.add(2).unwrap();
		records.add(vec![Value::from(3), Value::from(4)]).unwrap();
		let items: Vec<i64> = records.content().iter().filter_map(Value::as_i64).collect();
		assert_eq!(items, vec![1, 2, 3, 4]);
	}
}
