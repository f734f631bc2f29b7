//! Dynamic values stored in object properties.
//!
//! Properties hold [`Value`]s. Change detection uses [`Value::identical`],
//! which compares primitives by value and containers by reference, so
//! replacing a list with an equal but distinct list is still a change.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::object::ObjectRef;

/// An opaque host value (for example a DOM event) carried through method arguments.
#[derive(Clone)]
pub struct NativeValue(Rc<dyn Any>);

impl NativeValue {
	/// Wraps a host value.
	pub fn new<T: Any>(value: T) -> Self {
		Self(Rc::new(value))
	}

	/// Wraps an already shared host value without copying it.
	pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
		Self(value)
	}

	/// Returns the wrapped value if it has type `T`.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref::<T>()
	}

	/// Returns true if both handles point at the same host value.
	pub fn ptr_eq(&self, other: &NativeValue) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for NativeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("NativeValue(..)")
	}
}

/// A dynamically typed property value.
#[derive(Clone, Debug, Default)]
pub enum Value {
	/// Absent value.
	#[default]
	Null,
	/// Boolean.
	Bool(bool),
	/// Integer number.
	Int(i64),
	/// Floating point number.
	Float(f64),
	/// Immutable string.
	Str(Rc<str>),
	/// Shared, immutable sequence.
	List(Rc<Vec<Value>>),
	/// Shared, immutable ordered map (plain data, not observable).
	Map(Rc<IndexMap<String, Value>>),
	/// Observable object.
	Object(ObjectRef),
	/// Opaque host value.
	Native(NativeValue),
}

impl Value {
	/// Builds a list value.
	pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
		Value::List(Rc::new(items.into_iter().collect()))
	}

	/// Builds a map value from key/value pairs.
	pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
		Value::Map(Rc::new(
			entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
		))
	}

	/// Strict identity comparison used for change detection.
	///
	/// Numbers compare numerically (`Int(1)` is identical to `Float(1.0)`,
	/// NaN is never identical to anything), strings by content, and lists,
	/// maps, objects and native values by reference.
	pub fn identical(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
			(Value::Float(a), Value::Float(b)) => a == b,
			(Value::Str(a), Value::Str(b)) => a == b,
			(Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
			(Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
			(Value::Native(a), Value::Native(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Truthiness as used by templates and loaded-state checks.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Int(i) => *i != 0,
			Value::Float(f) => *f != 0.0 && !f.is_nan(),
			Value::Str(s) => !s.is_empty(),
			Value::List(_) | Value::Map(_) | Value::Object(_) | Value::Native(_) => true,
		}
	}

	/// Returns true for [`Value::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Returns the boolean, if this is a boolean.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the number as an integer, if this is a whole number.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
			_ => None,
		}
	}

	/// Returns the number as a float.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(i) => Some(*i as f64),
			Value::Float(f) => Some(*f),
			_ => None,
		}
	}

	/// Returns the string slice, if this is a string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the items, if this is a list.
	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Value::List(items) => Some(items.as_slice()),
			_ => None,
		}
	}

	/// Returns the entries, if this is a map.
	pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
		match self {
			Value::Map(map) => Some(map),
			_ => None,
		}
	}

	/// Returns the object, if this is an object.
	pub fn as_object(&self) -> Option<&ObjectRef> {
		match self {
			Value::Object(obj) => Some(obj),
			_ => None,
		}
	}

	/// Returns the host value of type `T`, if this is a native value holding one.
	pub fn downcast_native<T: Any>(&self) -> Option<&T> {
		match self {
			Value::Native(native) => native.downcast_ref::<T>(),
			_ => None,
		}
	}

	/// Converts a JSON document into a value tree.
	pub fn from_json(json: &serde_json::Value) -> Self {
		match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(*b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Value::Int(i),
				None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Value::Str(Rc::from(s.as_str())),
			serde_json::Value::Array(items) => Value::list(items.iter().map(Value::from_json)),
			serde_json::Value::Object(map) => {
				Value::map(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
			}
		}
	}

	/// Converts plain data back into JSON. Objects and native values become `null`.
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null | Value::Object(_) | Value::Native(_) => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Int(i) => serde_json::Value::from(*i),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::Str(s) => serde_json::Value::String(s.to_string()),
			Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
			Value::Map(map) => serde_json::Value::Object(
				map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
			),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => Ok(()),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Float(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
			Value::Float(x) => write!(f, "{}", x),
			Value::Str(s) => f.write_str(s),
			Value::List(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					write!(f, "{}", item)?;
				}
				Ok(())
			}
			Value::Map(_) => write!(f, "{}", self.to_json()),
			Value::Object(obj) => write!(f, "[object {}]", obj.class_name()),
			Value::Native(_) => f.write_str("[native]"),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(value.into())
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<usize> for Value {
	fn from(value: usize) -> Self {
		Value::Int(value as i64)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(Rc::from(value))
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(Rc::from(value))
	}
}

impl From<ObjectRef> for Value {
	fn from(value: ObjectRef) -> Self {
		Value::Object(value)
	}
}

impl From<&ObjectRef> for Value {
	fn from(value: &ObjectRef) -> Self {
		Value::Object(value.clone())
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Value::List(Rc::new(value))
	}
}

impl From<NativeValue> for Value {
	fn from(value: NativeValue) -> Self {
		Value::Native(value)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Value::Null, false)]
	#[case(Value::Bool(false), false)]
	#[case(Value::Bool(true), true)]
	#[case(Value::Int(0), false)]
	#[case(Value::Int(3), true)]
	#[case(Value::Float(f64::NAN), false)]
	#[case(Value::from(""), false)]
	#[case(Value::from("x"), true)]
	#[case(Value::list(vec![]), true)]
	fn test_truthiness(#[case] value: Value, #[case] expected: bool) {
		assert_eq!(value.is_truthy(), expected);
	}

	#[test]
	fn test_identical_primitives_by_value() {
		assert!(Value::from("a").identical(&Value::from("a")));
		assert!(Value::Int(1).identical(&Value::Float(1.0)));
		assert!(!Value::Int(1).identical(&Value::from("1")));
		assert!(!Value::Float(f64::NAN).identical(&Value::Float(f64::NAN)));
		assert!(!Value::Null.identical(&Value::Bool(false)));
	}

	#[test]
	fn test_identical_containers_by_reference() {
		let a = Value::list(vec![Value::Int(1)]);
		let b = Value::list(vec![Value::Int(1)]);
		assert!(a.identical(&a.clone()));
		assert!(!a.identical(&b));
	}

	#[test]
	fn test_from_json_round_trip() {
		let json = json!({"id": 1, "title": "Alien", "rating": 8.5, "tags": ["scifi"], "sequel": null});
		let value = Value::from_json(&json);

		let map = value.as_map().unwrap();
		assert_eq!(map["id"].as_i64(), Some(1));
		assert_eq!(map["title"].as_str(), Some("Alien"));
		assert_eq!(map["tags"].as_list().unwrap().len(), 1);
		assert!(map["sequel"].is_null());
		assert_eq!(value.to_json(), json);
	}

	#[test]
	fn test_display() {
		assert_eq!(Value::Null.to_string(), "");
		assert_eq!(Value::Float(2.0).to_string(), "2");
		assert_eq!(Value::Float(2.5).to_string(), "2.5");
		assert_eq!(
			Value::list(vec![Value::Int(1), Value::from("b")]).to_string(),
			"1,b"
		);
	}

	#[test]
	fn test_native_downcast() {
		let value = Value::from(NativeValue::new(42u8));
		assert_eq!(value.downcast_native::<u8>(), Some(&42));
		assert!(value.downcast_native::<String>().is_none());
	}
}
