//! Dotted property paths such as `controller.movie.title`.
//!
//! A path is resolved segment by segment against objects and maps. Every
//! segment but the last must land on a container; hitting anything else
//! is an [`Error::UnresolvedPath`] naming the offending segment. The last
//! segment may be missing and then reads as [`Value::Null`].

use std::fmt;

use crate::error::{Error, Result};
use crate::observable::Observable;
use crate::value::Value;

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
	raw: String,
	segments: Vec<String>,
}

impl PropertyPath {
	/// Parses a dotted path. Empty paths and empty segments are rejected.
	pub fn parse(path: &str) -> Result<Self> {
		let segments: Vec<String> = path.split('.').map(str::to_string).collect();
		if path.is_empty() || segments.iter().any(String::is_empty) {
			return Err(Error::InvalidPath(path.to_string()));
		}
		Ok(Self {
			raw: path.to_string(),
			segments,
		})
	}

	/// The original text.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// All segments.
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// The last segment: the property that is actually read or observed.
	pub fn property_name(&self) -> &str {
		// parse() guarantees at least one segment
		self.segments.last().map(String::as_str).unwrap_or_default()
	}

	/// Resolves every segment but the last, returning the owning container.
	pub fn resolve_owner(&self, root: &Value) -> Result<Value> {
		let mut current = root.clone();
		for segment in &self.segments[..self.segments.len() - 1] {
			current = match read(&current, segment) {
				Some(next @ (Value::Object(_) | Value::Map(_))) => next,
				_ => return Err(self.unresolved(segment)),
			};
		}
		match current {
			Value::Object(_) | Value::Map(_) => Ok(current),
			_ => Err(self.unresolved(self.property_name())),
		}
	}

	/// Resolves the whole path.
	pub fn resolve(&self, root: &Value) -> Result<Value> {
		let owner = self.resolve_owner(root)?;
		read(&owner, self.property_name()).ok_or_else(|| self.unresolved(self.property_name()))
	}

	fn unresolved(&self, segment: &str) -> Error {
		Error::UnresolvedPath {
			path: self.raw.clone(),
			segment: segment.to_string(),
		}
	}
}

impl fmt::Display for PropertyPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

fn read(container: &Value, key: &str) -> Option<Value> {
	match container {
		Value::Object(object) => Some(object.get(key)),
		Value::Map(map) => Some(map.get(key).cloned().unwrap_or_default()),
		_ => None,
	}
}

/// Resolves `path` against `root`.
pub fn get_path(root: &Value, path: &str) -> Result<Value> {
	PropertyPath::parse(path)?.resolve(root)
}

/// The last segment of a dotted path.
pub fn property_name(path: &str) -> &str {
	path.rsplit('.').next().unwrap_or(path)
}
