//! Error types for the object model.
//!
//! Every fallible operation in the object model (method dispatch, observer
//! callbacks, property path resolution) reports failures through [`Error`].

use thiserror::Error;

/// Result type for object model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Object model errors.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
	/// The receiver has no method with the requested name.
	#[error("'{class}' does not respond to '{method}'")]
	MissingMethod {
		/// Class name of the receiver.
		class: String,
		/// Requested method name.
		method: String,
	},

	/// A capability was used on a value that does not provide it.
	#[error("{operation} requires the {capability} capability")]
	MissingCapability {
		/// Missing capability (e.g. "observable").
		capability: &'static str,
		/// Operation that was attempted.
		operation: String,
	},

	/// An intermediate segment of a property path did not resolve to a container.
	#[error("cannot resolve '{segment}' in property path '{path}'")]
	UnresolvedPath {
		/// The full dotted path.
		path: String,
		/// The segment that could not be resolved.
		segment: String,
	},

	/// A property path could not be parsed.
	#[error("invalid property path: '{0}'")]
	InvalidPath(String),

	/// Application-defined failure raised from a method or callback.
	#[error("{0}")]
	Custom(String),
}

impl Error {
	/// Creates an application-defined error.
	pub fn custom(message: impl Into<String>) -> Self {
		Self::Custom(message.into())
	}
}
