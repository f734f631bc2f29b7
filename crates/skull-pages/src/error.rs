//! Error types for routing, views and the store.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::history::HistoryMode;

/// Result type for page-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Page-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// Failure raised by the object model (missing method, callback error, ...).
	#[error(transparent)]
	Core(#[from] skull_core::Error),

	/// The environment cannot provide the requested history mode.
	#[error("history mode '{mode}' is not supported by this environment")]
	UnsupportedHistoryMode {
		/// Requested mode.
		mode: HistoryMode,
	},

	/// A route pattern did not compile.
	#[error("invalid route pattern '{pattern}': {source}")]
	InvalidRoute {
		/// Pattern as registered.
		pattern: String,
		/// Underlying regex error.
		#[source]
		source: regex::Error,
	},

	/// No template is registered under the given id.
	#[error("template not found: {0}")]
	TemplateNotFound(String),

	/// The element a view should attach under does not exist.
	#[error("root element not found: {0}")]
	RootElementNotFound(String),

	/// Markup carries a marker id the view's registry does not know.
	#[error("unknown {kind} marker: {id}")]
	UnknownMarker {
		/// Marker kind ("action", "binding", "collection").
		kind: &'static str,
		/// Marker id.
		id: u64,
	},

	/// A fetch could not be prepared.
	#[error(transparent)]
	Fetch(#[from] FetchError),

	/// Settings could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// A required collaborator was not supplied to the application builder.
	#[error("missing collaborator: {0}")]
	MissingCollaborator(&'static str),
}

impl From<Error> for skull_core::Error {
	fn from(err: Error) -> Self {
		match err {
			Error::Core(inner) => inner,
			other => skull_core::Error::Custom(other.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_core_errors_pass_through() {
		let core = skull_core::Error::MissingMethod {
			class: "View".to_string(),
			method: "save".to_string(),
		};
		let err: Error = core.clone().into();
		assert_eq!(err.to_string(), core.to_string());

		let back: skull_core::Error = err.into();
		assert_eq!(back, core);
	}

	#[test]
	fn test_page_errors_become_custom_core_errors() {
		let err = Error::TemplateNotFound("movies".to_string());
		let core: skull_core::Error = err.into();
		assert_eq!(
			core,
			skull_core::Error::Custom("template not found: movies".to_string())
		);
	}

	#[test]
	fn test_unsupported_mode_display() {
		let err = Error::UnsupportedHistoryMode {
			mode: HistoryMode::Path,
		};
		assert_eq!(
			err.to_string(),
			"history mode 'path' is not supported by this environment"
		);
	}
}
