//! Application settings.
//!
//! Settings come from TOML, optionally overridden by environment
//! variables, and fall back to defaults for anything missing:
//!
//! ```toml
//! [history]
//! mode = "hash"     # or "history" / "path"
//! root = "/"
//!
//! [view]
//! root_element = "body"
//!
//! [api]
//! base_url = "https://api.example.com"
//! ```
//!
//! | Variable              | Setting             |
//! |-----------------------|---------------------|
//! | `SKULL_HISTORY_MODE`  | `history.mode`      |
//! | `SKULL_HISTORY_ROOT`  | `history.root`      |
//! | `SKULL_ROOT_ELEMENT`  | `view.root_element` |
//! | `SKULL_API_BASE_URL`  | `api.base_url`      |

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::HistoryMode;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SKULL_";

/// Settings loading failures.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The settings file could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// The settings file is not valid TOML for [`Settings`].
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// An override has an unusable value.
	#[error("invalid value for {key}: '{value}'")]
	InvalidValue {
		/// Setting or variable name.
		key: String,
		/// Offending value.
		value: String,
	},
}

/// History settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
	/// Hash or path mode.
	pub mode: HistoryMode,
	/// URL prefix stripped from fragments.
	pub root: String,
}

impl Default for HistorySettings {
	fn default() -> Self {
		Self {
			mode: HistoryMode::Hash,
			root: "/".to_string(),
		}
	}
}

/// View settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
	/// Selector of the element views attach under when they name none.
	pub root_element: String,
}

impl Default for ViewSettings {
	fn default() -> Self {
		Self {
			root_element: "body".to_string(),
		}
	}
}

/// Remote API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
	/// Prefix for relative model URLs.
	pub base_url: Option<String>,
}

/// All settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// History settings.
	pub history: HistorySettings,
	/// View settings.
	pub view: ViewSettings,
	/// API settings.
	pub api: ApiSettings,
}

impl Settings {
	/// Parses TOML.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Reads and parses a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path)?;
		tracing::debug!(path = %path.display(), "loading settings");
		Self::from_toml_str(&source)
	}

	/// Applies `SKULL_*` environment overrides.
	pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
		self.with_overrides(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())
	}

	/// Applies overrides from `lookup`, which receives names without the prefix.
	pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(mode) = lookup("HISTORY_MODE") {
			self.history.mode = mode.parse().map_err(|_| ConfigError::InvalidValue {
				key: format!("{}HISTORY_MODE", ENV_PREFIX),
				value: mode.clone(),
			})?;
		}
		if let Some(root) = lookup("HISTORY_ROOT") {
			self.history.root = root;
		}
		if let Some(root_element) = lookup("ROOT_ELEMENT") {
			if root_element.trim().is_empty() {
				return Err(ConfigError::InvalidValue {
					key: format!("{}ROOT_ELEMENT", ENV_PREFIX),
					value: root_element,
				});
			}
			self.view.root_element = root_element;
		}
		if let Some(base_url) = lookup("API_BASE_URL") {
			self.api.base_url = (!base_url.is_empty()).then_some(base_url);
		}
		Ok(self)
	}
}
