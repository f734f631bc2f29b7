//! Navigation history.
//!
//! [`History`] tracks the current normalized fragment of the environment's
//! location and emits [`URL_CHANGED`] whenever it takes a new value. The
//! environment itself is a [`Location`] collaborator; [`MemoryLocation`]
//! keeps an in-memory entry stack with back/forward support.
//!
//! States: idle until [`History::start`], active afterwards. While active,
//! environment notifications and [`History::navigate`] both funnel into
//! [`History::load_url`], which only emits when the fragment changed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use skull_core::{Events, Listeners, Value};

use crate::error::{Error, Result};

/// Event emitted with the new fragment as its only argument.
pub const URL_CHANGED: &str = "url:changed";

/// How fragments are stored in the location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
	/// `#fragment` in the URL hash.
	#[default]
	Hash,
	/// Real paths through push-state.
	#[serde(alias = "history")]
	Path,
}

impl fmt::Display for HistoryMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HistoryMode::Hash => f.write_str("hash"),
			HistoryMode::Path => f.write_str("path"),
		}
	}
}

impl FromStr for HistoryMode {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"hash" => Ok(HistoryMode::Hash),
			"path" | "history" => Ok(HistoryMode::Path),
			other => Err(format!("unknown history mode '{}'", other)),
		}
	}
}

/// Callback for environment-originated navigation.
pub type LocationListener = Rc<dyn Fn() -> skull_core::Result<()>>;

/// The environment's location.
pub trait Location {
	/// Current path, starting with `/`.
	fn path(&self) -> String;

	/// Current hash without the leading `#`.
	fn hash(&self) -> String;

	/// Whether path mode can be used.
	fn supports_push_state(&self) -> bool;

	/// Pushes a new path entry. Does not notify listeners.
	fn push_path(&self, url: &str);

	/// Assigns the hash. Does not notify listeners.
	fn set_hash(&self, fragment: &str);

	/// Registers a callback for back/forward and manual hash edits.
	fn subscribe(&self, listener: LocationListener);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
	path: String,
	hash: String,
}

/// In-memory location with an entry stack.
pub struct MemoryLocation {
	entries: RefCell<Vec<Entry>>,
	index: Cell<usize>,
	push_state: bool,
	listeners: RefCell<Vec<LocationListener>>,
}

impl Default for MemoryLocation {
	fn default() -> Self {
		Self::with_path("/")
	}
}

impl MemoryLocation {
	/// A location at `/` with an empty hash.
	pub fn new() -> Self {
		Self::default()
	}

	/// A location at `path`.
	pub fn with_path(path: &str) -> Self {
		Self {
			entries: RefCell::new(vec![Entry {
				path: path.to_string(),
				hash: String::new(),
			}]),
			index: Cell::new(0),
			push_state: true,
			listeners: RefCell::new(Vec::new()),
		}
	}

	/// Disables push-state support.
	pub fn without_push_state(mut self) -> Self {
		self.push_state = false;
		self
	}

	fn current(&self) -> Entry {
		self.entries.borrow()[self.index.get()].clone()
	}

	fn push(&self, entry: Entry) {
		let mut entries = self.entries.borrow_mut();
		entries.truncate(self.index.get() + 1);
		entries.push(entry);
		self.index.set(entries.len() - 1);
	}

	fn notify(&self) -> skull_core::Result<()> {
		let listeners = self.listeners.borrow().clone();
		for listener in listeners {
			listener()?;
		}
		Ok(())
	}

	/// Number of entries in the stack.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Whether the stack is empty (never true).
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	/// Moves one entry back and notifies. Returns false at the first entry.
	pub fn back(&self) -> skull_core::Result<bool> {
		let index = self.index.get();
		if index == 0 {
			return Ok(false);
		}
		self.index.set(index - 1);
		self.notify()?;
		Ok(true)
	}

	/// Moves one entry forward and notifies. Returns false at the last entry.
	pub fn forward(&self) -> skull_core::Result<bool> {
		let index = self.index.get();
		if index + 1 >= self.len() {
			return Ok(false);
		}
		self.index.set(index + 1);
		self.notify()?;
		Ok(true)
	}

	/// Simulates the user editing the hash, then notifies.
	pub fn edit_hash(&self, fragment: &str) -> skull_core::Result<()> {
		self.set_hash(fragment);
		self.notify()
	}
}

impl Location for MemoryLocation {
	fn path(&self) -> String {
		self.current().path
	}

	fn hash(&self) -> String {
		self.current().hash
	}

	fn supports_push_state(&self) -> bool {
		self.push_state
	}

	fn push_path(&self, url: &str) {
		let path = if url.starts_with('/') {
			url.to_string()
		} else {
			format!("/{}", url)
		};
		self.push(Entry {
			path,
			hash: String::new(),
		});
	}

	fn set_hash(&self, fragment: &str) {
		let path = self.current().path;
		self.push(Entry {
			path,
			hash: fragment.trim_start_matches('#').to_string(),
		});
	}

	fn subscribe(&self, listener: LocationListener) {
		self.listeners.borrow_mut().push(listener);
	}
}

impl fmt::Debug for MemoryLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryLocation")
			.field("entries", &self.entries.borrow())
			.field("index", &self.index.get())
			.field("push_state", &self.push_state)
			.finish()
	}
}

/// Fragment tracker over a [`Location`].
pub struct History {
	location: Rc<dyn Location>,
	mode: HistoryMode,
	root: String,
	fragment: RefCell<String>,
	active: Cell<bool>,
	listeners: Listeners,
}

impl History {
	/// Creates an idle history.
	///
	/// Fails with [`Error::UnsupportedHistoryMode`] when path mode is
	/// requested from a location without push-state support.
	pub fn new(location: Rc<dyn Location>, mode: HistoryMode, root: &str) -> Result<Rc<Self>> {
		if mode == HistoryMode::Path && !location.supports_push_state() {
			return Err(Error::UnsupportedHistoryMode { mode });
		}
		let root = format!("/{}/", root.trim_matches('/')).replace("//", "/");
		Ok(Rc::new(Self {
			location,
			mode,
			root,
			fragment: RefCell::new(String::new()),
			active: Cell::new(false),
			listeners: Listeners::new(),
		}))
	}

	/// Configured mode.
	pub fn mode(&self) -> HistoryMode {
		self.mode
	}

	/// Normalized root, always `/` or `/segment.../`.
	pub fn root(&self) -> &str {
		&self.root
	}

	/// Whether [`start`](Self::start) has run.
	pub fn is_active(&self) -> bool {
		self.active.get()
	}

	/// The stored fragment.
	pub fn fragment(&self) -> String {
		self.fragment.borrow().clone()
	}

	/// Starts tracking: stores the current fragment, subscribes to the
	/// location and emits [`URL_CHANGED`]. Calling it again does nothing.
	pub fn start(self: &Rc<Self>) -> skull_core::Result<()> {
		if self.active.replace(true) {
			return Ok(());
		}
		let fragment = self.current_fragment();
		*self.fragment.borrow_mut() = fragment.clone();

		let weak: Weak<History> = Rc::downgrade(self);
		self.location.subscribe(Rc::new(move || match weak.upgrade() {
			Some(history) => history.check_url().map(|_| ()),
			None => Ok(()),
		}));

		tracing::debug!(mode = %self.mode, root = %self.root, fragment = %fragment, "history started");
		self.send_event(URL_CHANGED, &[Value::from(fragment)])
	}

	/// The normalized fragment of the location right now.
	pub fn current_fragment(&self) -> String {
		let raw = match self.mode {
			HistoryMode::Hash => self.location.hash(),
			HistoryMode::Path => self.location.path(),
		};
		self.normalize_fragment(&raw)
	}

	/// Strips the root prefix, leading `#`/`/` and trailing `/`/whitespace.
	pub fn normalize_fragment(&self, raw: &str) -> String {
		let mut fragment = raw.trim_start_matches('#');
		let root = self.root.trim_end_matches('/');
		if !root.is_empty()
			&& let Some(rest) = fragment.strip_prefix(root)
			&& (rest.is_empty() || rest.starts_with('/'))
		{
			fragment = rest;
		}
		fragment
			.trim_start_matches(['#', '/'])
			.trim_end_matches(|c: char| c == '/' || c.is_whitespace())
			.to_string()
	}

	/// Re-reads the location and loads it if the fragment changed.
	pub fn check_url(&self) -> skull_core::Result<bool> {
		if !self.is_active() {
			return Ok(false);
		}
		let current = self.current_fragment();
		if current == *self.fragment.borrow() {
			return Ok(false);
		}
		self.load_url(&current)
	}

	/// Stores `fragment` and emits [`URL_CHANGED`] if it differs from the stored one.
	pub fn load_url(&self, fragment: &str) -> skull_core::Result<bool> {
		let fragment = self.normalize_fragment(fragment);
		if fragment == *self.fragment.borrow() {
			return Ok(false);
		}
		*self.fragment.borrow_mut() = fragment.clone();
		tracing::debug!(fragment = %fragment, "url changed");
		self.send_event(URL_CHANGED, &[Value::from(fragment)])?;
		Ok(true)
	}

	/// Updates the location and loads the fragment.
	///
	/// Before [`start`](Self::start) only the location is updated.
	pub fn navigate(&self, fragment: &str) -> skull_core::Result<bool> {
		let fragment = self.normalize_fragment(fragment);
		match self.mode {
			HistoryMode::Hash => self.location.set_hash(&fragment),
			HistoryMode::Path => self.location.push_path(&format!("{}{}", self.root, fragment)),
		}
		if !self.is_active() {
			return Ok(false);
		}
		self.load_url(&fragment)
	}
}

impl Events for History {
	fn listeners(&self) -> &Listeners {
		&self.listeners
	}
}

impl fmt::Debug for History {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("History")
			.field("mode", &self.mode)
			.field("root", &self.root)
			.field("fragment", &self.fragment.borrow())
			.field("active", &self.active.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use skull_core::Handler;

	fn recorder(history: &History) -> Rc<RefCell<Vec<String>>> {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		history.add_listener(
			URL_CHANGED,
			Handler::new(move |event| {
				sink.borrow_mut().push(event.args[0].to_string());
				Ok(())
			}),
			None,
		);
		seen
	}

	#[rstest]
	#[case("/", "#/movies/7/", "movies/7")]
	#[case("/", "movies", "movies")]
	#[case("/app", "/app/movies/7", "movies/7")]
	#[case("/app/", "/app", "")]
	#[case("/app", "/application/x", "application/x")]
	#[case("/", "  ", "")]
	fn test_normalize_fragment(#[case] root: &str, #[case] raw: &str, #[case] expected: &str) {
		let history = History::new(Rc::new(MemoryLocation::new()), HistoryMode::Hash, root).unwrap();
		assert_eq!(history.normalize_fragment(raw), expected);
	}

	#[test]
	fn test_path_mode_requires_push_state() {
		let location = Rc::new(MemoryLocation::new().without_push_state());
		let err = History::new(location, HistoryMode::Path, "/").unwrap_err();
		assert!(matches!(
			err,
			Error::UnsupportedHistoryMode {
				mode: HistoryMode::Path
			}
		));
	}

	#[test]
	fn test_start_emits_once() {
		let location = Rc::new(MemoryLocation::new());
		location.set_hash("movies");
		let history = History::new(location, HistoryMode::Hash, "/").unwrap();
		let seen = recorder(&history);

		history.start().unwrap();
		history.start().unwrap();
		assert!(history.is_active());
		assert_eq!(history.fragment(), "movies");
		assert_eq!(*seen.borrow(), vec!["movies".to_string()]);
	}

	#[test]
	fn test_navigate_dedupes_same_fragment() {
		let history = History::new(Rc::new(MemoryLocation::new()), HistoryMode::Hash, "/").unwrap();
		let seen = recorder(&history);
		history.start().unwrap();

		assert!(history.navigate("movies/7").unwrap());
		assert!(!history.navigate("/movies/7/").unwrap());
		assert_eq!(history.fragment(), "movies/7");
		assert_eq!(seen.borrow().len(), 2);
	}

	#[test]
	fn test_navigate_before_start_only_moves_location() {
		let location = Rc::new(MemoryLocation::new());
		let history = History::new(location.clone(), HistoryMode::Hash, "/").unwrap();
		let seen = recorder(&history);

		assert!(!history.navigate("movies").unwrap());
		assert_eq!(location.hash(), "movies");
		assert!(seen.borrow().is_empty());

		history.start().unwrap();
		assert_eq!(*seen.borrow(), vec!["movies".to_string()]);
	}

	#[test]
	fn test_path_mode_pushes_rooted_path() {
		let location = Rc::new(MemoryLocation::with_path("/app/"));
		let history = History::new(location.clone(), HistoryMode::Path, "app").unwrap();
		history.start().unwrap();

		history.navigate("movies/7").unwrap();
		assert_eq!(location.path(), "/app/movies/7");
		assert_eq!(history.fragment(), "movies/7");
	}

	#[test]
	fn test_back_and_hash_edit_notify() {
		let location = Rc::new(MemoryLocation::new());
		let history = History::new(location.clone(), HistoryMode::Hash, "/").unwrap();
		let seen = recorder(&history);
		history.start().unwrap();

		history.navigate("movies").unwrap();
		history.navigate("movies/1").unwrap();
		assert!(location.back().unwrap());
		assert_eq!(history.fragment(), "movies");

		location.edit_hash("reviews").unwrap();
		assert_eq!(history.fragment(), "reviews");
		assert_eq!(
			*seen.borrow(),
			vec!["", "movies", "movies/1", "movies", "reviews"]
		);
	}

	#[rstest]
	#[case("hash", HistoryMode::Hash)]
	#[case("path", HistoryMode::Path)]
	#[case("History", HistoryMode::Path)]
	fn test_mode_from_str(#[case] input: &str, #[case] expected: HistoryMode) {
		assert_eq!(input.parse::<HistoryMode>().unwrap(), expected);
	}
}
