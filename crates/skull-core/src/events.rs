//! Named-event publish/subscribe.
//!
//! A [`Listeners`] table maps event names to an ordered list of handlers.
//! Anything that owns a table can implement [`Events`] and get
//! `add_listener` / `remove_listener` / `send_event` for free.
//!
//! ## Receivers
//!
//! A handler registered with a bound target receives that target as its
//! receiver; otherwise it receives the event source (when the source is an
//! object). Bound targets are held weakly so a listener never keeps its
//! target alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::object::{ObjectRef, WeakObjectRef};
use crate::value::Value;

/// A single event delivery.
pub struct Event<'a> {
	/// Event name (e.g. `"title:changed"`).
	pub name: &'a str,
	/// Bound target if one was given at registration, else the event source.
	pub receiver: Option<&'a ObjectRef>,
	/// Positional arguments passed to `send_event`.
	pub args: &'a [Value],
}

type Callback = dyn Fn(&Event<'_>) -> Result<()>;

enum HandlerKind {
	Closure(Box<Callback>),
	Method(String),
}

/// A listener callback, compared by identity on removal.
#[derive(Clone)]
pub struct Handler(Rc<HandlerKind>);

impl Handler {
	/// Creates a handler from a closure.
	pub fn new<F>(callback: F) -> Self
	where
		F: Fn(&Event<'_>) -> Result<()> + 'static,
	{
		Self(Rc::new(HandlerKind::Closure(Box::new(callback))))
	}

	/// Creates a handler that sends `method` to the receiver with the event arguments.
	pub fn method(method: impl Into<String>) -> Self {
		Self(Rc::new(HandlerKind::Method(method.into())))
	}

	/// Returns true if both handles refer to the same registration.
	pub fn ptr_eq(&self, other: &Handler) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub(crate) fn invoke(&self, event: &Event<'_>) -> Result<()> {
		match &*self.0 {
			HandlerKind::Closure(callback) => callback(event),
			HandlerKind::Method(method) => match event.receiver {
				Some(receiver) => receiver.send(method, event.args).map(|_| ()),
				None => Err(Error::MissingCapability {
					capability: "object receiver",
					operation: format!("dispatch of '{}' to method '{}'", event.name, method),
				}),
			},
		}
	}
}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.0 {
			HandlerKind::Closure(_) => f.write_str("Handler(<closure>)"),
			HandlerKind::Method(name) => write!(f, "Handler(method {})", name),
		}
	}
}

#[derive(Clone)]
struct Listener {
	handler: Handler,
	target: Option<WeakObjectRef>,
}

/// Listener table: event name to handlers in registration order.
#[derive(Default)]
pub struct Listeners {
	table: RefCell<HashMap<String, Vec<Listener>>>,
}

impl Listeners {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a handler, optionally bound to a target receiver.
	pub fn add(&self, name: &str, handler: Handler, target: Option<&ObjectRef>) {
		self.table
			.borrow_mut()
			.entry(name.to_string())
			.or_default()
			.push(Listener {
				handler,
				target: target.map(ObjectRef::downgrade),
			});
	}

	/// Removes every registration of `handler` under `name`.
	pub fn remove(&self, name: &str, handler: &Handler) {
		let mut table = self.table.borrow_mut();
		if let Some(listeners) = table.get_mut(name) {
			listeners.retain(|l| !l.handler.ptr_eq(handler));
			if listeners.is_empty() {
				table.remove(name);
			}
		}
	}

	/// Number of handlers registered under `name`.
	pub fn count(&self, name: &str) -> usize {
		self.table.borrow().get(name).map_or(0, Vec::len)
	}

	/// Invokes the handlers registered under `name` in registration order.
	///
	/// Dispatch runs over a snapshot: registrations made or removed by a
	/// handler take effect from the next dispatch. The first error stops
	/// the dispatch and is returned.
	pub fn send(&self, name: &str, args: &[Value], source: Option<&ObjectRef>) -> Result<()> {
		let snapshot = match self.table.borrow().get(name) {
			Some(listeners) => listeners.clone(),
			None => return Ok(()),
		};

		for listener in snapshot {
			let receiver = match &listener.target {
				Some(weak) => match weak.upgrade() {
					Some(target) => Some(target),
					None => {
						tracing::warn!(event = name, "skipping listener whose target was dropped");
						continue;
					}
				},
				None => source.cloned(),
			};
			tracing::trace!(event = name, handler = ?listener.handler, "dispatching");
			listener.handler.invoke(&Event {
				name,
				receiver: receiver.as_ref(),
				args,
			})?;
		}
		Ok(())
	}
}

/// Named-event capability.
pub trait Events {
	/// The listener table backing this emitter.
	fn listeners(&self) -> &Listeners;

	/// The receiver passed to handlers registered without a bound target.
	fn event_source(&self) -> Option<ObjectRef> {
		None
	}

	/// Registers `handler` for `name`.
	fn add_listener(&self, name: &str, handler: Handler, target: Option<&ObjectRef>) {
		self.listeners().add(name, handler, target);
	}

	/// Removes `handler` from `name` (identity match).
	fn remove_listener(&self, name: &str, handler: &Handler) {
		self.listeners().remove(name, handler);
	}

	/// Synchronously invokes every handler registered for `name`.
	fn send_event(&self, name: &str, args: &[Value]) -> Result<()> {
		let source = self.event_source();
		self.listeners().send(name, args, source.as_ref())
	}
}
