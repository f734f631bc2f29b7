//! # Skull Core
//!
//! The object model underneath the Skull client framework:
//!
//! - **Classes** ([`Class`], [`ClassBuilder`], [`Mixin`]): immutable member
//!   tables with single inheritance, left-to-right mixin merging, explicit
//!   super calls and declarative `observes` tables.
//! - **Objects** ([`ObjectRef`]): instances with their own properties and a
//!   private listener table.
//! - **Events** ([`Events`], [`Handler`]): ordered, synchronous named-event
//!   dispatch.
//! - **Observation** ([`Observable`]): `get`/`set` with strict-inequality
//!   change detection; every change fires `all:changed` before
//!   `<property>:changed`.
//! - **Array proxies** ([`array`]): uniform iteration over lists and lazily
//!   loaded collections.
//! - **Property paths** ([`PropertyPath`]): dotted access such as
//!   `controller.movie.title`.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); callbacks run
//! synchronously on the caller's turn and errors propagate back to the
//! code that triggered them.

pub mod array;
pub mod class;
pub mod error;
pub mod events;
pub mod object;
pub mod observable;
pub mod path;
pub mod value;

pub use array::ArrayProxy;
pub use class::{Class, ClassBuilder, Invocation, Member, MethodFn, Mixin, Overrides};
pub use error::{Error, Result};
pub use events::{Event, Events, Handler, Listeners};
pub use object::{ObjectRef, WeakObjectRef};
pub use observable::{ALL_CHANGED, Observable, changed_event, observe, unobserve};
pub use path::{PropertyPath, get_path, property_name};
pub use value::{NativeValue, Value};
