//! # Skull Pages
//!
//! Routing, views and data for the Skull client framework, built on the
//! object model of `skull-core`.
//!
//! ## Flow
//!
//! [`History`] notices a fragment change and emits `url:changed`; the
//! [`Router`] matches the fragment and executes a fresh [`Route`], which
//! instantiates its controller and [`View`]; the view renders its template
//! and wires actions, bindings and collections to live observers. From
//! then on, `set` calls on controllers or records (for instance when a
//! [`Store`] fetch resolves) update the bound markup in place.
//!
//! ## Collaborators
//!
//! The environment is reached through small traits, each with an
//! in-memory implementation:
//!
//! | Trait                | In-memory            |
//! |----------------------|----------------------|
//! | [`Dom`]              | [`MemoryDom`]        |
//! | [`Location`]         | [`MemoryLocation`]   |
//! | [`TemplateProvider`] | [`TemplateRegistry`] |
//! | [`FetchProvider`]    | [`MockFetcher`]      |
//!
//! The `http` feature adds `HttpFetcher`, backed by reqwest.

pub mod app;
pub mod config;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod history;
pub mod markers;
pub mod model;
pub mod page;
pub mod route;
pub mod router;
pub mod store;
pub mod template;
pub mod view;

pub use app::{Application, ApplicationBuilder};
pub use config::{ApiSettings, ConfigError, HistorySettings, Settings, ViewSettings};
pub use dom::{Dom, DomEvent, DomListener, MemoryDom, NodeId};
pub use error::{Error, Result};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchError, FetchMethod, FetchProvider, FetchRequest, MockFetcher, PendingFetch};
pub use history::{History, HistoryMode, Location, MemoryLocation, URL_CHANGED};
pub use markers::{ACTION_ATTR, BINDING_ATTR, COLLECTION_ATTR, MarkerRegistry};
pub use model::{Model, Record, RecordArray, Resource};
pub use page::{IntoPage, Page, PageElement};
pub use route::{Controller, Route, RouteClass, RouteClassBuilder, RouteState};
pub use router::{CompiledRoute, RoutePattern, RouteTable, Router};
pub use store::{Found, Store};
pub use template::{
	ActionOptions, RenderFn, RenderScope, TemplateLoader, TemplateProvider, TemplateRegistry,
};
pub use view::{SUPPORTED_EVENTS, View};
