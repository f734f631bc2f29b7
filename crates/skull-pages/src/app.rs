//! The application context.
//!
//! An [`Application`] owns the router, the store and the collaborators
//! (location, DOM, templates, fetch provider), and is passed explicitly to
//! whatever needs them. Building it connects history changes to route
//! loading; [`Application::start`] begins tracking the location.
//!
//! ```ignore
//! let app = Application::builder()
//!     .settings(Settings::from_file("skull.toml")?.with_env_overrides()?)
//!     .templates(templates)
//!     .fetcher(Rc::new(MockFetcher::new()))
//!     .build()?;
//! app.define([("", index_route), ("movies/:id", movie_route)])?;
//! app.start()?;
//! ```

use std::fmt;
use std::rc::{Rc, Weak};

use skull_core::{Events, Handler};

use crate::config::Settings;
use crate::dom::{Dom, MemoryDom};
use crate::error::{Error, Result};
use crate::fetch::FetchProvider;
use crate::history::{History, Location, MemoryLocation, URL_CHANGED};
use crate::route::{Route, RouteClass};
use crate::router::{RoutePattern, Router};
use crate::store::Store;
use crate::template::{TemplateLoader, TemplateRegistry};

struct AppInner {
	settings: Settings,
	router: Router,
	store: Store,
	dom: Rc<dyn Dom>,
	templates: Rc<dyn TemplateLoader>,
}

/// Shared application context.
#[derive(Clone)]
pub struct Application {
	inner: Rc<AppInner>,
}

impl Application {
	/// Starts building an application.
	pub fn builder() -> ApplicationBuilder {
		ApplicationBuilder::default()
	}

	/// The router.
	pub fn router(&self) -> &Router {
		&self.inner.router
	}

	/// The history behind the router.
	pub fn history(&self) -> &Rc<History> {
		self.inner.router.history()
	}

	/// The store.
	pub fn store(&self) -> &Store {
		&self.inner.store
	}

	/// The DOM collaborator.
	pub fn dom(&self) -> Rc<dyn Dom> {
		self.inner.dom.clone()
	}

	/// The template loader.
	pub fn templates(&self) -> Rc<dyn TemplateLoader> {
		self.inner.templates.clone()
	}

	/// Settings the application was built with.
	pub fn settings(&self) -> &Settings {
		&self.inner.settings
	}

	/// Registers routes; see [`Router::define`].
	pub fn define<P, I>(&self, routes: I) -> Result<()>
	where
		P: Into<RoutePattern>,
		I: IntoIterator<Item = (P, Rc<RouteClass>)>,
	{
		self.inner.router.define(routes)
	}

	/// Starts history tracking, loading the route of the current location.
	pub fn start(&self) -> Result<()> {
		tracing::debug!("starting application");
		Ok(self.history().start()?)
	}

	/// Navigates to `fragment`; see [`History::navigate`].
	pub fn navigate(&self, fragment: &str) -> Result<bool> {
		self.inner.router.navigate(fragment)
	}

	/// The current route.
	pub fn current_route(&self) -> Option<Rc<Route>> {
		self.inner.router.current_route()
	}

	fn from_inner(inner: Rc<AppInner>) -> Self {
		Self { inner }
	}
}

impl fmt::Debug for Application {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Application")
			.field("settings", &self.inner.settings)
			.field("router", &self.inner.router)
			.field("store", &self.inner.store)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
	settings: Option<Settings>,
	location: Option<Rc<dyn Location>>,
	dom: Option<Rc<dyn Dom>>,
	templates: Option<Rc<dyn TemplateLoader>>,
	fetcher: Option<Rc<dyn FetchProvider>>,
}

impl ApplicationBuilder {
	/// Settings; defaults to [`Settings::default`].
	pub fn settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Location; defaults to a fresh [`MemoryLocation`].
	pub fn location<L: Location + 'static>(mut self, location: Rc<L>) -> Self {
		self.location = Some(location);
		self
	}

	/// DOM; defaults to a fresh [`MemoryDom`].
	pub fn dom<D: Dom + 'static>(mut self, dom: Rc<D>) -> Self {
		self.dom = Some(dom);
		self
	}

	/// Templates; defaults to an empty [`TemplateRegistry`].
	pub fn templates<T: TemplateLoader + 'static>(mut self, templates: Rc<T>) -> Self {
		self.templates = Some(templates);
		self
	}

	/// Fetch provider. Required.
	pub fn fetcher<F: FetchProvider + 'static>(mut self, fetcher: Rc<F>) -> Self {
		self.fetcher = Some(fetcher);
		self
	}

	/// Builds the application and connects history changes to the router.
	pub fn build(self) -> Result<Application> {
		let fetcher = self
			.fetcher
			.ok_or(Error::MissingCollaborator("fetch provider"))?;
		let settings = self.settings.unwrap_or_default();
		let location = self
			.location
			.unwrap_or_else(|| Rc::new(MemoryLocation::new()));
		let dom = self.dom.unwrap_or_else(|| Rc::new(MemoryDom::new()));
		let templates = self
			.templates
			.unwrap_or_else(|| Rc::new(TemplateRegistry::new()));

		let history = History::new(location, settings.history.mode, &settings.history.root)?;
		let mut store = Store::new(fetcher);
		if let Some(base_url) = &settings.api.base_url {
			store = store.with_base_url(base_url.clone());
		}

		let inner = Rc::new(AppInner {
			settings,
			router: Router::new(history.clone()),
			store,
			dom,
			templates,
		});

		let app: Weak<AppInner> = Rc::downgrade(&inner);
		history.add_listener(
			URL_CHANGED,
			Handler::new(move |event| {
				let Some(inner) = app.upgrade() else {
					return Ok(());
				};
				let fragment = event
					.args
					.first()
					.map(ToString::to_string)
					.unwrap_or_default();
				let app = Application::from_inner(inner);
				match app.router().load_route(&app, &fragment) {
					Ok(_) => Ok(()),
					Err(err) => {
						tracing::error!(fragment = %fragment, error = %err, "route failed to load");
						Err(err.into())
					}
				}
			}),
			None,
		);

		tracing::debug!(
			mode = %inner.settings.history.mode,
			root = %inner.settings.history.root,
			"application built"
		);
		Ok(Application::from_inner(inner))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fetch::MockFetcher;
	use crate::history::HistoryMode;

	#[test]
	fn test_fetcher_is_required() {
		let err = Application::builder().build().unwrap_err();
		assert!(matches!(err, Error::MissingCollaborator("fetch provider")));
	}

	#[test]
	fn test_settings_reach_collaborators() {
		let mut settings = Settings::default();
		settings.history.mode = HistoryMode::Path;
		settings.history.root = "app".to_string();
		settings.api.base_url = Some("https://api.example.com".to_string());

		let app = Application::builder()
			.settings(settings)
			.fetcher(Rc::new(MockFetcher::new()))
			.build()
			.unwrap();
		assert_eq!(app.history().mode(), HistoryMode::Path);
		assert_eq!(app.history().root(), "/app/");
		assert_eq!(app.store().base_url(), Some("https://api.example.com"));
	}

	#[test]
	fn test_unsupported_mode_fails_build() {
		let mut settings = Settings::default();
		settings.history.mode = HistoryMode::Path;
		let err = Application::builder()
			.settings(settings)
			.location(Rc::new(MemoryLocation::new().without_push_state()))
			.fetcher(Rc::new(MockFetcher::new()))
			.build()
			.unwrap_err();
		assert!(matches!(err, Error::UnsupportedHistoryMode { .. }));
	}
}
