//! # Skull
//!
//! A client-side MVC framework: observable objects, hash or path routing,
//! templates with live bindings, and a fetch-backed model store.
//!
//! The framework is split into two crates, re-exported here:
//!
//! - [`core`]: classes, objects, events, property observation, array
//!   proxies and dotted property paths.
//! - [`pages`]: history, router, routes, views, templates, the store and
//!   the application context that ties them together.
//!
//! ## Feature Flags
//!
//! - `http` - `HttpFetcher`, a fetch provider backed by reqwest
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use skull::prelude::*;
//! use std::rc::Rc;
//!
//! # fn main() -> skull::pages::Result<()> {
//! let templates = Rc::new(TemplateRegistry::new());
//! templates.register("movies", |scope| {
//! 	Ok(Page::element("ul")
//! 		.child(scope.each("controller.movies", |movie| {
//! 			Ok(Page::element("li").child(movie.bind("title")?).into_page())
//! 		})?)
//! 		.into_page())
//! });
//!
//! let movies = Resource::new("Movie", "/movies.json");
//! let route = RouteClass::builder("MoviesRoute")
//! 	.controller(Controller::class())
//! 	.view(
//! 		Class::extend(&View::class(), "MoviesView")
//! 			.property("template_id", "movies")
//! 			.build(),
//! 	)
//! 	.setup(move |route, app, _params| {
//! 		let records = app.store().find_all(&movies)?;
//! 		if let Some(controller) = route.controller() {
//! 			controller.set("movies", records)?;
//! 		}
//! 		Ok(())
//! 	})
//! 	.build();
//!
//! let app = Application::builder()
//! 	.templates(templates)
//! 	.fetcher(Rc::new(MockFetcher::new()))
//! 	.build()?;
//! app.define([("movies", route)])?;
//! app.start()?;
//! app.navigate("movies")?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pages;

pub use skull_core::{Class, Error as CoreError, ObjectRef, Value};
pub use skull_pages::{Application, Error, Result};

/// Commonly used types.
pub mod prelude {
	// Object model
	pub use skull_core::{
		ArrayProxy, Class, Events, Handler, Mixin, ObjectRef, Observable, Overrides, Value,
	};

	// Application surface
	pub use skull_pages::{
		ActionOptions, Application, Controller, IntoPage, Page, PageElement, RenderScope,
		Resource, RouteClass, Store, TemplateRegistry, View,
	};

	// Collaborators
	pub use skull_pages::{
		Dom, FetchProvider, Location, MemoryDom, MemoryLocation, MockFetcher, TemplateProvider,
	};

	#[cfg(feature = "http")]
	pub use skull_pages::HttpFetcher;
}
