//! Routing, views and data module.
//!
//! History, router, routes, views with live bindings, templates, the model
//! store and the [`Application`](skull_pages::Application) context.
//!
//! # Examples
//!
//! ```rust
//! use skull::pages::CompiledRoute;
//!
//! let route = CompiledRoute::compile("movies/:id").unwrap();
//! assert_eq!(route.extract("movies/42"), Some(vec![Some("42".to_string())]));
//! ```

pub use skull_pages::*;
