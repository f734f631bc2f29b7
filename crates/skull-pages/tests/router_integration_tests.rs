//! Router Integration Tests
//!
//! Tests for pattern matching, first-match dispatch and route lifecycle
//! driven through an application context.
//!
//! Test Categories:
//! - Category 1: Pattern Matching
//! - Category 2: Dispatch Through History
//! - Category 3: Route Lifecycle

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use skull_core::{Class, Observable, Value};
use skull_pages::{
	Application, CompiledRoute, MemoryDom, MemoryLocation, MockFetcher, Page, RouteClass,
	RouteState, TemplateRegistry, View,
};

type Calls = Rc<RefCell<Vec<(String, Vec<Option<String>>)>>>;

fn recording_route(name: &'static str, calls: &Calls) -> Rc<RouteClass> {
	let sink = calls.clone();
	RouteClass::builder(name)
		.setup(move |_, _, params| {
			sink.borrow_mut().push((name.to_string(), params.to_vec()));
			Ok(())
		})
		.build()
}

fn app() -> Application {
	Application::builder()
		.fetcher(Rc::new(MockFetcher::new()))
		.build()
		.unwrap()
}

// ============================================================================
// Category 1: Pattern Matching
// ============================================================================

/// Tests the named parameter cases
#[rstest]
#[case("movies/42", Some(vec![Some("42".to_string())]))]
#[case("movies", None)]
#[case("movies/42/reviews", None)]
#[case("movies/", Some(vec![None]))]
fn test_movies_id_pattern(#[case] fragment: &str, #[case] expected: Option<Vec<Option<String>>>) {
	let route = CompiledRoute::compile("movies/:id").unwrap();
	assert_eq!(route.extract(fragment), expected);
}

/// Tests that regex metacharacters in templates match literally
#[test]
fn test_special_characters_are_literal() {
	let route = CompiledRoute::compile("search?q=:term").unwrap();
	assert_eq!(
		route.extract("search?q=heat"),
		Some(vec![Some("heat".to_string())])
	);
	assert_eq!(route.extract("searchXq=heat"), None);
}

/// Tests several parameters in capture order
#[test]
fn test_multiple_params_in_order() {
	let route = CompiledRoute::compile("movies/:movie_id/reviews/:review_id").unwrap();
	assert_eq!(
		route.extract("movies/7/reviews/3"),
		Some(vec![Some("7".to_string()), Some("3".to_string())])
	);
}

// ============================================================================
// Category 2: Dispatch Through History
// ============================================================================

/// Tests that registration order decides between overlapping patterns
#[test]
fn test_first_registered_pattern_wins() {
	let calls: Calls = Rc::default();
	let app = app();
	app.define([
		("movies/:id", recording_route("MovieRoute", &calls)),
		("movies/*rest", recording_route("MoviesRestRoute", &calls)),
	])
	.unwrap();
	app.start().unwrap();

	app.navigate("movies/42").unwrap();
	app.navigate("movies/42/reviews").unwrap();

	assert_eq!(
		*calls.borrow(),
		vec![
			("MovieRoute".to_string(), vec![Some("42".to_string())]),
			(
				"MoviesRestRoute".to_string(),
				vec![Some("42/reviews".to_string())]
			),
		]
	);
}

/// Tests that unmatched fragments are ignored
#[test]
fn test_unmatched_fragment_is_noop() {
	let calls: Calls = Rc::default();
	let app = app();
	app.define([("movies", recording_route("MoviesRoute", &calls))])
		.unwrap();
	app.start().unwrap();

	app.navigate("nowhere").unwrap();
	assert!(calls.borrow().is_empty());
	assert!(app.current_route().is_none());
	assert_eq!(app.router().fragment(), "nowhere");
}

/// Tests that navigating to the same fragment twice does not re-route
#[test]
fn test_same_fragment_does_not_reload() {
	let calls: Calls = Rc::default();
	let app = app();
	app.define([("movies/:id", recording_route("MovieRoute", &calls))])
		.unwrap();
	app.start().unwrap();

	app.navigate("movies/1").unwrap();
	app.navigate("/movies/1/").unwrap();
	assert_eq!(calls.borrow().len(), 1);
}

/// Tests back navigation through the location
#[test]
fn test_back_navigation_reloads_route() {
	let calls: Calls = Rc::default();
	let location = Rc::new(MemoryLocation::new());
	let app = Application::builder()
		.location(location.clone())
		.fetcher(Rc::new(MockFetcher::new()))
		.build()
		.unwrap();
	app.define([("movies/:id", recording_route("MovieRoute", &calls))])
		.unwrap();
	app.start().unwrap();

	app.navigate("movies/1").unwrap();
	app.navigate("movies/2").unwrap();
	location.back().unwrap();

	let ids: Vec<Option<String>> = calls.borrow().iter().map(|(_, p)| p[0].clone()).collect();
	assert_eq!(
		ids,
		vec![
			Some("1".to_string()),
			Some("2".to_string()),
			Some("1".to_string())
		]
	);
}

/// Tests that an unbalanced optional group rejects the whole definition
#[test]
fn test_invalid_regex_rejects_definition() {
	let app = app();
	let route = RouteClass::builder("Any").build();
	let result = app.define([("ok", route.clone()), ("docs(/:section", route)]);

	assert!(result.is_err());
	assert_eq!(app.router().route_count(), 0);
}

// ============================================================================
// Category 3: Route Lifecycle
// ============================================================================

/// Tests that each match builds a fresh controller and view
#[test]
fn test_each_match_creates_fresh_instances() {
	let templates = Rc::new(TemplateRegistry::new());
	templates.register("movie", |scope| scope.bind("controller.id"));
	let dom = Rc::new(MemoryDom::new());

	let controller = Class::extend(&skull_pages::Controller::class(), "MovieController").build();
	let view = Class::extend(&View::class(), "MovieView")
		.property("template_id", "movie")
		.build();
	let route = RouteClass::builder("MovieRoute")
		.controller(controller)
		.view(view)
		.setup(|route, _, params| {
			let id = params[0].clone();
			if let Some(controller) = route.controller() {
				controller.set("id", Value::from(id))?;
			}
			Ok(())
		})
		.build();

	let app = Application::builder()
		.templates(templates)
		.dom(dom.clone())
		.fetcher(Rc::new(MockFetcher::new()))
		.build()
		.unwrap();
	app.define([("movies/:id", route)]).unwrap();
	app.start().unwrap();

	app.navigate("movies/1").unwrap();
	let first = app.current_route().unwrap();
	app.navigate("movies/2").unwrap();
	let second = app.current_route().unwrap();

	assert!(!Rc::ptr_eq(&first, &second));
	assert!(!first.controller().unwrap().ptr_eq(second.controller().unwrap()));
	assert_eq!(second.state(), RouteState::Rendered);
	assert_eq!(second.controller().unwrap().get("id").as_str(), Some("2"));
	assert_eq!(dom.text_content(dom.body()), "2");
}

/// Tests a custom execute that skips rendering
#[test]
fn test_custom_execute_skips_render() {
	let dom = Rc::new(MemoryDom::new());
	let templates = Rc::new(TemplateRegistry::new());
	templates.register("never", |_| Ok(Page::text("rendered")));
	let view = Class::extend(&View::class(), "NeverView")
		.property("template_id", "never")
		.build();
	let route = RouteClass::builder("SilentRoute")
		.view(view)
		.execute(|_, _, _| Ok(()))
		.build();

	let app = Application::builder()
		.templates(templates)
		.dom(dom.clone())
		.fetcher(Rc::new(MockFetcher::new()))
		.build()
		.unwrap();
	app.define([("", route)]).unwrap();
	app.start().unwrap();

	let current = app.current_route().unwrap();
	assert_eq!(current.state(), RouteState::Completed);
	assert_eq!(dom.text_content(dom.body()), "");
}

/// Tests route class inheritance
#[test]
fn test_extended_route_inherits_hooks() {
	let calls: Calls = Rc::default();
	let base = recording_route("BaseRoute", &calls);
	let child = RouteClass::extend(&base, "ChildRoute").build();

	let app = app();
	app.define([("child/:x", child.clone())]).unwrap();
	app.start().unwrap();
	app.navigate("child/9").unwrap();

	let current = app.current_route().unwrap();
	assert_eq!(current.name(), "ChildRoute");
	assert!(current.is_instance_of(&base));
	assert!(current.is_instance_of(&child));
	assert_eq!(calls.borrow()[0].1, vec![Some("9".to_string())]);
}
