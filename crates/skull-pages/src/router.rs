//! Fragment routing.
//!
//! Route patterns use a small template syntax compiled to anchored regular
//! expressions:
//!
//! | Syntax    | Matches                                   |
//! |-----------|-------------------------------------------|
//! | `movies`  | the literal text                          |
//! | `:id`     | one segment (no `/`), possibly empty      |
//! | `*rest`   | anything, including `/`, as little as possible |
//! | `( ... )` | an optional part                          |
//!
//! Patterns are tried in registration order and the first match wins.
//! Captures are URL-decoded; empty captures become `None`. A fragment no
//! pattern matches is ignored.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};

use crate::app::Application;
use crate::error::{Error, Result};
use crate::history::History;
use crate::route::{Route, RouteClass};

/// Maximum size of a compiled route expression in bytes.
const MAX_ROUTE_REGEX_SIZE: usize = 1 << 20;

/// A route pattern: template syntax or a prebuilt expression.
#[derive(Debug, Clone)]
pub enum RoutePattern {
	/// Template with `:name`, `*name` and `( ... )`.
	Template(String),
	/// Expression used as is; its capture groups are the parameters.
	Regex(Regex),
}

impl From<&str> for RoutePattern {
	fn from(pattern: &str) -> Self {
		RoutePattern::Template(pattern.to_string())
	}
}

impl From<String> for RoutePattern {
	fn from(pattern: String) -> Self {
		RoutePattern::Template(pattern)
	}
}

impl From<Regex> for RoutePattern {
	fn from(regex: Regex) -> Self {
		RoutePattern::Regex(regex)
	}
}

/// Translates template syntax into an anchored expression.
pub fn route_to_regex(route: &str) -> String {
	let mut out = String::from("^");
	let mut chars = route.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'(' => out.push_str("(?:"),
			')' => out.push_str(")?"),
			':' | '*' => {
				let mut name = String::new();
				while let Some(&next) = chars.peek() {
					if !(next.is_ascii_alphanumeric() || next == '_') {
						break;
					}
					name.push(next);
					chars.next();
				}
				if name.is_empty() {
					out.push_str(&regex::escape(&c.to_string()));
				} else if c == ':' {
					out.push_str("([^/]*)");
				} else {
					out.push_str("(.*?)");
				}
			}
			other => out.push_str(&regex::escape(&other.to_string())),
		}
	}

	out.push('$');
	out
}

/// A compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
	pattern: String,
	regex: Regex,
}

impl CompiledRoute {
	/// Compiles a pattern.
	pub fn compile(pattern: impl Into<RoutePattern>) -> Result<Self> {
		match pattern.into() {
			RoutePattern::Regex(regex) => Ok(Self {
				pattern: regex.as_str().to_string(),
				regex,
			}),
			RoutePattern::Template(template) => {
				let regex = RegexBuilder::new(&route_to_regex(&template))
					.size_limit(MAX_ROUTE_REGEX_SIZE)
					.build()
					.map_err(|source| Error::InvalidRoute {
						pattern: template.clone(),
						source,
					})?;
				Ok(Self {
					pattern: template,
					regex,
				})
			}
		}
	}

	/// The pattern as registered.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// The compiled expression.
	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Matches `fragment`, returning the decoded captures in order.
	pub fn extract(&self, fragment: &str) -> Option<Vec<Option<String>>> {
		let captures = self.regex.captures(fragment)?;
		Some(
			captures
				.iter()
				.skip(1)
				.map(|group| {
					group
						.map(|m| m.as_str())
						.filter(|raw| !raw.is_empty())
						.map(decode_param)
				})
				.collect(),
		)
	}
}

fn decode_param(raw: &str) -> String {
	match urlencoding::decode(raw) {
		Ok(decoded) => decoded.into_owned(),
		Err(err) => {
			tracing::warn!(param = raw, error = %err, "route parameter is not valid UTF-8 once decoded");
			raw.to_string()
		}
	}
}

/// Ordered pattern table.
#[derive(Debug, Default)]
pub struct RouteTable {
	routes: Vec<(CompiledRoute, Rc<RouteClass>)>,
}

impl RouteTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a route.
	pub fn add(&mut self, pattern: impl Into<RoutePattern>, class: Rc<RouteClass>) -> Result<()> {
		self.routes.push((CompiledRoute::compile(pattern)?, class));
		Ok(())
	}

	/// First route matching `fragment`, with its parameters.
	pub fn find(&self, fragment: &str) -> Option<(Rc<RouteClass>, Vec<Option<String>>)> {
		self.routes.iter().find_map(|(compiled, class)| {
			compiled
				.extract(fragment)
				.map(|params| (class.clone(), params))
		})
	}

	/// Number of routes.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// Whether the table is empty.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}
}

/// Maps history fragments to routes.
pub struct Router {
	history: Rc<History>,
	table: RefCell<RouteTable>,
	current: RefCell<Option<Rc<Route>>>,
}

impl Router {
	/// Creates a router over `history`.
	pub fn new(history: Rc<History>) -> Self {
		Self {
			history,
			table: RefCell::new(RouteTable::new()),
			current: RefCell::new(None),
		}
	}

	/// Registers routes in iteration order.
	///
	/// Nothing is registered if any pattern fails to compile.
	pub fn define<P, I>(&self, routes: I) -> Result<()>
	where
		P: Into<RoutePattern>,
		I: IntoIterator<Item = (P, Rc<RouteClass>)>,
	{
		let mut staged = RouteTable::new();
		for (pattern, class) in routes {
			staged.add(pattern, class)?;
		}
		tracing::debug!(routes = staged.len(), "defining routes");
		self.table.borrow_mut().routes.append(&mut staged.routes);
		Ok(())
	}

	/// First route matching `fragment`, with its parameters.
	pub fn match_fragment(&self, fragment: &str) -> Option<(Rc<RouteClass>, Vec<Option<String>>)> {
		self.table.borrow().find(fragment)
	}

	/// Instantiates and executes the route matching `fragment`.
	///
	/// The new route becomes current before it executes, so a redirect
	/// from `execute` leaves the redirect target current.
	pub fn load_route(&self, app: &Application, fragment: &str) -> Result<bool> {
		let Some((class, params)) = self.match_fragment(fragment) else {
			tracing::debug!(fragment, "no route matched");
			return Ok(false);
		};
		tracing::debug!(fragment, route = %class.name(), "route matched");
		let route = class.instantiate(app)?;
		*self.current.borrow_mut() = Some(route.clone());
		route.execute(app, &params)?;
		Ok(true)
	}

	/// Navigates the history to `fragment`.
	pub fn navigate(&self, fragment: &str) -> Result<bool> {
		Ok(self.history.navigate(fragment)?)
	}

	/// The route of the last match.
	pub fn current_route(&self) -> Option<Rc<Route>> {
		self.current.borrow().clone()
	}

	/// The history's current fragment.
	pub fn fragment(&self) -> String {
		self.history.fragment()
	}

	/// The underlying history.
	pub fn history(&self) -> &Rc<History> {
		&self.history
	}

	/// Number of registered routes.
	pub fn route_count(&self) -> usize {
		self.table.borrow().len()
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("history", &self.history)
			.field("routes", &self.route_count())
			.field(
				"current",
				&self.current.borrow().as_ref().map(|r| r.name().to_string()),
			)
			.finish()
	}
}
